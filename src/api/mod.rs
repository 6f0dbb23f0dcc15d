pub mod attendance;
pub mod course;
pub mod quiz;
pub mod student;
