pub mod attendance_summary;
pub mod db_utils;
pub mod quiz_grading;
pub mod reset_limiter;
pub mod username_lookup;
