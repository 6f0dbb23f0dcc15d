use crate::api::attendance::{MarkAttendance, MarkAttendanceResponse, SummaryQuery};
use crate::api::course::{CourseListResponse, CourseQuery, CreateCourse, EnrollRequest};
use crate::api::quiz::{
    AnswerSubmission, CreateQuiz, CreateQuizQuestion, QuizDetailResponse, QuizListResponse,
    QuizQuery, QuizQuestionView, SubmitAttempt,
};
use crate::api::student::{CreateStudent, StudentListResponse, StudentQuery};
use crate::model::attendance::{AttendanceStatus, AttendanceSummary, DailyAttendanceRecord};
use crate::model::course::Course;
use crate::model::quiz::{Quiz, QuizAttempt};
use crate::model::student::Student;
use utoipa::Modify;
use utoipa::OpenApi;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "LMS API",
        version = "1.0.0",
        description = r#"
## Learning Management System (LMS)

This API powers a **Learning Management System** for course delivery,
quizzes, attendance, and student account management.

### 🔹 Key Features
- **Student Management**
  - Create, update, list, and view student profiles
- **Course Management**
  - Create courses and manage enrollment
- **Quiz Management**
  - Publish quizzes, record single attempts, automatic grading
- **Attendance Management**
  - Daily roster capture and monthly per-student summaries

### 🔐 Security
Most endpoints are protected using **JWT Bearer authentication**.
Only authorized roles such as **Admin** or **Instructor** can access sensitive operations.

### 📦 Response Format
- JSON-based RESTful responses
- Pagination supported for list endpoints

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::student::create_student,
        crate::api::student::list_students,
        crate::api::student::get_student,
        crate::api::student::update_student,
        crate::api::student::delete_student,

        crate::api::course::create_course,
        crate::api::course::list_courses,
        crate::api::course::get_course,
        crate::api::course::update_course,
        crate::api::course::delete_course,
        crate::api::course::enroll_student,
        crate::api::course::unenroll_student,
        crate::api::course::list_course_students,

        crate::api::quiz::create_quiz,
        crate::api::quiz::list_quizzes,
        crate::api::quiz::get_quiz,
        crate::api::quiz::submit_attempt,
        crate::api::quiz::my_attempt,

        crate::api::attendance::mark_attendance,
        crate::api::attendance::attendance_summary
    ),
    components(
        schemas(
            Student,
            CreateStudent,
            StudentQuery,
            StudentListResponse,
            Course,
            CreateCourse,
            CourseQuery,
            CourseListResponse,
            EnrollRequest,
            Quiz,
            QuizAttempt,
            CreateQuiz,
            CreateQuizQuestion,
            QuizQuery,
            QuizListResponse,
            QuizDetailResponse,
            QuizQuestionView,
            SubmitAttempt,
            AnswerSubmission,
            MarkAttendance,
            MarkAttendanceResponse,
            SummaryQuery,
            AttendanceSummary,
            DailyAttendanceRecord,
            AttendanceStatus
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Student", description = "Student management APIs"),
        (name = "Course", description = "Course and enrollment APIs"),
        (name = "Quiz", description = "Quiz and attempt APIs"),
        (name = "Attendance", description = "Attendance capture and summary APIs"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
