use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "course_code": "MATH-101",
        "title": "Introductory Algebra",
        "description": "First-semester algebra course",
        "instructor_id": 12,
        "status": "active"
    })
)]
pub struct Course {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = "MATH-101")]
    pub course_code: String,

    #[schema(example = "Introductory Algebra")]
    pub title: String,

    #[schema(example = "First-semester algebra course", nullable = true)]
    pub description: Option<String>,

    /// User id of the instructor who owns the course
    #[schema(example = 12, nullable = true)]
    pub instructor_id: Option<u64>,

    #[schema(example = "active")]
    pub status: String,
}
