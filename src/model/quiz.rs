use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Quiz {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 3)]
    pub course_id: u64,
    #[schema(example = "Week 4 checkpoint")]
    pub title: String,
    #[schema(example = "published")]
    pub status: String,
    #[schema(example = "2026-01-01T00:00:00Z", format = "date-time", value_type = String)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Question row as stored; `options_json` holds the ordered option texts.
#[derive(Debug, sqlx::FromRow)]
pub struct QuizQuestionRow {
    pub id: u64,
    pub quiz_id: u64,
    pub position: u32,
    pub prompt: String,
    pub options_json: String,
    pub correct_option: u32,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct QuizAttempt {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 1)]
    pub quiz_id: u64,
    #[schema(example = 7)]
    pub student_id: u64,
    #[schema(example = 80)]
    pub score: u32,
    #[schema(example = 4)]
    pub correct_count: u32,
    #[schema(example = 5)]
    pub total_questions: u32,
    #[schema(example = "2026-01-01T00:00:00Z", format = "date-time", value_type = String)]
    pub submitted_at: Option<DateTime<Utc>>,
}
