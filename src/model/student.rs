use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "student_code": "STU-001",
        "first_name": "Amina",
        "last_name": "Rahman",
        "email": "amina.rahman@school.edu",
        "phone": "+8801712345678",
        "enrolled_date": "2024-01-15",
        "status": "active"
    })
)]
pub struct Student {
    #[schema(example = 1)]
    pub id: u64,

    /// Human-readable code used interchangeably with the primary id
    /// by upstream systems (attendance may reference either).
    #[schema(example = "STU-001")]
    pub student_code: String,

    #[schema(example = "Amina")]
    pub first_name: String,

    #[schema(example = "Rahman")]
    pub last_name: String,

    #[schema(example = "amina.rahman@school.edu")]
    pub email: String,

    #[schema(example = "+8801712345678", nullable = true)]
    pub phone: Option<String>,

    #[schema(example = "2024-01-15", value_type = String, format = "date")]
    pub enrolled_date: NaiveDate,

    #[schema(example = "active")]
    pub status: String,
}
