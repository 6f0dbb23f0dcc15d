use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

/// Raw attendance row: one row per (course, date, student reference).
/// `student_ref` may hold either the numeric student id or the
/// human-readable student code; upstream writers use both.
#[derive(Debug, sqlx::FromRow)]
pub struct AttendanceRow {
    pub date: NaiveDate,
    pub student_ref: String,
    pub recorded_at: DateTime<Utc>,
}

/// All attendance captured for one calendar date, the shape the
/// summary computation consumes.
#[derive(Debug, Clone)]
pub struct AttendanceDateRecord {
    pub date: NaiveDate,
    pub present_students: HashSet<String>,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DailyAttendanceRecord {
    #[schema(example = "2026-08-03", value_type = String, format = "date")]
    pub date: NaiveDate,
    #[schema(example = "present")]
    pub status: AttendanceStatus,
    /// Clock time of the last update to that day's record, when present.
    #[schema(example = "09:42", nullable = true)]
    pub time: Option<String>,
    #[schema(example = 7.0)]
    pub hours_spent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AttendanceSummary {
    #[schema(example = "August 2026")]
    pub current_month: String,
    #[schema(example = 20)]
    pub total_days: u32,
    #[schema(example = 15)]
    pub present_days: u32,
    #[schema(example = 5)]
    pub absent_days: u32,
    #[schema(example = 75)]
    pub percentage: u32,
    #[schema(example = 105.0)]
    pub total_hours: f64,
    #[schema(example = 7.0)]
    pub average_hours_per_day: f64,
    pub daily_records: Vec<DailyAttendanceRecord>,
}

/// Alias set for one student. The attendance source of truth may have
/// recorded presence under the primary id or the student code, so
/// membership checks must cover every known alias.
#[derive(Debug, Clone)]
pub struct StudentIdentifiers {
    aliases: HashSet<String>,
}

impl StudentIdentifiers {
    pub fn new(primary_id: u64, student_code: &str) -> Self {
        let mut aliases = HashSet::new();
        aliases.insert(primary_id.to_string());
        let code = student_code.trim().to_lowercase();
        if !code.is_empty() {
            aliases.insert(code);
        }
        Self { aliases }
    }

    /// True when `reference` names this student under any alias.
    pub fn matches(&self, reference: &str) -> bool {
        self.aliases.contains(&reference.trim().to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_match_id_and_code_case_insensitively() {
        let ids = StudentIdentifiers::new(42, "STU-042");
        assert!(ids.matches("42"));
        assert!(ids.matches("stu-042"));
        assert!(ids.matches(" STU-042 "));
        assert!(!ids.matches("43"));
        assert!(!ids.matches("STU-043"));
    }

    #[test]
    fn blank_code_adds_no_alias() {
        let ids = StudentIdentifiers::new(7, "  ");
        assert!(ids.matches("7"));
        assert!(!ids.matches(""));
    }

    #[test]
    fn attendance_status_serde_lowercase() {
        let s: AttendanceStatus = serde_json::from_str("\"present\"").unwrap();
        assert_eq!(s, AttendanceStatus::Present);
        let v = serde_json::to_value(AttendanceStatus::Absent).unwrap();
        assert_eq!(v, serde_json::json!("absent"));
        assert_eq!(AttendanceStatus::Present.to_string(), "present");
    }
}
