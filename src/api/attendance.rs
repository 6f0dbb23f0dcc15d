use crate::{
    auth::auth::AuthUser,
    config::Config,
    model::attendance::{AttendanceDateRecord, AttendanceRow, AttendanceSummary, StudentIdentifiers},
    utils::attendance_summary::compute_monthly_summary,
};
use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use std::collections::BTreeMap;
use tracing::error;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct MarkAttendance {
    #[schema(example = "2026-08-03", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(example = 3)]
    pub course_id: u64,
    /// Student references present that day; each entry may be a numeric
    /// id or a student code, stored as given.
    #[schema(example = json!(["42", "STU-043"]))]
    pub present_students: Vec<String>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct SummaryQuery {
    /// Student whose summary is requested
    #[schema(example = 42)]
    pub student_id: u64,
    /// Month as YYYY-MM; defaults to the current month
    #[schema(example = "2026-08")]
    pub month: Option<String>,
    /// Restrict to one course
    #[schema(example = 3)]
    pub course_id: Option<u64>,
}

#[derive(Serialize, ToSchema)]
pub struct MarkAttendanceResponse {
    #[schema(example = "2026-08-03", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(example = 23)]
    pub recorded: u32,
}

fn parse_month(raw: &str) -> Option<(i32, u32)> {
    let (y, m) = raw.trim().split_once('-')?;
    let year = y.parse::<i32>().ok()?;
    let month = m.parse::<u32>().ok()?;
    if (1..=12).contains(&month) {
        Some((year, month))
    } else {
        None
    }
}

fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()
}

/// Record attendance for one date
#[utoipa::path(
    post,
    path = "/api/v1/attendance",
    request_body = MarkAttendance,
    responses(
        (status = 200, description = "Attendance recorded", body = MarkAttendanceResponse),
        (status = 400, description = "Invalid date or empty roster"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn mark_attendance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<MarkAttendance>,
) -> actix_web::Result<impl Responder> {
    auth.require_instructor_or_admin()?;

    let today = Utc::now().date_naive();
    if payload.date > today {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Cannot record attendance for a future date"
        })));
    }

    let refs: Vec<&str> = payload
        .present_students
        .iter()
        .map(|r| r.trim())
        .filter(|r| !r.is_empty())
        .collect();

    if refs.is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "present_students must not be empty"
        })));
    }

    let mut tx = pool.begin().await.map_err(|e| {
        error!(error = %e, "Failed to open transaction");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let mut recorded = 0u32;
    for student_ref in refs {
        sqlx::query(
            r#"
            INSERT INTO attendance_days (course_id, date, student_ref)
            VALUES (?, ?, ?)
            ON DUPLICATE KEY UPDATE recorded_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(payload.course_id)
        .bind(payload.date)
        .bind(student_ref)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            error!(error = %e, course_id = payload.course_id, student_ref, "Failed to record attendance");
            ErrorInternalServerError("Internal Server Error")
        })?;
        recorded += 1;
    }

    tx.commit().await.map_err(|e| {
        error!(error = %e, "Failed to commit attendance");
        ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(MarkAttendanceResponse {
        date: payload.date,
        recorded,
    }))
}

/// Monthly attendance summary for one student
#[utoipa::path(
    get,
    path = "/api/v1/attendance/summary",
    params(SummaryQuery),
    responses(
        (status = 200, description = "Monthly summary", body = AttendanceSummary),
        (status = 400, description = "Invalid month"),
        (status = 404, description = "Student not found"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn attendance_summary(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    query: web::Query<SummaryQuery>,
) -> actix_web::Result<impl Responder> {
    // students may read their own summary only
    if auth.is_student() && auth.student_id != Some(query.student_id) {
        return Err(actix_web::error::ErrorForbidden("Not your record"));
    }

    let today = Utc::now().date_naive();
    let (year, month) = match query.month.as_deref() {
        Some(raw) => match parse_month(raw) {
            Some(parsed) => parsed,
            None => {
                return Ok(HttpResponse::BadRequest().json(json!({
                    "message": "month must be YYYY-MM"
                })));
            }
        },
        None => (today.year(), today.month()),
    };

    let (Some(month_start), Some(month_end)) = (
        NaiveDate::from_ymd_opt(year, month, 1),
        last_day_of_month(year, month),
    ) else {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "month out of range"
        })));
    };

    let student = sqlx::query_as::<_, (u64, String)>(
        "SELECT id, student_code FROM students WHERE id = ?",
    )
    .bind(query.student_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, student_id = query.student_id, "Failed to fetch student");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let Some((student_id, student_code)) = student else {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Student not found"
        })));
    };

    let identifiers = StudentIdentifiers::new(student_id, &student_code);

    let mut sql = String::from(
        "SELECT date, student_ref, recorded_at FROM attendance_days WHERE date BETWEEN ? AND ?",
    );
    if query.course_id.is_some() {
        sql.push_str(" AND course_id = ?");
    }

    let mut rows_q = sqlx::query_as::<_, AttendanceRow>(&sql)
        .bind(month_start)
        .bind(month_end);
    if let Some(course_id) = query.course_id {
        rows_q = rows_q.bind(course_id);
    }

    let rows = rows_q.fetch_all(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, student_id, "Failed to fetch attendance rows");
        ErrorInternalServerError("Internal Server Error")
    })?;

    // Fold flat rows into one record per date, the snapshot shape the
    // summary computation expects.
    let mut by_date: BTreeMap<NaiveDate, AttendanceDateRecord> = BTreeMap::new();
    for row in rows {
        let entry = by_date
            .entry(row.date)
            .or_insert_with(|| AttendanceDateRecord {
                date: row.date,
                present_students: Default::default(),
                last_updated: row.recorded_at,
            });
        entry.last_updated = entry.last_updated.max(row.recorded_at);
        entry.present_students.insert(row.student_ref);
    }
    let date_records: Vec<AttendanceDateRecord> = by_date.into_values().collect();

    // For a past month every day counts; for the current month the clock
    // bounds the totals; a future month yields the all-zero summary.
    let effective_today = today.clamp(month_start, month_end);

    let summary = compute_monthly_summary(
        &identifiers,
        &date_records,
        effective_today,
        config.attendance_hours_per_day,
    );

    Ok(HttpResponse::Ok().json(summary))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_month() {
        assert_eq!(parse_month("2026-08"), Some((2026, 8)));
        assert_eq!(parse_month(" 2026-01 "), Some((2026, 1)));
    }

    #[test]
    fn rejects_malformed_month() {
        assert_eq!(parse_month("2026"), None);
        assert_eq!(parse_month("2026-13"), None);
        assert_eq!(parse_month("2026-00"), None);
        assert_eq!(parse_month("august"), None);
    }

    #[test]
    fn month_end_handles_length_and_leap_years() {
        assert_eq!(
            last_day_of_month(2026, 8),
            NaiveDate::from_ymd_opt(2026, 8, 31)
        );
        assert_eq!(
            last_day_of_month(2026, 2),
            NaiveDate::from_ymd_opt(2026, 2, 28)
        );
        assert_eq!(
            last_day_of_month(2028, 2),
            NaiveDate::from_ymd_opt(2028, 2, 29)
        );
        assert_eq!(
            last_day_of_month(2026, 12),
            NaiveDate::from_ymd_opt(2026, 12, 31)
        );
    }
}
