use crate::model::attendance::{
    AttendanceDateRecord, AttendanceStatus, AttendanceSummary, DailyAttendanceRecord,
    StudentIdentifiers,
};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use std::collections::BTreeMap;

/// Pure projection from one month's attendance records to a summary for a
/// single student.
///
/// Rules:
/// - Only dates of `today`'s month, up to and including `today`, are
///   considered; later dates never contribute to any count.
/// - A date with no record at all is a holiday and is excluded from the
///   totals and from `daily_records`.
/// - A date with a record counts as present when any of the student's
///   aliases appears in that day's set, absent otherwise. Presence under
///   several aliases still counts once.
/// - Each present day is credited `hours_per_present_day` hours.
///
/// An empty `date_records` slice is the "no data yet" state and yields an
/// all-zero summary, not an error.
pub fn compute_monthly_summary(
    identifiers: &StudentIdentifiers,
    date_records: &[AttendanceDateRecord],
    today: NaiveDate,
    hours_per_present_day: f64,
) -> AttendanceSummary {
    let current_month = today.format("%B %Y").to_string();

    if date_records.is_empty() {
        return AttendanceSummary {
            current_month,
            total_days: 0,
            present_days: 0,
            absent_days: 0,
            percentage: 0,
            total_hours: 0.0,
            average_hours_per_day: 0.0,
            daily_records: Vec::new(),
        };
    }

    let month_start = today.with_day(1).unwrap_or(today);

    // Collapse records per date: several documents for the same date are
    // unioned, keeping the latest update time among the matching ones.
    struct DayAgg {
        present: bool,
        last_updated: Option<DateTime<Utc>>,
    }

    let mut days: BTreeMap<NaiveDate, DayAgg> = BTreeMap::new();
    for record in date_records {
        if record.date < month_start || record.date > today {
            continue;
        }
        let matched = record
            .present_students
            .iter()
            .any(|reference| identifiers.matches(reference));

        let entry = days.entry(record.date).or_insert(DayAgg {
            present: false,
            last_updated: None,
        });
        if matched {
            entry.present = true;
            entry.last_updated = match entry.last_updated {
                Some(existing) => Some(existing.max(record.last_updated)),
                None => Some(record.last_updated),
            };
        }
    }

    let mut daily_records = Vec::with_capacity(days.len());
    let mut present_days = 0u32;
    let mut absent_days = 0u32;

    for (date, agg) in days {
        let (status, time, hours_spent) = if agg.present {
            present_days += 1;
            (
                AttendanceStatus::Present,
                agg.last_updated.map(|t| t.format("%H:%M").to_string()),
                hours_per_present_day,
            )
        } else {
            absent_days += 1;
            (AttendanceStatus::Absent, None, 0.0)
        };

        daily_records.push(DailyAttendanceRecord {
            date,
            status,
            time,
            hours_spent,
        });
    }

    let total_days = present_days + absent_days;
    let percentage = if total_days > 0 {
        ((present_days as f64 / total_days as f64) * 100.0).round() as u32
    } else {
        0
    };
    let total_hours = present_days as f64 * hours_per_present_day;
    let average_hours_per_day = if present_days > 0 {
        total_hours / present_days as f64
    } else {
        0.0
    };

    AttendanceSummary {
        current_month,
        total_days,
        present_days,
        absent_days,
        percentage,
        total_hours,
        average_hours_per_day,
        daily_records,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashSet;

    const HOURS: f64 = 7.0;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(date: NaiveDate, present: &[&str]) -> AttendanceDateRecord {
        AttendanceDateRecord {
            date,
            present_students: present.iter().map(|s| s.to_string()).collect::<HashSet<_>>(),
            last_updated: Utc.with_ymd_and_hms(2026, 3, 1, 9, 42, 0).unwrap(),
        }
    }

    fn student() -> StudentIdentifiers {
        StudentIdentifiers::new(42, "STU-042")
    }

    #[test]
    fn empty_records_yield_zero_summary() {
        let summary = compute_monthly_summary(&student(), &[], day(2026, 3, 15), HOURS);
        assert_eq!(summary.total_days, 0);
        assert_eq!(summary.present_days, 0);
        assert_eq!(summary.absent_days, 0);
        assert_eq!(summary.percentage, 0);
        assert_eq!(summary.total_hours, 0.0);
        assert_eq!(summary.average_hours_per_day, 0.0);
        assert!(summary.daily_records.is_empty());
        assert_eq!(summary.current_month, "March 2026");
    }

    #[test]
    fn month_of_twenty_class_days_fifteen_present_under_mixed_aliases() {
        // 20 recorded class days in March 2026: presence logged under the
        // primary id on 10 of them, under the student code on 5, and under
        // other students only on the remaining 5.
        let mut records = Vec::new();
        for d in 1..=10 {
            records.push(record(day(2026, 3, d), &["42", "99"]));
        }
        for d in 11..=15 {
            records.push(record(day(2026, 3, d), &["STU-042"]));
        }
        for d in 16..=20 {
            records.push(record(day(2026, 3, d), &["99", "STU-777"]));
        }

        let summary = compute_monthly_summary(&student(), &records, day(2026, 3, 31), HOURS);
        assert_eq!(summary.total_days, 20);
        assert_eq!(summary.present_days, 15);
        assert_eq!(summary.absent_days, 5);
        assert_eq!(summary.percentage, 75);
        assert_eq!(summary.total_hours, 105.0);
        assert_eq!(summary.average_hours_per_day, 7.0);
        assert_eq!(summary.daily_records.len(), 20);
    }

    #[test]
    fn record_listing_other_students_counts_absent() {
        let records = vec![record(day(2026, 3, 2), &["99", "STU-777"])];
        let summary = compute_monthly_summary(&student(), &records, day(2026, 3, 15), HOURS);
        assert_eq!(summary.total_days, 1);
        assert_eq!(summary.present_days, 0);
        assert_eq!(summary.absent_days, 1);
        assert_eq!(summary.percentage, 0);
        assert_eq!(summary.daily_records[0].status, AttendanceStatus::Absent);
        assert_eq!(summary.daily_records[0].hours_spent, 0.0);
        assert!(summary.daily_records[0].time.is_none());
    }

    #[test]
    fn today_on_the_first_excludes_the_rest_of_the_month() {
        let records = vec![
            record(day(2026, 3, 1), &["42"]),
            record(day(2026, 3, 2), &["42"]),
            record(day(2026, 3, 20), &["42"]),
        ];
        let summary = compute_monthly_summary(&student(), &records, day(2026, 3, 1), HOURS);
        assert_eq!(summary.total_days, 1);
        assert_eq!(summary.present_days, 1);
        assert_eq!(summary.absent_days, 0);
        assert_eq!(summary.percentage, 100);
        assert_eq!(summary.daily_records.len(), 1);
        assert_eq!(summary.daily_records[0].date, day(2026, 3, 1));
    }

    #[test]
    fn both_aliases_on_one_date_count_once() {
        let records = vec![record(day(2026, 3, 3), &["42", "STU-042"])];
        let summary = compute_monthly_summary(&student(), &records, day(2026, 3, 15), HOURS);
        assert_eq!(summary.present_days, 1);
        assert_eq!(summary.total_days, 1);
        assert_eq!(summary.total_hours, HOURS);
    }

    #[test]
    fn records_outside_the_month_are_ignored() {
        let records = vec![
            record(day(2026, 2, 27), &["42"]),
            record(day(2026, 3, 5), &["42"]),
            record(day(2026, 4, 1), &["42"]),
        ];
        let summary = compute_monthly_summary(&student(), &records, day(2026, 3, 15), HOURS);
        assert_eq!(summary.total_days, 1);
        assert_eq!(summary.present_days, 1);
    }

    #[test]
    fn counts_always_balance_and_percentage_stays_bounded() {
        let mut records = Vec::new();
        for d in 1..=28 {
            let present: &[&str] = if d % 3 == 0 { &["42"] } else { &["99"] };
            records.push(record(day(2026, 2, d), present));
        }
        let summary = compute_monthly_summary(&student(), &records, day(2026, 2, 28), HOURS);
        assert_eq!(
            summary.present_days + summary.absent_days,
            summary.total_days
        );
        assert!(summary.percentage <= 100);
    }

    #[test]
    fn recomputation_is_idempotent() {
        let records = vec![
            record(day(2026, 3, 2), &["42"]),
            record(day(2026, 3, 3), &["99"]),
            record(day(2026, 3, 4), &["STU-042"]),
        ];
        let today = day(2026, 3, 10);
        let first = compute_monthly_summary(&student(), &records, today, HOURS);
        let second = compute_monthly_summary(&student(), &records, today, HOURS);
        assert_eq!(first, second);
    }

    #[test]
    fn daily_records_are_chronological_regardless_of_input_order() {
        let records = vec![
            record(day(2026, 3, 9), &["42"]),
            record(day(2026, 3, 2), &["99"]),
            record(day(2026, 3, 5), &["STU-042"]),
        ];
        let summary = compute_monthly_summary(&student(), &records, day(2026, 3, 15), HOURS);
        let dates: Vec<NaiveDate> = summary.daily_records.iter().map(|r| r.date).collect();
        assert_eq!(
            dates,
            vec![day(2026, 3, 2), day(2026, 3, 5), day(2026, 3, 9)]
        );
    }

    #[test]
    fn present_day_carries_update_clock_time() {
        let records = vec![record(day(2026, 3, 2), &["42"])];
        let summary = compute_monthly_summary(&student(), &records, day(2026, 3, 15), HOURS);
        assert_eq!(summary.daily_records[0].time.as_deref(), Some("09:42"));
    }

    #[test]
    fn duplicate_documents_for_one_date_are_unioned() {
        let mut early = record(day(2026, 3, 2), &["42"]);
        early.last_updated = Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap();
        let mut late = record(day(2026, 3, 2), &["STU-042"]);
        late.last_updated = Utc.with_ymd_and_hms(2026, 3, 2, 13, 30, 0).unwrap();

        let summary =
            compute_monthly_summary(&student(), &[early, late], day(2026, 3, 15), HOURS);
        assert_eq!(summary.total_days, 1);
        assert_eq!(summary.present_days, 1);
        assert_eq!(summary.daily_records[0].time.as_deref(), Some("13:30"));
    }

    #[test]
    fn configured_hours_flow_through_totals() {
        let records = vec![
            record(day(2026, 3, 2), &["42"]),
            record(day(2026, 3, 3), &["42"]),
        ];
        let summary = compute_monthly_summary(&student(), &records, day(2026, 3, 15), 6.5);
        assert_eq!(summary.total_hours, 13.0);
        assert_eq!(summary.average_hours_per_day, 6.5);
        assert_eq!(summary.daily_records[0].hours_spent, 6.5);
    }
}
