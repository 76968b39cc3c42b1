use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;
use utoipa::ToSchema;

use crate::model::attendance::AttendanceRecord;

/// Day-of-week labels indexed by days since Sunday.
pub const WEEKDAY_LABELS: [&str; 7] = ["S", "M", "T", "W", "Th", "F", "Sa"];

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DayStats {
    #[schema(example = "Th")]
    pub label: String,
    #[schema(example = 45)]
    pub total_minutes: i64,
    #[schema(example = 225)]
    pub total_kcal_burned: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total_classes: usize,
    pub total_minutes: i64,
    pub total_kcal_burned: i64,
}

fn label_for(day: NaiveDate) -> &'static str {
    WEEKDAY_LABELS[day.weekday().num_days_from_sunday() as usize]
}

/// Attendance over the trailing seven days (today included), one bucket
/// per day in chronological order.
///
/// Records joined between local midnight six days ago and `now` are summed
/// into their day's bucket. A record with no (or zero) duration or kcal
/// counts as 1 for that total. Days with no records at all report
/// `empty_day_default` for both totals.
pub fn weekly_stats(
    attendance: &[AttendanceRecord],
    now: NaiveDateTime,
    empty_day_default: i64,
) -> Vec<DayStats> {
    let first_day = now.date() - Days::new(6);
    let window_start = first_day.and_time(NaiveTime::MIN);

    let mut buckets: [Option<(i64, i64)>; 7] = [None; 7];
    for record in attendance {
        if record.joined_at < window_start || record.joined_at > now {
            continue;
        }
        let offset = (record.joined_at.date() - first_day).num_days() as usize;
        let minutes = record.duration_minutes.filter(|m| *m != 0).unwrap_or(1);
        let kcal = record.kcal_burned.filter(|k| *k != 0).unwrap_or(1);

        let bucket = buckets[offset].get_or_insert((0, 0));
        bucket.0 += minutes;
        bucket.1 += kcal;
    }

    buckets
        .iter()
        .enumerate()
        .map(|(offset, bucket)| {
            let day = first_day + Days::new(offset as u64);
            let (total_minutes, total_kcal_burned) =
                bucket.unwrap_or((empty_day_default, empty_day_default));
            DayStats {
                label: label_for(day).to_string(),
                total_minutes,
                total_kcal_burned,
            }
        })
        .collect()
}

/// Totals over records joined within the last `days` days. A window reaching
/// past the earliest representable date covers everything.
pub fn user_stats(attendance: &[AttendanceRecord], days: u32, now: NaiveDateTime) -> UserStats {
    let since = now
        .checked_sub_days(Days::new(u64::from(days)))
        .unwrap_or(NaiveDateTime::MIN);
    let recent: Vec<_> = attendance.iter().filter(|r| r.joined_at >= since).collect();

    UserStats {
        total_classes: recent.len(),
        total_minutes: recent.iter().filter_map(|r| r.duration_minutes).sum(),
        total_kcal_burned: recent.iter().filter_map(|r| r.kcal_burned).sum(),
    }
}
