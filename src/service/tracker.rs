//! Step and water-intake trackers.
//!
//! One tracker document per (owner, metric). Entries are append-only;
//! each entry also folds into the [`DailySummary`] of its local day, so
//! reads never have to re-aggregate the entry log.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use tracing::{debug, info};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::model::owner::Owner;
use crate::model::tracker::{DailySummary, Entry, Metric, Tracker};
use crate::store::{Collection, Filter, Record};

/// Input for [`record_entry`]. `distance` and `calories` stay 0 for water.
#[derive(Debug, Clone, Default)]
pub struct NewEntry {
    pub value: f64,
    pub distance: f64,
    pub calories: f64,
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DateHistory {
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    pub entries: Vec<Entry>,
    pub daily_summary: DailySummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RangeHistory {
    #[schema(value_type = String, format = "date")]
    pub start_date: NaiveDate,
    #[schema(value_type = String, format = "date")]
    pub end_date: NaiveDate,
    pub entries: Vec<Entry>,
    pub daily_summaries: Vec<DailySummary>,
}

fn tracker_filter(owner: Owner, metric: Metric) -> Filter {
    Filter::new()
        .eq("owner.kind", owner.kind.as_ref())
        .eq("owner.id", owner.id)
        .eq("metric", metric.as_ref())
}

fn not_initialized(owner: Owner, metric: Metric) -> AppError {
    AppError::not_found(format!(
        "{} not found for this {}",
        metric.describe(),
        owner.kind
    ))
}

fn positive(value: f64, what: &str) -> Result<f64, AppError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(AppError::validation(format!("Valid {what} is required")))
    }
}

pub async fn find(
    trackers: &Collection<Tracker>,
    owner: Owner,
    metric: Metric,
) -> Result<Record<Tracker>, AppError> {
    trackers
        .find_one(&tracker_filter(owner, metric))
        .await?
        .ok_or_else(|| not_initialized(owner, metric))
}

/// Creates the tracker for `owner`. The owner's existence is checked by
/// the caller; a second tracker for the same owner and metric is a
/// conflict.
pub async fn initialize(
    trackers: &Collection<Tracker>,
    owner: Owner,
    metric: Metric,
    daily_goal: Option<f64>,
    now: NaiveDateTime,
) -> Result<Record<Tracker>, AppError> {
    let daily_goal = match daily_goal {
        Some(goal) => positive(goal, "daily goal")?,
        None => metric.default_goal(),
    };

    if trackers
        .find_one(&tracker_filter(owner, metric))
        .await?
        .is_some()
    {
        return Err(AppError::conflict(format!(
            "{} already initialized for this {}",
            metric.describe(),
            owner.kind
        )));
    }

    let record = trackers
        .insert(Tracker::new(owner, metric, daily_goal, now))
        .await?;
    info!(tracker_id = record.id, owner_id = owner.id, metric = %metric, "Tracker initialized");
    Ok(record)
}

/// Changes the goal for future summaries. Existing summaries keep the
/// `goalAchieved` flag they were computed with.
pub async fn update_daily_goal(
    trackers: &Collection<Tracker>,
    owner: Owner,
    metric: Metric,
    daily_goal: f64,
    now: NaiveDateTime,
) -> Result<Record<Tracker>, AppError> {
    let daily_goal = positive(daily_goal, "daily goal")?;
    let current = find(trackers, owner, metric).await?;

    let (record, ()) = trackers
        .update_with(current.id, |tracker| {
            tracker.daily_goal = daily_goal;
            tracker.last_updated = now;
            Ok::<_, AppError>(())
        })
        .await?
        .ok_or_else(|| not_initialized(owner, metric))?;
    Ok(record)
}

/// Folds `entry` into the tracker: appends it and updates the summary of
/// the entry's local day. Returns that day's summary after the update.
pub fn apply_entry(tracker: &mut Tracker, entry: Entry) -> DailySummary {
    let day = entry.timestamp.date();
    let index = match tracker.daily_summaries.iter().position(|s| s.date == day) {
        Some(index) => index,
        None => {
            tracker.daily_summaries.push(DailySummary::empty(day));
            tracker.daily_summaries.len() - 1
        }
    };

    let summary = &mut tracker.daily_summaries[index];
    summary.total += entry.value;
    summary.total_distance += entry.distance;
    summary.total_calories += entry.calories;
    summary.goal_achieved = summary.total >= tracker.daily_goal;
    let summary = summary.clone();

    tracker.last_updated = entry.timestamp;
    tracker.entries.push(entry);
    summary
}

/// Appends an entry stamped `now` under a version-checked write.
pub async fn record_entry(
    trackers: &Collection<Tracker>,
    owner: Owner,
    metric: Metric,
    input: NewEntry,
    now: NaiveDateTime,
) -> Result<(Record<Tracker>, DailySummary), AppError> {
    let what = match metric {
        Metric::Steps => "step count",
        Metric::Water => "water intake amount",
    };
    let value = positive(input.value, what)?;
    let current = find(trackers, owner, metric).await?;

    let entry = Entry {
        value,
        distance: input.distance.max(0.0),
        calories: input.calories.max(0.0),
        note: input.note,
        timestamp: now,
    };

    let (record, summary) = trackers
        .update_with(current.id, |tracker| {
            Ok::<_, AppError>(apply_entry(tracker, entry.clone()))
        })
        .await?
        .ok_or_else(|| not_initialized(owner, metric))?;

    debug!(
        tracker_id = record.id,
        value,
        total = summary.total,
        goal_achieved = summary.goal_achieved,
        "Entry recorded"
    );
    Ok((record, summary))
}

/// The stored summary for `date`, or a zero summary. Never persists.
pub fn summary_for(tracker: &Tracker, date: NaiveDate) -> DailySummary {
    tracker
        .daily_summaries
        .iter()
        .find(|s| s.date == date)
        .cloned()
        .unwrap_or_else(|| DailySummary::empty(date))
}

pub fn today_summary(tracker: &Tracker, now: NaiveDateTime) -> DailySummary {
    summary_for(tracker, now.date())
}

/// Entries recorded on `date`'s local calendar day, whatever their time.
pub fn date_history(tracker: &Tracker, date: NaiveDate) -> DateHistory {
    DateHistory {
        date,
        entries: tracker
            .entries
            .iter()
            .filter(|e| e.timestamp.date() == date)
            .cloned()
            .collect(),
        daily_summary: summary_for(tracker, date),
    }
}

/// Entries and summaries from the start of `start` through the end of
/// `end`, both days inclusive. An inverted range is simply empty.
pub fn date_range_history(tracker: &Tracker, start: NaiveDate, end: NaiveDate) -> RangeHistory {
    let in_range = |day: NaiveDate| start <= day && day <= end;

    RangeHistory {
        start_date: start,
        end_date: end,
        entries: tracker
            .entries
            .iter()
            .filter(|e| in_range(e.timestamp.date()))
            .cloned()
            .collect(),
        daily_summaries: tracker
            .daily_summaries
            .iter()
            .filter(|s| in_range(s.date))
            .cloned()
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::sync::Arc;

    fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 4, day)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn trackers() -> Collection<Tracker> {
        Collection::new("trackers", Arc::new(MemoryStore::new()), 3)
    }

    fn amount(value: f64) -> NewEntry {
        NewEntry {
            value,
            ..NewEntry::default()
        }
    }

    #[actix_web::test]
    async fn water_goal_is_reached_across_entries() {
        let trackers = trackers();
        let owner = Owner::user(7);
        initialize(&trackers, owner, Metric::Water, Some(2000.0), at(20, 6, 0))
            .await
            .unwrap();

        record_entry(&trackers, owner, Metric::Water, amount(1500.0), at(20, 8, 0))
            .await
            .unwrap();
        let (_, summary) =
            record_entry(&trackers, owner, Metric::Water, amount(600.0), at(20, 12, 0))
                .await
                .unwrap();
        assert_eq!(summary.total, 2100.0);
        assert!(summary.goal_achieved);

        let tracker = find(&trackers, owner, Metric::Water).await.unwrap();
        let today = today_summary(&tracker.doc, at(20, 23, 0));
        assert_eq!(today.total, 2100.0);
        assert!(today.goal_achieved);
        assert_eq!(tracker.doc.entries.len(), 2);
    }

    #[actix_web::test]
    async fn today_summary_defaults_to_zero_without_writing() {
        let trackers = trackers();
        let owner = Owner::teacher(3);
        let created = initialize(&trackers, owner, Metric::Water, None, at(20, 6, 0))
            .await
            .unwrap();
        assert_eq!(created.doc.daily_goal, 2000.0);

        let summary = today_summary(&created.doc, at(21, 9, 0));
        assert_eq!(summary, DailySummary::empty(at(21, 0, 0).date()));

        let stored = find(&trackers, owner, Metric::Water).await.unwrap();
        assert!(stored.doc.daily_summaries.is_empty());
        assert_eq!(stored.version, created.version);
    }

    #[actix_web::test]
    async fn initialize_twice_conflicts_per_metric() {
        let trackers = trackers();
        let owner = Owner::user(1);
        initialize(&trackers, owner, Metric::Steps, None, at(20, 6, 0))
            .await
            .unwrap();

        let again = initialize(&trackers, owner, Metric::Steps, None, at(20, 7, 0)).await;
        assert!(matches!(again, Err(AppError::Conflict(_))));

        // a water tracker and another owner's step tracker are independent
        initialize(&trackers, owner, Metric::Water, None, at(20, 7, 0))
            .await
            .unwrap();
        initialize(&trackers, Owner::teacher(1), Metric::Steps, None, at(20, 7, 0))
            .await
            .unwrap();
    }

    #[actix_web::test]
    async fn rejects_non_positive_values() {
        let trackers = trackers();
        let owner = Owner::user(1);
        initialize(&trackers, owner, Metric::Steps, None, at(20, 6, 0))
            .await
            .unwrap();

        for bad in [0.0, -5.0, f64::NAN] {
            let result =
                record_entry(&trackers, owner, Metric::Steps, amount(bad), at(20, 7, 0)).await;
            assert!(matches!(result, Err(AppError::Validation(_))));
        }

        let goal = update_daily_goal(&trackers, owner, Metric::Steps, 0.0, at(20, 7, 0)).await;
        assert!(matches!(goal, Err(AppError::Validation(_))));
    }

    #[actix_web::test]
    async fn reads_without_tracker_are_not_found() {
        let trackers = trackers();
        let result = find(&trackers, Owner::user(9), Metric::Steps).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));

        let entry =
            record_entry(&trackers, Owner::user(9), Metric::Steps, amount(10.0), at(20, 7, 0))
                .await;
        assert!(matches!(entry, Err(AppError::NotFound(_))));
    }

    #[actix_web::test]
    async fn steps_accumulate_distance_and_calories() {
        let trackers = trackers();
        let owner = Owner::user(2);
        initialize(&trackers, owner, Metric::Steps, Some(5000.0), at(20, 6, 0))
            .await
            .unwrap();

        let walk = NewEntry {
            value: 3000.0,
            distance: 2.1,
            calories: 120.0,
            note: "morning walk".into(),
        };
        record_entry(&trackers, owner, Metric::Steps, walk.clone(), at(20, 7, 0))
            .await
            .unwrap();
        let (record, summary) =
            record_entry(&trackers, owner, Metric::Steps, walk, at(20, 18, 0))
                .await
                .unwrap();

        assert_eq!(summary.total, 6000.0);
        assert!((summary.total_distance - 4.2).abs() < 1e-9);
        assert_eq!(summary.total_calories, 240.0);
        assert!(summary.goal_achieved);
        assert_eq!(record.doc.last_updated, at(20, 18, 0));
    }

    #[actix_web::test]
    async fn new_goal_applies_to_later_entries() {
        let trackers = trackers();
        let owner = Owner::user(4);
        initialize(&trackers, owner, Metric::Water, Some(1000.0), at(20, 6, 0))
            .await
            .unwrap();
        update_daily_goal(&trackers, owner, Metric::Water, 3000.0, at(20, 6, 30))
            .await
            .unwrap();

        let (_, summary) =
            record_entry(&trackers, owner, Metric::Water, amount(1500.0), at(20, 7, 0))
                .await
                .unwrap();
        assert!(!summary.goal_achieved);
    }

    fn tracker_with_entries() -> Tracker {
        let mut tracker = Tracker::new(Owner::user(1), Metric::Water, 2000.0, at(18, 0, 0));
        for ts in [at(18, 23, 59), at(19, 0, 0), at(19, 13, 30), at(20, 9, 0)] {
            apply_entry(
                &mut tracker,
                Entry {
                    value: 250.0,
                    distance: 0.0,
                    calories: 0.0,
                    note: String::new(),
                    timestamp: ts,
                },
            );
        }
        tracker
    }

    #[test]
    fn date_history_keeps_exactly_that_day() {
        let tracker = tracker_with_entries();
        let history = date_history(&tracker, at(19, 0, 0).date());

        let stamps: Vec<_> = history.entries.iter().map(|e| e.timestamp).collect();
        assert_eq!(stamps, vec![at(19, 0, 0), at(19, 13, 30)]);
        assert_eq!(history.daily_summary.total, 500.0);

        let empty = date_history(&tracker, at(25, 0, 0).date());
        assert!(empty.entries.is_empty());
        assert_eq!(empty.daily_summary.total, 0.0);
        assert!(!empty.daily_summary.goal_achieved);
    }

    #[test]
    fn range_history_includes_both_end_days() {
        let tracker = tracker_with_entries();
        let range = date_range_history(&tracker, at(18, 12, 0).date(), at(19, 0, 0).date());

        assert_eq!(range.entries.len(), 3);
        assert_eq!(range.daily_summaries.len(), 2);

        let inverted = date_range_history(&tracker, at(20, 0, 0).date(), at(18, 0, 0).date());
        assert!(inverted.entries.is_empty());
        assert!(inverted.daily_summaries.is_empty());
    }
}
