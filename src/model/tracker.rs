use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};
use utoipa::ToSchema;

use super::owner::Owner;

/// What a tracker counts.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, AsRefStr, ToSchema)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Metric {
    /// Step count; entries may carry distance (km) and calories.
    Steps,
    /// Water intake in millilitres.
    Water,
}

impl Metric {
    pub fn default_goal(self) -> f64 {
        match self {
            Metric::Steps => 10_000.0,
            Metric::Water => 2_000.0,
        }
    }

    /// Human name used in error messages.
    pub fn describe(self) -> &'static str {
        match self {
            Metric::Steps => "Step tracking",
            Metric::Water => "Water intake tracking",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    #[schema(example = 500.0)]
    pub value: f64,
    #[serde(default)]
    pub distance: f64,
    #[serde(default)]
    pub calories: f64,
    #[serde(default)]
    pub note: String,
    #[schema(value_type = String, format = "date-time")]
    pub timestamp: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DailySummary {
    #[schema(example = "2025-04-20", value_type = String, format = "date")]
    pub date: NaiveDate,
    #[schema(example = 2100.0)]
    pub total: f64,
    #[serde(default)]
    pub total_distance: f64,
    #[serde(default)]
    pub total_calories: f64,
    #[schema(example = true)]
    pub goal_achieved: bool,
}

impl DailySummary {
    /// What a day without entries reports.
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            total: 0.0,
            total_distance: 0.0,
            total_calories: 0.0,
            goal_achieved: false,
        }
    }
}

/// Per-owner accumulator of dated entries plus derived daily totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Tracker {
    pub owner: Owner,
    pub metric: Metric,
    #[schema(example = 2000.0)]
    pub daily_goal: f64,
    #[serde(default)]
    pub entries: Vec<Entry>,
    #[serde(default)]
    pub daily_summaries: Vec<DailySummary>,
    #[schema(value_type = String, format = "date-time")]
    pub last_updated: NaiveDateTime,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: NaiveDateTime,
}

impl Tracker {
    pub fn new(owner: Owner, metric: Metric, daily_goal: f64, now: NaiveDateTime) -> Self {
        Self {
            owner,
            metric,
            daily_goal,
            entries: Vec::new(),
            daily_summaries: Vec::new(),
            last_updated: now,
            created_at: now,
        }
    }
}
