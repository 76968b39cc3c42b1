use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const PROTECTED_FIELDS: &[&str] = &["id", "students"];

/// A scheduled yoga class. `startTime`/`endTime` are wall-clock `HH:MM`
/// strings on the `schedule` date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct YogaClass {
    #[schema(example = "Core Strength Yoga")]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[schema(example = "07:30")]
    pub start_time: String,
    #[schema(example = "08:45")]
    pub end_time: String,
    #[schema(example = "2025-04-30", value_type = String, format = "date")]
    pub schedule: NaiveDate,
    #[serde(default)]
    pub how_it_will_help: String,
    #[serde(default)]
    pub how_it_will_not_help: String,
    #[serde(default)]
    pub who_its_for: String,
    #[serde(default)]
    pub who_its_not_for: String,
    #[serde(default)]
    #[schema(example = "Intermediate")]
    pub level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teacher: Option<u64>,
    #[serde(default)]
    pub students: Vec<u64>,
    #[serde(default)]
    pub meeting_number: String,
    /// Whether the live meeting is running.
    #[serde(default)]
    pub status: bool,
}
