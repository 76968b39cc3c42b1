use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const PROTECTED_FIELDS: &[&str] = &["id", "students"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[schema(example = "International Yoga Day")]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[schema(example = "2025-06-21", value_type = String, format = "date")]
    pub start_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, format = "date")]
    pub end_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default)]
    pub students: Vec<u64>,
    #[serde(default)]
    pub meeting_number: String,
    #[serde(default)]
    pub status: bool,
}
