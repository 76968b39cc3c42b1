use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};
use utoipa::ToSchema;

pub const PROTECTED_FIELDS: &[&str] = &["id", "user", "createdAt", "updatedAt"];

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Default, Serialize, Deserialize, Display, AsRefStr, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
    Completed,
}

/// A one-to-one session requested by a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomSession {
    pub user: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teacher: Option<u64>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub status: SessionStatus,
    #[serde(default)]
    pub meeting_number: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}
