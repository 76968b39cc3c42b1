use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::attendance::AttendanceRecord;

pub const PROTECTED_FIELDS: &[&str] = &["id", "attendance", "createdAt", "updatedAt"];

pub const HIDDEN_FIELDS: &[&str] = &["password"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Teacher {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobile: Option<String>,
    #[serde(default)]
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experience: Option<String>,
    /// Free-form certificates, as submitted by the admin UI.
    #[serde(default)]
    pub qualification: Vec<Value>,
    #[serde(default)]
    pub additional_courses: Vec<Value>,
    #[serde(default)]
    pub attendance: Vec<AttendanceRecord>,
    #[serde(default = "default_true")]
    pub status: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

fn default_true() -> bool {
    true
}
