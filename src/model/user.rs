use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::attendance::AttendanceRecord;

/// Fields that only the service itself may write.
pub const PROTECTED_FIELDS: &[&str] = &[
    "id",
    "role",
    "attendance",
    "achievements",
    "assessments",
    "classFeedback",
    "createdAt",
    "updatedAt",
];

/// Fields never returned to clients.
pub const HIDDEN_FIELDS: &[&str] = &["password"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassFeedback {
    pub class_id: u64,
    #[serde(default)]
    pub form_data: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default = "default_role")]
    pub role: String,
    pub company_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corporate_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// argon2 hash; empty when the account was created without a password.
    #[serde(default)]
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobile: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dob: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pincode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_weight: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_shape: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weekly_yoga_plan: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub practice_time: Option<String>,
    #[serde(default)]
    pub focus_area: Vec<String>,
    #[serde(default)]
    pub goal: Vec<String>,
    #[serde(default)]
    pub health_issues: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub how_you_know_us: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prior_experience: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub attendance: Vec<AttendanceRecord>,
    #[serde(default)]
    pub achievements: Vec<String>,
    #[serde(default)]
    pub assessments: Vec<String>,
    #[serde(default)]
    pub class_feedback: Vec<ClassFeedback>,

    #[serde(default = "default_true")]
    pub status: bool,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub notification_token: String,

    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

fn default_role() -> String {
    "user".to_string()
}

fn default_true() -> bool {
    true
}
