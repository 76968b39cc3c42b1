use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::owner::OwnerKind;

/// kcal burned per minute of class, applied when a participant leaves.
pub const KCAL_PER_MINUTE: i64 = 5;

/// One participant's presence in one class. Created on join, completed on
/// leave; embedded in the user or teacher document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    #[schema(example = 12)]
    pub class_id: u64,

    #[schema(example = "2025-04-20T07:30:00", value_type = String, format = "date-time")]
    pub joined_at: NaiveDateTime,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = "2025-04-20T08:00:00", value_type = Option<String>, format = "date-time")]
    pub left_at: Option<NaiveDateTime>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = 30)]
    pub duration_minutes: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = 150)]
    pub kcal_burned: Option<i64>,
}

impl AttendanceRecord {
    pub fn joined(class_id: u64, at: NaiveDateTime) -> Self {
        Self {
            class_id,
            joined_at: at,
            left_at: None,
            duration_minutes: None,
            kcal_burned: None,
        }
    }
}

/// Profiles that carry an embedded attendance log.
pub trait Attendee {
    const KIND: OwnerKind;

    fn attendance(&self) -> &[AttendanceRecord];
    fn attendance_mut(&mut self) -> &mut Vec<AttendanceRecord>;
    fn touch(&mut self, now: NaiveDateTime);
}

impl Attendee for super::user::User {
    const KIND: OwnerKind = OwnerKind::User;

    fn attendance(&self) -> &[AttendanceRecord] {
        &self.attendance
    }

    fn attendance_mut(&mut self) -> &mut Vec<AttendanceRecord> {
        &mut self.attendance
    }

    fn touch(&mut self, now: NaiveDateTime) {
        self.updated_at = now;
    }
}

impl Attendee for super::teacher::Teacher {
    const KIND: OwnerKind = OwnerKind::Teacher;

    fn attendance(&self) -> &[AttendanceRecord] {
        &self.attendance
    }

    fn attendance_mut(&mut self) -> &mut Vec<AttendanceRecord> {
        &mut self.attendance
    }

    fn touch(&mut self, now: NaiveDateTime) {
        self.updated_at = now;
    }
}
