use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};
use utoipa::ToSchema;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Default, Serialize, Deserialize, Display, AsRefStr, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SlotStatus {
    #[default]
    Available,
    Booked,
    Blocked,
}

/// A bookable or blocked interval `[startTime, endTime)` a teacher offers on
/// one date. Deleting only clears `isActive`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilitySlot {
    #[schema(example = 3)]
    pub teacher_id: u64,
    #[serde(default)]
    #[schema(example = "morning")]
    pub session: String,
    #[schema(example = "2025-04-20", value_type = String, format = "date")]
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    #[schema(example = "08:00", value_type = String)]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    #[schema(example = "09:00", value_type = String)]
    pub end_time: NaiveTime,
    #[serde(default)]
    #[schema(example = "custom-session")]
    pub availability_for: String,
    #[serde(default)]
    pub status: SlotStatus,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: NaiveDateTime,
    #[schema(value_type = String, format = "date-time")]
    pub updated_at: NaiveDateTime,
}

fn default_true() -> bool {
    true
}

/// Wall-clock times travel as `HH:MM` (seconds accepted on input) so that
/// stored values sort lexicographically.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    const FORMAT: &str = "%H:%M";

    pub fn parse(raw: &str) -> Option<NaiveTime> {
        NaiveTime::parse_from_str(raw, FORMAT)
            .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
            .ok()
    }

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| D::Error::custom(format!("invalid time `{raw}`, expected HH:MM")))
    }

    /// Same, for optional fields in partial updates.
    pub mod option {
        use chrono::NaiveTime;
        use serde::{Deserialize, Deserializer, de::Error};

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<NaiveTime>, D::Error> {
            match Option::<String>::deserialize(deserializer)? {
                None => Ok(None),
                Some(raw) => super::parse(&raw).map(Some).ok_or_else(|| {
                    D::Error::custom(format!("invalid time `{raw}`, expected HH:MM"))
                }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn times_round_trip_as_hhmm() {
        let slot: AvailabilitySlot = serde_json::from_value(json!({
            "teacherId": 1,
            "date": "2025-04-20",
            "startTime": "08:00",
            "endTime": "09:30:00",
            "createdAt": "2025-04-01T00:00:00",
            "updatedAt": "2025-04-01T00:00:00"
        }))
        .unwrap();

        assert_eq!(slot.end_time, NaiveTime::from_hms_opt(9, 30, 0).unwrap());
        assert_eq!(slot.status, SlotStatus::Available);
        assert!(slot.is_active);

        let value = serde_json::to_value(&slot).unwrap();
        assert_eq!(value["startTime"], "08:00");
        assert_eq!(value["endTime"], "09:30");
    }

    #[test]
    fn rejects_malformed_time() {
        let result = serde_json::from_value::<AvailabilitySlot>(json!({
            "teacherId": 1,
            "date": "2025-04-20",
            "startTime": "8 o'clock",
            "endTime": "09:00",
            "createdAt": "2025-04-01T00:00:00",
            "updatedAt": "2025-04-01T00:00:00"
        }));
        assert!(result.is_err());
    }
}
