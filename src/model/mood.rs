use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Mood {
    #[schema(example = 7)]
    pub user_id: u64,
    #[schema(example = "Happy")]
    pub mood: String,
    #[serde(default)]
    pub note: String,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: NaiveDateTime,
}
