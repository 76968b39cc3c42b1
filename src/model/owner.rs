use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};
use utoipa::ToSchema;

/// Which profile collection an owner id points into.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, Display, AsRefStr, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OwnerKind {
    User,
    Teacher,
}

impl OwnerKind {
    /// Capitalized noun for messages ("User not found").
    pub fn title(self) -> &'static str {
        match self {
            OwnerKind::User => "User",
            OwnerKind::Teacher => "Teacher",
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Owner {
    pub kind: OwnerKind,
    pub id: u64,
}

impl Owner {
    pub fn user(id: u64) -> Self {
        Owner {
            kind: OwnerKind::User,
            id,
        }
    }

    pub fn teacher(id: u64) -> Self {
        Owner {
            kind: OwnerKind::Teacher,
            id,
        }
    }
}
