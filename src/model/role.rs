use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Who a bearer token speaks for.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    Admin,
    Teacher,
    User,
}

impl Role {
    /// Roles allowed to manage the class/event catalogue and availability.
    pub fn is_staff(self) -> bool {
        matches!(self, Role::Admin | Role::Teacher)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn parses_lowercase_names() {
        assert_eq!(Role::from_str("teacher").unwrap(), Role::Teacher);
        assert_eq!(Role::User.to_string(), "user");
        assert!(Role::from_str("hr").is_err());
    }
}
