use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Farmer,
    Buyer,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Farmer => "farmer",
            UserRole::Buyer => "buyer",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "farmer" => Some(UserRole::Farmer),
            "buyer" => Some(UserRole::Buyer),
            _ => None,
        }
    }
}

/// Public profile fields exposed to chat counterparts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub role: UserRole,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        assert_eq!(UserRole::parse("farmer"), Some(UserRole::Farmer));
        assert_eq!(UserRole::parse("buyer"), Some(UserRole::Buyer));
        assert_eq!(UserRole::parse("admin"), None);
        assert_eq!(UserRole::Farmer.as_str(), "farmer");
    }

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&UserRole::Buyer).unwrap(), "\"buyer\"");
    }
}
