use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The durable pairing of two users plus bookkeeping. The pair is stored
/// ordered (user_low < user_high) so the unordered pair maps to one row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub user_low: Uuid,
    pub user_high: Uuid,
    pub last_message_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Canonical storage order for an unordered participant pair.
    pub fn ordered_pair(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
        if a < b {
            (a, b)
        } else {
            (b, a)
        }
    }

    pub fn is_participant(&self, user_id: Uuid) -> bool {
        self.user_low == user_id || self.user_high == user_id
    }

    /// The counterpart of `user_id` in this conversation. Callers must have
    /// checked participation first.
    pub fn other_participant(&self, user_id: Uuid) -> Uuid {
        if self.user_low == user_id {
            self.user_high
        } else {
            self.user_low
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordered_pair_is_symmetric() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(Conversation::ordered_pair(a, b), Conversation::ordered_pair(b, a));
    }

    #[test]
    fn test_ordered_pair_orders_low_first() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let (low, high) = Conversation::ordered_pair(a, b);
        assert!(low < high);
    }

    #[test]
    fn test_other_participant() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let (low, high) = Conversation::ordered_pair(a, b);
        let convo = Conversation {
            id: Uuid::new_v4(),
            user_low: low,
            user_high: high,
            last_message_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(convo.other_participant(low), high);
        assert_eq!(convo.other_participant(high), low);
        assert!(convo.is_participant(a) && convo.is_participant(b));
    }
}
