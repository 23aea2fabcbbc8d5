use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of a connection request: pending -> accepted | rejected.
/// Non-pending requests are immutable; re-requesting replaces the row.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Accepted => "accepted",
            RequestStatus::Rejected => "rejected",
        }
    }

    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(RequestStatus::Pending),
            "accepted" => Some(RequestStatus::Accepted),
            "rejected" => Some(RequestStatus::Rejected),
            _ => None,
        }
    }
}

impl TryFrom<String> for RequestStatus {
    type Error = crate::error::AppError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_db(&s).ok_or_else(|| {
            crate::error::AppError::Database(format!("unknown request status: {s}"))
        })
    }
}

/// A directed, pending proposal from one user to another to form a
/// mutual connection. At most one row per ordered (requester, recipient)
/// pair, enforced by a unique constraint.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ConnectionRequest {
    pub id: Uuid,
    pub requester_id: Uuid,
    pub recipient_id: Uuid,
    #[sqlx(try_from = "String")]
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The materialized, order-independent relationship between two users,
/// created once a request is accepted. `canonical_id` collapses both
/// request directions to one key, so at most one row exists per pair.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MutualConnection {
    pub id: Uuid,
    pub user_a: Uuid,
    pub user_b: Uuid,
    pub canonical_id: String,
    pub display_name: String,
    pub is_active: bool,
    pub post_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MutualConnection {
    pub fn is_member(&self, user_id: Uuid) -> bool {
        self.user_a == user_id || self.user_b == user_id
    }

    /// The member that is not `user_id`. Callers must check membership first.
    pub fn other_member(&self, user_id: Uuid) -> Uuid {
        if self.user_a == user_id {
            self.user_b
        } else {
            self.user_a
        }
    }
}

/// Canonical key for a pair: the two ids sorted lexicographically,
/// joined with `_`. Order-independent by construction.
pub fn canonical_id(a: Uuid, b: Uuid) -> String {
    let (lo, hi) = sorted_pair(a, b);
    format!("{lo}_{hi}")
}

/// The two member ids in lexicographic order (user_a, user_b).
pub fn sorted_pair(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
    let (a_s, b_s) = (a.to_string(), b.to_string());
    if a_s <= b_s {
        (a, b)
    } else {
        (b, a)
    }
}

/// Display name for a connection: usernames sorted alphabetically,
/// joined with " & ".
pub fn display_name(username_a: &str, username_b: &str) -> String {
    let mut names = [username_a, username_b];
    names.sort();
    format!("{} & {}", names[0], names[1])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_id_is_order_independent() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(canonical_id(a, b), canonical_id(b, a));
    }

    #[test]
    fn canonical_id_joins_sorted_ids_with_underscore() {
        let a = Uuid::parse_str("00000000-0000-0000-0000-00000000000a").unwrap();
        let b = Uuid::parse_str("00000000-0000-0000-0000-00000000000b").unwrap();
        assert_eq!(canonical_id(b, a), format!("{a}_{b}"));
    }

    #[test]
    fn display_name_sorts_alphabetically() {
        assert_eq!(display_name("bob", "alice"), "alice & bob");
        assert_eq!(display_name("alice", "bob"), "alice & bob");
    }

    #[test]
    fn other_member_returns_the_peer() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let (user_a, user_b) = sorted_pair(a, b);
        let conn = MutualConnection {
            id: Uuid::new_v4(),
            user_a,
            user_b,
            canonical_id: canonical_id(a, b),
            display_name: "alice & bob".into(),
            is_active: true,
            post_count: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(conn.other_member(user_a), user_b);
        assert_eq!(conn.other_member(user_b), user_a);
        assert!(conn.is_member(a));
        assert!(!conn.is_member(Uuid::new_v4()));
    }

    #[test]
    fn request_status_round_trips_through_db_strings() {
        for status in [
            RequestStatus::Pending,
            RequestStatus::Accepted,
            RequestStatus::Rejected,
        ] {
            assert_eq!(RequestStatus::from_db(status.as_str()), Some(status));
        }
        assert_eq!(RequestStatus::from_db("bogus"), None);
    }
}
