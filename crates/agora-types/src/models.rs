use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single vote on a post. Serialized as the bare integer `1` or `-1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum VoteValue {
    Up,
    Down,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("vote value must be 1 or -1, got {0}")]
pub struct InvalidVoteValue(pub i64);

impl VoteValue {
    pub fn as_i64(self) -> i64 {
        match self {
            Self::Up => 1,
            Self::Down => -1,
        }
    }
}

impl TryFrom<i64> for VoteValue {
    type Error = InvalidVoteValue;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Up),
            -1 => Ok(Self::Down),
            other => Err(InvalidVoteValue(other)),
        }
    }
}

impl From<VoteValue> for i64 {
    fn from(value: VoteValue) -> Self {
        value.as_i64()
    }
}

/// Public view of a registered user. Never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub points: i64,
    pub user_id: i64,
    pub creator: String,
    /// The requesting user's vote on this post, if they are signed in and have voted.
    pub vote_status: Option<VoteValue>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vote_value_accepts_only_unit_values() {
        assert_eq!(VoteValue::try_from(1), Ok(VoteValue::Up));
        assert_eq!(VoteValue::try_from(-1), Ok(VoteValue::Down));
        assert_eq!(VoteValue::try_from(0), Err(InvalidVoteValue(0)));
        assert_eq!(VoteValue::try_from(2), Err(InvalidVoteValue(2)));
    }

    #[test]
    fn vote_value_serializes_as_integer() {
        assert_eq!(serde_json::to_string(&VoteValue::Down).unwrap(), "-1");
        let up: VoteValue = serde_json::from_str("1").unwrap();
        assert_eq!(up, VoteValue::Up);
        assert!(serde_json::from_str::<VoteValue>("3").is_err());
    }
}
