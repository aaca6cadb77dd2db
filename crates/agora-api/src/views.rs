use chrono::{DateTime, Utc};
use tracing::warn;

use agora_db::models::{PostRow, UserRow};
use agora_types::models::{Post, User, VoteValue};

pub fn user(row: UserRow) -> User {
    User {
        created_at: parse_timestamp(&row.created_at, "user", row.id),
        updated_at: parse_timestamp(&row.updated_at, "user", row.id),
        id: row.id,
        username: row.username,
        email: row.email,
    }
}

pub fn post(row: PostRow) -> Post {
    let vote_status = row.vote_status.and_then(|v| match VoteValue::try_from(v) {
        Ok(v) => Some(v),
        Err(e) => {
            warn!("Corrupt vote on post {}: {}", row.id, e);
            None
        }
    });

    Post {
        created_at: parse_timestamp(&row.created_at, "post", row.id),
        updated_at: parse_timestamp(&row.updated_at, "post", row.id),
        id: row.id,
        title: row.title,
        content: row.content,
        points: row.points,
        user_id: row.user_id,
        creator: row.creator,
        vote_status,
    }
}

fn parse_timestamp(raw: &str, kind: &str, id: i64) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>().unwrap_or_else(|e| {
        warn!("Corrupt timestamp '{}' on {} {}: {}", raw, kind, id, e);
        DateTime::default()
    })
}
