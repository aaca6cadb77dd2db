//! The vote ledger: the only code path that writes `posts.points`.
//!
//! Every vote is applied inside an immediate transaction, so the lookup of the
//! caller's previous vote, the vote row write and the point adjustment form a
//! single serialized unit. `posts.points` therefore always equals the sum of
//! `votes.value` for that post.

use agora_types::models::VoteValue;
use rusqlite::OptionalExtension;
use tracing::debug;

use crate::{Database, Result, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteChange {
    /// First vote by this user on this post.
    Inserted,
    /// Same value as the stored vote; nothing written.
    Unchanged,
    /// Stored vote flipped to the opposite value.
    Switched,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteReceipt {
    pub change: VoteChange,
    /// Amount added to the post's points.
    pub delta: i64,
    /// The post's points after the vote.
    pub points: i64,
}

impl Database {
    pub fn cast_vote(&self, voter_id: i64, post_id: i64, value: VoteValue) -> Result<VoteReceipt> {
        let new = value.as_i64();

        let receipt = self.with_tx(|conn| {
            let points: i64 = conn
                .query_row("SELECT points FROM posts WHERE id = ?1", [post_id], |r| r.get(0))
                .optional()?
                .ok_or(StoreError::NotFound("post"))?;

            let previous: Option<i64> = conn
                .query_row(
                    "SELECT value FROM votes WHERE user_id = ?1 AND post_id = ?2",
                    (voter_id, post_id),
                    |r| r.get(0),
                )
                .optional()?;

            let (change, delta) = match previous {
                None => {
                    conn.execute(
                        "INSERT INTO votes (user_id, post_id, value) VALUES (?1, ?2, ?3)",
                        (voter_id, post_id, new),
                    )?;
                    (VoteChange::Inserted, new)
                }
                Some(old) if old == new => {
                    return Ok(VoteReceipt {
                        change: VoteChange::Unchanged,
                        delta: 0,
                        points,
                    });
                }
                Some(old) => {
                    conn.execute(
                        "UPDATE votes SET value = ?1 WHERE user_id = ?2 AND post_id = ?3",
                        (new, voter_id, post_id),
                    )?;
                    (VoteChange::Switched, new - old)
                }
            };

            let points: i64 = conn.query_row(
                "UPDATE posts SET points = points + ?1 WHERE id = ?2 RETURNING points",
                (delta, post_id),
                |r| r.get(0),
            )?;

            Ok(VoteReceipt {
                change,
                delta,
                points,
            })
        })?;

        debug!(
            voter_id,
            post_id,
            change = ?receipt.change,
            delta = receipt.delta,
            points = receipt.points,
            "vote applied"
        );
        Ok(receipt)
    }

    /// Current vote of `user_id` on `post_id`, if any.
    #[cfg(test)]
    pub fn get_vote(&self, user_id: i64, post_id: i64) -> Result<Option<VoteValue>> {
        self.with_conn(|conn| {
            let value: Option<i64> = conn
                .query_row(
                    "SELECT value FROM votes WHERE user_id = ?1 AND post_id = ?2",
                    (user_id, post_id),
                    |r| r.get(0),
                )
                .optional()?;
            // The CHECK constraint keeps anything else out of the table.
            Ok(value.and_then(|v| VoteValue::try_from(v).ok()))
        })
    }
}
