use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::models::UserRow;
use crate::{Database, Result, StoreError, now, timestamp};

const USER_COLUMNS: &str = "id, username, email, password, created_at, updated_at";

/// Counts of rows removed by [`Database::prune_expired`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PruneStats {
    pub sessions: usize,
    pub password_resets: usize,
}

impl Database {
    // -- Users --

    /// Insert a user. Duplicate usernames or emails come back as
    /// [`StoreError::Conflict`] naming the column.
    pub fn create_user(&self, username: &str, email: &str, password_hash: &str) -> Result<UserRow> {
        self.with_tx(|conn| {
            let ts = now();
            conn.execute(
                "INSERT INTO users (username, email, password, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)",
                (username, email, password_hash, &ts),
            )
            .map_err(StoreError::from_unique)?;

            let id = conn.last_insert_rowid();
            query_user_by_id(conn, id)?.ok_or(StoreError::NotFound("user"))
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
                    [email],
                    map_user,
                )
                .optional()?;
            Ok(row)
        })
    }

    pub fn get_user_by_id(&self, id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_id(conn, id))
    }

    // -- Sessions --

    pub fn create_session(&self, id: Uuid, user_id: i64, expires_at: DateTime<Utc>) -> Result<()> {
        self.with_tx(|conn| {
            conn.execute(
                "INSERT INTO sessions (id, user_id, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)",
                (id.to_string(), user_id, now(), timestamp(expires_at)),
            )?;
            Ok(())
        })
    }

    /// True when the session exists, belongs to `user_id` and has not expired.
    pub fn session_is_active(&self, id: Uuid, user_id: i64, at: DateTime<Utc>) -> Result<bool> {
        self.with_conn(|conn| {
            let found = conn
                .query_row(
                    "SELECT 1 FROM sessions WHERE id = ?1 AND user_id = ?2 AND expires_at > ?3",
                    (id.to_string(), user_id, timestamp(at)),
                    |_| Ok(()),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    /// Returns false if there was no such session.
    pub fn delete_session(&self, id: Uuid) -> Result<bool> {
        self.with_tx(|conn| {
            let n = conn.execute("DELETE FROM sessions WHERE id = ?1", [id.to_string()])?;
            Ok(n > 0)
        })
    }

    // -- Password resets --

    pub fn create_password_reset(
        &self,
        token_hash: &str,
        user_id: i64,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        self.with_tx(|conn| {
            conn.execute(
                "INSERT INTO password_resets (token_hash, user_id, expires_at) VALUES (?1, ?2, ?3)",
                (token_hash, user_id, timestamp(expires_at)),
            )?;
            Ok(())
        })
    }

    /// Consume a reset token and set the new password hash.
    ///
    /// Returns `None` when the token is unknown or expired. On success every
    /// outstanding reset token of that user is deleted in the same
    /// transaction, so a token can be redeemed at most once.
    pub fn redeem_password_reset(
        &self,
        token_hash: &str,
        new_password_hash: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<UserRow>> {
        self.with_tx(|conn| {
            let user_id: Option<i64> = conn
                .query_row(
                    "SELECT user_id FROM password_resets WHERE token_hash = ?1 AND expires_at > ?2",
                    (token_hash, timestamp(at)),
                    |r| r.get(0),
                )
                .optional()?;

            let Some(user_id) = user_id else {
                return Ok(None);
            };

            conn.execute(
                "UPDATE users SET password = ?1, updated_at = ?2 WHERE id = ?3",
                (new_password_hash, now(), user_id),
            )?;
            conn.execute("DELETE FROM password_resets WHERE user_id = ?1", [user_id])?;

            query_user_by_id(conn, user_id)
        })
    }

    // -- Maintenance --

    pub fn prune_expired(&self, at: DateTime<Utc>) -> Result<PruneStats> {
        let cutoff = timestamp(at);
        self.with_tx(|conn| {
            let sessions = conn.execute("DELETE FROM sessions WHERE expires_at <= ?1", [&cutoff])?;
            let password_resets =
                conn.execute("DELETE FROM password_resets WHERE expires_at <= ?1", [&cutoff])?;
            Ok(PruneStats {
                sessions,
                password_resets,
            })
        })
    }
}

fn query_user_by_id(conn: &Connection, id: i64) -> Result<Option<UserRow>> {
    let row = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            [id],
            map_user,
        )
        .optional()?;
    Ok(row)
}

fn map_user(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}
