use rusqlite::{Connection, OptionalExtension, Row};
use tracing::debug;

use crate::models::PostRow;
use crate::{Database, Result, StoreError, now};

/// Base projection for every post read. `?1` is the viewer's user id (or
/// NULL), used to pick up their vote on each post.
pub(crate) const POST_SELECT: &str = "
    SELECT p.id, p.title, p.content, p.points, p.user_id, u.username, v.value,
           p.created_at, p.updated_at
    FROM posts p
    JOIN users u ON u.id = p.user_id
    LEFT JOIN votes v ON v.post_id = p.id AND v.user_id = ?1";

/// Outcome of an edit. Non-owners get the post back untouched.
#[derive(Debug)]
pub enum PostEdit {
    Updated(PostRow),
    NotOwner(PostRow),
}

#[derive(Debug, PartialEq, Eq)]
pub enum PostRemoval {
    Deleted { votes_removed: usize },
    NotOwner,
    Missing,
}

impl Database {
    pub fn create_post(&self, user_id: i64, title: &str, content: &str) -> Result<PostRow> {
        self.with_tx(|conn| {
            let ts = now();
            conn.execute(
                "INSERT INTO posts (title, content, points, user_id, created_at, updated_at)
                 VALUES (?1, ?2, 0, ?3, ?4, ?4)",
                (title, content, user_id, &ts),
            )?;
            let id = conn.last_insert_rowid();
            query_post(conn, id, Some(user_id))?.ok_or(StoreError::NotFound("post"))
        })
    }

    pub fn get_post(&self, id: i64, viewer: Option<i64>) -> Result<Option<PostRow>> {
        self.with_conn(|conn| query_post(conn, id, viewer))
    }

    /// Change title and content if `caller` owns the post.
    pub fn update_post(&self, id: i64, caller: i64, title: &str, content: &str) -> Result<PostEdit> {
        self.with_tx(|conn| {
            let post = query_post(conn, id, Some(caller))?.ok_or(StoreError::NotFound("post"))?;
            if post.user_id != caller {
                debug!(post_id = id, caller, "update refused, caller is not the author");
                return Ok(PostEdit::NotOwner(post));
            }

            conn.execute(
                "UPDATE posts SET title = ?1, content = ?2, updated_at = ?3 WHERE id = ?4",
                (title, content, now(), id),
            )?;
            let updated = query_post(conn, id, Some(caller))?.ok_or(StoreError::NotFound("post"))?;
            Ok(PostEdit::Updated(updated))
        })
    }

    /// Delete a post owned by `caller` together with every vote cast on it.
    ///
    /// Votes go first so the foreign key holds; both deletes share one
    /// transaction and either both land or neither does.
    pub fn delete_post(&self, id: i64, caller: i64) -> Result<PostRemoval> {
        self.with_tx(|conn| {
            let owner: Option<i64> = conn
                .query_row("SELECT user_id FROM posts WHERE id = ?1", [id], |r| r.get(0))
                .optional()?;

            match owner {
                None => Ok(PostRemoval::Missing),
                Some(owner) if owner != caller => {
                    debug!(post_id = id, caller, "delete refused, caller is not the author");
                    Ok(PostRemoval::NotOwner)
                }
                Some(_) => {
                    let votes_removed = conn.execute("DELETE FROM votes WHERE post_id = ?1", [id])?;
                    conn.execute("DELETE FROM posts WHERE id = ?1", [id])?;
                    Ok(PostRemoval::Deleted { votes_removed })
                }
            }
        })
    }
}

pub(crate) fn query_post(conn: &Connection, id: i64, viewer: Option<i64>) -> Result<Option<PostRow>> {
    let row = conn
        .query_row(&format!("{POST_SELECT} WHERE p.id = ?2"), (viewer, id), map_post)
        .optional()?;
    Ok(row)
}

pub(crate) fn map_post(row: &Row<'_>) -> rusqlite::Result<PostRow> {
    Ok(PostRow {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        points: row.get(3)?,
        user_id: row.get(4)?,
        creator: row.get(5)?,
        vote_status: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_types::models::VoteValue;

    fn setup() -> (Database, i64, i64) {
        let db = Database::open_in_memory().unwrap();
        let a = db.create_user("author", "author@example.com", "h").unwrap().id;
        let b = db.create_user("other", "other@example.com", "h").unwrap().id;
        (db, a, b)
    }

    fn vote_count(db: &Database, post_id: i64) -> i64 {
        db.with_conn(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM votes WHERE post_id = ?1", [post_id], |r| {
                r.get(0)
            })?)
        })
        .unwrap()
    }

    #[test]
    fn create_and_get_post() {
        let (db, a, _) = setup();
        let post = db.create_post(a, "Hello", "World").unwrap();
        assert_eq!(post.points, 0);
        assert_eq!(post.creator, "author");
        assert_eq!(post.vote_status, None);

        let fetched = db.get_post(post.id, None).unwrap().unwrap();
        assert_eq!(fetched.title, "Hello");
        assert!(db.get_post(post.id + 1, None).unwrap().is_none());
    }

    #[test]
    fn get_post_reports_viewer_vote() {
        let (db, a, b) = setup();
        let post = db.create_post(a, "t", "c").unwrap();
        db.cast_vote(b, post.id, VoteValue::Down).unwrap();

        assert_eq!(db.get_post(post.id, Some(b)).unwrap().unwrap().vote_status, Some(-1));
        assert_eq!(db.get_post(post.id, Some(a)).unwrap().unwrap().vote_status, None);
    }

    #[test]
    fn author_can_update() {
        let (db, a, _) = setup();
        let post = db.create_post(a, "old", "old body").unwrap();

        match db.update_post(post.id, a, "new", "new body").unwrap() {
            PostEdit::Updated(p) => {
                assert_eq!(p.title, "new");
                assert_eq!(p.content, "new body");
            }
            other => panic!("expected update, got {other:?}"),
        }
    }

    #[test]
    fn non_author_update_returns_post_unchanged() {
        let (db, a, b) = setup();
        let post = db.create_post(a, "mine", "body").unwrap();

        match db.update_post(post.id, b, "hijacked", "nope").unwrap() {
            PostEdit::NotOwner(p) => {
                assert_eq!(p.title, "mine");
                assert_eq!(p.content, "body");
                assert_eq!(p.updated_at, post.updated_at);
            }
            other => panic!("expected refusal, got {other:?}"),
        }
        assert_eq!(db.get_post(post.id, None).unwrap().unwrap().title, "mine");
    }

    #[test]
    fn update_missing_post_is_not_found() {
        let (db, a, _) = setup();
        let err = db.update_post(99, a, "t", "c").unwrap_err();
        assert!(matches!(err, StoreError::NotFound("post")));
    }

    #[test]
    fn delete_removes_votes_and_post() {
        let (db, a, b) = setup();
        let c = db.create_user("third", "third@example.com", "h").unwrap().id;
        let post = db.create_post(a, "t", "c").unwrap();
        for voter in [a, b, c] {
            db.cast_vote(voter, post.id, VoteValue::Up).unwrap();
        }
        assert_eq!(vote_count(&db, post.id), 3);

        assert_eq!(
            db.delete_post(post.id, a).unwrap(),
            PostRemoval::Deleted { votes_removed: 3 }
        );
        assert_eq!(vote_count(&db, post.id), 0);
        assert!(db.get_post(post.id, None).unwrap().is_none());
    }

    #[test]
    fn non_author_delete_is_refused() {
        let (db, a, b) = setup();
        let post = db.create_post(a, "t", "c").unwrap();
        db.cast_vote(b, post.id, VoteValue::Up).unwrap();

        assert_eq!(db.delete_post(post.id, b).unwrap(), PostRemoval::NotOwner);
        assert_eq!(db.delete_post(post.id + 10, a).unwrap(), PostRemoval::Missing);
        assert_eq!(vote_count(&db, post.id), 1);
    }

    #[test]
    fn failed_post_delete_rolls_back_vote_removal() {
        let (db, a, b) = setup();
        let c = db.create_user("third", "third@example.com", "h").unwrap().id;
        let post = db.create_post(a, "t", "c").unwrap();
        for voter in [a, b, c] {
            db.cast_vote(voter, post.id, VoteValue::Down).unwrap();
        }

        // Make the second statement of the delete fail after votes are gone.
        db.with_conn(|conn| {
            conn.execute_batch(
                "CREATE TRIGGER block_post_delete BEFORE DELETE ON posts
                 BEGIN SELECT RAISE(ABORT, 'post delete blocked'); END;",
            )?;
            Ok(())
        })
        .unwrap();

        assert!(db.delete_post(post.id, a).is_err());
        assert_eq!(vote_count(&db, post.id), 3);
        assert_eq!(db.get_post(post.id, None).unwrap().unwrap().points, -3);
    }
}
