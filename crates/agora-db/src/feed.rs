use crate::models::PostRow;
use crate::posts::{POST_SELECT, map_post};
use crate::{Database, Result};

/// Hard cap on page size, whatever the caller asks for. Smaller requests are
/// raised to one post so a page can always advance the cursor.
pub const MAX_PAGE_SIZE: u32 = 50;

#[derive(Debug)]
pub struct FeedPage {
    pub posts: Vec<PostRow>,
    pub has_more: bool,
}

impl Database {
    /// Newest-first page of posts.
    ///
    /// Order is `(created_at DESC, id DESC)`; the id breaks timestamp ties so
    /// every post has exactly one position. With a cursor, only posts strictly
    /// after the cursor post are returned. An unknown cursor yields an empty page.
    pub fn list_posts(&self, limit: u32, cursor: Option<i64>, viewer: Option<i64>) -> Result<FeedPage> {
        let limit = limit.clamp(1, MAX_PAGE_SIZE) as usize;
        let fetch = (limit + 1) as i64;

        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{POST_SELECT}
                 WHERE ?2 IS NULL
                    OR (p.created_at, p.id) < (SELECT created_at, id FROM posts WHERE id = ?2)
                 ORDER BY p.created_at DESC, p.id DESC
                 LIMIT ?3"
            ))?;

            let mut posts = stmt
                .query_map((viewer, cursor, fetch), map_post)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            let has_more = posts.len() > limit;
            posts.truncate(limit);

            Ok(FeedPage { posts, has_more })
        })
    }
}
