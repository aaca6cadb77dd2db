//! Database row types, mapped directly from SQLite rows.
//! Kept apart from the agora-types API models so the store has no opinion on
//! the wire format.

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct PostRow {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub points: i64,
    pub user_id: i64,
    pub creator: String,
    /// The viewer's vote, when the query was made on behalf of a signed-in user.
    pub vote_status: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}
