use rusqlite::ErrorCode;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),

    /// A unique constraint rejected the write. Carries the offending column.
    #[error("{0} already exists")]
    Conflict(String),

    #[error("database lock poisoned")]
    Poisoned,

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

impl StoreError {
    /// Turn a unique-constraint failure into `Conflict`, leave anything else as is.
    ///
    /// SQLite reports these as `UNIQUE constraint failed: users.email`.
    pub(crate) fn from_unique(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(code, Some(msg)) = &err {
            if code.code == ErrorCode::ConstraintViolation {
                if let Some(cols) = msg.strip_prefix("UNIQUE constraint failed: ") {
                    let column = cols
                        .split(',')
                        .next()
                        .and_then(|c| c.trim().rsplit('.').next())
                        .unwrap_or(cols);
                    return Self::Conflict(column.to_string());
                }
            }
        }
        Self::Sqlite(err)
    }
}
