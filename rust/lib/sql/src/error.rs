use thiserror::Error;

#[derive(Error, Debug)]
pub enum SQLError {
    #[error("query error: {0}")]
    Query(String),

    #[error("execution error: {0}")]
    Execution(String),

    #[error("connection error: {0}")]
    Connection(String),

    /// A UNIQUE constraint rejected the write.
    #[error("unique constraint failed: {0}")]
    Unique(String),

    /// A FOREIGN KEY constraint rejected the write.
    #[error("foreign key constraint failed: {0}")]
    ForeignKey(String),
}

impl SQLError {
    /// Classify a failed write by the constraint that fired.
    pub(crate) fn from_write(e: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(ref failure, ref msg) = e {
            let detail = msg.clone().unwrap_or_else(|| e.to_string());
            match failure.extended_code {
                rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY => return SQLError::Unique(detail),
                rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY => return SQLError::ForeignKey(detail),
                _ => {}
            }
        }
        SQLError::Execution(e.to_string())
    }
}
