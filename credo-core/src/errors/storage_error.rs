/// Storage-layer errors for SQLite operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("SQLite error: {message}")]
    SqliteError { message: String },

    #[error("migration failed at version {version}: {reason}")]
    MigrationFailed { version: u32, reason: String },

    #[error("constraint violation: {message}")]
    ConstraintViolation { message: String },

    #[error("write lock poisoned: {message}")]
    LockPoisoned { message: String },
}
