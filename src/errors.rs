use sea_orm::error::DbErr;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),

    #[error("Batch insert into {table} failed after {committed_rows} committed rows: {source}")]
    BatchInsert {
        table: String,
        committed_rows: u64,
        #[source]
        source: DbErr,
    },

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Migration error: {0}")]
    MigrationError(String),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ConfigError(err.to_string())
    }
}

impl From<sea_orm::sea_query::error::Error> for ServiceError {
    fn from(err: sea_orm::sea_query::error::Error) -> Self {
        ServiceError::InvalidInput(err.to_string())
    }
}

impl ServiceError {
    /// Rows that reached a commit before the failure, when the error carries that count.
    pub fn committed_rows(&self) -> Option<u64> {
        match self {
            Self::BatchInsert { committed_rows, .. } => Some(*committed_rows),
            _ => None,
        }
    }

    /// Whether the underlying database error reports a table that does not exist.
    ///
    /// Matches SQLite, PostgreSQL and MySQL messages plus Oracle's `ORA-00942`; sea-orm
    /// surfaces driver errors as text.
    pub fn is_missing_object(&self) -> bool {
        match self {
            Self::DatabaseError(err) | Self::BatchInsert { source: err, .. } => {
                is_missing_object(err)
            }
            _ => false,
        }
    }
}

pub(crate) fn is_missing_object(err: &DbErr) -> bool {
    let message = err.to_string().to_ascii_lowercase();
    const MARKERS: [&str; 4] = ["no such table", "does not exist", "unknown table", "ora-00942"];
    MARKERS.iter().any(|marker| message.contains(marker))
}

pub type AppError = ServiceError;
