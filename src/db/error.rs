use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatabaseError {
    /// No live snippet matches the requested id.
    #[error("no matching record found")]
    NoRecord,

    #[error(transparent)]
    Query(#[from] diesel::result::Error),

    #[error(transparent)]
    Pool(#[from] diesel::r2d2::PoolError),

    #[error("database connection error: {0}")]
    Connection(String),

    #[error("schema setup failed: {0}")]
    Schema(String),

    #[error("database task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl DatabaseError {
    pub fn is_no_record(&self) -> bool {
        matches!(self, Self::NoRecord)
    }
}

#[cfg(test)]
mod tests {
    use super::DatabaseError;

    #[test]
    fn only_no_record_reports_missing_row() {
        assert!(DatabaseError::NoRecord.is_no_record());
        assert!(!DatabaseError::Query(diesel::result::Error::NotFound).is_no_record());
        assert!(!DatabaseError::Connection("refused".to_string()).is_no_record());
    }

    #[test]
    fn driver_errors_display_unchanged() {
        let err = DatabaseError::from(diesel::result::Error::NotFound);
        assert_eq!(err.to_string(), diesel::result::Error::NotFound.to_string());
    }
}
