use thiserror::Error;

/// Failures surfaced by the stores and the owner-scoped repository
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Absent, or owned by someone else. Callers cannot tell the two apart.
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("Internal store error: {0}")]
    Internal(String),

    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("Password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    #[error(transparent)]
    Sqlx(sqlx::Error),
}

impl DatabaseError {
    pub fn not_found(what: impl Into<String>) -> Self {
        DatabaseError::NotFound(what.into())
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        DatabaseError::InvalidArgument(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        DatabaseError::Conflict(message.into())
    }
}

// Constraint violations carry meaning for callers; everything else is internal
impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                let constraint = db_err.constraint().unwrap_or_default();
                let message = if constraint.contains("period") {
                    "Income record for this month already exists"
                } else if constraint.contains("username") {
                    "Username already exists"
                } else {
                    "Record already exists"
                };
                return DatabaseError::Conflict(message.to_string());
            }
            if db_err.is_foreign_key_violation() {
                return DatabaseError::NotFound("Owner".to_string());
            }
            if db_err.is_check_violation() {
                return DatabaseError::InvalidArgument(db_err.message().to_string());
            }
        }
        DatabaseError::Sqlx(err)
    }
}
