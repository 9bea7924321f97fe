use sea_orm::{DbErr, SqlErr};

/// Failure kinds crossing the data-access boundary.
///
/// Every storage, credential, and validation failure is classified into one
/// of these before it leaves the crate; callers map them to whatever
/// transport signal fits (the mapping itself lives outside this crate).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Caller-supplied data violates a documented constraint.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Uniqueness or cap violation (username, email, commander name, commander limit).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Target row absent or not owned by the caller. The two cases are
    /// deliberately indistinguishable so non-owners learn nothing about
    /// what exists.
    #[error("not found")]
    NotFoundOrForbidden,

    /// Missing, malformed, or expired credentials. The message never says
    /// which check failed.
    #[error("invalid or expired credentials")]
    Unauthenticated,

    /// The store is unreachable, the pool is exhausted, or a statement
    /// failed for reasons the caller cannot correct. The only kind that may
    /// warrant retry/backoff at a layer above.
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<DbErr> for Error {
    fn from(err: DbErr) -> Self {
        // Unique indexes are the race backstop for the application-level
        // uniqueness checks; a violation that slips past those checks is a
        // Conflict, not a storage fault.
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(msg)) => Self::Conflict(msg),
            _ => Self::Storage(err.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_errors_map_to_storage() {
        let err: Error = DbErr::Conn(sea_orm::RuntimeErr::Internal("refused".into())).into();
        assert!(matches!(err, Error::Storage(_)));
    }

    #[test]
    fn messages_do_not_leak_existence() {
        assert_eq!(Error::NotFoundOrForbidden.to_string(), "not found");
        assert_eq!(
            Error::Unauthenticated.to_string(),
            "invalid or expired credentials"
        );
    }
}
