use thiserror::Error;

pub type ParkingResult<T> = Result<T, ParkingError>;

/// Failures of store reads and slot/entry transitions.
#[derive(Debug, Error)]
pub enum ParkingError {
    /// Reservation or slot change attempted on a slot that is not free.
    #[error("slot is not available")]
    SlotUnavailable,

    /// Unknown id, or an entry that is no longer active.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Caller neither owns the entry nor may act on others' entries.
    #[error("not allowed to act on this entry")]
    Unauthorized,

    /// Unique constraint hit, e.g. a duplicate slot label or username.
    #[error("{0} already exists")]
    Conflict(&'static str),

    /// A stored value could not be decoded.
    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error("database lock poisoned: {0}")]
    Poisoned(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl ParkingError {
    /// Maps a unique-constraint violation to `Conflict`, passing other errors through.
    pub(crate) fn on_unique(what: &'static str) -> impl FnOnce(rusqlite::Error) -> ParkingError {
        move |err| match err {
            rusqlite::Error::SqliteFailure(e, _)
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                ParkingError::Conflict(what)
            }
            other => ParkingError::Database(other),
        }
    }
}
