//! Persistence error type.

use derive_more::{Display, Error};
use std::panic::Location;

/// Persistence error carrying the code location that raised it.
#[derive(Debug, Clone, Display, Error)]
#[display("statistics store error at {location}: {message}")]
pub struct DbError {
    /// Error message.
    pub message: String,
    /// Code location that raised the error.
    pub location: &'static Location<'static>,
}

impl DbError {
    /// Creates a new persistence error capturing the caller's location.
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            location: Location::caller(),
        }
    }
}

impl From<diesel::result::Error> for DbError {
    #[track_caller]
    fn from(err: diesel::result::Error) -> Self {
        Self::new(format!("Diesel error: {}", err))
    }
}

impl From<diesel::ConnectionError> for DbError {
    #[track_caller]
    fn from(err: diesel::ConnectionError) -> Self {
        Self::new(format!("Connection error: {}", err))
    }
}
