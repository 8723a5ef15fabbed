//! Error types for the brewery_core library.

use crate::Stage;
use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Broad class of an error, for front ends that group messages
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Input out of bounds or not applicable to the current state
    Validation,
    /// No free tank, busy brewhouse or not enough stock
    Capacity,
    /// Sales data could not be imported
    Import,
    /// Referenced entity does not exist
    NotFound,
    /// Filesystem, serialization or configuration failure
    Infrastructure,
}

/// Core error type for brewery_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Input out of bounds (volume, bottle count, date, horizon)
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Unknown beer: {0}")]
    UnknownBeer(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Batch {batch} cannot move from {from}: {reason}")]
    InvalidTransition {
        batch: String,
        from: Stage,
        reason: String,
    },

    #[error("Moving to {stage} requires a tank; free candidates: {candidates}")]
    TankRequired { stage: Stage, candidates: String },

    #[error("Tank {tank} cannot be used for {stage}")]
    TankIncapable { tank: String, stage: Stage },

    #[error("Tank {tank} holds {capacity}L, batch needs {volume}L")]
    TankTooSmall {
        tank: String,
        capacity: u32,
        volume: u32,
    },

    #[error("Tank {0} is occupied")]
    TankUnavailable(String),

    #[error("No free tank for {stage} of {volume}L")]
    NoFreeTank { stage: Stage, volume: u32 },

    #[error("Brewhouse is busy")]
    BrewhouseBusy,

    #[error("Insufficient stock of {beer}: requested {requested}, available {available}")]
    InsufficientStock {
        beer: String,
        requested: u32,
        available: u32,
    },

    #[error("Order {0} has already been delivered")]
    OrderNotPending(String),

    /// The condition behind a suggestion no longer holds
    #[error("Suggestion no longer applies: {0}")]
    StaleSuggestion(String),

    /// Sales CSV could not be imported; nothing was merged
    #[error("Import failed: {0}")]
    Import(String),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_)
            | Error::UnknownBeer(_)
            | Error::InvalidTransition { .. }
            | Error::TankRequired { .. }
            | Error::TankIncapable { .. }
            | Error::TankTooSmall { .. }
            | Error::OrderNotPending(_)
            | Error::StaleSuggestion(_) => ErrorKind::Validation,
            Error::TankUnavailable(_)
            | Error::NoFreeTank { .. }
            | Error::BrewhouseBusy
            | Error::InsufficientStock { .. } => ErrorKind::Capacity,
            Error::Import(_) => ErrorKind::Import,
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::Io(_) | Error::Json(_) | Error::Csv(_) | Error::Toml(_) | Error::Config(_) => {
                ErrorKind::Infrastructure
            }
        }
    }
}
