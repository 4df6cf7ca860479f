//! Engine error type.
//!
//! Search and sale requests never surface these: both paths shape their
//! own response bodies so the till always gets a structured answer.
//! Engine errors are for the plumbing around them, cache refreshes and
//! configuration loading.

use thiserror::Error;

use duka_store::StoreError;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    /// A configured value failed validation.
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Config file could not be read.
    #[error("Config file error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file could not be parsed.
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// A control channel to a background task is gone.
    #[error("Channel error: {0}")]
    Channel(String),

    /// The backing store failed during a cache refresh.
    #[error(transparent)]
    Store(#[from] StoreError),
}
