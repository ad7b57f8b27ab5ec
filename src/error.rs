use crate::config::ConfigError;
use crate::quotes::QuoteError;
use crate::stats::StatsError;
use thiserror::Error;

/// Everything that can stop the program before or while it runs.
#[derive(Debug, Error)]
pub enum WpmError {
    #[error("wpm requires at least {required} {dimension} in your display (found {actual})")]
    DisplayTooSmall {
        dimension: &'static str,
        required: u16,
        actual: u16,
    },
    #[error("no quote with text id {0}")]
    TextIdNotFound(i64),
    #[error("no quote matches {0:?}")]
    NoSearchMatch(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Quotes(#[from] QuoteError),
    #[error(transparent)]
    Stats(#[from] StatsError),
    #[error("terminal error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = WpmError> = std::result::Result<T, E>;
