use thiserror::Error;

/// Errors raised while refreshing or querying the forecasting engine.
/// None of them are fatal: a failed refresh leaves the engine untouched.
#[derive(Debug, Error)]
pub enum Error {
    #[error("feed request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("feed returned status {0}")]
    Status(u16),

    #[error("malformed feed payload: {0}")]
    Malformed(String),

    #[error("feed returned no rounds")]
    EmptySnapshot,

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Config(String),

    #[error("not ready: {0}")]
    NotReady(&'static str),
}

impl Error {
    pub fn malformed(msg: impl Into<String>) -> Self {
        Error::Malformed(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
