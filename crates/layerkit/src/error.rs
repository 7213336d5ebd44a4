use std::path::PathBuf;
use thiserror::Error;

/// Failure of a data fetcher or of the HTTP layer below it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("HTTP {status} fetching {url}")]
    Status { url: String, status: u16 },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Failed to parse {format} data: {message}")]
    Parse {
        format: &'static str,
        message: String,
    },

    #[error("No fetcher registered for data type \"{0}\"")]
    UnsupportedType(String),

    #[error("Data has neither a url nor an inline value")]
    MissingSource,
}

impl FetchError {
    pub fn parse(format: &'static str, message: impl ToString) -> Self {
        FetchError::Parse {
            format,
            message: message.to_string(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Data type \"{0}\" is not delegated")]
    NotDelegated(String),

    #[error("No layer with data is bound")]
    NoData,

    #[error("Pipeline has shut down")]
    Closed,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Toml(#[from] toml::de::Error),
}
