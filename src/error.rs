use thiserror::Error;

#[derive(Error, Debug)]
pub enum InsightError {
    #[error("Provider error: {0}")]
    Provider(String),

    #[cfg(any(feature = "gemini", feature = "plaid"))]
    #[error("Provider transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Response for '{operation}' does not match the declared schema: {source}")]
    SchemaViolation {
        operation: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid input: {0}")]
    Input(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl InsightError {
    /// True for failures raised at or beyond the network boundary.
    pub fn is_provider_error(&self) -> bool {
        match self {
            Self::Provider(_) => true,
            #[cfg(any(feature = "gemini", feature = "plaid"))]
            Self::Transport(_) => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, InsightError>;
