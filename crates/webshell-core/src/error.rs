use thiserror::Error;

#[derive(Debug, Error)]
pub enum WebshellError {
    #[error("Configuration error: {0}")]
    Config(String),
}

impl WebshellError {
    /// Short error code string, stable across releases.
    pub fn code(&self) -> &'static str {
        match self {
            WebshellError::Config(_) => "CONFIG_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, WebshellError>;
