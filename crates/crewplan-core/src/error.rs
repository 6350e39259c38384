use thiserror::Error;

#[derive(Debug, Error)]
pub enum CrewplanError {
    #[error("Configuration error: {0}")]
    Config(String),
}

impl CrewplanError {
    /// Short error code string for machine-readable output.
    pub fn code(&self) -> &'static str {
        match self {
            CrewplanError::Config(_) => "CONFIG_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, CrewplanError>;
