use thiserror::Error;

/// Failures of the validator itself.
///
/// Problems found in a validated document are never reported through this
/// type; they become [`crate::validation::ValidationIssue`]s instead.
#[derive(Error, Debug)]
pub enum ValidatorError {
    #[error("Fetch error for '{location}': {message}")]
    Fetch { location: String, message: String },

    #[error("Parse error for '{location}': {message}")]
    Parse { location: String, message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ValidatorError {
    pub fn fetch(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Fetch {
            location: location.into(),
            message: message.into(),
        }
    }

    pub fn parse(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            location: location.into(),
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Location the error refers to, for fetch and parse failures.
    pub fn location(&self) -> Option<&str> {
        match self {
            Self::Fetch { location, .. } | Self::Parse { location, .. } => Some(location),
            _ => None,
        }
    }

    pub fn is_fetch(&self) -> bool {
        matches!(self, Self::Fetch { .. })
    }

    pub fn is_parse(&self) -> bool {
        matches!(self, Self::Parse { .. })
    }
}

pub type Result<T> = std::result::Result<T, ValidatorError>;
