//! Error types shared across HeadPut crates.

/// Top-level error type for HeadPut operations.
#[derive(Debug, thiserror::Error)]
pub enum HeadputError {
    #[error("Settings error: {message}")]
    Settings { message: String },

    #[error("Actuation error: {message}")]
    Actuation { message: String },

    #[error("Ingest error: {message}")]
    Ingest { message: String },

    #[error("Unknown key name: {name}")]
    UnknownKey { name: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using HeadputError.
pub type HeadputResult<T> = Result<T, HeadputError>;

impl HeadputError {
    pub fn settings(msg: impl Into<String>) -> Self {
        Self::Settings {
            message: msg.into(),
        }
    }

    pub fn actuation(msg: impl Into<String>) -> Self {
        Self::Actuation {
            message: msg.into(),
        }
    }

    pub fn ingest(msg: impl Into<String>) -> Self {
        Self::Ingest {
            message: msg.into(),
        }
    }

    pub fn unknown_key(name: impl Into<String>) -> Self {
        Self::UnknownKey { name: name.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_carry_context() {
        let err = HeadputError::unknown_key("F13");
        assert_eq!(err.to_string(), "Unknown key name: F13");

        let err = HeadputError::settings("bad file");
        assert_eq!(err.to_string(), "Settings error: bad file");
    }

    #[test]
    fn test_json_error_converts() {
        let parse: Result<u32, _> = serde_json::from_str("not json");
        let err: HeadputError = parse.unwrap_err().into();
        assert!(matches!(err, HeadputError::Json(_)));
    }
}
