use std::fmt;

#[derive(Debug)]
pub enum EngineError {
    InvalidConfig(String),
    Persistence(String),
    Serialization(serde_json::Error),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            EngineError::Persistence(msg) => write!(f, "persistence error: {msg}"),
            EngineError::Serialization(e) => write!(f, "serialization error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::Serialization(e)
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
