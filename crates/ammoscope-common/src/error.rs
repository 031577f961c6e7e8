use thiserror::Error;

#[derive(Debug, Error)]
pub enum AmmoscopeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    FieldType(#[from] FieldTypeError),
}

/// A numeric attribute held a value that is not a number (nor null).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("field `{field}` expected a number, found {found}")]
pub struct FieldTypeError {
    pub field: String,
    pub found: &'static str,
}

pub type Result<T> = std::result::Result<T, AmmoscopeError>;
