use thiserror::Error;

/// Errors raised while interpreting model values
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Unknown component type: {0}")]
    UnknownComponentType(String),

    #[error("Invalid state path: {0}")]
    InvalidStatePath(String),
}
