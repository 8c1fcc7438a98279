//! Error types shared by every spec operation.

use crate::data::DrawError;

/// Failures that abort a conform, explain, generate or check call.
///
/// Rejection of a value is not an error: it is `Conformed::Invalid`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SpecError {
    /// The spec is misconfigured for the requested operation
    #[error("usage error: {0}")]
    Usage(String),

    /// No generator was supplied and none can be derived
    #[error("unable to construct gen at: {0}")]
    NoGenerator(String),

    /// A named child reference is not present in the registry
    #[error("unable to resolve spec: {0}")]
    UnknownSpec(String),

    /// Drawing a value from the choice sequence failed
    #[error("draw error: {0}")]
    Draw(#[from] DrawError),

    /// A pattern could not be compiled for generation
    #[error("invalid pattern: {0}")]
    Pattern(String),
}

pub type SpecResult<T> = Result<T, SpecError>;
