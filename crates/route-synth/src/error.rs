use thiserror::Error;

/// Failures of the synthesis pipeline itself.
///
/// Bad numeric input never reaches this type; it is replaced by defaults at
/// the parameter boundary.
#[derive(Error, Debug)]
pub enum SynthError {
    #[error("Route is empty, draw or generate a route first")]
    EmptyRoute,

    #[error("Timestamp formatting error: {0}")]
    TimeFormat(#[from] time::error::Format),
}
