use thiserror::Error;

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors reported by network construction, propagation, and persistence.
#[derive(Error, Debug)]
pub enum Error {
    /// A weight, neuron, or layer count does not match what an operation
    /// requires. The message names the offending index and the expected
    /// vs. actual sizes.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// The operation needs at least one layer.
    #[error("network has no layers")]
    EmptyNetwork,

    /// A model file could not be opened or flushed.
    #[error("model file '{path}': {source}")]
    ModelIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A weight stream could not be encoded or decoded.
    #[error("model data: {0}")]
    ModelFormat(#[from] bincode::Error),

    /// An architecture sidecar could not be encoded or decoded.
    #[error("model spec: {0}")]
    Spec(#[from] serde_json::Error),

    /// Malformed dataset input.
    #[error("data: {0}")]
    Data(String),
}
