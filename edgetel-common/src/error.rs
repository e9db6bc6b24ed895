use thiserror::Error;

/// Errors shared by the EdgeTel crates.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CBOR error: {0}")]
    Cbor(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A snapshot value was an array, object or null.
    #[error("snapshot field '{field}' is not a scalar: {value}")]
    NonScalarField { field: String, value: String },

    /// An envelope carried something other than the expected payload.
    #[error("payload type is '{found}', expected '{expected}'")]
    PayloadType { expected: String, found: String },
}

impl<E: std::fmt::Debug> From<ciborium::ser::Error<E>> for Error {
    fn from(e: ciborium::ser::Error<E>) -> Self {
        Error::Cbor(format!("{:?}", e))
    }
}

impl<E: std::fmt::Debug> From<ciborium::de::Error<E>> for Error {
    fn from(e: ciborium::de::Error<E>) -> Self {
        Error::Cbor(format!("{:?}", e))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
