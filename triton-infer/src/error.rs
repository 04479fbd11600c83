use thiserror::Error;

/// Typed error variants for the inference client.
#[derive(Debug, Error)]
pub enum InferError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Server returned {status}: {message}")]
    Server { status: u16, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Shape {shape:?} holds {expected} elements but {actual} were given")]
    ShapeMismatch {
        shape: Vec<i64>,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid shape {0:?}: dimensions must be non-negative with a product that fits in usize")]
    InvalidShape(Vec<i64>),

    #[error("Unsupported datatype: {0}")]
    UnsupportedDataType(String),

    #[error("Invalid {datatype} element: {value}")]
    InvalidElement { datatype: String, value: String },

    #[error("Output not found in response: {0}")]
    OutputNotFound(String),

    #[error("Model not ready: {0}")]
    ModelNotReady(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl InferError {
    /// Return a machine-readable error code string for this error variant.
    pub fn code(&self) -> &str {
        match self {
            Self::Http(_) => "HTTP_ERROR",
            Self::Server { .. } => "SERVER_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::ShapeMismatch { .. } => "SHAPE_MISMATCH",
            Self::InvalidShape(_) => "INVALID_SHAPE",
            Self::UnsupportedDataType(_) => "UNSUPPORTED_DATATYPE",
            Self::InvalidElement { .. } => "INVALID_ELEMENT",
            Self::OutputNotFound(_) => "OUTPUT_NOT_FOUND",
            Self::ModelNotReady(_) => "MODEL_NOT_READY",
            Self::InvalidUrl(_) => "INVALID_URL",
        }
    }
}

impl From<ureq::Error> for InferError {
    fn from(err: ureq::Error) -> Self {
        Self::Http(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, InferError>;
