pub mod client;
pub mod config;
pub mod error;
pub mod protocol;
pub mod tensor;

pub use client::{InferInput, InferOptions, InferRequestedOutput, InferResult, InferenceClient};
pub use error::{InferError, Result};
pub use tensor::{DataType, Tensor, TensorData};
