//! Error types for mnemograph.

use thiserror::Error;

/// Main error type for mnemograph operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Durable-storage failure. Not retried; the caller decides whether to
    /// retry or abort the enclosing action.
    #[error("Store error: {0}")]
    Store(#[from] crate::sqlite::Error),

    /// Embedding generation failed for content that requires one.
    /// Creation and update operations fail outright rather than persisting
    /// an embedding-less record.
    #[error("Embedding unavailable: {0}")]
    Embedding(String),

    /// ANN index backing file unreadable or corrupt at startup. Recovered
    /// by discarding the file and rebuilding from the store.
    #[error("Index initialization failed: {0}")]
    IndexInit(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Tokenization error.
    #[error("Tokenization error: {0}")]
    Tokenization(#[from] tokenizers::Error),

    /// ONNX session error.
    #[error("ONNX session error: {0}")]
    Onnx(#[from] ort::Error),

    /// HuggingFace Hub error.
    #[error("HuggingFace Hub error: {0}")]
    HfHub(#[from] hf_hub::api::sync::ApiError),
}
