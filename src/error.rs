//! Error handling for the Loja client

use std::fmt;
use thiserror::Error;

use loja_rust_storage::StorageError;

/// Message shown when the backend cannot be reached at all
pub const CONNECTION_ERROR_MESSAGE: &str = "Connection error: could not reach the server";

/// Unified error type for the Loja client
#[derive(Error, Debug)]
pub enum Error {
    /// Network or transport errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization or deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing errors
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// Non-2xx response from the backend
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The backend answered with something that is not JSON
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Local storage read/write failure
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// The operation needs a logged-in session
    #[error("Not authenticated")]
    NotAuthenticated,

    /// Input rejected before anything was sent
    #[error("Validation error: {0}")]
    Validation(String),

    /// Requested quantity exceeds the last known stock
    #[error("Insufficient stock for product {product_id}: only {available} available")]
    InsufficientStock { product_id: i64, available: u32 },
}

impl Error {
    /// Create a new API error
    pub fn api<T: fmt::Display>(status: u16, msg: T) -> Self {
        Error::Api {
            status,
            message: msg.to_string(),
        }
    }

    /// Create a new validation error
    pub fn validation<T: fmt::Display>(msg: T) -> Self {
        Error::Validation(msg.to_string())
    }

    /// Create a new invalid response error
    pub fn invalid_response<T: fmt::Display>(msg: T) -> Self {
        Error::InvalidResponse(msg.to_string())
    }

    /// HTTP status of an API error
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            Error::Http(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// True when the request never got an HTTP answer (refused, timed out, reset)
    pub fn is_connection_error(&self) -> bool {
        match self {
            Error::Http(err) => !err.is_decode() && !err.is_status() && !err.is_builder(),
            _ => false,
        }
    }

    /// True when the user should be sent back to a login screen
    pub fn requires_reauthentication(&self) -> bool {
        matches!(self, Error::NotAuthenticated) || self.status() == Some(401)
    }

    /// Human-readable message suitable for an alert dialog
    pub fn user_message(&self) -> String {
        match self {
            Error::Api { message, .. } => message.clone(),
            Error::Http(_) if self.is_connection_error() => CONNECTION_ERROR_MESSAGE.to_string(),
            Error::Http(_) | Error::Json(_) | Error::InvalidResponse(_) => {
                "The server sent an unexpected response".to_string()
            }
            Error::Url(_) => "The API address is not a valid URL".to_string(),
            Error::Storage(_) => "Could not access local storage".to_string(),
            Error::NotAuthenticated => "Please log in to continue".to_string(),
            Error::Validation(msg) => msg.clone(),
            Error::InsufficientStock { available, .. } => {
                format!("Only {} units available", available)
            }
        }
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;
