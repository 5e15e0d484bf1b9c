//! Client error types.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    /// Transport failure (connect, timeout, body read).
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server answered with an error envelope or a non-2xx status.
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// A 2xx response that did not carry the expected envelope.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Not enough locally known stock for a cart change or reservation.
    #[error("Insufficient stock for menu {menu_id}: available {available}, requested {requested}")]
    InsufficientStock {
        menu_id: i32,
        available: i32,
        requested: i64,
    },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl ClientError {
    /// HTTP status of an API error, if this is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }
}
