/*
 * Copyright 2025 Security Union LLC
 *
 * Licensed under either of
 *
 * * Apache License, Version 2.0
 *   (http://www.apache.org/licenses/LICENSE-2.0)
 * * MIT license
 *   (http://opensource.org/licenses/MIT)
 *
 * at your option.
 */

//! Error types for the token issuer client.

use huddle_types::APIError;
use thiserror::Error;

/// Errors returned by [`TokenApiClient`](crate::TokenApiClient) methods.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The caller's session is missing or expired (HTTP 401).
    #[error("Not authenticated. Please log in.")]
    NotAuthenticated,

    /// The issuer refused to mint a token for this caller (HTTP 403).
    #[error("Access denied: {0}")]
    Forbidden(String),

    /// Unknown room or endpoint (HTTP 404).
    #[error("Not found: {0}")]
    NotFound(String),

    /// Any other 4xx: the request itself is invalid and must not be retried.
    #[error("Bad request ({status}): {body}")]
    BadRequest { status: u16, body: String },

    /// A 5xx (or otherwise unexpected) status with its body.
    #[error("Server error ({status}): {body}")]
    ServerError { status: u16, body: String },

    /// A network or transport error, no HTTP status available.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// A 2xx response whose body did not match the expected shape.
    #[error("Invalid response body: {0}")]
    Decode(String),

    /// A configuration error (e.g. missing base URL).
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ApiError {
    /// Map a non-2xx status and its body to an error variant.
    pub fn from_status(status: u16, body: String) -> Self {
        let body = match APIError::from_body(&body) {
            Some(parsed) => parsed.to_string(),
            None => body,
        };
        match status {
            401 => ApiError::NotAuthenticated,
            403 => ApiError::Forbidden(body),
            404 => ApiError::NotFound(body),
            400..=499 => ApiError::BadRequest { status, body },
            _ => ApiError::ServerError { status, body },
        }
    }

    /// HTTP status of the failed response, if the failure got that far.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::NotAuthenticated => Some(401),
            ApiError::Forbidden(_) => Some(403),
            ApiError::NotFound(_) => Some(404),
            ApiError::BadRequest { status, .. } | ApiError::ServerError { status, .. } => {
                Some(*status)
            }
            ApiError::Network(e) => e.status().map(|s| s.as_u16()),
            ApiError::Decode(_) | ApiError::Config(_) => None,
        }
    }

    /// Whether the failure is transient: transport-level failures without a
    /// status, or 5xx responses. 4xx responses are never retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Network(_) => match self.status() {
                None => true,
                Some(status) => status >= 500,
            },
            ApiError::ServerError { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
