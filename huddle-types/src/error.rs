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

//! Error body returned by the token issuer on failure.

use serde::{Deserialize, Serialize};

/// Structured error body of a failed token request.
///
/// Issuers are not required to send one; clients fall back to the raw body
/// text when it does not parse.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct APIError {
    /// Machine-readable error code (e.g. `"INVALID_ROOM"`).
    #[serde(default)]
    pub code: String,

    /// Human-readable error message.
    #[serde(default)]
    pub message: String,
}

impl APIError {
    /// Best-effort parse of an error body. Returns `None` for bodies that are
    /// not JSON or carry neither a code nor a message.
    pub fn from_body(body: &str) -> Option<Self> {
        let parsed: APIError = serde_json::from_str(body).ok()?;
        if parsed.code.is_empty() && parsed.message.is_empty() {
            None
        } else {
            Some(parsed)
        }
    }
}

impl std::fmt::Display for APIError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for APIError {}
