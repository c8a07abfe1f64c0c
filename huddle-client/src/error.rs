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
 *
 * Unless you explicitly state otherwise, any contribution intentionally
 * submitted for inclusion in the work by you, as defined in the Apache-2.0
 * license, shall be dual licensed as above, without any additional terms or
 * conditions.
 */

//! Error types for call session operations.

use huddle_token_client::ApiError;
use thiserror::Error;

use crate::session::CallState;
use crate::transport::TransportError;

/// Errors returned by [`CallSessionController`](crate::CallSessionController)
/// operations. Reclamation never produces one of these.
#[derive(Debug, Error)]
pub enum CallError {
    /// The operation is not valid from the current state.
    #[error("cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: CallState,
    },

    /// The session already reached LEFT.
    #[error("session has already left")]
    SessionLeft,

    /// `leave()` was requested while the operation was in flight.
    #[error("operation cancelled by leave")]
    Cancelled,

    /// The token issuer refused or could not be reached.
    #[error("credential fetch failed: {0}")]
    Credential(#[from] ApiError),

    /// The media SDK failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

impl CallError {
    /// Whether retrying the same operation later can succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            CallError::Credential(e) => e.is_retryable(),
            CallError::Transport(_) => true,
            CallError::InvalidState { .. } | CallError::SessionLeft | CallError::Cancelled => {
                false
            }
        }
    }
}
