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

use async_trait::async_trait;
use huddle_token_client::{ApiError, TokenApiClient};
use huddle_types::{RtcTokenRequest, RtcTokenResponse};
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

/// Something that issues RTC join tokens. Implemented by
/// [`TokenApiClient`]; tests plug in their own.
#[async_trait]
pub trait CredentialIssuer: Send + Sync {
    /// One attempt. Retries are applied by the caller.
    async fn issue(&self, request: &RtcTokenRequest) -> Result<RtcTokenResponse, ApiError>;
}

#[async_trait]
impl CredentialIssuer for TokenApiClient {
    async fn issue(&self, request: &RtcTokenRequest) -> Result<RtcTokenResponse, ApiError> {
        self.issue_rtc_token(request).await
    }
}

/// A join token bound to the room it was issued for.
#[derive(Clone, PartialEq, Eq)]
pub struct JoinCredential {
    pub token: String,
    pub app_id: String,
    /// Lifetime reported by the issuer; `0` means unknown.
    pub expires_in_seconds: u64,
    pub room_id: String,
    pub fetched_at: Instant,
}

impl JoinCredential {
    pub fn new(room_id: impl Into<String>, response: RtcTokenResponse) -> Self {
        Self {
            token: response.token,
            app_id: response.app_id,
            expires_in_seconds: response.expires_in,
            room_id: room_id.into(),
            fetched_at: Instant::now(),
        }
    }

    /// `None` when the issuer did not report a lifetime.
    pub fn expires_at(&self) -> Option<Instant> {
        (self.expires_in_seconds > 0)
            .then(|| self.fetched_at + Duration::from_secs(self.expires_in_seconds))
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at().is_some_and(|at| Instant::now() >= at)
    }

    /// Usable for joining `room_id` right now.
    pub fn is_valid_for(&self, room_id: &str) -> bool {
        self.room_id == room_id && !self.is_expired()
    }
}

impl fmt::Debug for JoinCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JoinCredential")
            .field("token", &"<redacted>")
            .field("app_id", &self.app_id)
            .field("expires_in_seconds", &self.expires_in_seconds)
            .field("room_id", &self.room_id)
            .finish()
    }
}
