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

//! Client configuration.
//!
//! [`ClientConfig`] holds the process-level settings (usually read once from
//! the environment); [`CallSessionOptions`] is what one controller needs and
//! is derived from it per call.

use huddle_token_client::RetryPolicy;
use huddle_types::RtcRole;
use std::env;
use std::time::Duration;

use crate::constants::{DEFAULT_EXPIRY_MARGIN_SECS, DEFAULT_TOKEN_BACKOFF_MS, DEFAULT_TOKEN_RETRIES};
use crate::identity::IdentitySource;

/// Process-level configuration for the call client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Media transport application id.
    pub app_id: String,
    /// Base URL of the token issuer (e.g. "https://api.example.com").
    pub token_api_url: String,
    /// Role requested for RTC tokens.
    pub token_role: RtcRole,
    /// Retry budget for token requests.
    pub retry: RetryPolicy,
    /// How long before credential expiry to emit `CredentialExpiring`.
    pub expiry_margin: Duration,
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// # Required
    /// - `HUDDLE_APP_ID`
    /// - `HUDDLE_TOKEN_API_URL`
    ///
    /// # Optional
    /// - `HUDDLE_TOKEN_ROLE` (default: `"publisher"`)
    /// - `HUDDLE_TOKEN_RETRIES` (default: `"2"`)
    /// - `HUDDLE_TOKEN_BACKOFF_MS` (default: `"300"`)
    /// - `HUDDLE_EXPIRY_MARGIN_SECS` (default: `"30"`)
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let app_id = lookup("HUDDLE_APP_ID")
            .filter(|s| !s.is_empty())
            .ok_or("HUDDLE_APP_ID environment variable is required")?;
        let token_api_url = lookup("HUDDLE_TOKEN_API_URL")
            .filter(|s| !s.is_empty())
            .ok_or("HUDDLE_TOKEN_API_URL environment variable is required")?;

        let token_role = match lookup("HUDDLE_TOKEN_ROLE") {
            Some(role) => role.parse::<RtcRole>()?,
            None => RtcRole::default(),
        };
        let max_retries = lookup("HUDDLE_TOKEN_RETRIES")
            .unwrap_or_else(|| DEFAULT_TOKEN_RETRIES.to_string())
            .parse::<u32>()
            .map_err(|_| "HUDDLE_TOKEN_RETRIES must be a valid integer")?;
        let backoff_ms = lookup("HUDDLE_TOKEN_BACKOFF_MS")
            .unwrap_or_else(|| DEFAULT_TOKEN_BACKOFF_MS.to_string())
            .parse::<u64>()
            .map_err(|_| "HUDDLE_TOKEN_BACKOFF_MS must be a valid integer")?;
        let margin_secs = lookup("HUDDLE_EXPIRY_MARGIN_SECS")
            .unwrap_or_else(|| DEFAULT_EXPIRY_MARGIN_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "HUDDLE_EXPIRY_MARGIN_SECS must be a valid integer")?;

        Ok(Self {
            app_id,
            token_api_url,
            token_role,
            retry: RetryPolicy {
                max_retries,
                base_delay: Duration::from_millis(backoff_ms),
            },
            expiry_margin: Duration::from_secs(margin_secs),
        })
    }

    /// Options for one call in `room_id` as `identity`.
    pub fn session_options(
        &self,
        room_id: impl Into<String>,
        identity: Option<IdentitySource>,
    ) -> CallSessionOptions {
        CallSessionOptions {
            app_id: self.app_id.clone(),
            room_id: room_id.into(),
            identity,
            token_role: self.token_role,
            retry: self.retry,
            expiry_margin: self.expiry_margin,
            reclaim_on_leave: true,
        }
    }
}

/// Options struct for constructing a controller via
/// [`CallSessionController::new`](crate::CallSessionController::new).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSessionOptions {
    /// Media transport application id. When empty, the app id returned by the
    /// token issuer is used.
    pub app_id: String,

    /// Room to join.
    pub room_id: String,

    /// Raw user identity; normalized once when the controller is built.
    pub identity: Option<IdentitySource>,

    pub token_role: RtcRole,

    pub retry: RetryPolicy,

    /// How long before credential expiry to emit `CredentialExpiring`.
    pub expiry_margin: Duration,

    /// Run a full [`ResourceReclaimer`](crate::ResourceReclaimer) pass at the
    /// end of `leave()`. This also reclaims resources of other controllers
    /// sharing the reclaimer.
    pub reclaim_on_leave: bool,
}

impl CallSessionOptions {
    pub fn new(app_id: impl Into<String>, room_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            room_id: room_id.into(),
            identity: None,
            token_role: RtcRole::default(),
            retry: RetryPolicy::default(),
            expiry_margin: Duration::from_secs(DEFAULT_EXPIRY_MARGIN_SECS),
            reclaim_on_leave: true,
        }
    }

    pub fn with_identity(mut self, identity: impl Into<IdentitySource>) -> Self {
        self.identity = Some(identity.into());
        self
    }
}
