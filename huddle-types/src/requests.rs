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

//! Request types for the token issuer.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role requested for the RTC token.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RtcRole {
    /// May publish local tracks and subscribe to remote ones.
    #[default]
    Publisher,
    /// Receive-only.
    Subscriber,
}

impl fmt::Display for RtcRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RtcRole::Publisher => write!(f, "publisher"),
            RtcRole::Subscriber => write!(f, "subscriber"),
        }
    }
}

impl FromStr for RtcRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "publisher" => Ok(RtcRole::Publisher),
            "subscriber" => Ok(RtcRole::Subscriber),
            other => Err(format!("unknown RTC role '{other}'")),
        }
    }
}

/// Request body for `POST /rtc-tokens`.
///
/// ```json
/// { "roomName": "standup", "account": "webjanedoe", "role": "publisher" }
/// ```
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RtcTokenRequest {
    /// Room the token grants access to.
    pub room_name: String,

    /// Normalized account string of the caller.
    pub account: String,

    #[serde(default)]
    pub role: RtcRole,
}
