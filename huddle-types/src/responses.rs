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

//! Response types for the token issuer.

use serde::{Deserialize, Serialize};

/// Successful response of `POST /rtc-tokens`.
///
/// ```json
/// { "token": "006abc...", "appId": "f3e1...", "expiresIn": 3600 }
/// ```
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RtcTokenResponse {
    /// Opaque token handed to the media transport on join.
    pub token: String,

    /// Media transport application id the token was minted for. Some issuers
    /// leave this empty and expect the client to know its own app id.
    #[serde(default)]
    pub app_id: String,

    /// Lifetime of the token in seconds, counted from issuance.
    pub expires_in: u64,
}
