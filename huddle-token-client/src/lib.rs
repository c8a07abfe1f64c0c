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

//! REST client for the huddle RTC token issuer.
//!
//! # Example
//!
//! ```no_run
//! use huddle_token_client::{AuthMode, RetryPolicy, TokenApiClient};
//! use huddle_types::{RtcRole, RtcTokenRequest};
//!
//! # async fn example() -> Result<(), huddle_token_client::ApiError> {
//! let client = TokenApiClient::new("http://localhost:8081", AuthMode::Cookie);
//! let request = RtcTokenRequest {
//!     room_name: "standup".to_string(),
//!     account: "webjanedoe".to_string(),
//!     role: RtcRole::Publisher,
//! };
//!
//! // Single attempt
//! let token = client.issue_rtc_token(&request).await?;
//!
//! // With the default bounded retry (2 retries, 300ms linear backoff)
//! let token = client
//!     .issue_rtc_token_with_retry(&request, &RetryPolicy::default())
//!     .await?;
//! println!("token expires in {}s", token.expires_in);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod retry;
pub mod rtc_tokens;

pub use error::ApiError;
pub use huddle_types;
pub use retry::{with_retry, RetryPolicy};

use reqwest::Client;

/// How the client authenticates with the token issuer.
#[derive(Debug, Clone)]
pub enum AuthMode {
    /// Browser mode: send credentials (cookies) automatically via `fetch`.
    Cookie,
    /// Attach `Authorization: Bearer <token>` to every request.
    Bearer(String),
}

/// A typed REST client for the token issuer.
#[derive(Debug, Clone)]
pub struct TokenApiClient {
    base_url: String,
    auth: AuthMode,
    http: Client,
}

impl TokenApiClient {
    /// Create a new client pointing at the given issuer base URL.
    ///
    /// # Arguments
    ///
    /// * `base_url` - e.g. `"http://localhost:8081"`
    /// * `auth` - how to authenticate requests
    pub fn new(base_url: &str, auth: AuthMode) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
            http: Client::new(),
        }
    }

    /// Update the bearer token (e.g. after a session refresh).
    pub fn set_bearer_token(&mut self, token: String) {
        self.auth = AuthMode::Bearer(token);
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build a POST request with auth applied.
    pub(crate) fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.apply_auth(self.http.post(self.url(path)))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn apply_auth(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth {
            AuthMode::Cookie => {
                #[cfg(target_arch = "wasm32")]
                {
                    builder.fetch_credentials_include()
                }
                #[cfg(not(target_arch = "wasm32"))]
                {
                    builder
                }
            }
            AuthMode::Bearer(token) => {
                builder.header(reqwest::header::AUTHORIZATION, format!("Bearer {token}"))
            }
        }
    }
}

/// Parse a JSON body on 2xx, mapping every other status to [`ApiError`].
pub(crate) async fn parse_json_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ApiError> {
    let status = response.status().as_u16();
    match status {
        200..=299 => {
            let text = response.text().await?;
            serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))
        }
        _ => {
            let text = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, text))
        }
    }
}
