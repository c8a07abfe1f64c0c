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

//! RTC token endpoint: `POST /rtc-tokens`.

use huddle_types::{RtcTokenRequest, RtcTokenResponse};
use log::debug;

use crate::error::ApiError;
use crate::retry::{with_retry, RetryPolicy};
use crate::{parse_json_response, TokenApiClient};

impl TokenApiClient {
    /// Request a join token for a room.
    ///
    /// Calls `POST /rtc-tokens` once. Transport failures surface as
    /// [`ApiError::Network`], non-2xx statuses as the matching variant.
    pub async fn issue_rtc_token(
        &self,
        request: &RtcTokenRequest,
    ) -> Result<RtcTokenResponse, ApiError> {
        if request.room_name.is_empty() {
            return Err(ApiError::Config("room name must not be empty".to_string()));
        }
        debug!(
            "requesting RTC token for '{}' in room '{}'",
            request.account, request.room_name
        );
        let response = self.post("/rtc-tokens").json(request).send().await?;
        parse_json_response(response).await
    }

    /// [`issue_rtc_token`](Self::issue_rtc_token) under a [`RetryPolicy`].
    ///
    /// Only transport failures and 5xx responses are retried.
    pub async fn issue_rtc_token_with_retry(
        &self,
        request: &RtcTokenRequest,
        policy: &RetryPolicy,
    ) -> Result<RtcTokenResponse, ApiError> {
        with_retry(
            policy,
            |_| self.issue_rtc_token(request),
            ApiError::is_retryable,
        )
        .await
    }
}
