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

//! Shared wire types for the huddle RTC token issuer.
//!
//! This crate defines the contract between the token issuing backend and the
//! call client. It carries no HTTP or runtime dependencies, only serde shapes.

pub mod error;
pub mod requests;
pub mod responses;

pub use error::APIError;
pub use requests::{RtcRole, RtcTokenRequest};
pub use responses::RtcTokenResponse;
