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

//! Account string normalization shared with the token issuer.
//!
//! The issuer derives the token subject with the exact same rule, so any
//! change here breaks joins.

use rand::Rng;

use crate::constants::{ANONYMOUS_SUFFIX_MAX, ANONYMOUS_SUFFIX_MIN, IDENTITY_PREFIX};

const EMPTY_LOCAL_PART: &str = "user";

/// What the caller knows about the local user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentitySource {
    /// An email address or any free-form account name.
    Text(String),
    /// A numeric user id, used verbatim.
    Numeric(u64),
}

impl From<&str> for IdentitySource {
    fn from(value: &str) -> Self {
        IdentitySource::Text(value.to_string())
    }
}

impl From<String> for IdentitySource {
    fn from(value: String) -> Self {
        IdentitySource::Text(value)
    }
}

impl From<u64> for IdentitySource {
    fn from(value: u64) -> Self {
        IdentitySource::Numeric(value)
    }
}

fn random_suffix() -> u32 {
    rand::thread_rng().gen_range(ANONYMOUS_SUFFIX_MIN..=ANONYMOUS_SUFFIX_MAX)
}

/// Normalize a user identity into the account string used for both the
/// media transport login and the token subject.
///
/// - text: cut at the first `@`, keep ASCII alphanumerics, lowercase, prefix
///   `web`; `webuserNNNNN` if nothing survives the cleaning
/// - numeric: `web` + the number
/// - missing or empty: `webNNNNN`
pub fn normalize_identity(source: Option<&IdentitySource>) -> String {
    match source {
        Some(IdentitySource::Numeric(n)) => format!("{IDENTITY_PREFIX}{n}"),
        Some(IdentitySource::Text(text)) if !text.is_empty() => {
            let local_part = text.split('@').next().unwrap_or_default();
            let cleaned: String = local_part
                .chars()
                .filter(char::is_ascii_alphanumeric)
                .map(|c| c.to_ascii_lowercase())
                .collect();
            if cleaned.is_empty() {
                format!("{IDENTITY_PREFIX}{EMPTY_LOCAL_PART}{}", random_suffix())
            } else {
                format!("{IDENTITY_PREFIX}{cleaned}")
            }
        }
        _ => format!("{IDENTITY_PREFIX}{}", random_suffix()),
    }
}
