pub const DEFAULT_TOKEN_RETRIES: u32 = 2;
pub const DEFAULT_TOKEN_BACKOFF_MS: u64 = 300;

// seconds before credential expiry
pub const DEFAULT_EXPIRY_MARGIN_SECS: u64 = 30;

// "web" + five digits when no identity is known
pub const IDENTITY_PREFIX: &str = "web";
pub const ANONYMOUS_SUFFIX_MIN: u32 = 10_000;
pub const ANONYMOUS_SUFFIX_MAX: u32 = 99_999;
