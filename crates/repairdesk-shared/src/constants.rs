/// Application name
pub const APP_NAME: &str = "Repair Desk";

/// URL prefix under which stored attachments are served
pub const UPLOADS_PREFIX: &str = "/uploads";

/// Minimum trimmed length of the requester's name (in chars)
pub const MIN_NAME_LEN: usize = 2;

/// Minimum trimmed length of the problem description (in chars)
pub const MIN_DESCRIPTION_LEN: usize = 10;

/// Filename used when an upload's original name sanitizes to nothing
pub const FALLBACK_UPLOAD_NAME: &str = "upload";

/// Default HTTP API port
pub const DEFAULT_HTTP_PORT: u16 = 5000;

/// Default shared secret for the key-gated submission endpoint (development only)
pub const DEFAULT_API_KEY: &str = "TEST_API_KEY_123";

/// Default maximum upload size in bytes (10 MiB)
pub const DEFAULT_MAX_UPLOAD_SIZE: usize = 10 * 1024 * 1024;
