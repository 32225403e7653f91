use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for `adrotor`.
///
/// Each subsystem defines its own error variant. Callers can match on these
/// to decide recovery strategy; internal code continues to use
/// `anyhow::Result` for ad-hoc context chains.
#[derive(Debug, Error)]
pub enum RotorError {
    // ── Config ───────────────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── OAuth / credentials ─────────────────────────────────────────────
    #[error("auth: {0}")]
    Auth(#[from] AuthError),

    // ── Ads API ─────────────────────────────────────────────────────────
    #[error("api: {0}")]
    Api(#[from] ApiError),

    // ── Outcome store ───────────────────────────────────────────────────
    #[error("store: {0}")]
    Store(#[from] StoreError),

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ─── OAuth errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token refresh rejected ({status}): {body}")]
    Refresh { status: u16, body: String },

    #[error("token response missing access_token")]
    MissingToken,

    #[error("token refresh transport error: {0}")]
    Transport(String),
}

// ─── Ads API errors ─────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{endpoint} failed ({status}): {body}")]
    Status {
        endpoint: &'static str,
        status: u16,
        body: String,
    },

    #[error("{endpoint} transport error: {message}")]
    Transport {
        endpoint: &'static str,
        message: String,
    },

    #[error("{endpoint} returned an unexpected payload: {message}")]
    Decode {
        endpoint: &'static str,
        message: String,
    },

    #[error("{endpoint} cancelled")]
    Cancelled { endpoint: &'static str },
}

// ─── Outcome store errors ───────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to open outcome store: {0}")]
    Open(String),

    #[error("query failed: {0}")]
    Query(String),
}

// ─── Convenience re-exports ─────────────────────────────────────────────────

/// Shorthand result type for the crate.
pub type Result<T> = std::result::Result<T, RotorError>;
