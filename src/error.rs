use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for `draftsync`.
///
/// Each subsystem defines its own error variant. Library callers can match on
/// these to decide recovery strategy; internal code continues to use
/// `anyhow::Result` for ad-hoc context chains.
#[derive(Debug, Error)]
pub enum SyncError {
    // ── Backend API ──────────────────────────────────────────────────────
    #[error("api: {0}")]
    Api(#[from] ApiError),

    // ── Live update stream ──────────────────────────────────────────────
    #[error("stream: {0}")]
    Stream(#[from] StreamError),

    // ── User-initiated mutations ────────────────────────────────────────
    #[error("action: {0}")]
    Action(#[from] ActionError),

    // ── Config ───────────────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ─── Backend API errors ─────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ApiError {
    /// The entity genuinely does not exist. Distinct from generic failure so
    /// callers can render "does not exist" rather than "try again".
    #[error("protocol not found: {0}")]
    NotFound(String),

    /// The bearer credential was rejected. Terminal for the session; callers
    /// must stop issuing requests and defer to re-authentication.
    #[error("session expired or credential rejected")]
    SessionExpired,

    #[error("backend returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("request failed: {0}")]
    Network(String),

    #[error("response decode failed: {0}")]
    Decode(String),
}

// ─── Stream errors ──────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("connection to {url} failed: {message}")]
    Connect { url: String, message: String },

    #[error("no frame within {timeout_secs}s of opening")]
    ConnectTimeout { timeout_secs: u64 },

    #[error("connection closed by server")]
    Closed,
}

// ─── Action errors ──────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ActionError {
    /// Caught before the request is sent; never reaches the network layer.
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("operation not permitted while status is {status}")]
    InvalidState { status: String },

    #[error("api: {0}")]
    Api(#[from] ApiError),
}

// ─── Config errors ──────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ─── Convenience re-exports ─────────────────────────────────────────────────

/// Shorthand result type for the crate.
pub type Result<T> = std::result::Result<T, SyncError>;
