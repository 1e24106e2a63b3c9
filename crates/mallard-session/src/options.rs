//! Per-session options.

/// Default session max-age in seconds (30 days).
pub const DEFAULT_SESSION_MAX_AGE: i64 = 60 * 60 * 24 * 30;

/// Options governing a single session.
///
/// These mirror the cookie attributes a front end would apply when it
/// hands the session identifier to clients. The store itself only
/// consumes `max_age`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// Scope path for the session.
    pub path: String,

    /// Optional scope domain.
    pub domain: Option<String>,

    /// Session lifetime in seconds.
    ///
    /// Zero falls back to the store's default TTL when the session is
    /// written. A negative value makes the next save delete the session
    /// instead of persisting it.
    pub max_age: i64,

    /// Restrict the session to secure transports.
    pub secure: bool,

    /// Hide the session identifier from client-side scripts.
    pub http_only: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            path: "/".to_string(),
            domain: None,
            max_age: DEFAULT_SESSION_MAX_AGE,
            secure: false,
            http_only: false,
        }
    }
}

impl SessionOptions {
    /// Create options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the scope path.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Set the scope domain.
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Set the session lifetime in seconds.
    pub fn with_max_age(mut self, max_age: i64) -> Self {
        self.max_age = max_age;
        self
    }

    /// Restrict the session to secure transports.
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Hide the session identifier from client-side scripts.
    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }
}
