//! Error taxonomy for a single fetch task

/// Error from processing one task (remote call + match + hand-off).
///
/// Transient errors (timeout, non-200, transport) are recovered by the
/// worker as "zero results". Everything else stops the worker that hit it.
#[derive(Debug)]
pub enum FetchError {
    /// Non-success HTTP status, or a transport failure without a status
    Http {
        status: Option<u16>,
        message: String,
    },
    /// Request exceeded the per-request timeout
    Timeout,
    /// Response body did not have the expected shape
    Decode(String),
    /// Local I/O (recovery cache, output files)
    Io(std::io::Error),
    /// The persistence writer has gone away
    SinkClosed,
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http {
                status: Some(s),
                message,
            } => write!(f, "HTTP {s}: {message}"),
            Self::Http {
                status: None,
                message,
            } => write!(f, "HTTP error: {message}"),
            Self::Timeout => write!(f, "request timed out"),
            Self::Decode(msg) => write!(f, "malformed response: {msg}"),
            Self::Io(e) => write!(f, "IO: {e}"),
            Self::SinkClosed => write!(f, "result writer closed"),
        }
    }
}

impl std::error::Error for FetchError {}

impl FetchError {
    /// Create from a reqwest error, stripping the URL to keep query
    /// strings out of logs
    pub fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            return Self::Timeout;
        }
        let e = e.without_url();
        if e.is_decode() {
            return Self::Decode(e.to_string());
        }
        Self::Http {
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        }
    }

    /// Whether the task should be treated as "no results" and the worker
    /// should move on.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Http { .. } | Self::Timeout)
    }
}

impl From<std::io::Error> for FetchError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(e: serde_json::Error) -> Self {
        Self::Decode(e.to_string())
    }
}
