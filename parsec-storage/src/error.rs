use std::fmt;

/// Result type used throughout the crate.
pub type CResult<T> = Result<T, Error>;

/// Errors surfaced by the storage core.
///
/// Each variant corresponds to one of the `status` tags a caller at the
/// envelope layer would serialize back to a client: `block_not_found`,
/// `vlob_not_found`, `version_conflict`, `bad_version`, `integrity_failure`,
/// `backend_unavailable`, `bad_msg`.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    BlockNotFound(String),
    VlobNotFound(String),
    TrustSeedError(String),
    VersionConflict { expected: u64, got: u64 },
    BadVersion(String),
    Integrity(String),
    BackendUnavailable(String),
    BadMsg(String),
    Io(String),
    Json(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BlockNotFound(id) => write!(f, "block not found: {}", id),
            Error::VlobNotFound(id) => write!(f, "vlob not found: {}", id),
            Error::TrustSeedError(msg) => write!(f, "trust seed error: {}", msg),
            Error::VersionConflict { expected, got } => {
                write!(f, "version conflict: expected {}, got {}", expected, got)
            }
            Error::BadVersion(msg) => write!(f, "bad version: {}", msg),
            Error::Integrity(msg) => write!(f, "integrity failure: {}", msg),
            Error::BackendUnavailable(msg) => write!(f, "backend unavailable: {}", msg),
            Error::BadMsg(msg) => write!(f, "{}", msg),
            Error::Io(msg) => write!(f, "io error: {}", msg),
            Error::Json(msg) => write!(f, "json error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err.to_string())
    }
}

impl Error {
    /// The `status` tag used by the command envelope (spec.md §6/§7).
    pub fn status(&self) -> &'static str {
        match self {
            Error::BlockNotFound(_) => "block_not_found",
            Error::VlobNotFound(_) => "vlob_not_found",
            Error::TrustSeedError(_) => "trust_seed_error",
            Error::VersionConflict { .. } => "version_conflict",
            Error::BadVersion(_) => "bad_version",
            Error::Integrity(_) => "integrity_failure",
            Error::BackendUnavailable(_) => "backend_unavailable",
            Error::BadMsg(_) => "bad_msg",
            Error::Io(_) => "io_error",
            Error::Json(_) => "bad_msg",
        }
    }

    /// True for the two GC/discard call sites where a not-found error is
    /// swallowed for idempotency (spec.md §7).
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::BlockNotFound(_) | Error::VlobNotFound(_))
    }
}
