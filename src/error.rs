//! # Error Types
//!
//! Every rejection in pagebus carries a typed reason so the host can present
//! a precise message to the owner of a connection. Configuration and
//! registration errors are returned synchronously; I/O errors that occur in
//! the middle of a transaction are absorbed by the state machine (the owner
//! is notified and the transaction completes with a deterministic outcome)
//! so that one failing connection never halts the tick loop.
//!
//! ## Taxonomy
//!
//! | Variant             | Raised when                                        |
//! |---------------------|----------------------------------------------------|
//! | `PathEscape`        | A file name resolves outside the owner sandbox     |
//! | `QuotaExceeded`     | A size/count limit would be crossed                |
//! | `PermissionDenied`  | The owner cannot claim a position the layout needs |
//! | `FileConflict`      | The reader/writer policy on a shared file fails    |
//! | `StaleOrigin`       | A stepped origin no longer carries its marker      |
//! | `InvalidProperties` | Connection parameters are out of range             |
//! | `NotFound`          | A lookup by id or origin matches nothing           |
//! | `Io`                | An unrecoverable filesystem error                  |

use crate::geom::Position;

pub type Result<T> = std::result::Result<T, Error>;

/// Which limit a [`Error::QuotaExceeded`] rejection refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaKind {
    FileSize,
    TotalSpace,
    FileCount,
    EnabledConnections,
}

impl std::fmt::Display for QuotaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            QuotaKind::FileSize => "file size",
            QuotaKind::TotalSpace => "total space",
            QuotaKind::FileCount => "file count",
            QuotaKind::EnabledConnections => "enabled connections",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The resolved file path is not contained within the owner's sandbox
    /// root. The file is never opened.
    #[error("file '{name}' escapes the owner sandbox")]
    PathEscape { name: String },

    /// A configured limit would be exceeded; the prior state stands.
    #[error("{kind} quota exceeded: limit {limit}, required {required}")]
    QuotaExceeded {
        kind: QuotaKind,
        limit: u64,
        required: u64,
    },

    /// The claim check rejected one of the positions the layout occupies.
    #[error("permission denied: cannot claim position {position}")]
    PermissionDenied { position: Position },

    /// The single-writer/single-additional-reader policy on a shared file
    /// was violated.
    #[error("file conflict on '{file}': {reason}")]
    FileConflict { file: String, reason: &'static str },

    /// A step found the world-visible origin marker gone; the connection
    /// unregisters itself.
    #[error("stale origin at {origin}")]
    StaleOrigin { origin: Position },

    /// Connection parameters failed validation.
    #[error("invalid connection properties: {reason}")]
    InvalidProperties { reason: String },

    /// An id or origin that no registered connection answers to.
    #[error("no connection {target}")]
    NotFound { target: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
