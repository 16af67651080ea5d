use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::registry::SessionToken;

/// Represents all possible errors in the dirstream crate.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Hash, Eq)]
pub enum Error {
    /// A native path or file name is not valid text.
    #[error("Failed to encode path as UTF-8: {path}")]
    PathEncoding {
        /// Lossy rendering of the offending path, for diagnostics only.
        path: String,
    },

    /// A directory entry vanished or could not be inspected.
    #[error("Failed to stat {path}: {how}")]
    EntryStat {
        /// The entry that failed to be inspected.
        path: String,
        /// The reason for the failure.
        how: String,
    },

    /// The directory to list could not be opened.
    #[error("Failed to open directory {path}: {how}")]
    OpenDir {
        /// The directory that failed to open.
        path: String,
        /// The reason for the failure.
        how: String,
    },

    /// A session was registered twice under the same token.
    #[error("Duplicated session {0}")]
    DuplicateSession(SessionToken),

    /// The token does not name a live session.
    #[error("Unknown session {0}")]
    UnknownSession(SessionToken),

    /// Another call is currently driving this session.
    #[error("Session {0} is already being advanced by another call")]
    SessionBusy(SessionToken),

    /// Per-call storage could not be reserved.
    #[error("Unable to allocate {what}")]
    Allocation {
        /// The storage that failed to be reserved.
        what: String,
    },

    /// The caller's requested row shape does not match the entry record.
    #[error("Result type mismatch: expected {expected}, found {found}")]
    ResultTypeMismatch {
        /// The row shape produced by the listing.
        expected: String,
        /// The row shape the caller asked for.
        found: String,
    },

    /// Error indicating an invalid argument was provided.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A lock was poisoned or a blocking task failed to complete.
    #[error("Sync failed {what}: {how}")]
    Sync {
        /// Specific failure type
        what: String,
        /// The potential reason for the failure.
        how: String,
    },
}
