use thiserror::Error;

use crate::SlotKey;

/// Errors reported by signal registration.
///
/// Each of them leaves the signal exactly as it was before the failing call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignalError {
    /// The same receiver+method (or function) is already connected
    #[error("slot {key} is already connected")]
    DuplicateRegistration { key: SlotKey },

    /// An invalid connection was bound into a `ScopedConnection`. This usually means the connect
    /// call it came from failed.
    #[error("cannot scope an invalid connection")]
    InvalidConnection,
}
