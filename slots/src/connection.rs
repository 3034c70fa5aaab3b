use std::cmp::Ordering;
use std::rc::Weak;

use tracing::{trace, warn};

use crate::table::Detach;
use crate::{SignalError, SlotKey};

#[derive(Clone)]
struct Release {
    // A connection never keeps the table alive. Once the signal and every other owner are gone
    // the upgrade fails and releasing becomes a no-op.
    table: Weak<dyn Detach>,
    serial: u64,
}

/// A handle to a single slot registration, returned by the `connect` family of `Signal` methods.
///
/// Clones refer to the same registration. Disconnecting is idempotent and safe at any time,
/// including after the signal has been dropped or cleared. The default value is an invalid
/// connection that refers to nothing.
#[derive(Clone, Default)]
pub struct Connection {
    release: Option<Release>,
    key: SlotKey,
}

impl Connection {
    pub(crate) fn new(table: Weak<dyn Detach>, key: SlotKey, serial: u64) -> Self { Self { release: Some(Release { table, serial }), key } }

    /// True until this handle has been disconnected. Says nothing about whether the slot is still
    /// registered; see [`Connection::is_connected`].
    pub fn is_valid(&self) -> bool { self.release.is_some() }

    /// True if the registration this handle refers to is still live
    pub fn is_connected(&self) -> bool {
        match &self.release {
            Some(release) => release.table.upgrade().is_some_and(|table| table.is_attached(&self.key, release.serial)),
            None => false,
        }
    }

    pub fn key(&self) -> SlotKey { self.key }

    /// Removes the registration from its signal
    pub fn disconnect(&mut self) {
        let Some(release) = self.release.take() else { return };
        if let Some(table) = release.table.upgrade() {
            if table.detach(&self.key, release.serial) {
                trace!(key = %self.key, "connection released");
            }
        }
    }
}

impl PartialEq for Connection {
    fn eq(&self, other: &Self) -> bool { self.key == other.key }
}
impl Eq for Connection {}

impl PartialOrd for Connection {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}
impl Ord for Connection {
    fn cmp(&self, other: &Self) -> Ordering { self.key.cmp(&other.key) }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection").field("key", &self.key).field("valid", &self.is_valid()).finish()
    }
}

/// A connection that is disconnected when it goes out of scope.
///
/// Holds at most one registration at a time: assigning a new connection severs the current one
/// first. Cannot be cloned.
#[derive(Default)]
pub struct ScopedConnection(Connection);

impl ScopedConnection {
    /// An empty scope holding no registration
    pub fn new() -> Self { Self::default() }

    /// Replaces the held registration with `connection`.
    ///
    /// An invalid `connection` is rejected with [`SignalError::InvalidConnection`] and the current
    /// registration is kept.
    pub fn assign(&mut self, connection: Connection) -> Result<(), SignalError> {
        if !connection.is_valid() {
            warn!(current = %self.0.key, "refusing to scope an invalid connection");
            return Err(SignalError::InvalidConnection);
        }
        self.0.disconnect();
        self.0 = connection;
        Ok(())
    }

    pub fn disconnect(&mut self) { self.0.disconnect() }

    /// Gives up the scope without disconnecting
    pub fn release(mut self) -> Connection { std::mem::take(&mut self.0) }

    pub fn connection(&self) -> &Connection { &self.0 }

    pub fn key(&self) -> SlotKey { self.0.key }

    pub fn is_valid(&self) -> bool { self.0.is_valid() }

    pub fn is_connected(&self) -> bool { self.0.is_connected() }
}

impl TryFrom<Connection> for ScopedConnection {
    type Error = SignalError;

    fn try_from(connection: Connection) -> Result<Self, Self::Error> {
        let mut scoped = Self::new();
        scoped.assign(connection)?;
        Ok(scoped)
    }
}

impl Drop for ScopedConnection {
    fn drop(&mut self) { self.0.disconnect(); }
}

impl std::fmt::Debug for ScopedConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.debug_tuple("ScopedConnection").field(&self.0).finish() }
}
