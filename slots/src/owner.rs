use std::cell::RefCell;
use std::collections::BTreeMap;

use tracing::{debug, trace};

use crate::{ScopedConnection, Signal, SignalId, SlotKey};

/// Implemented by receivers that embed an [`OwnerHandle`], which lets `Signal::connect_tracked`
/// record every registration the receiver's methods take part in.
pub trait Tracked {
    fn owner_handle(&self) -> &OwnerHandle;
}

/// Tracks the registrations made on behalf of one receiver, grouped by signal, and severs all of
/// them when dropped.
///
/// Embed it in the receiver. Rust drops a struct's fields only once the struct itself is already
/// unreachable, and method slots additionally hold the receiver weakly, so no fire can reach a
/// receiver that is being torn down.
#[derive(Default)]
pub struct OwnerHandle {
    connections: RefCell<BTreeMap<SignalId, BTreeMap<SlotKey, ScopedConnection>>>,
}

impl OwnerHandle {
    pub fn new() -> Self { Self::default() }

    /// Starts tracking `connection` for `signal`. Returns false if a registration with the same key
    /// was already tracked; that older scope is dropped and replaced.
    ///
    /// Scopes whose registration is already gone (their signal dropped or cleared, or the slot
    /// disconnected elsewhere) are pruned on the way.
    pub(crate) fn register(&self, signal: SignalId, connection: ScopedConnection) -> bool {
        let (previous, pruned) = {
            let mut connections = self.connections.borrow_mut();
            let previous = connections.entry(signal).or_default().insert(connection.key(), connection);
            (previous, Self::prune(&mut connections))
        };
        if !pruned.is_empty() {
            trace!(connections = pruned.len(), "owner handle pruned dead scopes");
        }
        // released only after the borrow above has ended
        drop(pruned);
        previous.is_none()
    }

    fn prune(connections: &mut BTreeMap<SignalId, BTreeMap<SlotKey, ScopedConnection>>) -> Vec<ScopedConnection> {
        let mut pruned = Vec::new();
        connections.retain(|_, scopes| {
            let dead: Vec<SlotKey> = scopes.iter().filter(|(_, scope)| !scope.is_connected()).map(|(key, _)| *key).collect();
            pruned.extend(dead.iter().filter_map(|key| scopes.remove(key)));
            !scopes.is_empty()
        });
        pruned
    }

    /// Severs every tracked registration on `signal`
    pub fn disconnect<A: 'static>(&self, signal: &Signal<A>) { self.disconnect_id(signal.id()) }

    /// Severs every tracked registration on every signal
    pub fn disconnect_all(&self) {
        let all = std::mem::take(&mut *self.connections.borrow_mut());
        if !all.is_empty() {
            debug!(signals = all.len(), "owner handle disconnecting");
        }
        drop(all);
    }

    /// Number of tracked registrations, across all signals
    pub fn connection_count(&self) -> usize { self.connections.borrow().values().map(BTreeMap::len).sum() }

    pub fn is_tracking<A: 'static>(&self, signal: &Signal<A>) -> bool { self.connections.borrow().contains_key(&signal.id()) }

    fn disconnect_id(&self, signal: SignalId) {
        let removed = self.connections.borrow_mut().remove(&signal);
        if let Some(removed) = removed {
            debug!(%signal, connections = removed.len(), "owner handle disconnecting from signal");
        }
    }
}

impl Drop for OwnerHandle {
    fn drop(&mut self) { self.disconnect_all(); }
}

impl std::fmt::Debug for OwnerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OwnerHandle").field("connections", &self.connection_count()).finish()
    }
}
