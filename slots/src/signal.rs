use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::{debug, trace, warn};

use crate::table::{Detach, Inserted, OrderList, Slot, SlotTable};
use crate::{Connection, ScopedConnection, Selector, SignalConfig, SignalError, SlotKey, Tracked};

static NEXT_SIGNAL_ID: AtomicUsize = AtomicUsize::new(0);

/// Identifies a signal for its whole lifetime, across `clear` calls
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct SignalId(usize);

impl SignalId {
    pub(crate) fn next() -> Self { Self(NEXT_SIGNAL_ID.fetch_add(1, Ordering::Relaxed)) }
}

impl std::fmt::Display for SignalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "{}", self.0) }
}

/// The slot table and registration order of one signal generation. `clear` starts a new one.
struct Generation<A> {
    table: Rc<SlotTable<A>>,
    order: Rc<OrderList>,
}

impl<A> Generation<A> {
    fn new() -> Self { Self { table: Rc::new(SlotTable::new()), order: Rc::new(OrderList::new()) } }
}

impl<A> Clone for Generation<A> {
    fn clone(&self) -> Self { Self { table: self.table.clone(), order: self.order.clone() } }
}

/// A typed dispatcher that calls every connected slot, in registration order, when fired.
///
/// Slots are free functions/closures or methods bound to an `Rc` receiver. Multiple arguments are
/// passed as a tuple. Return values are discarded.
///
/// All methods take `&self`, so a slot may connect, disconnect, clear or re-fire the signal that is
/// calling it. Slots removed mid-dispatch are skipped; slots added mid-dispatch are only
/// guaranteed to run from the next fire on.
pub struct Signal<A> {
    id: SignalId,
    config: SignalConfig,
    generation: RefCell<Generation<A>>,
}

impl<A: 'static> Default for Signal<A> {
    fn default() -> Self { Self::new() }
}

impl<A: 'static> Signal<A> {
    pub fn new() -> Self { Self::with_config(SignalConfig::default()) }

    pub fn with_config(config: SignalConfig) -> Self { Self { id: SignalId::next(), config, generation: RefCell::new(Generation::new()) } }

    pub fn id(&self) -> SignalId { self.id }

    pub fn config(&self) -> &SignalConfig { &self.config }

    /// Connects a free function or closure.
    ///
    /// A fn item or a closure that captures nothing is identified by its type, so it can be
    /// connected once at a time and later disconnected by value. Anything carrying state (capturing
    /// closures, `fn` pointers, boxed closures) gets a key of its own on every call and is
    /// disconnected through the returned [`Connection`].
    pub fn connect<F, R>(&self, function: F) -> Result<Connection, SignalError>
    where F: Fn(A) -> R + 'static {
        self.connect_with_key(SlotKey::for_function::<F>(), function)
    }

    /// Connects `method` bound to `receiver`.
    ///
    /// The slot holds `receiver` weakly: it never keeps the receiver alive and does nothing once
    /// the receiver is gone.
    pub fn connect_method<T, M, R>(&self, receiver: &Rc<T>, method: M) -> Result<Connection, SignalError>
    where
        T: ?Sized + 'static,
        M: Fn(&T, A) -> R + 'static,
    {
        let key = SlotKey::for_method::<T, M>(receiver);
        let weak = Rc::downgrade(receiver);
        self.insert(
            key,
            Rc::new(move |args: A| match weak.upgrade() {
                Some(receiver) => {
                    method(&*receiver, args);
                }
                None => trace!("receiver of {key} is gone"),
            }),
        )
    }

    /// Like [`Signal::connect_method`], and also records the registration in the receiver's
    /// [`OwnerHandle`](crate::OwnerHandle) so it is severed when the receiver drops.
    pub fn connect_tracked<T, M, R>(&self, receiver: &Rc<T>, method: M) -> Result<Connection, SignalError>
    where
        T: Tracked + ?Sized + 'static,
        M: Fn(&T, A) -> R + 'static,
    {
        let connection = self.connect_method(receiver, method)?;
        let scoped = ScopedConnection::try_from(connection.clone())?;
        if !receiver.owner_handle().register(self.id, scoped) {
            warn!(signal = %self.id, name = self.label(), key = %connection.key(), "receiver re-registered a tracked slot");
        }
        Ok(connection)
    }

    /// Connects `slot` under a caller-chosen key
    pub fn connect_with_key<F, R>(&self, key: SlotKey, slot: F) -> Result<Connection, SignalError>
    where F: Fn(A) -> R + 'static {
        self.insert(
            key,
            Rc::new(move |args: A| {
                slot(args);
            }),
        )
    }

    /// Disconnects the free function or closure of type `F`, if connected. Only stateless
    /// callables can be found this way; for the rest this returns false.
    pub fn disconnect<F, R>(&self, _function: F) -> bool
    where F: Fn(A) -> R + 'static {
        Selector::identified_by_type::<F>() && self.disconnect_key(SlotKey::function::<F>())
    }

    /// Disconnects `method` bound to `receiver`, if connected. Like [`Signal::disconnect`], only
    /// for stateless methods.
    pub fn disconnect_method<T, M, R>(&self, receiver: &Rc<T>, _method: M) -> bool
    where
        T: ?Sized + 'static,
        M: Fn(&T, A) -> R + 'static,
    {
        Selector::identified_by_type::<M>() && self.disconnect_key(SlotKey::method::<T, M>(receiver))
    }

    /// Disconnects whatever is registered under `key`. Returns whether anything was.
    pub fn disconnect_key(&self, key: SlotKey) -> bool {
        let table = self.generation.borrow().table.clone();
        let removed = table.remove(&key);
        if removed {
            debug!(signal = %self.id, name = self.label(), %key, "disconnected");
        }
        removed
    }

    /// Calls every connected slot once, in registration order, each with its own clone of `args`.
    pub fn fire(&self, args: A)
    where A: Clone {
        // The order list is snapshotted so that slots connecting or disconnecting during this call
        // cannot disturb the walk. Lookups still go to the live table, which is how removals made
        // mid-dispatch (including `clear`) take effect immediately.
        let order = self.generation.borrow().order.clone();
        let walk = order.walk();
        trace!(signal = %self.id, name = self.label(), slots = walk.keys.len(), "firing");

        let mut stale = false;
        for (index, key) in walk.keys.iter().enumerate() {
            if key.is_tombstone() {
                // left behind by an outer fire that is still walking
                stale = true;
                continue;
            }
            let slot = self.generation.borrow().table.get(key);
            match slot {
                Some(slot) => slot(args.clone()),
                None => {
                    trace!(signal = %self.id, %key, "skipping disconnected slot");
                    order.tombstone(index, key);
                    stale = true;
                }
            }
        }

        if stale {
            order.compact();
        }
    }

    /// True if no slot is connected
    pub fn is_empty(&self) -> bool { self.generation.borrow().table.is_empty() }

    /// Number of connected slots
    pub fn len(&self) -> usize { self.generation.borrow().table.len() }

    pub fn contains(&self, key: &SlotKey) -> bool { self.generation.borrow().table.contains(key) }

    /// Disconnects every slot by starting a fresh generation. Connections from before the clear
    /// keep pointing at the old table, so disconnecting them is a no-op.
    pub fn clear(&self) {
        let previous = std::mem::replace(&mut *self.generation.borrow_mut(), Generation::new());
        debug!(signal = %self.id, name = self.label(), slots = previous.table.len(), "cleared");
        // old slots are dropped outside the borrow
        drop(previous);
    }

    fn insert(&self, key: SlotKey, slot: Slot<A>) -> Result<Connection, SignalError> {
        let Generation { table, order } = self.generation.borrow().clone();
        let serial = match table.insert(key, slot, self.config.duplicate_policy) {
            Inserted::Rejected => {
                warn!(signal = %self.id, name = self.label(), %key, "duplicate registration rejected");
                return Err(SignalError::DuplicateRegistration { key });
            }
            Inserted::Replaced(serial) => {
                warn!(signal = %self.id, name = self.label(), %key, "duplicate registration replaced the existing slot");
                serial
            }
            Inserted::New(serial) => {
                debug!(signal = %self.id, name = self.label(), %key, "connected");
                serial
            }
        };
        // Keys disconnected since the last fire would otherwise pile up when nothing fires.
        // Runs after the insert so a reconnected key keeps its place.
        order.prune(|listed| table.contains(listed));
        order.append_unique(key);

        let table = Rc::downgrade(&table) as Weak<dyn Detach>;
        Ok(Connection::new(table, key, serial))
    }

    fn label(&self) -> &str { self.config.name.as_deref().unwrap_or_default() }
}

impl<A> std::fmt::Debug for Signal<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.id)
            .field("name", &self.config.name)
            .field("slots", &self.generation.borrow().table.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DuplicatePolicy;

    thread_local! {
        static CALLS: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
    }

    fn record(call: impl Into<String>) { CALLS.with(|calls| calls.borrow_mut().push(call.into())) }

    fn take_calls() -> Vec<String> { CALLS.with(|calls| calls.borrow_mut().drain(..).collect()) }

    fn on_value(value: u32) { record(format!("on_value {value}")) }

    fn on_other(value: u32) -> bool {
        record(format!("on_other {value}"));
        true
    }

    #[test]
    fn test_free_functions_fire_in_order() {
        let signal = Signal::new();
        signal.connect(on_other).expect("first connect");
        signal.connect(on_value).expect("second connect");
        assert_eq!(signal.len(), 2);

        signal.fire(3);
        assert_eq!(take_calls(), ["on_other 3", "on_value 3"]);

        assert!(signal.disconnect(on_other));
        assert!(!signal.disconnect(on_other));
        signal.fire(4);
        assert_eq!(take_calls(), ["on_value 4"]);
    }

    #[test]
    fn test_duplicate_function_rejected() {
        let signal = Signal::new();
        let conn = signal.connect(on_value).expect("first connect");
        assert_eq!(signal.connect(on_value).err(), Some(SignalError::DuplicateRegistration { key: conn.key() }));

        signal.fire(1);
        assert_eq!(take_calls(), ["on_value 1"]);
    }

    #[test]
    fn test_replace_policy_keeps_position() {
        let signal = Signal::with_config(SignalConfig::new().name("replacing").duplicate_policy(DuplicatePolicy::Replace));
        let key = SlotKey::tagged(7);
        let mut old = signal.connect_with_key(key, |v: u32| record(format!("old {v}"))).expect("connect");
        signal.connect(on_value).expect("connect");
        let new = signal.connect_with_key(key, |v: u32| record(format!("new {v}"))).expect("replace");

        signal.fire(5);
        assert_eq!(take_calls(), ["new 5", "on_value 5"]);

        // the handle for the replaced registration no longer reaches anything
        old.disconnect();
        assert!(new.is_connected());
        signal.fire(6);
        assert_eq!(take_calls(), ["new 6", "on_value 6"]);
    }

    #[test]
    fn test_clear_starts_new_generation() {
        let signal = Signal::new();
        let mut before = signal.connect(on_value).expect("connect");
        signal.clear();
        assert!(signal.is_empty());
        assert!(!before.is_connected());

        let after = signal.connect(on_value).expect("reconnect after clear");
        before.disconnect();
        assert!(after.is_connected());
        signal.fire(9);
        assert_eq!(take_calls(), ["on_value 9"]);
    }

    #[test]
    fn test_stateful_closures_connect_independently() {
        let signal = Signal::new();
        let connections: Vec<Connection> =
            (0..3).map(|i| signal.connect(move |v: u32| record(format!("closure {i} got {v}"))).expect("distinct closures")).collect();
        assert_eq!(signal.len(), 3);

        signal.fire(1);
        assert_eq!(take_calls(), ["closure 0 got 1", "closure 1 got 1", "closure 2 got 1"]);

        // they can't be looked up by value, only through their connection
        let i = 1;
        assert!(!signal.disconnect(move |v: u32| record(format!("closure {i} got {v}"))));
        let mut middle = connections[1].clone();
        middle.disconnect();
        signal.fire(2);
        assert_eq!(take_calls(), ["closure 0 got 2", "closure 2 got 2"]);
    }

    #[test]
    fn test_order_stays_bounded_without_fire() {
        let signal: Signal<u32> = Signal::new();
        signal.connect(on_value).expect("connect");
        for tag in 0..1000 {
            let mut conn = signal.connect_with_key(SlotKey::tagged(tag), |_: u32| {}).expect("connect");
            conn.disconnect();
        }
        assert_eq!(signal.len(), 1);
        assert_eq!(signal.generation.borrow().order.snapshot().len(), 2);

        // a disconnect followed by a reconnect keeps the original position
        let key = SlotKey::tagged(5000);
        signal.connect_with_key(key, |v: u32| record(format!("tagged {v}"))).expect("connect");
        signal.connect(on_other).expect("connect");
        assert!(signal.disconnect_key(key));
        signal.connect_with_key(key, |v: u32| record(format!("tagged {v}"))).expect("reconnect");
        signal.fire(8);
        assert_eq!(take_calls(), ["on_value 8", "tagged 8", "on_other 8"]);
    }

    #[test]
    fn test_debug_output() {
        let signal: Signal<u32> = Signal::with_config(SignalConfig::new().name("resized"));
        let rendered = format!("{signal:?}");
        assert!(rendered.contains("resized"));
        assert!(rendered.contains("slots: 0"));
    }
}
