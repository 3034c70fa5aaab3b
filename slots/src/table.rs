use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::SlotKey;
use crate::config::DuplicatePolicy;

/// A type-erased slot. Return values of the bound callable are discarded when it is wrapped.
pub(crate) type Slot<A> = Rc<dyn Fn(A)>;

struct Entry<A> {
    serial: u64,
    slot: Slot<A>,
}

/// Outcome of [`SlotTable::insert`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Inserted {
    New(u64),
    Replaced(u64),
    Rejected,
}

/// Keyed slot storage shared by a signal and the connections it hands out.
///
/// Every registration gets a serial that is unique within the table. Connections release their
/// entry by (key, serial), so a connection that outlived its registration can never remove a
/// later registration of the same key.
pub(crate) struct SlotTable<A> {
    entries: RefCell<BTreeMap<SlotKey, Entry<A>>>,
    next_serial: Cell<u64>,
}

impl<A> SlotTable<A> {
    pub fn new() -> Self { Self { entries: RefCell::new(BTreeMap::new()), next_serial: Cell::new(0) } }

    pub fn insert(&self, key: SlotKey, slot: Slot<A>, policy: DuplicatePolicy) -> Inserted {
        let serial = self.next_serial.get();
        let replaced = {
            let mut entries = self.entries.borrow_mut();
            if policy == DuplicatePolicy::Reject && entries.contains_key(&key) {
                return Inserted::Rejected;
            }
            entries.insert(key, Entry { serial, slot })
        };
        self.next_serial.set(serial + 1);
        // the displaced slot is dropped here, after the borrow is released
        match replaced {
            Some(_) => Inserted::Replaced(serial),
            None => Inserted::New(serial),
        }
    }

    pub fn get(&self, key: &SlotKey) -> Option<Slot<A>> { self.entries.borrow().get(key).map(|entry| entry.slot.clone()) }

    pub fn contains(&self, key: &SlotKey) -> bool { self.entries.borrow().contains_key(key) }

    /// Removes whatever is registered under `key`
    pub fn remove(&self, key: &SlotKey) -> bool {
        let removed = self.entries.borrow_mut().remove(key);
        removed.is_some()
    }

    pub fn len(&self) -> usize { self.entries.borrow().len() }

    pub fn is_empty(&self) -> bool { self.entries.borrow().is_empty() }
}

/// Argument-type independent view of a [`SlotTable`], which is all a connection needs
pub(crate) trait Detach {
    /// Removes the entry under `key` if it is still the registration numbered `serial`
    fn detach(&self, key: &SlotKey, serial: u64) -> bool;

    fn is_attached(&self, key: &SlotKey, serial: u64) -> bool;
}

impl<A> Detach for SlotTable<A> {
    fn detach(&self, key: &SlotKey, serial: u64) -> bool {
        let removed = {
            let mut entries = self.entries.borrow_mut();
            let current = entries.get(key).is_some_and(|entry| entry.serial == serial);
            if current { entries.remove(key) } else { None }
        };
        removed.is_some()
    }

    fn is_attached(&self, key: &SlotKey, serial: u64) -> bool {
        self.entries.borrow().get(key).is_some_and(|entry| entry.serial == serial)
    }
}

/// Registration order of a signal generation.
///
/// Only ever appended to, except for dead keys. While a fire walks the list those are overwritten
/// with the tombstone and compacted away once the walk is done. Outside of a walk they can be
/// pruned directly.
#[derive(Default)]
pub(crate) struct OrderList {
    keys: RefCell<Vec<SlotKey>>,
    walkers: Cell<usize>,
}

impl OrderList {
    pub fn new() -> Self { Self::default() }

    /// Appends `key` unless it is already listed
    pub fn append_unique(&self, key: SlotKey) -> bool {
        let mut keys = self.keys.borrow_mut();
        if keys.contains(&key) {
            return false;
        }
        keys.push(key);
        true
    }

    pub fn snapshot(&self) -> Vec<SlotKey> { self.keys.borrow().clone() }

    /// Snapshots the list for a fire. Pruning is held off until the returned walk is dropped.
    pub fn walk(&self) -> Walk<'_> {
        self.walkers.set(self.walkers.get() + 1);
        Walk { order: self, keys: self.snapshot() }
    }

    pub fn is_walking(&self) -> bool { self.walkers.get() > 0 }

    /// Drops every key for which `live` is false, unless a fire is walking the list. Returns how
    /// many were dropped.
    pub fn prune(&self, live: impl Fn(&SlotKey) -> bool) -> usize {
        if self.is_walking() {
            return 0;
        }
        let mut keys = self.keys.borrow_mut();
        let before = keys.len();
        keys.retain(|key| !key.is_tombstone() && live(key));
        before - keys.len()
    }

    /// Marks `key`, last seen at `index`, as dead.
    ///
    /// A re-entrant fire may have compacted the list since `index` was read, in which case the
    /// key is looked up again.
    pub fn tombstone(&self, index: usize, key: &SlotKey) {
        let mut keys = self.keys.borrow_mut();
        let position = match keys.get(index) {
            Some(found) if found == key => Some(index),
            _ => keys.iter().position(|found| found == key),
        };
        if let Some(position) = position {
            keys[position] = SlotKey::TOMBSTONE;
        }
    }

    /// Drops all tombstones, returning how many there were
    pub fn compact(&self) -> usize {
        let mut keys = self.keys.borrow_mut();
        let before = keys.len();
        keys.retain(|key| !key.is_tombstone());
        before - keys.len()
    }
}

/// A fire's view of an [`OrderList`]
pub(crate) struct Walk<'a> {
    order: &'a OrderList,
    pub keys: Vec<SlotKey>,
}

impl Drop for Walk<'_> {
    fn drop(&mut self) { self.order.walkers.set(self.order.walkers.get() - 1); }
}
