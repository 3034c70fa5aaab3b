use std::any::TypeId;
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

static NEXT_UNIQUE_SELECTOR: AtomicU64 = AtomicU64::new(0);

/// Identity of a bound receiver.
///
/// Derived from the address of the receiver's `Rc` allocation. Method slots hold a `Weak` to
/// the receiver, which keeps the allocation (and so the address) reserved while the
/// registration exists, even after the receiver itself has been dropped.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Subject(usize);

impl Subject {
    pub fn of<T: ?Sized>(receiver: &Rc<T>) -> Self { Self(Rc::as_ptr(receiver) as *const () as usize) }
}

impl std::fmt::Display for Subject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "{:#x}", self.0) }
}

/// Identity of a bound callable.
///
/// Every fn item and closure literal has a type of its own, so for callables that carry no state
/// the `TypeId` is a stable identity. Values of a stateful type (capturing closures, `fn(A)`
/// pointers, boxed closures) can differ from each other, so `Signal` gives each of those a
/// [`Selector::unique`] instead.
#[derive(Clone, Copy)]
pub struct Selector(Repr);

#[derive(Clone, Copy)]
enum Repr {
    Callable { id: TypeId, name: &'static str },
    Tag(u64),
    Unique { serial: u64, name: &'static str },
}

impl Selector {
    /// Selector for the callable type `F`
    pub fn of<F: ?Sized + 'static>() -> Self { Self(Repr::Callable { id: TypeId::of::<F>(), name: std::any::type_name::<F>() }) }

    /// Selector for `value`'s callable type. Convenient when `F` is an unnameable closure type.
    pub fn of_val<F: 'static>(_value: &F) -> Self { Self::of::<F>() }

    /// Caller-chosen selector
    pub fn tag(tag: u64) -> Self { Self(Repr::Tag(tag)) }

    /// A selector equal to no other, labelled with the name of `F`
    pub fn unique<F: ?Sized + 'static>() -> Self {
        Self(Repr::Unique { serial: NEXT_UNIQUE_SELECTOR.fetch_add(1, AtomicOrdering::Relaxed), name: std::any::type_name::<F>() })
    }

    /// Selector for a connection of the callable type `F`: its type if `F` is zero-sized, a fresh
    /// unique selector otherwise
    pub fn for_callable<F: 'static>() -> Self { if Self::identified_by_type::<F>() { Self::of::<F>() } else { Self::unique::<F>() } }

    /// True if every value of `F` is interchangeable, which makes the type alone an identity
    pub fn identified_by_type<F: 'static>() -> bool { std::mem::size_of::<F>() == 0 }

    fn rank(&self) -> (u8, Option<TypeId>, u64) {
        match self.0 {
            Repr::Callable { id, .. } => (0, Some(id), 0),
            Repr::Tag(tag) => (1, None, tag),
            Repr::Unique { serial, .. } => (2, None, serial),
        }
    }
}

impl PartialEq for Selector {
    fn eq(&self, other: &Self) -> bool { self.rank() == other.rank() }
}
impl Eq for Selector {}

impl PartialOrd for Selector {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}
impl Ord for Selector {
    fn cmp(&self, other: &Self) -> Ordering { self.rank().cmp(&other.rank()) }
}

impl Hash for Selector {
    fn hash<H: Hasher>(&self, state: &mut H) { self.rank().hash(state) }
}

impl std::fmt::Debug for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            Repr::Callable { name, .. } => write!(f, "Selector({name})"),
            Repr::Tag(tag) => write!(f, "Selector(#{tag})"),
            Repr::Unique { serial, name } => write!(f, "Selector({name}~{serial})"),
        }
    }
}

/// Identifies one slot registration: the receiver (absent for free functions) and the callable.
///
/// Ordered by subject first, then selector. The key with both parts absent is the tombstone used
/// to mark dead entries of a registration order list; none of the public constructors yield it.
#[derive(Debug, Clone, Copy, Default, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct SlotKey {
    subject: Option<Subject>,
    selector: Option<Selector>,
}

impl SlotKey {
    pub(crate) const TOMBSTONE: SlotKey = SlotKey { subject: None, selector: None };

    /// Key for a free function or closure of type `F`
    pub fn function<F: ?Sized + 'static>() -> Self { Self { subject: None, selector: Some(Selector::of::<F>()) } }

    /// Key for connecting the free callable `F`. See [`Selector::for_callable`].
    pub fn for_function<F: 'static>() -> Self { Self { subject: None, selector: Some(Selector::for_callable::<F>()) } }

    /// Key for connecting the method `M` bound to `receiver`. See [`Selector::for_callable`].
    pub fn for_method<T: ?Sized, M: 'static>(receiver: &Rc<T>) -> Self {
        Self { subject: Some(Subject::of(receiver)), selector: Some(Selector::for_callable::<M>()) }
    }

    /// Key for the method `M` bound to `receiver`
    pub fn method<T: ?Sized, M: 'static>(receiver: &Rc<T>) -> Self {
        Self { subject: Some(Subject::of(receiver)), selector: Some(Selector::of::<M>()) }
    }

    /// Key built from explicit parts
    pub fn new(subject: Option<Subject>, selector: Selector) -> Self { Self { subject, selector: Some(selector) } }

    /// Key for a free registration identified only by `tag`
    pub fn tagged(tag: u64) -> Self { Self::new(None, Selector::tag(tag)) }

    pub fn subject(&self) -> Option<Subject> { self.subject }

    pub fn selector(&self) -> Option<Selector> { self.selector }

    pub fn is_tombstone(&self) -> bool { *self == Self::TOMBSTONE }
}

impl std::fmt::Display for SlotKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.subject, self.selector) {
            (_, None) => write!(f, "<tombstone>"),
            (None, Some(selector)) => write!(f, "{selector:?}"),
            (Some(subject), Some(selector)) => write!(f, "{selector:?}@{subject}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Receiver;
    impl Receiver {
        fn first(&self, _: u32) {}
        fn second(&self, _: u32) {}
    }

    fn free(_: u32) {}

    #[test]
    fn test_method_keys_distinguish_receiver_and_method() {
        let a = Rc::new(Receiver);
        let b = Rc::new(Receiver);

        let a_first = SlotKey::method::<_, fn(&Receiver, u32)>(&a);
        assert_eq!(a_first, SlotKey::method::<_, fn(&Receiver, u32)>(&a));

        fn key_of<M: Fn(&Receiver, u32) + 'static>(receiver: &Rc<Receiver>, _: M) -> SlotKey { SlotKey::method::<_, M>(receiver) }
        assert_eq!(key_of(&a, Receiver::first), key_of(&a, Receiver::first));
        assert_ne!(key_of(&a, Receiver::first), key_of(&a, Receiver::second));
        assert_ne!(key_of(&a, Receiver::first), key_of(&b, Receiver::first));
        assert_ne!(key_of(&a, Receiver::first), SlotKey::function::<fn(&Receiver, u32)>());
    }

    #[test]
    fn test_tombstone_never_collides() {
        assert!(SlotKey::default().is_tombstone());
        assert!(!SlotKey::function::<fn(u32)>().is_tombstone());
        assert!(!SlotKey::tagged(0).is_tombstone());
        assert_ne!(Selector::of_val(&free), Selector::tag(0));
        // the tombstone sorts ahead of every real key
        assert!(SlotKey::TOMBSTONE < SlotKey::tagged(0));
    }

    #[test]
    fn test_ordering_is_total() {
        let rc = Rc::new(Receiver);
        let mut keys = vec![SlotKey::method::<_, u8>(&rc), SlotKey::tagged(2), SlotKey::function::<u16>(), SlotKey::tagged(1)];
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), 4);
        for window in keys.windows(2) {
            assert_eq!(window[0].cmp(&window[1]), Ordering::Less);
            assert_eq!(window[1].cmp(&window[0]), Ordering::Greater);
        }
        // free registrations order before bound ones
        assert_eq!(keys.last().and_then(|k| k.subject()), Some(Subject::of(&rc)));
    }

    fn function_key_of<F: Fn(u32) + 'static>(_: &F) -> SlotKey { SlotKey::for_function::<F>() }

    #[test]
    fn test_stateful_callables_get_their_own_key() {
        let make = |offset: u32| move |value: u32| assert!(value + offset > 0);
        let (one, two) = (make(1), make(2));
        // same closure type, different captures
        assert_ne!(function_key_of(&one), function_key_of(&two));
        assert_ne!(function_key_of(&one), function_key_of(&one));

        let boxed: Box<dyn Fn(u32)> = Box::new(free);
        assert_ne!(function_key_of(&boxed), function_key_of(&boxed));

        // stateless callables keep a stable key
        assert_eq!(function_key_of(&free), function_key_of(&free));
        assert_eq!(function_key_of(&free), SlotKey::new(None, Selector::of_val(&free)));
        let empty = |_: u32| {};
        assert_eq!(function_key_of(&empty), SlotKey::new(None, Selector::of_val(&empty)));
    }
}
