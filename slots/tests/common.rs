use std::cell::RefCell;
use std::rc::Rc;
use std::str::FromStr;

#[allow(unused)]
pub use ankurah_slots::{Connection, OwnerHandle, ScopedConnection, Signal, SignalError, SlotKey, Tracked};
use tracing::Level;

// Initialize tracing for tests
#[ctor::ctor]
fn init_tracing() {
    // if LOG_LEVEL env var is set, use it
    if let Ok(level) = std::env::var("LOG_LEVEL") {
        tracing_subscriber::fmt().with_max_level(Level::from_str(&level).unwrap()).with_test_writer().init();
    } else {
        tracing_subscriber::fmt().with_max_level(Level::INFO).with_test_writer().init();
    }
}

/// Collects a description of every slot call, in call order
#[derive(Clone, Default)]
pub struct Recorder(Rc<RefCell<Vec<String>>>);

#[allow(unused)]
impl Recorder {
    pub fn record(&self, call: impl Into<String>) { self.0.borrow_mut().push(call.into()) }

    /// Drains everything recorded so far
    pub fn take(&self) -> Vec<String> { self.0.borrow_mut().drain(..).collect() }

    /// Slot that records `label` along with the fired value
    pub fn slot<A: std::fmt::Display>(&self, label: &'static str) -> impl Fn(A) + 'static {
        let recorder = self.clone();
        move |value: A| recorder.record(format!("{value} {label}"))
    }
}

/// A receiver with two slot methods that opts into owner tracking
pub struct Widget {
    pub name: &'static str,
    calls: Recorder,
    handle: OwnerHandle,
}

#[allow(unused)]
impl Widget {
    pub fn new(name: &'static str, calls: &Recorder) -> Rc<Self> { Rc::new(Self { name, calls: calls.clone(), handle: OwnerHandle::new() }) }

    pub fn on_fn(&self, step: &'static str) { self.calls.record(format!("{step} {}::fn", self.name)) }

    pub fn on_fn1(&self, step: &'static str) -> usize {
        self.calls.record(format!("{step} {}::fn1", self.name));
        step.len()
    }
}

impl Tracked for Widget {
    fn owner_handle(&self) -> &OwnerHandle { &self.handle }
}
