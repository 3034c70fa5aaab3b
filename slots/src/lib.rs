/*!
Typed signal/slot dispatch for single-threaded observer wiring.

A [`Signal`] holds any number of slots (free functions, closures, or methods bound to an `Rc`
receiver) and calls each of them, in the order they were connected, when fired.

# Design requirements:
- A registration can be found again from what was registered (receiver + method, or function),
  without holding on to a token. See [`SlotKey`].
- Connecting hands out a [`Connection`] that can sever that one registration later. Disconnecting is
  idempotent, and safe after the signal is gone.
- Receivers that embed an [`OwnerHandle`] get every registration they take part in severed when they
  drop, so a signal can never call into a dead receiver.
- Slots may connect, disconnect, clear, or fire while the signal is dispatching. Removed slots are
  skipped for the rest of the dispatch; added ones are guaranteed to run from the next fire on.
- Not thread safe. Signals, connections and handles are `!Send`.

# Basic usage

```rust
use ankurah_slots::*;
use std::rc::Rc;

struct Console;
impl Console {
    fn print(&self, message: &'static str) { println!("print: {message}") }
    fn shout(&self, message: &'static str) { println!("SHOUT: {message}") }
}

let signal: Signal<&'static str> = Signal::new();
let console = Rc::new(Console);

let mut print = signal.connect_method(&console, Console::print).unwrap();
let _shout = ScopedConnection::try_from(signal.connect_method(&console, Console::shout).unwrap()).unwrap();
signal.fire("step 1"); // print, then shout

print.disconnect();
signal.fire("step 2"); // shout

// connecting the same receiver + method twice is refused
signal.connect_method(&console, Console::shout).unwrap_err();
```

# Owner handles

```rust
use ankurah_slots::*;
use std::rc::Rc;

#[derive(Default)]
struct Label {
    handle: OwnerHandle,
}
impl Label {
    fn set_text(&self, text: String) { println!("text: {text}") }
}
impl Tracked for Label {
    fn owner_handle(&self) -> &OwnerHandle { &self.handle }
}

let changed: Signal<String> = Signal::new();
let label = Rc::new(Label::default());
changed.connect_tracked(&label, Label::set_text).unwrap();
assert_eq!(changed.len(), 1);

drop(label);
assert!(changed.is_empty());
```
*/

mod config;
mod connection;
mod error;
mod key;
mod macros;
mod owner;
mod signal;
mod table;

pub use config::*;
pub use connection::*;
pub use error::*;
pub use key::*;
pub use owner::*;
pub use signal::*;
