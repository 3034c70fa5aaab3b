/// Declares a struct that groups several signals.
///
/// Each signal is stored privately and exposed through an accessor method of the same name, with
/// the visibility given on the field. `Default` builds every signal named after its field, which
/// is what shows up in tracing output.
///
/// ```rust
/// use ankurah_slots::declare_signals;
///
/// declare_signals! {
///     /// Signals of a window
///     pub struct WindowSignals {
///         pub resized: (u32, u32),
///         pub closed: (),
///     }
/// }
///
/// let signals = WindowSignals::default();
/// signals.resized().connect(|(w, h): (u32, u32)| println!("{w}x{h}")).unwrap();
/// signals.resized().fire((800, 600));
/// assert!(signals.closed().is_empty());
/// ```
///
/// Signals can also be declared as accessors on a trait, and a struct can then store them by
/// naming the trait after a colon. Its fields have to match the trait's.
///
/// ```rust
/// use ankurah_slots::declare_signals;
///
/// declare_signals! {
///     pub trait DocumentEvents {
///         saved: String,
///     }
/// }
///
/// declare_signals! {
///     pub struct TextDocument: DocumentEvents {
///         saved: String,
///     }
/// }
///
/// let document: Box<dyn DocumentEvents> = Box::new(TextDocument::default());
/// document.saved().connect(|path: String| println!("saved {path}")).unwrap();
/// document.saved().fire("notes.txt".into());
/// ```
#[macro_export]
macro_rules! declare_signals {
    (@storage $(#[$meta:meta])* $vis:vis struct $name:ident { $( $field:ident : $args:ty ),* }) => {
        $(#[$meta])*
        $vis struct $name {
            $( $field: $crate::Signal<$args>, )*
        }

        impl ::std::default::Default for $name {
            fn default() -> Self {
                Self { $( $field: $crate::Signal::with_config($crate::SignalConfig::new().name(stringify!($field))), )* }
            }
        }
    };

    (
        $(#[$meta:meta])*
        $vis:vis trait $name:ident {
            $( $(#[$field_meta:meta])* $field:ident : $args:ty ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis trait $name {
            $(
                $(#[$field_meta])*
                fn $field(&self) -> &$crate::Signal<$args>;
            )*
        }
    };

    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident : $interface:path {
            $( $(#[$field_meta:meta])* $field:ident : $args:ty ),* $(,)?
        }
    ) => {
        $crate::declare_signals!(@storage $(#[$meta])* $vis struct $name { $( $field : $args ),* });

        impl $interface for $name {
            $(
                $(#[$field_meta])*
                fn $field(&self) -> &$crate::Signal<$args> { &self.$field }
            )*
        }
    };

    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $( $(#[$field_meta:meta])* $field_vis:vis $field:ident : $args:ty ),* $(,)?
        }
    ) => {
        $crate::declare_signals!(@storage $(#[$meta])* $vis struct $name { $( $field : $args ),* });

        impl $name {
            $(
                $(#[$field_meta])*
                $field_vis fn $field(&self) -> &$crate::Signal<$args> { &self.$field }
            )*
        }
    };
}
