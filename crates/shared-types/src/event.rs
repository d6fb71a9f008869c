//! # Events
//!
//! A published payload declares the type tag it travels under. Handlers are
//! registered against the same tag, which is how an inbound message finds its
//! handler without decoding the body first.

use serde::de::DeserializeOwned;
use serde::Serialize;

/// A payload that can be published and handled.
///
/// ```rust,ignore
/// #[derive(Serialize, Deserialize)]
/// struct Foo { id: u32 }
///
/// impl Event for Foo {
///     const MESSAGE_TYPE: &'static str = "Contract.Foo";
/// }
/// ```
pub trait Event: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Value of the `MessageType` user property for this event.
    const MESSAGE_TYPE: &'static str;
}
