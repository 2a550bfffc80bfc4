//! Domain models for poolwire
//!
//! The container vocabulary (values, references, definitions) without any
//! I/O concerns.

mod adapter;
mod definition;
mod value;

pub use adapter::{AdapterClasses, AdapterKind};
pub use definition::{Definition, Factory, MethodCall, TagAttributes};
pub use value::{InvalidBehavior, Reference, Value};
