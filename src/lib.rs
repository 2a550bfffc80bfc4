//! poolwire - build-time wiring of cache pools
//!
//! Scans a dependency-injection container for components tagged as cache
//! pools, resolves their inherited tag attributes, derives a stable
//! namespace per pool and rewrites constructor arguments, clearer groups
//! and listing commands accordingly.

pub mod cli;
pub mod config;
pub mod domain;
pub mod duration;
pub mod logging;
pub mod pass;
pub mod registry;

pub use config::PassConfig;
pub use domain::{AdapterKind, Definition, Reference, Value};
pub use pass::{CachePoolPass, PassError, PassReport};
pub use registry::Registry;
