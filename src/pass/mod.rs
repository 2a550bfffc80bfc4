//! # Build Passes
//!
//! Passes mutate a [`Registry`](crate::registry::Registry) after all
//! definitions are loaded and before the container is dumped.
//!
//! ## Cache pool pass
//!
//! | Step | What happens |
//! |------|--------------|
//! | Tag merge | `cache.pool` attributes are merged down the parent chain, most derived wins |
//! | Identity | `name` defaults to the id, `namespace` to a hash of seed, class and name |
//! | Providers | DSN providers get a hidden lazy connection component |
//! | Arguments | provider, namespace and lifetime replace constructor arguments in order |
//! | Chains | nested pools of a chain adapter receive provider, namespace and lifetime |
//! | Finalize | clearers get their pool groups, listing commands get pool names |
//!
//! Any invalid pool aborts the pass with a [`PassError`].

mod cache_pool;
mod error;
pub mod namespace;
pub mod provider;

pub use cache_pool::{CachePoolPass, PassReport, PoolSummary};
pub use error::PassError;
