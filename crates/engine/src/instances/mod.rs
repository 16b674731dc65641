//! Local instance state: filesystem discovery, the cached instance store,
//! and `tdserver`/`td` subprocess lifecycle tasks.

pub mod discover;
pub mod lifecycle;
pub mod store;

pub use store::{InstanceStore, InstanceStoreError};
