//! Dynamic value resolution.
//!
//! Flag values — instance names, collection names, function and table
//! names — are not enumerable in the grammar; they come from live backend
//! state. This module defines the capability trait the completion engine
//! is injected with, one method per entity class. Keeping the trait this
//! narrow isolates the pure grammar walk from network and store concerns
//! and makes the engine unit-testable with a fixed resolver.
//!
//! Implementations must degrade, never fail: a backend outage yields an
//! empty list, so a completion request can at worst produce no
//! suggestions.

use std::fmt::Debug;

/// Source of live candidate values for flag completion.
pub trait ValueResolver: Send + Sync + Debug {
    /// Names of locally known server instances.
    fn instance_names(&self) -> Vec<String>;

    /// Names of all collections on the bound server.
    fn collection_names(&self) -> Vec<String>;

    /// Function names in `collection`, or across all collections when
    /// `None`.
    fn function_names(&self, collection: Option<&str>) -> Vec<String>;

    /// Table names in `collection`, or across all collections when `None`.
    fn table_names(&self, collection: Option<&str>) -> Vec<String>;
}

/// Resolver with no backend at all; every lookup is empty. Used until an
/// instance is bound and in tests that only exercise the static grammar.
#[derive(Debug, Default)]
pub struct NullResolver;

impl ValueResolver for NullResolver {
    fn instance_names(&self) -> Vec<String> {
        Vec::new()
    }

    fn collection_names(&self) -> Vec<String> {
        Vec::new()
    }

    fn function_names(&self, _collection: Option<&str>) -> Vec<String> {
        Vec::new()
    }

    fn table_names(&self, _collection: Option<&str>) -> Vec<String> {
        Vec::new()
    }
}
