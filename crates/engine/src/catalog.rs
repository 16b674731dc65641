//! Cached entity catalog and the live resolver built on it.
//!
//! Completion must answer synchronously on every keystroke, so the live
//! resolver never performs I/O: it reads a [`CatalogSnapshot`] cached
//! behind an `RwLock`, refreshed off the event loop by whoever owns the
//! API client. A failed refresh simply leaves the previous snapshot in
//! place; with nothing cached yet every lookup is empty and completion
//! degrades to "no suggestions".

use std::sync::{Arc, RwLock};

use tdconsole_types::CatalogSnapshot;

use crate::instances::InstanceStore;
use crate::resolver::ValueResolver;

/// Shared, refreshable snapshot of the bound server's entities.
#[derive(Debug, Default)]
pub struct CatalogCache {
    inner: RwLock<CatalogSnapshot>,
}

impl CatalogCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot (cloned; snapshots are small).
    pub fn snapshot(&self) -> CatalogSnapshot {
        self.inner.read().expect("catalog lock poisoned").clone()
    }

    /// Swap in a freshly fetched snapshot.
    pub fn replace(&self, snapshot: CatalogSnapshot) {
        *self.inner.write().expect("catalog lock poisoned") = snapshot;
    }

    /// Drop all cached entities, e.g. when the working instance changes.
    pub fn clear(&self) {
        self.replace(CatalogSnapshot::default());
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().expect("catalog lock poisoned").is_empty()
    }
}

/// Live resolver: instance names from the local store, entity names from
/// the cached catalog.
#[derive(Debug)]
pub struct CatalogResolver {
    catalog: Arc<CatalogCache>,
    instances: Arc<InstanceStore>,
}

impl CatalogResolver {
    pub fn new(catalog: Arc<CatalogCache>, instances: Arc<InstanceStore>) -> Self {
        Self { catalog, instances }
    }
}

impl ValueResolver for CatalogResolver {
    fn instance_names(&self) -> Vec<String> {
        self.instances.names()
    }

    fn collection_names(&self) -> Vec<String> {
        self.catalog.snapshot().collections
    }

    fn function_names(&self, collection: Option<&str>) -> Vec<String> {
        let snapshot = self.catalog.snapshot();
        match collection {
            Some(collection) => snapshot.functions.get(collection).cloned().unwrap_or_default(),
            None => union_sorted(snapshot.functions.values()),
        }
    }

    fn table_names(&self, collection: Option<&str>) -> Vec<String> {
        let snapshot = self.catalog.snapshot();
        match collection {
            Some(collection) => snapshot.tables.get(collection).cloned().unwrap_or_default(),
            None => union_sorted(snapshot.tables.values()),
        }
    }
}

fn union_sorted<'a, I>(lists: I) -> Vec<String>
where
    I: Iterator<Item = &'a Vec<String>>,
{
    let mut union: Vec<String> = lists.flatten().cloned().collect();
    union.sort();
    union.dedup();
    union
}

#[cfg(test)]
mod tests {
    use super::*;
    use tdconsole_types::InstanceRecord;

    fn resolver_with_snapshot() -> CatalogResolver {
        let mut snapshot = CatalogSnapshot::default();
        snapshot.collections = vec!["acme".into(), "zenith".into()];
        snapshot.tables.insert("acme".into(), vec!["orders".into(), "users".into()]);
        snapshot.tables.insert("zenith".into(), vec!["users".into()]);
        snapshot.functions.insert("acme".into(), vec!["ingest".into()]);
        snapshot.functions.insert("zenith".into(), vec!["report".into()]);

        let catalog = Arc::new(CatalogCache::new());
        catalog.replace(snapshot);
        let instances = Arc::new(InstanceStore::ephemeral());
        instances
            .sync_records(vec![InstanceRecord::not_created("dev"), InstanceRecord::not_created("prod")])
            .unwrap();
        CatalogResolver::new(catalog, instances)
    }

    #[test]
    fn scoped_lookups_read_the_snapshot() {
        let resolver = resolver_with_snapshot();
        assert_eq!(resolver.collection_names(), vec!["acme", "zenith"]);
        assert_eq!(resolver.table_names(Some("acme")), vec!["orders", "users"]);
        assert_eq!(resolver.function_names(Some("zenith")), vec!["report"]);
        assert!(resolver.table_names(Some("ghost")).is_empty());
    }

    #[test]
    fn unscoped_lookups_union_sorted_and_deduplicated() {
        let resolver = resolver_with_snapshot();
        assert_eq!(resolver.table_names(None), vec!["orders", "users"]);
        assert_eq!(resolver.function_names(None), vec!["ingest", "report"]);
    }

    #[test]
    fn instance_names_come_from_the_store() {
        let resolver = resolver_with_snapshot();
        assert_eq!(resolver.instance_names(), vec!["dev", "prod"]);
    }

    #[test]
    fn empty_cache_degrades_to_empty_lists() {
        let catalog = Arc::new(CatalogCache::new());
        let instances = Arc::new(InstanceStore::ephemeral());
        let resolver = CatalogResolver::new(catalog.clone(), instances);
        assert!(resolver.collection_names().is_empty());
        assert!(resolver.table_names(None).is_empty());
        assert!(catalog.is_empty());
    }

    #[test]
    fn clear_empties_the_snapshot() {
        let resolver = resolver_with_snapshot();
        resolver.catalog.clear();
        assert!(resolver.collection_names().is_empty());
    }
}
