//! Badge-id resolution against the persisted registry.

use std::collections::HashMap;
use wattlog_model::RegistryEntry;
use wattlog_store::Store;

/// Resolves badge ids to registry entries during a single tick.
///
/// The whitelist is fully re-synced at the start of every tick, so nothing
/// here survives across ticks; within a tick, lookups (including misses)
/// are cached to bound store round-trips for large batches.
pub struct RegistryResolver<'a> {
    store: &'a Store,
    cache: HashMap<String, Option<RegistryEntry>>,
}

impl<'a> RegistryResolver<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self {
            store,
            cache: HashMap::new(),
        }
    }

    /// Look up a normalized badge id. `Ok(None)` means the badge is not
    /// registered (and the caller must deny the event).
    pub fn resolve(&mut self, badge_id: &str) -> wattlog_store::Result<Option<RegistryEntry>> {
        if let Some(cached) = self.cache.get(badge_id) {
            return Ok(cached.clone());
        }
        let entry = self.store.registry_get(badge_id)?;
        self.cache.insert(badge_id.to_string(), entry.clone());
        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wattlog_model::UserStatus;

    #[test]
    fn resolves_known_and_unknown_badges() {
        let store = Store::open_in_memory().unwrap();
        store
            .registry_upsert(&RegistryEntry {
                badge_id: "AB12".to_string(),
                name: "Jane Doe".to_string(),
                status: UserStatus::Active,
            })
            .unwrap();

        let mut resolver = RegistryResolver::new(&store);
        let hit = resolver.resolve("AB12").unwrap();
        assert_eq!(hit.map(|e| e.name), Some("Jane Doe".to_string()));
        assert!(resolver.resolve("ZZ99").unwrap().is_none());
    }

    #[test]
    fn misses_are_cached_within_a_tick() {
        let store = Store::open_in_memory().unwrap();
        let mut resolver = RegistryResolver::new(&store);
        assert!(resolver.resolve("AB12").unwrap().is_none());

        // A registration arriving mid-tick is not observed by this resolver;
        // the next tick starts with a fresh one.
        store
            .registry_upsert(&RegistryEntry {
                badge_id: "AB12".to_string(),
                name: "Jane Doe".to_string(),
                status: UserStatus::Active,
            })
            .unwrap();
        assert!(resolver.resolve("AB12").unwrap().is_none());

        let mut fresh = RegistryResolver::new(&store);
        assert!(fresh.resolve("AB12").unwrap().is_some());
    }
}
