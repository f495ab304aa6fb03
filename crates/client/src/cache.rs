//! In-memory listing cache with key-scoped invalidation.
//!
//! Two indexes: result lists keyed by request signature, and single
//! records keyed by id. Every write bumps a generation counter. A response
//! fetched under an older generation is refused, so a read that raced a
//! write can never repopulate the cache with pre-write data.

use estate_core::{Property, PropertyQuery};
use std::collections::HashMap;

/// Cache key for `GET /properties` with `query`.
pub fn list_key(query: &PropertyQuery) -> String {
    format!("properties?{}", query.cache_key())
}

pub const FEATURED_KEY: &str = "properties/featured";

#[derive(Debug, Clone)]
struct ListEntry {
    /// The filters this list was fetched with; decides invalidation.
    query: PropertyQuery,
    items: Vec<Property>,
}

impl ListEntry {
    /// `prior` and `written` are the record before and after the write;
    /// either may be unknown.
    fn is_stale_after(
        &self,
        id: &str,
        prior: Option<&Property>,
        written: Option<&Property>,
    ) -> bool {
        self.query.has_unscoped_keys()
            || self.items.iter().any(|p| p.id == id)
            || prior.is_some_and(|p| self.query.could_include(p))
            || written.is_some_and(|p| self.query.could_include(p))
    }
}

#[derive(Debug, Default)]
pub struct PropertyCache {
    lists: HashMap<String, ListEntry>,
    by_id: HashMap<String, Property>,
    generation: u64,
}

impl PropertyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamp to capture before issuing a request.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn list(&self, key: &str) -> Option<Vec<Property>> {
        self.lists.get(key).map(|e| e.items.clone())
    }

    pub fn property(&self, id: &str) -> Option<Property> {
        self.by_id.get(id).cloned()
    }

    pub fn contains_property(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    /// Stores a list fetched at `generation`. Returns `false`, storing
    /// nothing, if a write happened since.
    pub fn insert_list(
        &mut self,
        key: impl Into<String>,
        query: PropertyQuery,
        items: Vec<Property>,
        generation: u64,
    ) -> bool {
        if generation != self.generation {
            return false;
        }
        self.lists.insert(key.into(), ListEntry { query, items });
        true
    }

    /// Stores a record fetched at `generation`, same rule as [`insert_list`](Self::insert_list).
    pub fn insert_property(&mut self, property: Property, generation: u64) -> bool {
        if generation != self.generation {
            return false;
        }
        self.by_id.insert(property.id.clone(), property);
        true
    }

    /// Applies a successful write of `id`. `written` is the record's new
    /// version, `None` for a delete.
    ///
    /// Drops every list that contained `id`, whose filters could admit the
    /// cached prior version or the new one, or whose query has keys outside
    /// the recognised filters. Then replaces (or removes) the by-id entry.
    /// Returns how many lists were dropped.
    pub fn record_write(&mut self, id: &str, written: Option<&Property>) -> usize {
        self.generation += 1;

        let prior = match written {
            Some(p) => self.by_id.insert(id.to_owned(), p.clone()),
            None => self.by_id.remove(id),
        };

        let before = self.lists.len();
        self.lists
            .retain(|_, entry| !entry.is_stale_after(id, prior.as_ref(), written));
        before - self.lists.len()
    }

    pub fn clear(&mut self) {
        self.generation += 1;
        self.lists.clear();
        self.by_id.clear();
    }

    pub fn list_count(&self) -> usize {
        self.lists.len()
    }

    pub fn property_count(&self) -> usize {
        self.by_id.len()
    }
}
