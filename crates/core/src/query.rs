//! Listing query parameters and their canonical cache key.

use crate::error::{EstateError, EstateResult};
use crate::types::{Property, PropertyStatus};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Query string for `GET /properties`.
///
/// Backed by an ordered map, so two queries with the same pairs produce the
/// same [`cache_key`](Self::cache_key) regardless of insertion order. Blank
/// values are dropped on insert.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyQuery(BTreeMap<String, String>);

impl PropertyQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl ToString) {
        let key = key.into();
        let value = value.to_string();
        if value.trim().is_empty() {
            self.0.remove(&key);
        } else {
            self.0.insert(key, value);
        }
    }

    /// Parses `key=value` pairs as given on a command line.
    pub fn from_pairs<I, S>(pairs: I) -> EstateResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut query = Self::new();
        for pair in pairs {
            let pair = pair.as_ref();
            let (k, v) = pair.split_once('=').ok_or_else(|| {
                EstateError::InvalidInput(format!("expected key=value, got `{pair}`"))
            })?;
            if k.trim().is_empty() {
                return Err(EstateError::InvalidInput(format!(
                    "empty key in `{pair}`"
                )));
            }
            query.set(k.trim(), v.trim());
        }
        Ok(query)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Urlencoded, key-sorted form. Empty for an empty query.
    pub fn cache_key(&self) -> String {
        serde_urlencoded::to_string(&self.0).unwrap_or_else(|_| {
            self.0
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("&")
        })
    }

    /// Whether a listing could appear in this query's result.
    ///
    /// Returns `false` only when a recognised filter definitively excludes
    /// the record. Unrecognised keys (search text, paging, sort) never
    /// exclude, and neither do filter values that fail to parse.
    pub fn could_include(&self, property: &Property) -> bool {
        self.0
            .iter()
            .all(|(key, value)| filter_admits(key, value, property) != Some(false))
    }

    /// True when any key is outside the recognised filters. Such a result
    /// (a page, a search, a sort order) can shift on any write.
    pub fn has_unscoped_keys(&self) -> bool {
        self.0.keys().any(|key| !is_scoped_filter(key))
    }
}

fn is_scoped_filter(key: &str) -> bool {
    matches!(
        key,
        "type"
            | "status"
            | "city"
            | "state"
            | "country"
            | "featured"
            | "minPrice"
            | "maxPrice"
            | "bedrooms"
            | "minBedrooms"
            | "bathrooms"
            | "minBathrooms"
            | "agent"
    )
}

/// `Some(true|false)` for a recognised filter, `None` when undecidable.
fn filter_admits(key: &str, value: &str, p: &Property) -> Option<bool> {
    match key {
        "type" => Some(p.kind.eq_ignore_ascii_case(value)),
        "status" => PropertyStatus::parse(value).map(|s| s == p.status),
        "city" => Some(p.address.city.eq_ignore_ascii_case(value)),
        "state" => Some(p.address.state.eq_ignore_ascii_case(value)),
        "country" => Some(p.address.country.eq_ignore_ascii_case(value)),
        "featured" => value.parse::<bool>().ok().map(|f| f == p.featured),
        "minPrice" => value.parse::<f64>().ok().map(|min| p.price >= min),
        "maxPrice" => value.parse::<f64>().ok().map(|max| p.price <= max),
        "bedrooms" | "minBedrooms" => value.parse::<u32>().ok().map(|n| p.bedrooms >= n),
        "bathrooms" | "minBathrooms" => value.parse::<u32>().ok().map(|n| p.bathrooms >= n),
        "agent" => Some(p.agent_id() == Some(value)),
        _ => None,
    }
}

impl<K: Into<String>, V: ToString> FromIterator<(K, V)> for PropertyQuery {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut query = Self::new();
        for (k, v) in iter {
            query.set(k, v);
        }
        query
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn listing() -> Property {
        serde_json::from_value(json!({
            "id": "p1",
            "type": "Apartment",
            "status": "For Sale",
            "price": 250000.0,
            "bedrooms": 3,
            "bathrooms": 2,
            "address": { "city": "Pune", "country": "India" },
            "featured": true
        }))
        .unwrap()
    }

    #[test]
    fn key_ignores_insertion_order() {
        let a = PropertyQuery::new().with("city", "Pune").with("type", "Villa");
        let b = PropertyQuery::new().with("type", "Villa").with("city", "Pune");
        assert_eq!(a.cache_key(), b.cache_key());
        assert_eq!(a.cache_key(), "city=Pune&type=Villa");
    }

    #[test]
    fn key_escapes_values() {
        let q = PropertyQuery::new().with("search", "sea view & pool");
        assert_eq!(q.cache_key(), "search=sea+view+%26+pool");
    }

    #[test]
    fn blank_values_are_dropped() {
        let q = PropertyQuery::new().with("city", "  ").with("type", "Villa");
        assert_eq!(q.cache_key(), "type=Villa");
        assert!(PropertyQuery::new().cache_key().is_empty());
    }

    #[test]
    fn from_pairs_rejects_malformed() {
        let q = PropertyQuery::from_pairs(["city=Pune", "minPrice = 100"]).unwrap();
        assert_eq!(q.get("minPrice"), Some("100"));
        assert!(PropertyQuery::from_pairs(["city"]).is_err());
        assert!(PropertyQuery::from_pairs(["=x"]).is_err());
    }

    #[test]
    fn known_filters_exclude() {
        let p = listing();
        assert!(PropertyQuery::new().with("city", "pune").could_include(&p));
        assert!(!PropertyQuery::new().with("city", "Goa").could_include(&p));
        assert!(!PropertyQuery::new().with("status", "Sold").could_include(&p));
        assert!(!PropertyQuery::new().with("maxPrice", "100000").could_include(&p));
        assert!(PropertyQuery::new().with("bedrooms", "2").could_include(&p));
        assert!(!PropertyQuery::new().with("featured", "false").could_include(&p));
    }

    #[test]
    fn unknown_or_unparseable_filters_never_exclude() {
        let p = listing();
        assert!(PropertyQuery::new().with("page", "7").could_include(&p));
        assert!(PropertyQuery::new().with("search", "garden").could_include(&p));
        assert!(PropertyQuery::new().with("minPrice", "cheap").could_include(&p));
        assert!(!PropertyQuery::new()
            .with("page", "2")
            .with("city", "Goa")
            .could_include(&p));
    }

    #[test]
    fn paging_search_and_sort_are_unscoped() {
        assert!(!PropertyQuery::new().has_unscoped_keys());
        assert!(!PropertyQuery::new()
            .with("city", "Pune")
            .with("maxPrice", 10)
            .has_unscoped_keys());
        for key in ["page", "limit", "search", "sort"] {
            assert!(PropertyQuery::new().with(key, "2").has_unscoped_keys(), "{key}");
        }
    }
}
