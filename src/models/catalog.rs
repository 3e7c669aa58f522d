use crate::error::ConfigError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A purchasable item: identifier as emitted by the detector, name shown on
/// the receipt, and unit price in won
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogEntry {
    pub item_id: String,
    pub display_name: String,
    pub unit_price: u32,
}

impl CatalogEntry {
    pub fn new(item_id: &str, display_name: &str, unit_price: u32) -> Self {
        Self {
            item_id: item_id.to_string(),
            display_name: display_name.to_string(),
            unit_price,
        }
    }
}

/// The bakery's price list
pub fn default_entries() -> Vec<CatalogEntry> {
    vec![
        CatalogEntry::new("croissant", "오리지널크라상", 3200),
        CatalogEntry::new("salt_bread", "소금버터롤", 2800),
        CatalogEntry::new("cookie", "다크초코피넛버터쿠키", 4200),
        CatalogEntry::new("eggmayo", "에그마요소금버터롤", 4500),
        CatalogEntry::new("muffin", "초코청크머핀", 4500),
        CatalogEntry::new("pie", "호두파이(조각)", 4700),
        CatalogEntry::new("twisted_bread", "츄러스꽈배기", 3500),
    ]
}

/// Read-only item lookup.
///
/// Lookups are total: an identifier the catalog does not know is priced at 0
/// and displayed as-is, so a detector label missing from the price list still
/// shows up on the order.
#[derive(Debug, Clone)]
pub struct ItemCatalog {
    entries: HashMap<String, CatalogEntry>,
}

impl ItemCatalog {
    /// Build a catalog, rejecting malformed or duplicate identifiers
    pub fn from_entries(entries: Vec<CatalogEntry>) -> Result<Self, ConfigError> {
        let id_pattern = Regex::new(r"^[a-z][a-z0-9_]*$")
            .map_err(|e| ConfigError::InvalidCatalog(format!("regex error: {}", e)))?;

        let mut map = HashMap::with_capacity(entries.len());
        for entry in entries {
            if !id_pattern.is_match(&entry.item_id) {
                return Err(ConfigError::InvalidCatalog(format!(
                    "item id '{}' must be lowercase snake_case",
                    entry.item_id
                )));
            }
            if entry.display_name.trim().is_empty() {
                return Err(ConfigError::InvalidCatalog(format!(
                    "item '{}' has an empty display name",
                    entry.item_id
                )));
            }
            if map.contains_key(&entry.item_id) {
                return Err(ConfigError::InvalidCatalog(format!(
                    "duplicate item id '{}'",
                    entry.item_id
                )));
            }
            map.insert(entry.item_id.clone(), entry);
        }

        Ok(Self { entries: map })
    }

    pub fn get(&self, item_id: &str) -> Option<&CatalogEntry> {
        self.entries.get(item_id)
    }

    pub fn contains(&self, item_id: &str) -> bool {
        self.entries.contains_key(item_id)
    }

    /// Unit price, 0 for unknown items
    pub fn price_of(&self, item_id: &str) -> u32 {
        self.get(item_id).map(|e| e.unit_price).unwrap_or(0)
    }

    /// Display name, the raw identifier for unknown items
    pub fn display_name_of<'a>(&'a self, item_id: &'a str) -> &'a str {
        self.get(item_id)
            .map(|e| e.display_name.as_str())
            .unwrap_or(item_id)
    }

    /// Entries sorted by identifier
    pub fn entries(&self) -> Vec<&CatalogEntry> {
        let mut entries: Vec<_> = self.entries.values().collect();
        entries.sort_by(|a, b| a.item_id.cmp(&b.item_id));
        entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ItemCatalog {
    fn default() -> Self {
        let entries = default_entries()
            .into_iter()
            .map(|e| (e.item_id.clone(), e))
            .collect();
        Self { entries }
    }
}
