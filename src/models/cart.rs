use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Cumulative multiset of accepted items for the current order.
///
/// Entries are kept in identifier order and never hold a zero quantity.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(from = "CartRepr")]
pub struct Cart {
    items: BTreeMap<String, u32>,
}

/// Serialized shape of a cart, rebuilt through `add` so zero entries are dropped
#[derive(Deserialize)]
struct CartRepr {
    #[serde(default)]
    items: BTreeMap<String, u32>,
}

impl From<CartRepr> for Cart {
    fn from(repr: CartRepr) -> Self {
        repr.items.into_iter().collect()
    }
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `count` units of an item; a zero count leaves the cart untouched
    pub(crate) fn add(&mut self, item_id: &str, count: u32) {
        if count == 0 {
            return;
        }
        let quantity = self.items.entry(item_id.to_string()).or_insert(0);
        *quantity = quantity.saturating_add(count);
    }

    pub(crate) fn clear(&mut self) {
        self.items.clear();
    }

    pub fn quantity_of(&self, item_id: &str) -> u32 {
        self.items.get(item_id).copied().unwrap_or(0)
    }

    /// (item_id, quantity) pairs in identifier order
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.items.iter().map(|(id, qty)| (id.as_str(), *qty))
    }

    /// Number of distinct items
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, u32)> for Cart {
    fn from_iter<T: IntoIterator<Item = (S, u32)>>(iter: T) -> Self {
        let mut cart = Cart::new();
        for (id, qty) in iter {
            let id: String = id.into();
            cart.add(&id, qty);
        }
        cart
    }
}
