use crate::models::cart::Cart;
use crate::models::catalog::ItemCatalog;
use crate::models::order::{CartLine, OrderSummary};

/// Total quantity and total price of a cart
pub fn summarize(cart: &Cart, catalog: &ItemCatalog) -> OrderSummary {
    cart.iter()
        .fold(OrderSummary::default(), |summary, (item_id, quantity)| {
            let subtotal = catalog.price_of(item_id) as u64 * quantity as u64;
            OrderSummary {
                total_quantity: summary.total_quantity.saturating_add(quantity),
                total_price: summary.total_price.saturating_add(subtotal),
            }
        })
}

/// Per-item rows in cart order
pub fn lines(cart: &Cart, catalog: &ItemCatalog) -> Vec<CartLine> {
    cart.iter()
        .map(|(item_id, quantity)| {
            let unit_price = catalog.price_of(item_id);
            CartLine {
                item_id: item_id.to_string(),
                display_name: catalog.display_name_of(item_id).to_string(),
                unit_price,
                quantity,
                subtotal: unit_price as u64 * quantity as u64,
            }
        })
        .collect()
}
