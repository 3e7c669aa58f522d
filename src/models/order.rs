use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Totals derived from the cart
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderSummary {
    pub total_quantity: u32,
    pub total_price: u64,
}

/// One rendered cart row
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CartLine {
    pub item_id: String,
    pub display_name: String,
    pub unit_price: u32,
    pub quantity: u32,
    pub subtotal: u64,
}

/// Lifecycle phase of the order session
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OrderPhase {
    #[default]
    Empty,
    Active,
    Paying,
}

/// Payload of the one-shot "payment complete" signal
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentReceipt {
    /// Sequence number of the order within this session, starting at 1
    pub order_number: u64,
    pub lines: Vec<CartLine>,
    pub summary: OrderSummary,
    pub paid_at: DateTime<Utc>,
}
