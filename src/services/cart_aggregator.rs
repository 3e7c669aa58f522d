use crate::models::cart::Cart;
use crate::models::detection::Detection;
use std::collections::BTreeMap;

/// Count accepted detections per item
pub fn count_items(accepted: &[Detection]) -> BTreeMap<&str, u32> {
    let mut counts = BTreeMap::new();
    for detection in accepted {
        *counts.entry(detection.item_id.as_str()).or_insert(0) += 1;
    }
    counts
}

/// Add accepted detections to a copy of `cart`.
///
/// Summing is order-independent within a call, but repeated calls with the
/// same detections keep adding: the scanner cannot tell a loaf seen twice from
/// a second loaf.
pub fn merge(cart: &Cart, accepted: &[Detection]) -> Cart {
    let mut merged = cart.clone();
    for (item_id, count) in count_items(accepted) {
        merged.add(item_id, count);
    }
    merged
}
