use crate::models::order::{CartLine, OrderSummary, PaymentReceipt};
use std::fmt::Write as _;

const SHOP_NAME: &str = "DDBB Bakery";

/// Format an amount with thousands separators, e.g. `10,900`
pub fn format_price(amount: u64) -> String {
    let digits = amount.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Plain-text receipt for the current cart
pub fn render(lines: &[CartLine], summary: &OrderSummary) -> String {
    if lines.is_empty() {
        return "빵이 감지되지 않았습니다 (no bread detected)\n".to_string();
    }

    let mut out = String::new();
    let _ = writeln!(out, "{}", SHOP_NAME);
    let _ = writeln!(out, "{}", "-".repeat(32));
    for line in lines {
        let _ = writeln!(out, "{}", line.display_name);
        let _ = writeln!(
            out,
            "  {}원 × {}개 = {}원",
            format_price(line.unit_price as u64),
            line.quantity,
            format_price(line.subtotal)
        );
    }
    let _ = writeln!(out, "{}", "=".repeat(32));
    let _ = writeln!(
        out,
        "총 {}개: {}원",
        summary.total_quantity,
        format_price(summary.total_price)
    );
    out
}

/// Receipt printed once a payment settles
pub fn render_paid(receipt: &PaymentReceipt) -> String {
    let mut out = render(&receipt.lines, &receipt.summary);
    let _ = writeln!(
        out,
        "주문 #{} 결제가 완료되었습니다 ({})",
        receipt.order_number,
        receipt.paid_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    out
}
