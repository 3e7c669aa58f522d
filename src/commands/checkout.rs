use crate::error::ScanError;
use crate::models::catalog::ItemCatalog;
use crate::services::order_session::{OrderSession, PayOutcome, ScanStatus, SessionView};
use crate::services::receipt::{format_price, render, render_paid};
use image::DynamicImage;
use std::fmt::Write as _;
use std::path::Path;
use tracing::warn;

/// Read an image from disk; unreadable files count as "no image"
pub fn load_image(path: &Path) -> Option<DynamicImage> {
    match image::open(path) {
        Ok(image) => Some(image),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not read image");
            None
        }
    }
}

fn status_line(status: &ScanStatus) -> String {
    match status {
        ScanStatus::Merged { accepted, rejected } => {
            format!("added {} item(s), {} below threshold", accepted, rejected)
        }
        ScanStatus::NothingAccepted { rejected } => {
            format!("nothing added, {} below threshold", rejected)
        }
        ScanStatus::EmptyImage => "no usable image".to_string(),
    }
}

/// Scan one image and describe the result with the updated receipt
pub async fn scan_one(session: &OrderSession, image: Option<&DynamicImage>) -> String {
    let (headline, view): (String, SessionView) = match session.scan(image).await {
        Ok(report) => (status_line(&report.status), report.view),
        Err(e) => {
            let headline = match &e {
                ScanError::Unavailable { .. } => {
                    "❌ 모델을 사용할 수 없습니다 (detector unavailable)".to_string()
                }
                ScanError::Failed { message, .. } => format!("❌ 오류: {}", message),
            };
            (headline, e.into_view())
        }
    };

    let mut out = String::new();
    let _ = writeln!(out, "{}", headline);
    out.push_str(&render(&view.lines, &view.summary));
    out
}

/// Scan each file in order against the same session
pub async fn scan_files<P: AsRef<Path>>(session: &OrderSession, paths: &[P]) -> String {
    let mut out = String::new();
    for (i, path) in paths.iter().enumerate() {
        let path = path.as_ref();
        let image = load_image(path);
        let _ = writeln!(out, "[{}/{}] {}", i + 1, paths.len(), path.display());
        out.push_str(&scan_one(session, image.as_ref()).await);
    }
    out
}

/// Settle the order and describe the outcome
pub async fn pay(session: &OrderSession) -> String {
    match session.pay().await {
        PayOutcome::Completed { receipt, .. } => render_paid(&receipt),
        PayOutcome::NothingToPay { .. } => "장바구니가 비어있습니다 (cart is empty)\n".to_string(),
        PayOutcome::Cancelled { .. } => "payment cancelled\n".to_string(),
    }
}

/// One line per catalog item
pub fn catalog_listing(catalog: &ItemCatalog) -> String {
    let mut out = String::new();
    for entry in catalog.entries() {
        let _ = writeln!(
            out,
            "{:<16} {:>8}원  {}",
            entry.item_id,
            format_price(entry.unit_price as u64),
            entry.display_name
        );
    }
    out
}
