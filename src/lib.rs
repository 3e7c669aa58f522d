pub mod commands;
pub mod error;
pub mod logging;
pub mod models;
pub mod services;

pub use error::{ConfigError, DetectorError, ScanError};
pub use models::cart::Cart;
pub use models::catalog::{CatalogEntry, ItemCatalog};
pub use models::config::AppConfig;
pub use models::detection::{Detection, InferenceOptions, InferenceOutput};
pub use models::order::{CartLine, OrderPhase, OrderSummary, PaymentReceipt};
pub use services::cart_aggregator::merge;
pub use services::clock::{Clock, ImmediateClock, TokioClock};
pub use services::detection_filter::{filter, DetectionFilter};
pub use services::inference::{Detector, HttpDetector};
pub use services::order_session::{
    OrderSession, PayOutcome, ScanReport, ScanStatus, SessionEvent, SessionView,
};
pub use services::pricing::summarize;
