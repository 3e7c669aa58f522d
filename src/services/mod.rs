pub mod cart_aggregator;
pub mod clock;
pub mod config;
pub mod detection_filter;
pub mod inference;
pub mod order_session;
pub mod pricing;
pub mod receipt;
