pub mod engine;
pub mod http_detector;
pub mod preprocessing;

// Re-export main types
pub use engine::Detector;
pub use http_detector::HttpDetector;
