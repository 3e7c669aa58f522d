use crate::error::ConfigError;
use crate::models::catalog::{default_entries, CatalogEntry};
use crate::models::detection::InferenceOptions;
use crate::services::detection_filter::DEFAULT_ACCEPTANCE_THRESHOLD;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Inference server connection and model operating point
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InferenceConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub image_max_dimension: u32,
    pub inference_size: u32,
    pub confidence_floor: f32,
    pub iou_threshold: f32,
    pub augment: bool,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        let options = InferenceOptions::default();
        Self {
            base_url: "http://127.0.0.1:39836".to_string(),
            timeout_secs: 5,
            image_max_dimension: options.image_max_dimension,
            inference_size: options.inference_size,
            confidence_floor: options.confidence_floor,
            iou_threshold: options.iou_threshold,
            augment: options.augment,
        }
    }
}

impl InferenceConfig {
    pub fn options(&self) -> InferenceOptions {
        InferenceOptions {
            image_max_dimension: self.image_max_dimension,
            inference_size: self.inference_size,
            confidence_floor: self.confidence_floor,
            iou_threshold: self.iou_threshold,
            augment: self.augment,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Cart acceptance gate
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AcceptanceConfig {
    pub threshold: f32,
}

impl Default for AcceptanceConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_ACCEPTANCE_THRESHOLD,
        }
    }
}

/// Simulated settlement
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PaymentConfig {
    pub settlement_delay_ms: u64,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            settlement_delay_ms: 2000,
        }
    }
}

impl PaymentConfig {
    pub fn settlement_delay(&self) -> Duration {
        Duration::from_millis(self.settlement_delay_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub inference: InferenceConfig,
    pub acceptance: AcceptanceConfig,
    pub payment: PaymentConfig,
    pub catalog: Vec<CatalogEntry>,
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            inference: InferenceConfig::default(),
            acceptance: AcceptanceConfig::default(),
            payment: PaymentConfig::default(),
            catalog: default_entries(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Range checks that serde cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_unit_interval("acceptance.threshold", self.acceptance.threshold)?;
        check_unit_interval("inference.confidence_floor", self.inference.confidence_floor)?;
        check_unit_interval("inference.iou_threshold", self.inference.iou_threshold)?;

        if self.inference.image_max_dimension == 0 {
            return Err(ConfigError::InvalidValue {
                field: "inference.image_max_dimension",
                reason: "must be greater than 0".to_string(),
            });
        }
        if self.inference.inference_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "inference.inference_size",
                reason: "must be greater than 0".to_string(),
            });
        }
        if self.inference.base_url.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "inference.base_url",
                reason: "must not be empty".to_string(),
            });
        }

        let level = self.logging.level.parse::<tracing::Level>();
        if level.is_err() {
            return Err(ConfigError::InvalidValue {
                field: "logging.level",
                reason: format!("unknown level '{}'", self.logging.level),
            });
        }

        Ok(())
    }
}

fn check_unit_interval(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            field,
            reason: format!("{} is outside [0, 1]", value),
        })
    }
}
