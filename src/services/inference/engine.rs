use crate::error::DetectorError;
use crate::models::detection::{InferenceOptions, InferenceOutput};
use async_trait::async_trait;
use image::DynamicImage;

/// Detector abstraction - the object-detection model behind the scanner
#[async_trait]
pub trait Detector: Send + Sync {
    /// Run inference on one image
    async fn detect(
        &self,
        image: &DynamicImage,
        options: &InferenceOptions,
    ) -> Result<InferenceOutput, DetectorError>;

    /// Check that the detector can serve requests
    async fn health_check(&self) -> Result<(), DetectorError> {
        Ok(())
    }
}
