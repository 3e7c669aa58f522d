use super::engine::Detector;
use super::preprocessing::{decode_base64_image, encode_png_base64, fit_to_max_dimension};
use crate::error::DetectorError;
use crate::models::config::InferenceConfig;
use crate::models::detection::{Detection, InferenceOptions, InferenceOutput};
use async_trait::async_trait;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// HTTP detector client that talks to the local model server
#[derive(Clone)]
pub struct HttpDetector {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Serialize)]
struct DetectRequest {
    image_base64: String,
    imgsz: u32,
    conf: f32,
    iou: f32,
    augment: bool,
}

/// Single box reported by the server
#[derive(Deserialize, Debug)]
struct WireDetection {
    label: String,
    confidence: f32,
    #[serde(default)]
    bbox: Option<[f32; 4]>,
}

#[derive(Deserialize, Debug)]
struct DetectResponse {
    detections: Vec<WireDetection>,
    #[serde(default)]
    annotated_image_base64: Option<String>,
}

impl HttpDetector {
    /// Create a new client for the server described by `config`
    pub fn new(config: &InferenceConfig) -> Result<Self, DetectorError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| DetectorError::Request(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Turn a server response body into detections and the optional annotated image
    fn parse_response(response: DetectResponse) -> InferenceOutput {
        let detections = response
            .detections
            .into_iter()
            .map(|d| {
                let detection = Detection::new(d.label, d.confidence);
                match d.bbox {
                    Some(bbox) => detection.with_bbox(bbox),
                    None => detection,
                }
            })
            .collect();

        // A broken preview is not worth failing the scan over
        let annotated_image = match response.annotated_image_base64.as_deref() {
            Some(data) => match decode_base64_image(data) {
                Ok(image) => Some(image),
                Err(e) => {
                    warn!(error = %e, "dropping undecodable annotated image");
                    None
                }
            },
            None => None,
        };

        InferenceOutput {
            detections,
            annotated_image,
        }
    }
}

#[async_trait]
impl Detector for HttpDetector {
    async fn detect(
        &self,
        image: &DynamicImage,
        options: &InferenceOptions,
    ) -> Result<InferenceOutput, DetectorError> {
        let prepared = fit_to_max_dimension(image, options.image_max_dimension);
        let request = DetectRequest {
            image_base64: encode_png_base64(&prepared)?,
            imgsz: options.inference_size,
            conf: options.confidence_floor,
            iou: options.iou_threshold,
            augment: options.augment,
        };

        let url = format!("{}/detect", self.base_url);
        debug!(%url, width = prepared.width(), height = prepared.height(), "sending detect request");

        let response = self.client.post(&url).json(&request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            // 503 is what the server answers while the model is not loaded
            if status == reqwest::StatusCode::SERVICE_UNAVAILABLE {
                return Err(DetectorError::Unavailable(body));
            }
            return Err(DetectorError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let data: DetectResponse = response
            .json()
            .await
            .map_err(|e| DetectorError::InvalidResponse(e.to_string()))?;

        let output = Self::parse_response(data);
        debug!(count = output.detections.len(), "detect response parsed");
        Ok(output)
    }

    async fn health_check(&self) -> Result<(), DetectorError> {
        let url = format!("{}/health", self.base_url);
        let response = self.client.get(&url).send().await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(DetectorError::Unavailable(format!(
                "health check returned {}",
                response.status()
            )))
        }
    }
}
