use image::DynamicImage;
use serde::{Deserialize, Serialize};

/// One candidate object reported by the detector for a single image
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Detection {
    pub item_id: String,
    pub confidence: f32,
    /// Box corners (x1, y1, x2, y2) in source pixels, when the server reports them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<[f32; 4]>,
}

impl Detection {
    pub fn new(item_id: impl Into<String>, confidence: f32) -> Self {
        Self {
            item_id: item_id.into(),
            confidence,
            bbox: None,
        }
    }

    pub fn with_bbox(mut self, bbox: [f32; 4]) -> Self {
        self.bbox = Some(bbox);
        self
    }
}

/// Operating configuration handed to the inference collaborator.
///
/// `confidence_floor` is a pre-filter at the model boundary and is kept well
/// below the cart acceptance threshold.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InferenceOptions {
    pub image_max_dimension: u32,
    pub inference_size: u32,
    pub confidence_floor: f32,
    pub iou_threshold: f32,
    pub augment: bool,
}

impl Default for InferenceOptions {
    fn default() -> Self {
        Self {
            image_max_dimension: 1280,
            inference_size: 640,
            confidence_floor: 0.1,
            iou_threshold: 0.45,
            augment: true,
        }
    }
}

/// Result of one inference call
#[derive(Debug, Clone, Default)]
pub struct InferenceOutput {
    pub detections: Vec<Detection>,
    /// Image with boxes drawn by the detector, if it rendered one
    pub annotated_image: Option<DynamicImage>,
}

impl InferenceOutput {
    pub fn new(detections: Vec<Detection>) -> Self {
        Self {
            detections,
            annotated_image: None,
        }
    }
}
