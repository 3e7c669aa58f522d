use crate::models::detection::Detection;

/// Primary operating point for cart acceptance
pub const DEFAULT_ACCEPTANCE_THRESHOLD: f32 = 0.70;

/// Keep detections whose confidence is at least `threshold`.
///
/// Non-finite confidences never pass.
pub fn filter(detections: &[Detection], threshold: f32) -> Vec<Detection> {
    let gate = DetectionFilter::new(threshold);
    detections
        .iter()
        .filter(|d| gate.accepts(d))
        .cloned()
        .collect()
}

/// The single gate between raw detector output and the cart
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionFilter {
    threshold: f32,
}

impl DetectionFilter {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Split detections into (accepted, rejected count)
    pub fn apply(&self, detections: Vec<Detection>) -> (Vec<Detection>, usize) {
        let total = detections.len();
        let accepted: Vec<Detection> = detections
            .into_iter()
            .filter(|d| self.accepts(d))
            .collect();
        let rejected = total - accepted.len();
        (accepted, rejected)
    }

    pub fn accepts(&self, detection: &Detection) -> bool {
        detection.confidence.is_finite() && detection.confidence >= self.threshold
    }
}

impl Default for DetectionFilter {
    fn default() -> Self {
        Self::new(DEFAULT_ACCEPTANCE_THRESHOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Detection> {
        vec![
            Detection::new("croissant", 0.95),
            Detection::new("muffin", 0.70),
            Detection::new("pie", 0.69),
            Detection::new("cookie", 0.12),
            Detection::new("salt_bread", 0.81),
        ]
    }

    #[test]
    fn test_filter_keeps_exactly_those_at_or_above_threshold() {
        let detections = sample();
        let kept = filter(&detections, 0.70);

        assert!(kept.len() <= detections.len());
        assert!(kept.iter().all(|d| d.confidence >= 0.70));
        assert!(kept.iter().all(|d| detections.contains(d)));

        let dropped: Vec<_> = detections.iter().filter(|d| !kept.contains(d)).collect();
        assert!(dropped.iter().all(|d| d.confidence < 0.70));

        let ids: Vec<_> = kept.iter().map(|d| d.item_id.as_str()).collect();
        assert_eq!(ids, vec!["croissant", "muffin", "salt_bread"]);
    }

    #[test]
    fn test_filter_boundary_is_inclusive() {
        let kept = filter(&[Detection::new("pie", 0.5)], 0.5);
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn test_filter_empty_input() {
        assert!(filter(&[], 0.70).is_empty());
    }

    #[test]
    fn test_filter_rejects_nan() {
        let kept = filter(&[Detection::new("pie", f32::NAN)], 0.0);
        assert!(kept.is_empty());
    }

    #[test]
    fn test_alternate_operating_point() {
        let detections = sample();
        assert_eq!(filter(&detections, 0.50).len(), 4);
    }

    #[test]
    fn test_detection_filter_apply_counts_rejections() {
        let gate = DetectionFilter::default();
        assert_eq!(gate.threshold(), 0.70);

        let (accepted, rejected) = gate.apply(sample());
        assert_eq!(accepted.len(), 3);
        assert_eq!(rejected, 2);
        assert_eq!(accepted, filter(&sample(), 0.70));
    }

    #[test]
    fn test_filter_and_gate_agree_on_every_detection() {
        let mut detections = sample();
        detections.push(Detection::new("pie", f32::NAN));
        detections.push(Detection::new("pie", f32::INFINITY));

        for threshold in [0.0, 0.5, 0.70, 1.0] {
            let gate = DetectionFilter::new(threshold);
            let kept = filter(&detections, threshold);
            let expected: Vec<_> = detections.iter().filter(|d| gate.accepts(d)).cloned().collect();
            assert_eq!(kept, expected, "threshold {}", threshold);
        }
    }
}
