use crate::error::{ConfigError, DetectorError, ScanError};
use crate::models::cart::Cart;
use crate::models::catalog::ItemCatalog;
use crate::models::config::AppConfig;
use crate::models::detection::{InferenceOptions, InferenceOutput};
use crate::models::order::{CartLine, OrderPhase, OrderSummary, PaymentReceipt};
use crate::services::cart_aggregator;
use crate::services::clock::{Clock, TokioClock};
use crate::services::detection_filter::DetectionFilter;
use crate::services::inference::preprocessing::is_blank;
use crate::services::inference::Detector;
use crate::services::pricing;
use chrono::Utc;
use image::DynamicImage;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch, Mutex};
use tracing::{debug, error, info, warn};

/// Everything the presentation layer needs to render the order.
///
/// Views are snapshots; mutating one never touches the session cart.
#[derive(Clone, Serialize)]
pub struct SessionView {
    #[serde(skip)]
    pub annotated_image: Option<Arc<DynamicImage>>,
    pub cart: Cart,
    pub lines: Vec<CartLine>,
    pub summary: OrderSummary,
    pub phase: OrderPhase,
    pub payment_notice: Option<PaymentReceipt>,
}

impl fmt::Debug for SessionView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionView")
            .field(
                "annotated_image",
                &self.annotated_image.as_ref().map(|i| (i.width(), i.height())),
            )
            .field("cart", &self.cart)
            .field("summary", &self.summary)
            .field("phase", &self.phase)
            .field("payment_notice", &self.payment_notice.is_some())
            .finish()
    }
}

/// What a successful scan did to the cart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScanStatus {
    /// At least one detection passed the acceptance threshold
    Merged { accepted: usize, rejected: usize },
    /// Inference ran but nothing was confident enough
    NothingAccepted { rejected: usize },
    /// No usable image was supplied
    EmptyImage,
}

#[derive(Debug, Clone)]
pub struct ScanReport {
    pub status: ScanStatus,
    pub view: SessionView,
}

#[derive(Debug, Clone)]
pub enum PayOutcome {
    Completed {
        receipt: PaymentReceipt,
        view: SessionView,
    },
    /// Cart was empty; no delay, no signal
    NothingToPay { view: SessionView },
    /// A reset arrived during settlement
    Cancelled { view: SessionView },
}

impl PayOutcome {
    pub fn view(&self) -> &SessionView {
        match self {
            Self::Completed { view, .. } | Self::NothingToPay { view } | Self::Cancelled { view } => {
                view
            }
        }
    }

    pub fn receipt(&self) -> Option<&PaymentReceipt> {
        match self {
            Self::Completed { receipt, .. } => Some(receipt),
            _ => None,
        }
    }
}

/// Notifications for subscribers of the session
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    CartUpdated { summary: OrderSummary },
    PaymentCompleted { receipt: PaymentReceipt },
    Reset,
}

/// Mutable order state, guarded by the session lock
#[derive(Default)]
struct OrderState {
    cart: Cart,
    annotated_image: Option<Arc<DynamicImage>>,
    payment_notice: Option<PaymentReceipt>,
    orders_paid: u64,
}

/// Puts the phase back to `Active` if a payment is dropped before it settles
/// or is cancelled. The cart is untouched in that case.
struct PayingGuard<'a> {
    phase: &'a parking_lot::Mutex<OrderPhase>,
    armed: bool,
}

impl<'a> PayingGuard<'a> {
    fn new(phase: &'a parking_lot::Mutex<OrderPhase>) -> Self {
        Self { phase, armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for PayingGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            debug!("payment abandoned before settlement");
            *self.phase.lock() = OrderPhase::Active;
        }
    }
}

/// One customer's order at the till.
///
/// `scan`, `pay` and `reset` are serialized through a single async lock:
/// a scan holds it across inference, a payment across settlement and
/// clearing. `reset` raises the cancellation epoch before locking so that a
/// payment in progress gives the lock up promptly.
pub struct OrderSession {
    catalog: Arc<ItemCatalog>,
    detector: Option<Arc<dyn Detector>>,
    filter: DetectionFilter,
    options: InferenceOptions,
    settlement_delay: Duration,
    clock: Arc<dyn Clock>,
    state: Mutex<OrderState>,
    phase: parking_lot::Mutex<OrderPhase>,
    cancel: watch::Sender<u64>,
    events: broadcast::Sender<SessionEvent>,
}

impl OrderSession {
    /// Session with no detector, the default operating point and a 2 s settlement
    pub fn new(catalog: Arc<ItemCatalog>) -> Self {
        let (cancel, _) = watch::channel(0);
        let (events, _) = broadcast::channel(32);

        Self {
            catalog,
            detector: None,
            filter: DetectionFilter::default(),
            options: InferenceOptions::default(),
            settlement_delay: Duration::from_secs(2),
            clock: Arc::new(TokioClock),
            state: Mutex::new(OrderState::default()),
            phase: parking_lot::Mutex::new(OrderPhase::Empty),
            cancel,
            events,
        }
    }

    /// Build a session from application config
    pub fn from_config(
        config: &AppConfig,
        detector: Option<Arc<dyn Detector>>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let catalog = ItemCatalog::from_entries(config.catalog.clone())?;

        let mut session = Self::new(Arc::new(catalog))
            .with_threshold(config.acceptance.threshold)
            .with_inference_options(config.inference.options())
            .with_settlement_delay(config.payment.settlement_delay());
        session.detector = detector;
        Ok(session)
    }

    pub fn with_detector(mut self, detector: Arc<dyn Detector>) -> Self {
        self.detector = Some(detector);
        self
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.filter = DetectionFilter::new(threshold);
        self
    }

    pub fn with_inference_options(mut self, options: InferenceOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_settlement_delay(mut self, delay: Duration) -> Self {
        self.settlement_delay = delay;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn catalog(&self) -> &ItemCatalog {
        &self.catalog
    }

    pub fn threshold(&self) -> f32 {
        self.filter.threshold()
    }

    /// Current phase, readable while a payment holds the cart
    pub fn phase(&self) -> OrderPhase {
        *self.phase.lock()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Snapshot of the current order
    pub async fn view(&self) -> SessionView {
        let state = self.state.lock().await;
        self.view_of(&state)
    }

    /// Take the pending "payment complete" notice, if any
    pub async fn take_payment_notice(&self) -> Option<PaymentReceipt> {
        self.state.lock().await.payment_notice.take()
    }

    /// Run one image through inference, the acceptance filter and the cart.
    ///
    /// The cart is only replaced once a merged copy is complete, so a failed
    /// scan leaves it exactly as it was.
    pub async fn scan(&self, image: Option<&DynamicImage>) -> Result<ScanReport, ScanError> {
        let mut state = self.state.lock().await;

        let Some(detector) = self.detector.as_ref() else {
            warn!("scan requested but no detector is configured");
            return Err(ScanError::Unavailable {
                view: self.view_of(&state),
            });
        };

        let image = match image {
            Some(image) if !is_blank(image) => image,
            _ => {
                debug!("scan without a usable image");
                return Ok(ScanReport {
                    status: ScanStatus::EmptyImage,
                    view: self.view_of(&state),
                });
            }
        };

        let output = match self.run_inference(Arc::clone(detector), image).await {
            Ok(output) => output,
            Err(DetectorError::InvalidImage(reason)) => {
                debug!(%reason, "detector rejected image, treating as empty");
                return Ok(ScanReport {
                    status: ScanStatus::EmptyImage,
                    view: self.view_of(&state),
                });
            }
            Err(e) if e.is_unavailable() => {
                warn!(error = %e, "detector unavailable");
                return Err(ScanError::Unavailable {
                    view: self.view_of(&state),
                });
            }
            Err(e) => {
                error!(error = %e, "scan failed");
                return Err(ScanError::Failed {
                    message: e.to_string(),
                    view: self.view_of(&state),
                });
            }
        };

        let total = output.detections.len();
        let (accepted, rejected) = self.filter.apply(output.detections);
        debug!(
            total,
            accepted = accepted.len(),
            rejected,
            threshold = self.filter.threshold(),
            "detections filtered"
        );

        for detection in accepted.iter().filter(|d| !self.catalog.contains(&d.item_id)) {
            warn!(item_id = %detection.item_id, "item not in catalog, pricing at 0");
        }

        state.cart = cart_aggregator::merge(&state.cart, &accepted);
        state.annotated_image = output.annotated_image.map(Arc::new);
        self.sync_phase(&state.cart);

        let status = if accepted.is_empty() {
            ScanStatus::NothingAccepted { rejected }
        } else {
            let summary = pricing::summarize(&state.cart, &self.catalog);
            let _ = self.events.send(SessionEvent::CartUpdated { summary });
            ScanStatus::Merged {
                accepted: accepted.len(),
                rejected,
            }
        };

        Ok(ScanReport {
            status,
            view: self.view_of(&state),
        })
    }

    /// Settle the order: wait out the settlement delay while holding the
    /// cart, then clear it and signal completion once.
    pub async fn pay(&self) -> PayOutcome {
        // Subscribe before locking so a reset issued while we wait for the lock still cancels
        let mut cancel_rx = self.cancel.subscribe();
        let mut state = self.state.lock().await;

        if state.cart.is_empty() {
            state.payment_notice = None;
            return PayOutcome::NothingToPay {
                view: self.view_of(&state),
            };
        }

        self.set_phase(OrderPhase::Paying);
        // Declared after `state` so it runs while the lock is still held
        let mut paying = PayingGuard::new(&self.phase);
        let summary = pricing::summarize(&state.cart, &self.catalog);
        info!(
            total_quantity = summary.total_quantity,
            total_price = summary.total_price,
            "payment started"
        );

        let cancelled = tokio::select! {
            biased;
            _ = cancel_rx.changed() => true,
            _ = self.clock.sleep(self.settlement_delay) => false,
        };

        paying.disarm();

        if cancelled {
            info!("payment cancelled by reset");
            self.sync_phase(&state.cart);
            return PayOutcome::Cancelled {
                view: self.view_of(&state),
            };
        }

        state.orders_paid += 1;
        let receipt = PaymentReceipt {
            order_number: state.orders_paid,
            lines: pricing::lines(&state.cart, &self.catalog),
            summary,
            paid_at: Utc::now(),
        };

        state.cart.clear();
        state.payment_notice = Some(receipt.clone());
        self.set_phase(OrderPhase::Empty);

        info!(order_number = receipt.order_number, "payment completed");
        let _ = self.events.send(SessionEvent::PaymentCompleted {
            receipt: receipt.clone(),
        });

        PayOutcome::Completed {
            receipt,
            view: self.view_of(&state),
        }
    }

    /// Abandon the order from any phase
    pub async fn reset(&self) -> SessionView {
        self.cancel.send_modify(|epoch| *epoch = epoch.wrapping_add(1));

        let mut state = self.state.lock().await;
        state.cart.clear();
        state.annotated_image = None;
        state.payment_notice = None;
        self.set_phase(OrderPhase::Empty);

        info!("order reset");
        let _ = self.events.send(SessionEvent::Reset);

        self.view_of(&state)
    }

    /// Run the detector on its own task so a panicking collaborator surfaces
    /// as an error instead of unwinding through the session
    async fn run_inference(
        &self,
        detector: Arc<dyn Detector>,
        image: &DynamicImage,
    ) -> Result<InferenceOutput, DetectorError> {
        let image = image.clone();
        let options = self.options.clone();

        tokio::spawn(async move { detector.detect(&image, &options).await })
            .await
            .map_err(|e| DetectorError::Request(format!("Inference task failed: {}", e)))?
    }

    fn view_of(&self, state: &OrderState) -> SessionView {
        SessionView {
            annotated_image: state.annotated_image.clone(),
            cart: state.cart.clone(),
            lines: pricing::lines(&state.cart, &self.catalog),
            summary: pricing::summarize(&state.cart, &self.catalog),
            phase: self.phase(),
            payment_notice: state.payment_notice.clone(),
        }
    }

    fn set_phase(&self, phase: OrderPhase) {
        *self.phase.lock() = phase;
    }

    fn sync_phase(&self, cart: &Cart) {
        self.set_phase(if cart.is_empty() {
            OrderPhase::Empty
        } else {
            OrderPhase::Active
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::catalog::CatalogEntry;
    use crate::models::detection::Detection;
    use crate::services::clock::ImmediateClock;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::time::Instant;
    use tokio::sync::broadcast::error::TryRecvError;
    use tokio_test::{assert_err, assert_ok};

    /// Replays queued results, then returns no detections
    struct ScriptedDetector {
        script: parking_lot::Mutex<VecDeque<Result<Vec<Detection>, DetectorError>>>,
    }

    impl ScriptedDetector {
        fn new(script: Vec<Result<Vec<Detection>, DetectorError>>) -> Arc<Self> {
            Arc::new(Self {
                script: parking_lot::Mutex::new(script.into()),
            })
        }

        fn always(detections: Vec<Detection>) -> Arc<Self> {
            Self::new((0..16).map(|_| Ok(detections.clone())).collect())
        }
    }

    #[async_trait]
    impl Detector for ScriptedDetector {
        async fn detect(
            &self,
            _image: &DynamicImage,
            _options: &InferenceOptions,
        ) -> Result<InferenceOutput, DetectorError> {
            let next = self.script.lock().pop_front().unwrap_or_else(|| Ok(vec![]));
            next.map(|detections| InferenceOutput {
                detections,
                annotated_image: Some(DynamicImage::new_rgb8(2, 2)),
            })
        }
    }

    struct PanickingDetector;

    #[async_trait]
    impl Detector for PanickingDetector {
        async fn detect(
            &self,
            _image: &DynamicImage,
            _options: &InferenceOptions,
        ) -> Result<InferenceOutput, DetectorError> {
            panic!("model exploded");
        }
    }

    fn frame() -> DynamicImage {
        DynamicImage::new_rgb8(8, 8)
    }

    fn catalog() -> Arc<ItemCatalog> {
        Arc::new(
            ItemCatalog::from_entries(vec![
                CatalogEntry::new("croissant", "오리지널크라상", 3200),
                CatalogEntry::new("muffin", "초코청크머핀", 4500),
            ])
            .unwrap(),
        )
    }

    fn session_with(detector: Arc<dyn Detector>) -> OrderSession {
        OrderSession::new(catalog())
            .with_detector(detector)
            .with_clock(Arc::new(ImmediateClock))
    }

    fn loaded_scan() -> Vec<Detection> {
        vec![
            Detection::new("croissant", 0.93),
            Detection::new("croissant", 0.71),
            Detection::new("muffin", 0.88),
            Detection::new("muffin", 0.40),
        ]
    }

    async fn wait_for_phase(session: &OrderSession, phase: OrderPhase) {
        for _ in 0..200 {
            if session.phase() == phase {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("session never reached {:?}", phase);
    }

    #[tokio::test]
    async fn test_new_session_is_empty() {
        let session = OrderSession::new(catalog());
        assert_eq!(session.phase(), OrderPhase::Empty);
        assert_eq!(session.threshold(), 0.70);

        let view = session.view().await;
        assert!(view.cart.is_empty());
        assert_eq!(view.summary, OrderSummary::default());
        assert!(view.payment_notice.is_none());
    }

    #[tokio::test]
    async fn test_scan_filters_and_merges() {
        let session = session_with(ScriptedDetector::always(loaded_scan()));

        let report = assert_ok!(session.scan(Some(&frame())).await);
        assert_eq!(
            report.status,
            ScanStatus::Merged {
                accepted: 3,
                rejected: 1
            }
        );
        assert_eq!(report.view.cart.quantity_of("croissant"), 2);
        assert_eq!(report.view.cart.quantity_of("muffin"), 1);
        assert_eq!(report.view.summary.total_quantity, 3);
        assert_eq!(report.view.summary.total_price, 10900);
        assert_eq!(report.view.phase, OrderPhase::Active);
        assert!(report.view.annotated_image.is_some());
        assert_eq!(session.phase(), OrderPhase::Active);
    }

    #[tokio::test]
    async fn test_repeated_scan_accumulates() {
        let session = session_with(ScriptedDetector::always(loaded_scan()));

        assert_ok!(session.scan(Some(&frame())).await);
        let report = assert_ok!(session.scan(Some(&frame())).await);

        assert_eq!(report.view.cart.quantity_of("croissant"), 4);
        assert_eq!(report.view.cart.quantity_of("muffin"), 2);
    }

    #[tokio::test]
    async fn test_scan_with_nothing_confident_keeps_cart() {
        let detector = ScriptedDetector::new(vec![
            Ok(vec![Detection::new("muffin", 0.9)]),
            Ok(vec![Detection::new("croissant", 0.2)]),
        ]);
        let session = session_with(detector);

        assert_ok!(session.scan(Some(&frame())).await);
        let report = assert_ok!(session.scan(Some(&frame())).await);

        assert_eq!(report.status, ScanStatus::NothingAccepted { rejected: 1 });
        assert_eq!(report.view.cart.quantity_of("muffin"), 1);
        assert_eq!(report.view.cart.len(), 1);
        assert_eq!(report.view.summary.total_price, 4500);
    }

    #[tokio::test]
    async fn test_scan_on_empty_session_with_no_detections_stays_empty() {
        let session = session_with(ScriptedDetector::new(vec![Ok(vec![])]));

        let report = assert_ok!(session.scan(Some(&frame())).await);
        assert_eq!(report.status, ScanStatus::NothingAccepted { rejected: 0 });
        assert_eq!(session.phase(), OrderPhase::Empty);
    }

    #[tokio::test]
    async fn test_scan_without_detector_is_unavailable() {
        let session = OrderSession::new(catalog());

        let err = assert_err!(session.scan(Some(&frame())).await);
        assert!(matches!(err, ScanError::Unavailable { .. }));
        assert!(err.view().cart.is_empty());
    }

    #[tokio::test]
    async fn test_scan_without_image_is_no_op() {
        let session = session_with(ScriptedDetector::always(loaded_scan()));

        let report = assert_ok!(session.scan(None).await);
        assert_eq!(report.status, ScanStatus::EmptyImage);

        let blank = DynamicImage::new_rgb8(0, 0);
        let report = assert_ok!(session.scan(Some(&blank)).await);
        assert_eq!(report.status, ScanStatus::EmptyImage);
        assert!(report.view.cart.is_empty());
    }

    #[tokio::test]
    async fn test_detector_rejecting_image_is_treated_as_empty() {
        let detector = ScriptedDetector::new(vec![Err(DetectorError::InvalidImage(
            "corrupt".to_string(),
        ))]);
        let session = session_with(detector);

        let report = assert_ok!(session.scan(Some(&frame())).await);
        assert_eq!(report.status, ScanStatus::EmptyImage);
    }

    #[tokio::test]
    async fn test_unreachable_detector_leaves_cart() {
        let detector = ScriptedDetector::new(vec![
            Ok(vec![Detection::new("croissant", 0.9)]),
            Err(DetectorError::Unavailable("connection refused".to_string())),
        ]);
        let session = session_with(detector);
        assert_ok!(session.scan(Some(&frame())).await);

        let err = assert_err!(session.scan(Some(&frame())).await);
        assert!(matches!(err, ScanError::Unavailable { .. }));
        assert_eq!(err.view().cart.quantity_of("croissant"), 1);
        assert_eq!(session.phase(), OrderPhase::Active);
    }

    #[tokio::test]
    async fn test_failed_scan_does_not_partially_merge() {
        let detector = ScriptedDetector::new(vec![
            Ok(vec![Detection::new("muffin", 0.9)]),
            Err(DetectorError::Server {
                status: 500,
                body: "boom".to_string(),
            }),
        ]);
        let session = session_with(detector);
        let before = assert_ok!(session.scan(Some(&frame())).await).view.cart;

        let err = assert_err!(session.scan(Some(&frame())).await);
        match &err {
            ScanError::Failed { message, view } => {
                assert!(message.contains("500"));
                assert_eq!(view.cart, before);
            }
            other => panic!("expected Failed, got {:?}", other),
        }
        assert_eq!(session.view().await.cart, before);
    }

    #[tokio::test]
    async fn test_panicking_detector_is_contained() {
        let session = session_with(Arc::new(PanickingDetector));

        let err = assert_err!(session.scan(Some(&frame())).await);
        assert!(matches!(err, ScanError::Failed { .. }));
        assert!(session.view().await.cart.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_item_is_kept_at_zero_price() {
        let detector = ScriptedDetector::always(vec![
            Detection::new("baguette", 0.99),
            Detection::new("croissant", 0.99),
        ]);
        let session = session_with(detector);

        let report = assert_ok!(session.scan(Some(&frame())).await);
        assert_eq!(report.view.cart.quantity_of("baguette"), 1);
        assert_eq!(report.view.summary.total_quantity, 2);
        assert_eq!(report.view.summary.total_price, 3200);

        let line = report.view.lines.iter().find(|l| l.item_id == "baguette").unwrap();
        assert_eq!(line.display_name, "baguette");
    }

    #[tokio::test]
    async fn test_pay_clears_and_signals_once() {
        let session = session_with(ScriptedDetector::always(loaded_scan()));
        let mut events = session.subscribe();
        assert_ok!(session.scan(Some(&frame())).await);

        let outcome = session.pay().await;
        let receipt = outcome.receipt().cloned().expect("payment should complete");
        assert_eq!(receipt.order_number, 1);
        assert_eq!(receipt.summary.total_price, 10900);
        assert_eq!(receipt.lines.len(), 2);
        assert!(outcome.view().cart.is_empty());
        assert_eq!(outcome.view().phase, OrderPhase::Empty);
        assert_eq!(outcome.view().payment_notice.as_ref(), Some(&receipt));

        let second = session.pay().await;
        assert!(matches!(second, PayOutcome::NothingToPay { .. }));

        let mut completions = 0;
        loop {
            match events.try_recv() {
                Ok(SessionEvent::PaymentCompleted { .. }) => completions += 1,
                Ok(_) => {}
                Err(TryRecvError::Empty) => break,
                Err(e) => panic!("unexpected channel state: {:?}", e),
            }
        }
        assert_eq!(completions, 1);
    }

    #[tokio::test]
    async fn test_pay_on_empty_cart_skips_delay() {
        let session = OrderSession::new(catalog()).with_settlement_delay(Duration::from_secs(30));

        let start = Instant::now();
        let outcome = session.pay().await;
        assert!(matches!(outcome, PayOutcome::NothingToPay { .. }));
        assert!(start.elapsed() < Duration::from_secs(1));
        assert!(session.take_payment_notice().await.is_none());
    }

    #[tokio::test]
    async fn test_pay_waits_for_settlement() {
        let session = OrderSession::new(catalog())
            .with_detector(ScriptedDetector::always(loaded_scan()))
            .with_settlement_delay(Duration::from_millis(50));
        assert_ok!(session.scan(Some(&frame())).await);

        let start = Instant::now();
        let outcome = session.pay().await;
        assert!(outcome.receipt().is_some());
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_payment_notice_is_one_shot() {
        let session = session_with(ScriptedDetector::always(loaded_scan()));
        assert_ok!(session.scan(Some(&frame())).await);
        session.pay().await;

        assert!(session.take_payment_notice().await.is_some());
        assert!(session.take_payment_notice().await.is_none());
    }

    #[tokio::test]
    async fn test_order_numbers_increase() {
        let session = session_with(ScriptedDetector::always(loaded_scan()));

        assert_ok!(session.scan(Some(&frame())).await);
        let first = session.pay().await;
        assert_ok!(session.scan(Some(&frame())).await);
        let second = session.pay().await;

        assert_eq!(first.receipt().map(|r| r.order_number), Some(1));
        assert_eq!(second.receipt().map(|r| r.order_number), Some(2));
    }

    #[tokio::test]
    async fn test_reset_from_empty_and_active() {
        let session = session_with(ScriptedDetector::always(loaded_scan()));

        let view = session.reset().await;
        assert!(view.cart.is_empty());
        assert_eq!(view.phase, OrderPhase::Empty);

        assert_ok!(session.scan(Some(&frame())).await);
        assert_eq!(session.phase(), OrderPhase::Active);

        let view = session.reset().await;
        assert!(view.cart.is_empty());
        assert!(view.annotated_image.is_none());
        assert_eq!(view.phase, OrderPhase::Empty);
    }

    #[tokio::test]
    async fn test_reset_clears_payment_notice() {
        let session = session_with(ScriptedDetector::always(loaded_scan()));
        assert_ok!(session.scan(Some(&frame())).await);
        session.pay().await;

        let view = session.reset().await;
        assert!(view.payment_notice.is_none());
        assert!(session.take_payment_notice().await.is_none());
    }

    #[tokio::test]
    async fn test_reset_cancels_payment_in_progress() {
        let session = Arc::new(
            OrderSession::new(catalog())
                .with_detector(ScriptedDetector::always(loaded_scan()))
                .with_settlement_delay(Duration::from_secs(30)),
        );
        let mut events = session.subscribe();
        assert_ok!(session.scan(Some(&frame())).await);

        let paying = Arc::clone(&session);
        let start = Instant::now();
        let payment = tokio::spawn(async move { paying.pay().await });

        wait_for_phase(&session, OrderPhase::Paying).await;
        let view = session.reset().await;

        let outcome = payment.await.unwrap();
        assert!(matches!(outcome, PayOutcome::Cancelled { .. }));
        assert!(start.elapsed() < Duration::from_secs(5));

        assert!(view.cart.is_empty());
        assert_eq!(session.phase(), OrderPhase::Empty);
        assert!(session.take_payment_notice().await.is_none());

        while let Ok(event) = events.try_recv() {
            assert!(!matches!(event, SessionEvent::PaymentCompleted { .. }));
        }
    }

    #[tokio::test]
    async fn test_abandoned_payment_returns_to_active() {
        let session = OrderSession::new(catalog())
            .with_detector(ScriptedDetector::new(vec![Ok(vec![Detection::new(
                "croissant",
                0.9,
            )])]))
            .with_settlement_delay(Duration::from_secs(30));
        let mut events = session.subscribe();
        assert_ok!(session.scan(Some(&frame())).await);

        let timed_out =
            tokio::time::timeout(Duration::from_millis(50), session.pay()).await;
        assert_err!(timed_out);

        assert_eq!(session.phase(), OrderPhase::Active);
        let view = session.view().await;
        assert_eq!(view.phase, OrderPhase::Active);
        assert_eq!(view.cart.quantity_of("croissant"), 1);
        assert!(view.payment_notice.is_none());

        while let Ok(event) = events.try_recv() {
            assert!(!matches!(event, SessionEvent::PaymentCompleted { .. }));
        }

        // The till is still usable: a later payment settles normally
        let session = session.with_clock(Arc::new(ImmediateClock));
        let outcome = session.pay().await;
        assert!(outcome.receipt().is_some());
        assert_eq!(session.phase(), OrderPhase::Empty);
    }

    #[tokio::test]
    async fn test_scan_waits_for_payment_to_finish() {
        let session = Arc::new(
            OrderSession::new(catalog())
                .with_detector(ScriptedDetector::new(vec![
                    Ok(vec![Detection::new("croissant", 0.9)]),
                    Ok(vec![Detection::new("muffin", 0.9)]),
                ]))
                .with_settlement_delay(Duration::from_millis(100)),
        );
        assert_ok!(session.scan(Some(&frame())).await);

        let paying = Arc::clone(&session);
        let payment = tokio::spawn(async move { paying.pay().await });
        wait_for_phase(&session, OrderPhase::Paying).await;

        let report = assert_ok!(session.scan(Some(&frame())).await);
        let outcome = payment.await.unwrap();

        // The paid order holds only what was in the cart when payment began
        let receipt = outcome.receipt().expect("payment should complete");
        assert_eq!(receipt.lines.len(), 1);
        assert_eq!(receipt.lines[0].item_id, "croissant");

        assert_eq!(report.view.cart.quantity_of("muffin"), 1);
        assert_eq!(report.view.cart.quantity_of("croissant"), 0);
    }

    #[test]
    fn test_from_config_applies_operating_point() {
        let mut config = AppConfig::default();
        config.acceptance.threshold = 0.5;

        let session = OrderSession::from_config(&config, None).unwrap();
        assert_eq!(session.threshold(), 0.5);
        assert_eq!(session.catalog().len(), 7);
    }

    #[test]
    fn test_from_config_rejects_invalid_catalog() {
        let mut config = AppConfig::default();
        config.catalog.push(CatalogEntry::new("pie", "Another pie", 1));

        assert!(OrderSession::from_config(&config, None).is_err());
    }

    #[test]
    fn test_session_works_on_block_on_runtime() {
        let session = session_with(ScriptedDetector::always(loaded_scan()));
        let report = tokio_test::block_on(session.scan(Some(&frame()))).unwrap();
        assert_eq!(report.view.summary.total_quantity, 3);
    }
}
