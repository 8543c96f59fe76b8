//! The perception dispatcher: one owned context shared by the ingestion
//! callbacks, the periodic detection cycle and on-demand checks.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use anyhow::{Context, Result};
use crossbeam_channel::{bounded, select, tick, Receiver};
use parking_lot::Mutex;
use crate::aggregator::DetectionAggregator;
use crate::check_protocol::{CheckForObjects, CheckHandle, CheckTicket};
use crate::common::{
    BoundingBoxes, BvrDetection, BvrImage, ClassBucket, CompiledMessage, DispatchConfig, FusedDetection, SourceCloud,
};
use crate::data::send_channels::publish_channels;
use crate::data::{CheckOutcome, PublishReceivers, SourceId, TimeCalc, CROSS_MARK};
use crate::detection_runners::DetectionEngine;
use crate::fusion::fuse_with_cloud;
use crate::ingestion::{CloudSlots, FrameSlot};
use crate::publisher::ResultPublisher;

/// Summary of one completed detection cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub frame_seq: u64,
    pub objects: usize,
    /// `(label, count)` for every class seen this cycle.
    pub per_class: Vec<(String, usize)>,
    pub fused_sources: Vec<SourceId>,
    pub published: usize,
    pub elapsed: Duration,
}

/// Engine and aggregator share a lock so infer + aggregate is one step.
struct DetectionContext {
    engine: Box<dyn DetectionEngine>,
    aggregator: DetectionAggregator,
}

/// Immutable result of infer + aggregate, read by fusion and publication
/// after the engine lock is released.
struct Detected {
    frame: Arc<BvrImage>,
    buckets: Vec<ClassBucket>,
    boxes: BoundingBoxes,
}

impl Detected {
    fn detections(&self) -> Vec<BvrDetection> {
        self.buckets
            .iter()
            .flat_map(|bucket| bucket.detections().iter().cloned())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum CloudUse {
    /// Periodic cycles consume each cloud so it is fused once.
    Take,
    /// On-demand checks leave clouds for the periodic stream.
    Peek,
}

pub struct Dispatcher {
    config: Arc<DispatchConfig>,
    detection: Mutex<DetectionContext>,
    frames: FrameSlot,
    clouds: CloudSlots,
    check: Arc<CheckForObjects>,
    publisher: ResultPublisher,
    last_cycle_seq: Mutex<u64>,
    cycle_time: Mutex<TimeCalc>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("config", &self.config)
            .field("checking", &self.check.is_active())
            .field("publisher", &self.publisher)
            .finish()
    }
}

impl Dispatcher {
    /// Builds a dispatcher around an already loaded engine, taking class
    /// names from `class_names` or `labels_path`.
    pub fn new<E: DetectionEngine + 'static>(config: DispatchConfig, engine: E) -> Result<(Self, PublishReceivers)> {
        let class_names = config
            .configured_class_names()?
            .with_context(|| format!("{CROSS_MARK} No class names configured"))?;
        Self::with_class_names(config, class_names, engine)
    }

    pub fn with_class_names<E: DetectionEngine + 'static>(
        config: DispatchConfig,
        class_names: Vec<String>,
        engine: E,
    ) -> Result<(Self, PublishReceivers)> {
        config.validate()?;
        if class_names.is_empty() {
            anyhow::bail!("{CROSS_MARK} No class names configured");
        }
        if engine.num_classes() != class_names.len() {
            anyhow::bail!(
                "{CROSS_MARK} Class count mismatch: engine reports {} classes but {} class names are configured",
                engine.num_classes(),
                class_names.len()
            );
        }

        let (senders, receivers) = publish_channels(config.publish_queue_depth);
        let publisher = ResultPublisher::new(senders, config.font_path.as_deref(), config.publish_detection_image)?;

        log::info!("bvr_perception: dispatcher ready | Classes: {}\n{}", class_names.len(), config.summary());

        let dispatcher = Self {
            detection: Mutex::new(DetectionContext {
                engine: Box::new(engine),
                aggregator: DetectionAggregator::new(&class_names),
            }),
            frames: FrameSlot::new(),
            clouds: CloudSlots::new(config.point_cloud_sources),
            check: Arc::new(CheckForObjects::new()),
            publisher,
            last_cycle_seq: Mutex::new(0),
            cycle_time: Mutex::new(TimeCalc::default()),
            config: Arc::new(config),
        };
        Ok((dispatcher, receivers))
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Stores the newest camera frame and returns its sequence number.
    pub fn on_frame(&self, frame: impl Into<BvrImage>) -> u64 {
        self.frames.store(frame.into())
    }

    /// Stores the newest cloud of `source`; false when the source is disabled.
    pub fn on_cloud(&self, source: SourceId, cloud: SourceCloud) -> bool {
        self.clouds.store(source, cloud)
    }

    /// One periodic detection cycle. `Ok(None)` when no frame arrived since
    /// the previous cycle.
    pub fn run_cycle(&self) -> Result<Option<CycleReport>> {
        let start = Instant::now();

        let frame = match self.frames.snapshot() {
            Some(frame) => frame,
            None => return Ok(None),
        };
        {
            let mut last = self.last_cycle_seq.lock();
            if frame.seq <= *last {
                return Ok(None);
            }
            *last = frame.seq;
        }

        let detected = self.detect(frame)?;
        let (fused_sources, published) = self.publish(&detected, CloudUse::Take);

        let elapsed = start.elapsed();
        self.cycle_time.lock().add(elapsed);

        let report = CycleReport {
            frame_seq: detected.frame.seq,
            objects: detected.boxes.len(),
            per_class: detected
                .buckets
                .iter()
                .filter(|bucket| !bucket.is_empty())
                .map(|bucket| (bucket.label().to_string(), bucket.count()))
                .collect(),
            fused_sources,
            published,
            elapsed,
        };
        self.console_output(&report);
        Ok(Some(report))
    }

    fn console_output(&self, report: &CycleReport) {
        if !self.config.enable_console_output {
            log::debug!("bvr_perception: cycle {} | Objects: {} | {:.2?}", report.frame_seq, report.objects, report.elapsed);
            return;
        }
        let classes = report
            .per_class
            .iter()
            .map(|(label, count)| format!("{label}: {count}"))
            .collect::<Vec<_>>()
            .join(", ");
        log::info!(
            "Frame {} | Objects: {} [{}] | Cycle: {:.2?} | Avg: {:.2?}",
            report.frame_seq,
            report.objects,
            classes,
            report.elapsed,
            self.cycle_time.lock().avg()
        );
    }

    /// infer + filter + aggregate under the engine lock, returning a
    /// snapshot of the buckets.
    fn detect(&self, frame: Arc<BvrImage>) -> Result<Detected> {
        let mut context = self.detection.lock();
        let raw = context.engine.infer(&frame)?;
        let raw = self.filter_small(raw, &frame);
        let buckets = context.aggregator.aggregate(raw).to_vec();
        let boxes = context.aggregator.bounding_boxes(&frame);
        drop(context);

        Ok(Detected { frame, buckets, boxes })
    }

    /// Drops boxes narrower or shorter than `min_box_fraction` of the frame.
    fn filter_small(&self, mut raw: Vec<BvrDetection>, frame: &BvrImage) -> Vec<BvrDetection> {
        let fraction = self.config.min_box_fraction;
        if fraction <= 0. {
            return raw;
        }
        let min_w = fraction * frame.img_width as f32;
        let min_h = fraction * frame.img_height as f32;
        let before = raw.len();
        raw.retain(|d| d.bbox.w > min_w && d.bbox.h > min_h);
        if raw.len() < before {
            log::debug!("bvr_perception: dropped {} undersized detections", before - raw.len());
        }
        raw
    }

    fn publish(&self, detected: &Detected, clouds: CloudUse) -> (Vec<SourceId>, usize) {
        let detections = detected.detections();
        let mut fused_sources = Vec::new();
        let mut compiled = Vec::new();

        for source in self.clouds.enabled_sources() {
            let cloud = match clouds {
                CloudUse::Take => self.clouds.take(source),
                CloudUse::Peek => self.clouds.latest(source),
            };
            let Some(cloud) = cloud else {
                continue;
            };
            compiled.push(CompiledMessage {
                source_id: source,
                cloud_seq: cloud.seq,
                bounding_boxes: detected.boxes.clone(),
                detections: fuse_with_cloud(
                    &detections,
                    Some(&*cloud),
                    detected.frame.img_width,
                    detected.frame.img_height,
                ),
            });
            fused_sources.push(source);
        }

        let published = self
            .publisher
            .publish(&detected.frame, &detected.buckets, &detected.boxes, compiled);
        (fused_sources, published)
    }

    /// Runs one on-demand check on the calling thread.
    pub fn check_for_objects(&self) -> CheckOutcome {
        match self.check.try_begin() {
            Some(ticket) => self.run_check(ticket),
            None => {
                log::debug!("bvr_perception: check request rejected, another check is active");
                CheckOutcome::Busy
            }
        }
    }

    /// Starts an on-demand check on its own thread. Busy is decided before
    /// this returns, so the handle of a rejected request resolves at once.
    pub fn request_check(self: &Arc<Self>) -> CheckHandle {
        let (outcome_tx, outcome_rx) = bounded(1);
        let Some(ticket) = self.check.try_begin() else {
            log::debug!("bvr_perception: check request rejected, another check is active");
            let _ = outcome_tx.send(CheckOutcome::Busy);
            return CheckHandle::new(None, Arc::clone(&self.check), outcome_rx);
        };

        let id = ticket.id();
        let dispatcher = Arc::clone(self);
        let worker_tx = outcome_tx.clone();
        let worker = thread::Builder::new()
            .name(format!("bvr-check-{id}"))
            .spawn(move || {
                let outcome = dispatcher.run_check(ticket);
                let _ = worker_tx.send(outcome);
            });

        if let Err(e) = worker {
            log::error!("bvr_perception: failed to spawn check worker: {}", e);
            self.check.abandon(id);
            let _ = outcome_tx.send(CheckOutcome::Aborted(format!("failed to spawn check worker: {e}")));
        }
        CheckHandle::new(Some(id), Arc::clone(&self.check), outcome_rx)
    }

    fn run_check(&self, ticket: CheckTicket) -> CheckOutcome {
        let detected = self
            .frames
            .snapshot()
            .context("no frame received yet")
            .and_then(|frame| self.detect(frame));

        match detected {
            Ok(detected) => {
                let outcome = self.check.finish(ticket, Ok(detected.boxes.clone()));
                if outcome.is_succeeded() {
                    self.publish(&detected, CloudUse::Peek);
                }
                log::debug!("bvr_perception: check finished: {}", outcome.as_str());
                outcome
            }
            Err(e) => {
                log::warn!("bvr_perception: check could not run: {:#}", e);
                self.check.finish(ticket, Err(e))
            }
        }
    }

    /// Cancels the active check, if any.
    pub fn preempt_check(&self) -> bool {
        self.check.preempt()
    }

    pub fn is_checking_for_objects(&self) -> bool {
        self.check.is_active()
    }

    /// Enriches `detections` with the latest cloud of `source`, without
    /// consuming it.
    pub fn fuse(&self, detections: &[BvrDetection], source: SourceId) -> Vec<FusedDetection> {
        let cloud = self.clouds.latest(source);
        let (width, height) = match self.frames.snapshot() {
            Some(frame) if !frame.is_empty() => (frame.img_width, frame.img_height),
            _ => (self.config.frame_width, self.config.frame_height),
        };
        fuse_with_cloud(detections, cloud.as_deref(), width, height)
    }

    pub fn cycle_stats(&self) -> TimeCalc {
        self.cycle_time.lock().clone()
    }

    /// Runs [`run_cycle`](Self::run_cycle) every `cycle_interval_ms` until
    /// `shutdown` receives a message or is dropped.
    pub fn spawn_cycle_driver(self: &Arc<Self>, shutdown: Receiver<()>) -> Result<JoinHandle<()>> {
        let dispatcher = Arc::clone(self);
        let ticker = tick(Duration::from_millis(self.config.cycle_interval_ms));

        let handle = thread::Builder::new()
            .name("bvr-cycle".to_string())
            .spawn(move || {
                log::info!("bvr_perception: cycle driver started");
                loop {
                    select! {
                        recv(shutdown) -> _ => break,
                        recv(ticker) -> _ => {
                            if let Err(e) = dispatcher.run_cycle() {
                                log::error!("bvr_perception: detection cycle failed: {:#}", e);
                            }
                        }
                    }
                }
                log::info!("bvr_perception: cycle driver stopped");
            })
            .context("Failed to spawn cycle driver")?;
        Ok(handle)
    }
}
