//! Detection session: the frame worker, the speech worker and the state they
//! share for the lifetime of one session.
//!
//! ```text
//! submit_frame ─► [inbox: latest frame only] ─► frame worker ─► overlay channel
//!                                                   │
//!                                                   └─ boxes ─► speech worker ─► speech channel
//! ```
//!
//! Frames are processed strictly one at a time. The speech worker owns the
//! frame-level gate and serializes every access to the voiced registry
//! through a mutex, so announcements stay in frame order.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use anyhow::{anyhow, Context, Result};
use serde::Serialize;

use crate::clock::Clock;
use crate::config::NavigatorConfig;
use crate::depth::{DepthFrame, DepthSnapshot};
use crate::detect::{BoundingBox, SharedBackend};
use crate::ingest::ImageFrame;
use crate::spatial::BucketBounds;
use crate::voice::{
    compose_phrase, select_for_speech, SpeechGate, Translator, Utterance, VoicedRegistry,
};

use super::inbox::FrameInbox;
use super::{FrameOutcome, FramePipeline};

/// What the overlay collaborator should draw.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum OverlayUpdate {
    /// Nothing detected; clear the overlay.
    Clear,
    Boxes {
        boxes: Vec<BoundingBox>,
        inference_ms: u64,
    },
}

/// Receiving ends handed to the rendering and speech collaborators.
pub struct SessionOutputs {
    pub overlay: Receiver<OverlayUpdate>,
    pub speech: Receiver<Utterance>,
}

pub struct DetectionSession {
    inbox: Arc<FrameInbox>,
    depth: DepthSnapshot,
    backend: SharedBackend,
    sound_enabled: Arc<AtomicBool>,
    voiced: Arc<Mutex<VoicedRegistry>>,
    translator: Arc<Mutex<Translator>>,
    frame_worker: Option<JoinHandle<()>>,
    speech_worker: Option<JoinHandle<()>>,
}

impl DetectionSession {
    /// Start both workers. Fails only when the pipeline cannot be built.
    pub fn start(
        config: &NavigatorConfig,
        backend: SharedBackend,
        labels: Vec<String>,
        translator: Translator,
        clock: Arc<dyn Clock>,
    ) -> Result<(Self, SessionOutputs)> {
        let pipeline = FramePipeline::new(backend.clone(), labels, config.detection)
            .context("failed to initialize frame pipeline")?;

        let inbox = Arc::new(FrameInbox::new());
        let depth = DepthSnapshot::new(DepthFrame::empty(config.depth.width, config.depth.height));
        let sound_enabled = Arc::new(AtomicBool::new(config.voice.sound_enabled));
        let voiced = Arc::new(Mutex::new(VoicedRegistry::new(
            config.voice.object_cooldown_ms,
        )));
        let translator = Arc::new(Mutex::new(translator));

        let (overlay_tx, overlay_rx) = mpsc::channel();
        let (boxes_tx, boxes_rx) = mpsc::channel();
        let (speech_tx, speech_rx) = mpsc::channel();

        let frame_worker = {
            let inbox = inbox.clone();
            let depth = depth.clone();
            std::thread::Builder::new()
                .name("navigator-frames".into())
                .spawn(move || run_frame_worker(pipeline, inbox, depth, overlay_tx, boxes_tx))
                .context("failed to spawn frame worker")?
        };

        let speech_worker = {
            let ctx = SpeechContext {
                sound_enabled: sound_enabled.clone(),
                voiced: voiced.clone(),
                translator: translator.clone(),
                gate: SpeechGate::new(config.voice.speech_cooldown_ms),
                bounds: config.bounds,
                clock,
            };
            std::thread::Builder::new()
                .name("navigator-speech".into())
                .spawn(move || run_speech_worker(ctx, boxes_rx, speech_tx))
                .context("failed to spawn speech worker")?
        };

        log::info!("detection session started");
        Ok((
            Self {
                inbox,
                depth,
                backend,
                sound_enabled,
                voiced,
                translator,
                frame_worker: Some(frame_worker),
                speech_worker: Some(speech_worker),
            },
            SessionOutputs {
                overlay: overlay_rx,
                speech: speech_rx,
            },
        ))
    }

    /// Queue a frame for analysis, replacing any frame still waiting.
    pub fn submit_frame(&self, frame: ImageFrame) -> Result<()> {
        if self.inbox.submit(frame)? {
            log::debug!("dropped stale frame in favour of a newer one");
        }
        Ok(())
    }

    /// Publish a new depth frame for subsequent detections.
    pub fn publish_depth(&self, frame: DepthFrame) -> Result<()> {
        self.depth.publish(frame)
    }

    /// Handle for a depth-sensor callback running on its own thread.
    pub fn depth_snapshot(&self) -> DepthSnapshot {
        self.depth.clone()
    }

    /// Close and recreate the inference engine.
    ///
    /// Waits for an in-flight inference to finish. Decoder, suppression and
    /// voice state are left as they are.
    pub fn restart_backend(&self, use_gpu: bool) -> Result<()> {
        let mut guard = self
            .backend
            .lock()
            .map_err(|_| anyhow!("backend lock poisoned"))?;
        guard.close();
        guard.restart(use_gpu)?;
        log::info!(
            "detector backend '{}' restarted (gpu={})",
            guard.name(),
            guard.gpu_active()
        );
        Ok(())
    }

    pub fn set_sound_enabled(&self, enabled: bool) {
        self.sound_enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn sound_enabled(&self) -> bool {
        self.sound_enabled.load(Ordering::SeqCst)
    }

    pub fn set_locale(&self, locale: &str) -> Result<()> {
        let mut translator = self
            .translator
            .lock()
            .map_err(|_| anyhow!("translator lock poisoned"))?;
        translator.set_locale(locale);
        Ok(())
    }

    /// Number of distinct `(class, direction)` pairs announced so far.
    pub fn voiced_count(&self) -> Result<usize> {
        let voiced = self
            .voiced
            .lock()
            .map_err(|_| anyhow!("voiced registry lock poisoned"))?;
        Ok(voiced.len())
    }

    /// Frames replaced before the worker picked them up.
    pub fn dropped_frames(&self) -> u64 {
        self.inbox.dropped()
    }

    /// Stop both workers and close the backend.
    pub fn stop(mut self) -> Result<()> {
        self.shutdown()?;
        let mut guard = self
            .backend
            .lock()
            .map_err(|_| anyhow!("backend lock poisoned"))?;
        guard.close();
        log::info!("detection session stopped");
        Ok(())
    }

    fn shutdown(&mut self) -> Result<()> {
        self.inbox.close();
        // The speech worker exits once the frame worker drops its sender.
        for handle in [self.frame_worker.take(), self.speech_worker.take()]
            .into_iter()
            .flatten()
        {
            handle
                .join()
                .map_err(|_| anyhow!("detection worker panicked"))?;
        }
        Ok(())
    }
}

impl Drop for DetectionSession {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            log::error!("detection session shutdown failed: {}", err);
        }
    }
}

fn run_frame_worker(
    pipeline: FramePipeline,
    inbox: Arc<FrameInbox>,
    depth: DepthSnapshot,
    overlay_tx: Sender<OverlayUpdate>,
    boxes_tx: Sender<Vec<BoundingBox>>,
) {
    while let Some(frame) = inbox.next() {
        let depth_frame = match depth.latest() {
            Ok(frame) => frame,
            Err(err) => {
                log::error!("frame skipped: {}", err);
                continue;
            }
        };

        match pipeline.process(&frame, &depth_frame) {
            FrameOutcome::Empty => {
                if overlay_tx.send(OverlayUpdate::Clear).is_err() {
                    log::debug!("overlay receiver gone, update dropped");
                }
            }
            FrameOutcome::Detected {
                boxes,
                inference_ms,
            } => {
                let update = OverlayUpdate::Boxes {
                    boxes: boxes.clone(),
                    inference_ms,
                };
                if overlay_tx.send(update).is_err() {
                    log::debug!("overlay receiver gone, update dropped");
                }
                if boxes_tx.send(boxes).is_err() {
                    log::warn!("speech worker gone, stopping frame worker");
                    break;
                }
            }
            FrameOutcome::Skipped { .. } => {}
        }
    }
    log::debug!("frame worker exiting");
}

struct SpeechContext {
    sound_enabled: Arc<AtomicBool>,
    voiced: Arc<Mutex<VoicedRegistry>>,
    translator: Arc<Mutex<Translator>>,
    gate: SpeechGate,
    bounds: BucketBounds,
    clock: Arc<dyn Clock>,
}

fn run_speech_worker(
    mut ctx: SpeechContext,
    boxes_rx: Receiver<Vec<BoundingBox>>,
    speech_tx: Sender<Utterance>,
) {
    for boxes in boxes_rx {
        match ctx.utterance_for(&boxes) {
            Ok(Some(utterance)) => {
                if speech_tx.send(utterance).is_err() {
                    log::debug!("speech receiver gone, utterance dropped");
                }
            }
            Ok(None) => {}
            Err(err) => {
                log::error!("speech worker stopped: {}", err);
                break;
            }
        }
    }
    log::debug!("speech worker exiting");
}

impl SpeechContext {
    /// Apply the frame gate, then per-object cooldowns, to one frame's boxes.
    ///
    /// Only events that make it into the utterance start a cooldown.
    fn utterance_for(&mut self, boxes: &[BoundingBox]) -> Result<Option<Utterance>> {
        if !self.sound_enabled.load(Ordering::SeqCst) {
            return Ok(None);
        }
        let now = self.clock.now_millis();
        if !self.gate.is_open(now) {
            return Ok(None);
        }

        let events = {
            let mut voiced = self
                .voiced
                .lock()
                .map_err(|_| anyhow!("voiced registry lock poisoned"))?;
            let events = select_for_speech(voiced.due_candidates(boxes, &self.bounds, now));
            voiced.record_spoken(&events, now);
            events
        };
        if events.is_empty() {
            return Ok(None);
        }
        self.gate.mark_spoken(now);

        let phrase = {
            let translator = self
                .translator
                .lock()
                .map_err(|_| anyhow!("translator lock poisoned"))?;
            compose_phrase(&events, &translator)
        };
        log::debug!("announcing {} objects: {}", events.len(), phrase);
        Ok(Some(Utterance {
            events,
            phrase,
            at_ms: now,
        }))
    }
}
