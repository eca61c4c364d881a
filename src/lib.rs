//! Navigator kernel
//!
//! Turns a camera detector's raw output into spoken spatial alerts for
//! visually impaired users ("chair, down, left").
//!
//! # Architecture
//!
//! Per frame, in order:
//!
//! 1. **Decode**: raw `[1, 4 + classes, cells]` tensor into candidate boxes.
//! 2. **Distance**: depth sample under each box center, in meters.
//! 3. **Suppress**: greedy class-agnostic non-max suppression.
//! 4. **Classify**: 3x3 direction grid from the box center.
//! 5. **Voice**: frame-level speech gate, then per `(class, direction)`
//!    cooldown, then phrase rendering through a locale table.
//!
//! Inference, capture, depth sensing, overlay drawing and text-to-speech
//! stay outside this crate. Results leave through channels owned by a
//! [`DetectionSession`].
//!
//! # Module Structure
//!
//! - `detect`: backends, decoding, suppression, labels
//! - `depth`: depth frames, snapshots, distance estimation
//! - `spatial`: direction buckets
//! - `voice`: cooldowns, speech gate, phrases, translations
//! - `ingest`: frame preprocessing
//! - `pipeline`: per-frame orchestration and the session workers
//! - `config`: tunables from file and environment

pub mod clock;
pub mod config;
pub mod depth;
pub mod detect;
pub mod ingest;
pub mod pipeline;
pub mod spatial;
pub mod voice;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::NavigatorConfig;
pub use depth::{estimate_distance, DepthFrame, DepthSnapshot};
pub use detect::{
    apply_nms, BackendRegistry, BoundingBox, BoxDecoder, DecodeError, DetectionCapability,
    DetectorBackend, ModelShape, RawDetectionTensor, SharedBackend, StubBackend,
};
pub use ingest::ImageFrame;
pub use pipeline::{DetectionSession, FrameOutcome, FramePipeline, OverlayUpdate, SessionOutputs};
pub use spatial::{BucketBounds, DirectionBucket, Horizontal, Vertical};
pub use voice::{SpeechEvent, SpeechGate, Translator, Utterance, VoicedKey, VoicedRegistry};
