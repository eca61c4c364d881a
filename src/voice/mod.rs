//! Turning detections into rate-limited spoken alerts.
//!
//! - `cooldown`: per `(class, direction)` announcement history
//! - `gate`: frame-level speech throttle
//! - `speech`: event selection and phrase rendering
//! - `locale`: translation tables for spoken words

pub mod cooldown;
pub mod gate;
pub mod locale;
pub mod speech;

pub use cooldown::{VoicedKey, VoicedRegistry, DEFAULT_OBJECT_COOLDOWN_MS};
pub use gate::{SpeechGate, DEFAULT_SPEECH_COOLDOWN_MS};
pub use locale::Translator;
pub use speech::{compose_phrase, select_for_speech, SpeechCandidate, SpeechEvent, Utterance};
