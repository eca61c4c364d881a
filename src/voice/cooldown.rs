use std::collections::{HashMap, HashSet};

use crate::detect::BoundingBox;
use crate::spatial::{BucketBounds, DirectionBucket};

use super::speech::{SpeechCandidate, SpeechEvent};

/// Default minimum spacing between announcements of one `(class, bucket)` pair.
pub const DEFAULT_OBJECT_COOLDOWN_MS: u64 = 5000;

/// Identity of an announcement: class name plus direction bucket. Time is not
/// part of the key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct VoicedKey {
    pub class_name: String,
    pub bucket: DirectionBucket,
}

impl From<&SpeechEvent> for VoicedKey {
    fn from(event: &SpeechEvent) -> Self {
        Self {
            class_name: event.class_name.clone(),
            bucket: DirectionBucket::new(event.horizontal, event.vertical),
        }
    }
}

/// Per-identity announcement history for one detection session.
///
/// Holds at most one timestamp per key. A key is written only when it is
/// actually spoken. Records are dropped with the registry when the session
/// ends.
#[derive(Debug)]
pub struct VoicedRegistry {
    cooldown_ms: u64,
    last_announced: HashMap<VoicedKey, u64>,
}

impl VoicedRegistry {
    pub fn new(cooldown_ms: u64) -> Self {
        Self {
            cooldown_ms,
            last_announced: HashMap::new(),
        }
    }

    pub fn cooldown_ms(&self) -> u64 {
        self.cooldown_ms
    }

    /// Whether `key` may be announced at `now_ms`. Does not change state.
    ///
    /// First sightings are always due. Repeat sightings are due once at least
    /// the cooldown has elapsed since the last announcement.
    pub fn is_due(&self, key: &VoicedKey, now_ms: u64) -> bool {
        match self.last_announced.get(key) {
            None => true,
            Some(last) => now_ms.saturating_sub(*last) >= self.cooldown_ms,
        }
    }

    /// Mark `key` as announced at `now_ms`.
    pub fn record(&mut self, key: VoicedKey, now_ms: u64) {
        self.last_announced.insert(key, now_ms);
    }

    /// Classify one frame's boxes and keep those that are due.
    ///
    /// Boxes sharing a key collapse to the first one. Nothing is recorded;
    /// call [`record_spoken`](Self::record_spoken) with what was actually said.
    pub fn due_candidates(
        &self,
        boxes: &[BoundingBox],
        bounds: &BucketBounds,
        now_ms: u64,
    ) -> Vec<SpeechCandidate> {
        let mut seen = HashSet::new();
        let mut due = Vec::new();
        for b in boxes {
            let bucket = bounds.classify(b);
            let key = VoicedKey {
                class_name: b.class_name.clone(),
                bucket,
            };
            if !self.is_due(&key, now_ms) || !seen.insert(key) {
                continue;
            }
            due.push(SpeechCandidate {
                event: SpeechEvent {
                    class_name: b.class_name.clone(),
                    horizontal: bucket.horizontal,
                    vertical: bucket.vertical,
                },
                center_x: b.center_x(),
            });
        }
        due
    }

    /// Record every event of an utterance as announced at `now_ms`.
    pub fn record_spoken(&mut self, events: &[SpeechEvent], now_ms: u64) {
        for event in events {
            self.record(VoicedKey::from(event), now_ms);
        }
    }

    pub fn last_announced(&self, key: &VoicedKey) -> Option<u64> {
        self.last_announced.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.last_announced.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_announced.is_empty()
    }
}

impl Default for VoicedRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_OBJECT_COOLDOWN_MS)
    }
}
