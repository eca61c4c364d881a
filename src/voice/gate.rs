/// Default minimum spacing between two spoken utterances.
pub const DEFAULT_SPEECH_COOLDOWN_MS: u64 = 2000;

/// Frame-level speech throttle.
///
/// Independent of the per-object registry: while the gate is closed, whole
/// frames are dropped before any per-object decision is made.
#[derive(Clone, Debug)]
pub struct SpeechGate {
    cooldown_ms: u64,
    last_spoken_ms: Option<u64>,
}

impl SpeechGate {
    pub fn new(cooldown_ms: u64) -> Self {
        Self {
            cooldown_ms,
            last_spoken_ms: None,
        }
    }

    pub fn is_open(&self, now_ms: u64) -> bool {
        match self.last_spoken_ms {
            None => true,
            Some(last) => now_ms.saturating_sub(last) >= self.cooldown_ms,
        }
    }

    /// Start a new cooldown window at `now_ms`.
    pub fn mark_spoken(&mut self, now_ms: u64) {
        self.last_spoken_ms = Some(now_ms);
    }

    pub fn last_spoken(&self) -> Option<u64> {
        self.last_spoken_ms
    }
}

impl Default for SpeechGate {
    fn default() -> Self {
        Self::new(DEFAULT_SPEECH_COOLDOWN_MS)
    }
}
