use serde::Serialize;

use crate::spatial::{Horizontal, Vertical};

use super::locale::Translator;

/// Announcements kept per horizontal region in one utterance.
pub const MAX_LEFT: usize = 2;
pub const MAX_MIDDLE: usize = 3;
pub const MAX_RIGHT: usize = 2;

/// Pause inserted between two spoken events.
pub const EVENT_SEPARATOR: &str = ". ";

/// One object to announce: identity and direction only.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct SpeechEvent {
    pub class_name: String,
    pub horizontal: Horizontal,
    pub vertical: Vertical,
}

/// A due event together with the horizontal center used for ordering.
#[derive(Clone, Debug, PartialEq)]
pub struct SpeechCandidate {
    pub event: SpeechEvent,
    pub center_x: f32,
}

/// A rendered utterance handed to the speech collaborator.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Utterance {
    pub events: Vec<SpeechEvent>,
    pub phrase: String,
    pub at_ms: u64,
}

/// Trim one frame's due events to what is worth saying.
///
/// Left and middle events are ordered right-to-left and right events
/// left-to-right, so the objects nearest the center of view come first in
/// each region. Output order is left, middle, right.
pub fn select_for_speech(candidates: Vec<SpeechCandidate>) -> Vec<SpeechEvent> {
    let mut left = Vec::new();
    let mut middle = Vec::new();
    let mut right = Vec::new();
    for candidate in candidates {
        match candidate.event.horizontal {
            Horizontal::Left => left.push(candidate),
            Horizontal::Middle => middle.push(candidate),
            Horizontal::Right => right.push(candidate),
        }
    }

    left.sort_by(|a, b| b.center_x.total_cmp(&a.center_x));
    middle.sort_by(|a, b| b.center_x.total_cmp(&a.center_x));
    right.sort_by(|a, b| a.center_x.total_cmp(&b.center_x));

    left.into_iter()
        .take(MAX_LEFT)
        .chain(middle.into_iter().take(MAX_MIDDLE))
        .chain(right.into_iter().take(MAX_RIGHT))
        .map(|candidate| candidate.event)
        .collect()
}

/// Render events as `"<class> <vertical> <horizontal>"` phrases.
///
/// Every word goes through the translator; a missing translation leaves a
/// silent gap rather than failing.
pub fn compose_phrase(events: &[SpeechEvent], translator: &Translator) -> String {
    events
        .iter()
        .map(|event| {
            [
                translator.lookup(&event.class_name),
                translator.lookup(event.vertical.key()),
                translator.lookup(event.horizontal.key()),
            ]
            .into_iter()
            .filter(|word| !word.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
        })
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(EVENT_SEPARATOR)
}
