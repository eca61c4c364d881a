use std::sync::{Condvar, Mutex};

use anyhow::{anyhow, Result};

use crate::ingest::ImageFrame;

#[derive(Default)]
struct InboxState {
    pending: Option<ImageFrame>,
    closed: bool,
    dropped: u64,
}

/// Single-slot frame queue between capture and the frame worker.
///
/// Holds at most one unprocessed frame; a newer frame replaces an older one
/// that the worker has not picked up yet.
#[derive(Default)]
pub(crate) struct FrameInbox {
    state: Mutex<InboxState>,
    ready: Condvar,
}

impl FrameInbox {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Offer a frame. Returns true when it displaced a pending one.
    pub(crate) fn submit(&self, frame: ImageFrame) -> Result<bool> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| anyhow!("frame inbox lock poisoned"))?;
        if state.closed {
            return Err(anyhow!("detection session is stopped"));
        }
        let displaced = state.pending.replace(frame).is_some();
        if displaced {
            state.dropped += 1;
        }
        drop(state);
        self.ready.notify_one();
        Ok(displaced)
    }

    /// Block until a frame is pending or the inbox closes. `None` means closed.
    pub(crate) fn next(&self) -> Option<ImageFrame> {
        let mut state = self.state.lock().ok()?;
        loop {
            if state.closed {
                return None;
            }
            if let Some(frame) = state.pending.take() {
                return Some(frame);
            }
            state = self.ready.wait(state).ok()?;
        }
    }

    pub(crate) fn close(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.closed = true;
            state.pending = None;
        }
        self.ready.notify_all();
    }

    pub(crate) fn dropped(&self) -> u64 {
        self.state.lock().map(|s| s.dropped).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn frame(tag: u8) -> ImageFrame {
        ImageFrame::rgb(1, 1, vec![tag, 0, 0])
    }

    #[test]
    fn newer_frame_replaces_pending_one() {
        let inbox = FrameInbox::new();
        assert!(!inbox.submit(frame(1)).unwrap());
        assert!(inbox.submit(frame(2)).unwrap());
        assert_eq!(inbox.next().unwrap().pixels[0], 2);
        assert_eq!(inbox.dropped(), 1);
    }

    #[test]
    fn close_wakes_a_waiting_worker() {
        let inbox = Arc::new(FrameInbox::new());
        let worker = {
            let inbox = inbox.clone();
            std::thread::spawn(move || inbox.next())
        };
        std::thread::sleep(std::time::Duration::from_millis(20));
        inbox.close();
        assert!(worker.join().unwrap().is_none());
        assert!(inbox.submit(frame(3)).is_err());
    }
}
