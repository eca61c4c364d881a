use std::sync::{Arc, Mutex};
use std::time::Duration;

use navigator_kernel::detect::InputLayout;
use navigator_kernel::{
    DepthFrame, DetectionSession, DetectorBackend, Horizontal, ImageFrame, ManualClock, ModelShape,
    NavigatorConfig, OverlayUpdate, SessionOutputs, SharedBackend, StubBackend, Translator,
    Vertical,
};

const WAIT: Duration = Duration::from_secs(5);
const QUIET: Duration = Duration::from_millis(300);
const CELLS: usize = 4;

fn shape() -> ModelShape {
    ModelShape {
        tensor_width: 8,
        tensor_height: 8,
        num_channels: 6,
        num_elements: CELLS,
        layout: InputLayout::Nchw,
    }
}

/// `[cx, cy, w, h, person, chair]` per cell, padded with empty cells.
fn tensor(cells: &[[f32; 6]]) -> Vec<f32> {
    let mut data = vec![0.0; 6 * CELLS];
    for (cell, values) in cells.iter().enumerate() {
        for (channel, v) in values.iter().enumerate() {
            data[channel * CELLS + cell] = *v;
        }
    }
    data
}

const CHAIR_LEFT: [f32; 6] = [0.2, 0.5, 0.1, 0.1, 0.0, 0.9];
const CHAIR_RIGHT: [f32; 6] = [0.8, 0.5, 0.1, 0.1, 0.0, 0.8];

fn frame() -> ImageFrame {
    ImageFrame::rgba(8, 8, vec![0; 256])
}

struct Harness {
    session: DetectionSession,
    outputs: SessionOutputs,
    clock: Arc<ManualClock>,
    stub: Arc<Mutex<StubBackend>>,
}

fn start(stub: StubBackend) -> Harness {
    let stub = Arc::new(Mutex::new(stub));
    let backend: SharedBackend = stub.clone();
    let clock = Arc::new(ManualClock::new(0));
    let translator = Translator::from_table("en", "chair=chair\nleft=left\nright=right\nmiddle=");
    let (session, outputs) = DetectionSession::start(
        &NavigatorConfig::default(),
        backend,
        vec!["person".into(), "chair".into()],
        translator,
        clock.clone(),
    )
    .expect("start session");
    session
        .publish_depth(DepthFrame::filled(640, 640, 2500))
        .expect("publish depth");
    Harness {
        session,
        outputs,
        clock,
        stub,
    }
}

impl Harness {
    fn run_frame(&self) -> OverlayUpdate {
        self.session.submit_frame(frame()).expect("submit frame");
        self.outputs.overlay.recv_timeout(WAIT).expect("overlay update")
    }
}

#[test]
fn empty_detection_clears_overlay_and_stays_silent() {
    let h = start(StubBackend::new(shape()));
    assert_eq!(h.run_frame(), OverlayUpdate::Clear);
    assert!(h.outputs.speech.recv_timeout(QUIET).is_err());
    assert_eq!(h.session.voiced_count().unwrap(), 0);
    h.session.stop().unwrap();
}

#[test]
fn repeated_sighting_respects_object_cooldown() {
    let mut stub = StubBackend::new(shape());
    for _ in 0..3 {
        stub.push_output(tensor(&[CHAIR_LEFT]));
    }
    let h = start(stub);

    match h.run_frame() {
        OverlayUpdate::Boxes { boxes, .. } => {
            assert_eq!(boxes.len(), 1);
            assert_eq!(boxes[0].class_name, "chair");
            assert_eq!(boxes[0].distance_meters, 2.5);
        }
        other => panic!("unexpected overlay {:?}", other),
    }
    let first = h.outputs.speech.recv_timeout(WAIT).expect("first announcement");
    assert_eq!(first.events.len(), 1);
    assert_eq!(first.events[0].horizontal, Horizontal::Left);
    assert_eq!(first.events[0].vertical, Vertical::Middle);
    assert_eq!(first.phrase, "chair left");

    h.clock.set(3000);
    assert!(matches!(h.run_frame(), OverlayUpdate::Boxes { .. }));
    assert!(h.outputs.speech.recv_timeout(QUIET).is_err());

    h.clock.set(5000);
    assert!(matches!(h.run_frame(), OverlayUpdate::Boxes { .. }));
    let again = h.outputs.speech.recv_timeout(WAIT).expect("second announcement");
    assert_eq!(again.at_ms, 5000);
    assert_eq!(h.session.voiced_count().unwrap(), 1);
    h.session.stop().unwrap();
}

#[test]
fn distinct_buckets_announce_together() {
    let mut stub = StubBackend::new(shape());
    stub.push_output(tensor(&[CHAIR_LEFT, CHAIR_RIGHT]));
    let h = start(stub);

    assert!(matches!(h.run_frame(), OverlayUpdate::Boxes { .. }));
    let utterance = h.outputs.speech.recv_timeout(WAIT).expect("announcement");
    let directions: Vec<Horizontal> = utterance.events.iter().map(|e| e.horizontal).collect();
    assert_eq!(directions, vec![Horizontal::Left, Horizontal::Right]);
    assert_eq!(utterance.phrase, "chair left. chair right");
    h.session.stop().unwrap();
}

#[test]
fn failed_inference_skips_frame_and_recovers() {
    let mut stub = StubBackend::new(shape());
    stub.push_failure("interpreter run failed");
    stub.push_output(tensor(&[CHAIR_RIGHT]));
    let h = start(stub);

    h.session.submit_frame(frame()).unwrap();
    assert!(h.outputs.overlay.recv_timeout(QUIET).is_err());

    assert!(matches!(h.run_frame(), OverlayUpdate::Boxes { .. }));
    assert!(h.outputs.speech.recv_timeout(WAIT).is_ok());
    h.session.stop().unwrap();
}

#[test]
fn backend_restart_keeps_voice_state() {
    let mut stub = StubBackend::new(shape()).with_gpu();
    stub.push_output(tensor(&[CHAIR_LEFT]));
    stub.push_output(tensor(&[CHAIR_LEFT]));
    let h = start(stub);

    assert!(matches!(h.run_frame(), OverlayUpdate::Boxes { .. }));
    assert!(h.outputs.speech.recv_timeout(WAIT).is_ok());

    h.session.restart_backend(true).unwrap();
    {
        let stub = h.stub.lock().unwrap();
        assert_eq!(stub.restarts(), 1);
        assert!(stub.gpu_active());
    }

    h.clock.set(2500);
    assert!(matches!(h.run_frame(), OverlayUpdate::Boxes { .. }));
    assert!(h.outputs.speech.recv_timeout(QUIET).is_err());
    assert_eq!(h.session.voiced_count().unwrap(), 1);
    h.session.stop().unwrap();
}

#[test]
fn muted_session_still_updates_overlay() {
    let mut stub = StubBackend::new(shape());
    stub.push_output(tensor(&[CHAIR_LEFT]));
    let h = start(stub);
    h.session.set_sound_enabled(false);

    assert!(matches!(h.run_frame(), OverlayUpdate::Boxes { .. }));
    assert!(h.outputs.speech.recv_timeout(QUIET).is_err());
    assert!(!h.session.sound_enabled());
    h.session.stop().unwrap();
}

#[test]
fn stopped_session_closes_backend() {
    let h = start(StubBackend::new(shape()));
    let stub = h.stub.clone();
    h.session.stop().unwrap();
    let mut guard = stub.lock().unwrap();
    assert!(navigator_kernel::DetectorBackend::detect(&mut *guard, &[]).is_err());
}

#[test]
fn speech_continues_after_overlay_receiver_is_dropped() {
    let mut stub = StubBackend::new(shape());
    stub.push_output(tensor(&[CHAIR_LEFT]));
    stub.push_output(tensor(&[CHAIR_RIGHT]));
    let h = start(stub);
    let SessionOutputs { overlay, speech } = h.outputs;
    drop(overlay);

    h.session.submit_frame(frame()).unwrap();
    let first = speech.recv_timeout(WAIT).expect("first announcement");
    assert_eq!(first.phrase, "chair left");

    h.clock.set(2000);
    h.session.submit_frame(frame()).unwrap();
    let second = speech.recv_timeout(WAIT).expect("second announcement");
    assert_eq!(second.phrase, "chair right");
    h.session.stop().unwrap();
}
