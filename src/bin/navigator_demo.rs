//! navigator_demo - drive a detection session with synthetic or recorded input
//!
//! Without `--model` the demo runs a scripted backend that walks a chair
//! across the field of view past a standing person, so every stage of the
//! pipeline (decode, distance, suppression, cooldowns, phrasing) can be
//! observed in the log. With the `backend-tract` feature and `--model`, a
//! real ONNX detector runs against `--image` (or a blank frame).

use anyhow::{anyhow, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use navigator_kernel::detect::{load_labels, InputLayout};
use navigator_kernel::{
    BackendRegistry, DepthFrame, DetectionSession, ImageFrame, ModelShape, NavigatorConfig,
    OverlayUpdate, SharedBackend, StubBackend, SystemClock, Translator,
};

const DEMO_LABELS: [&str; 2] = ["person", "chair"];
const DEMO_CELLS: usize = 8;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Config file (TOML or JSON). Falls back to NAVIGATOR_CONFIG.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Number of frames to submit.
    #[arg(long, default_value_t = 60)]
    frames: u32,
    /// Frames per second.
    #[arg(long, default_value_t = 10)]
    fps: u32,
    /// ONNX detector model (requires the backend-tract feature).
    #[arg(long)]
    model: Option<PathBuf>,
    /// Still image to feed as every frame.
    #[arg(long)]
    image: Option<PathBuf>,
    /// Uniform depth reported by the synthetic depth sensor, in millimeters.
    #[arg(long, default_value_t = 2500)]
    depth_mm: u16,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if args.fps == 0 {
        return Err(anyhow!("fps must be >= 1"));
    }

    let cfg = match &args.config {
        Some(path) => NavigatorConfig::from_path(path)?,
        None => NavigatorConfig::load()?,
    };

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = stop.clone();
        ctrlc::set_handler(move || stop.store(true, Ordering::SeqCst))?;
    }

    let (backend, labels, scripted) = build_backend(&args, &cfg)?;
    let translator = Translator::load(&cfg.voice.locale_dir, &cfg.voice.locale);
    if translator.is_empty() {
        log::warn!(
            "no translations for locale '{}', announcements will be silent",
            cfg.voice.locale
        );
    }

    let (session, outputs) =
        DetectionSession::start(&cfg, backend, labels, translator, Arc::new(SystemClock))?;
    session.publish_depth(DepthFrame::filled(
        cfg.depth.width,
        cfg.depth.height,
        args.depth_mm,
    ))?;

    let frame = match &args.image {
        Some(path) => ImageFrame::open(path)?,
        None => ImageFrame::rgba(
            cfg.model.input_width,
            cfg.model.input_height,
            vec![0; cfg.model.input_width as usize * cfg.model.input_height as usize * 4],
        ),
    };

    let interval = Duration::from_millis(1000 / args.fps as u64);
    log::info!(
        "submitting {} frames at {} fps ({} backend)",
        args.frames,
        args.fps,
        if scripted { "scripted" } else { "onnx" }
    );

    for _ in 0..args.frames {
        if stop.load(Ordering::SeqCst) {
            log::info!("interrupted");
            break;
        }
        session.submit_frame(frame.clone())?;
        std::thread::sleep(interval);

        for update in outputs.overlay.try_iter() {
            match update {
                OverlayUpdate::Clear => log::info!("overlay: clear"),
                OverlayUpdate::Boxes {
                    boxes,
                    inference_ms,
                } => {
                    for b in &boxes {
                        log::info!(
                            "overlay: {} {:.2} at ({:.2}, {:.2}) {:.1} m [{} ms]",
                            b.class_name,
                            b.confidence,
                            b.cx,
                            b.cy,
                            b.distance_meters,
                            inference_ms
                        );
                    }
                }
            }
        }
        for utterance in outputs.speech.try_iter() {
            log::info!("speak: \"{}\"", utterance.phrase);
        }
    }

    log::info!(
        "{} distinct announcements, {} frames dropped",
        session.voiced_count()?,
        session.dropped_frames()
    );
    session.stop()
}

fn build_backend(args: &Args, cfg: &NavigatorConfig) -> Result<(SharedBackend, Vec<String>, bool)> {
    let mut registry = BackendRegistry::new();

    if let Some(model) = &args.model {
        #[cfg(feature = "backend-tract")]
        {
            let backend = navigator_kernel::detect::TractBackend::new(
                model,
                cfg.model.input_width,
                cfg.model.input_height,
            )?;
            registry.register(backend);
            let labels = load_labels(&cfg.model.labels_path)?;
            return Ok((registry.select(cfg.model.use_gpu)?, labels, false));
        }
        #[cfg(not(feature = "backend-tract"))]
        {
            return Err(anyhow!(
                "cannot load {}: built without the backend-tract feature",
                model.display()
            ));
        }
    }

    let labels = if cfg.model.labels_path.exists() {
        load_labels(&cfg.model.labels_path)?
    } else {
        DEMO_LABELS.iter().map(|label| label.to_string()).collect()
    };
    registry.register(scripted_backend(args.frames, labels.len(), cfg));
    Ok((registry.select(cfg.model.use_gpu)?, labels, true))
}

/// A chair crossing left to right and a person standing slightly right of
/// center, plus a weaker duplicate of the person for suppression to remove.
fn scripted_backend(frames: u32, num_classes: usize, cfg: &NavigatorConfig) -> StubBackend {
    let shape = ModelShape {
        tensor_width: cfg.model.input_width as usize,
        tensor_height: cfg.model.input_height as usize,
        num_channels: 4 + num_classes,
        num_elements: DEMO_CELLS,
        layout: InputLayout::Nchw,
    };
    let mut backend = StubBackend::new(shape);
    for i in 0..frames {
        let progress = i as f32 / frames.max(1) as f32;
        let mut cells = vec![vec![0.0; shape.num_channels]; DEMO_CELLS];
        cells[0][..5].copy_from_slice(&[0.58, 0.45, 0.2, 0.6, 0.88]);
        cells[1][..5].copy_from_slice(&[0.6, 0.46, 0.2, 0.6, 0.41]);
        if num_classes > 1 {
            let cx = 0.1 + 0.8 * progress;
            cells[2][..4].copy_from_slice(&[cx, 0.8, 0.15, 0.2]);
            cells[2][5] = 0.76;
        }
        backend.push_output(flatten(&cells, shape.num_channels));
    }
    backend
}

fn flatten(cells: &[Vec<f32>], channels: usize) -> Vec<f32> {
    let n = cells.len();
    let mut data = vec![0.0; channels * n];
    for (cell, values) in cells.iter().enumerate() {
        for (channel, v) in values.iter().enumerate() {
            data[channel * n + cell] = *v;
        }
    }
    data
}
