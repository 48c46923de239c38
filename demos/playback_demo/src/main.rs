// Copyright 2026 the Frameflip Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Real-time playback through the software renderer.
//!
//! A producer thread decodes synthetic frames into the render queue while the
//! main thread drives the render loop at the display refresh rate against a
//! monotonic clock. At the end the render statistics are printed and, with
//! `--trace`, the recorded events are exported as Chrome trace JSON.
//!
//! ```bash
//! playback_demo --fps 23.976 --refresh 60 --frames 240
//! playback_demo --trace playback.json
//! RUST_LOG=debug playback_demo --pretty --debug
//! ```

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;

use frameflip_core::backend::VideoParams;
use frameflip_core::clock::MonotonicClock;
use frameflip_core::config::RenderConfig;
use frameflip_core::display::FixedDisplay;
use frameflip_core::flags::RenderFlags;
use frameflip_core::format::RenderFormat;
use frameflip_core::picture::{VideoPicture, plane_geometry};
use frameflip_core::port::NullPort;
use frameflip_core::software::SoftwareFactory;
use frameflip_core::time::frame_duration;
use frameflip_core::timing::{DeinterlaceMethod, PresentField};
use frameflip_core::trace::SharedSink;
use frameflip_core::{BufferWait, RenderManager};
use frameflip_debug::chrome;
use frameflip_debug::pretty::PrettyPrintSink;
use frameflip_debug::recorder::RecorderSink;

#[derive(Clone, Debug, Parser)]
#[command(name = "playback_demo", version, about = "Software playback demo")]
struct Args {
    /// Content frame rate
    #[arg(long, default_value = "25")]
    fps: f64,

    /// Display refresh rate in Hz
    #[arg(long, default_value = "60")]
    refresh: f64,

    /// Number of frames to play
    #[arg(long, default_value = "150")]
    frames: u32,

    /// Render buffers to request (0 lets the renderer choose)
    #[arg(long, default_value = "0")]
    buffers: usize,

    /// Frame width in pixels
    #[arg(long, default_value = "160")]
    width: u32,

    /// Frame height in pixels
    #[arg(long, default_value = "90")]
    height: u32,

    /// Render tuning overrides (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write a Chrome trace of the run to this path
    #[arg(long)]
    trace: Option<PathBuf>,

    /// Print every event to stderr instead of recording
    #[arg(long)]
    pretty: bool,

    /// Enable per-tick debug logging
    #[arg(long, short = 'd')]
    debug: bool,
}

/// Planar frames with a bar that moves one column per frame.
struct FrameSource {
    width: u32,
    height: u32,
    planes: [Vec<u8>; 3],
    strides: [usize; 3],
}

impl FrameSource {
    fn new(width: u32, height: u32) -> Self {
        let geometry = plane_geometry(RenderFormat::Yuv420p, width, height);
        Self {
            width,
            height,
            planes: geometry.map(|(row_bytes, rows)| vec![128; row_bytes * rows]),
            strides: geometry.map(|(row_bytes, _)| row_bytes),
        }
    }

    fn picture(&mut self, index: u32, pts: f64) -> VideoPicture<'_> {
        let stride = self.strides[0];
        let bar = index as usize % stride.max(1);
        for row in self.planes[0].chunks_mut(stride.max(1)) {
            for (x, luma) in row.iter_mut().enumerate() {
                *luma = if x.abs_diff(bar) < 4 { 235 } else { 16 };
            }
        }
        VideoPicture::new(
            RenderFormat::Yuv420p,
            self.width,
            self.height,
            [&self.planes[0], &self.planes[1], &self.planes[2]],
            self.strides,
        )
        .with_pts(pts)
    }
}

fn produce(manager: &RenderManager, args: &Args, stop: &AtomicBool) -> u32 {
    let mut source = FrameSource::new(args.width, args.height);
    let period = frame_duration(args.fps);
    let mut queued = 0;
    for index in 0..args.frames {
        loop {
            if stop.load(Ordering::Acquire) {
                return queued;
            }
            match manager.wait_for_buffer(stop, Duration::from_millis(100)) {
                BufferWait::Available { .. } => break,
                BufferWait::Suppressed { dropped } if dropped > 0 => {
                    log::info!("GUI suppressed, dropped {dropped} queued frames");
                }
                _ => {}
            }
        }
        let pts = f64::from(index) * period;
        if manager.add_picture(&source.picture(index, pts)).is_none() {
            log::warn!("no slot for frame {index}");
            continue;
        }
        let flipped = manager.flip_page(
            stop,
            pts,
            DeinterlaceMethod::None,
            PresentField::None,
            false,
        );
        if flipped.is_some() {
            queued += 1;
        }
    }
    queued
}

fn load_config(path: Option<&PathBuf>) -> Result<RenderConfig> {
    let Some(path) = path else {
        return Ok(RenderConfig::default());
    };
    let source =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    RenderConfig::from_toml_str(&source).with_context(|| format!("parsing {}", path.display()))
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    if args.fps <= 0.0 || args.refresh <= 0.0 {
        anyhow::bail!("--fps and --refresh must be positive");
    }

    // -- manager -----------------------------------------------------------
    let config = load_config(args.config.as_ref())?;
    let manager = Arc::new(
        RenderManager::new(
            Arc::new(MonotonicClock::new()),
            Arc::new(FixedDisplay::new(args.refresh)),
            Arc::new(NullPort),
            Box::new(SoftwareFactory::new().with_retained_frames(1)),
        )
        .with_config(config),
    );
    let recorder = SharedSink::new(RecorderSink::new());
    if args.pretty {
        manager.set_trace_sink(Box::new(PrettyPrintSink::stderr()));
    } else {
        manager.set_trace_sink(Box::new(recorder.clone()));
    }
    manager
        .configure(
            VideoParams::new(args.width, args.height, args.fps, RenderFormat::Yuv420p)
                .with_buffers(args.buffers),
        )
        .context("configuring the renderer")?;
    if args.debug {
        manager.toggle_debug();
    }

    // -- producer ----------------------------------------------------------
    let stop = Arc::new(AtomicBool::new(false));
    let producer = {
        let manager = Arc::clone(&manager);
        let stop = Arc::clone(&stop);
        let args = args.clone();
        thread::spawn(move || produce(&manager, &args, &stop))
    };

    // -- render loop -------------------------------------------------------
    let vblank = Duration::from_secs_f64(1.0 / args.refresh);
    let limit =
        Duration::from_secs_f64(f64::from(args.frames) / args.fps) + Duration::from_secs(2);
    let started = Instant::now();
    let mut next_vblank = started;
    let mut ticks = 0_u64;
    while !(producer.is_finished() && manager.slot_counts().queued == 0) {
        if started.elapsed() > limit {
            log::warn!("playback overran, stopping the producer");
            stop.store(true, Ordering::Release);
            break;
        }
        manager.frame_move();
        manager.render(true, RenderFlags::empty(), 255, true);
        ticks += 1;
        next_vblank += vblank;
        thread::sleep(next_vblank.saturating_duration_since(Instant::now()));
    }
    let queued = producer
        .join()
        .map_err(|_| anyhow::anyhow!("producer thread panicked"))?;
    let stats = manager.stats();
    manager.un_init().context("tearing down the renderer")?;

    // -- report ------------------------------------------------------------
    println!(
        "{queued}/{} frames queued over {ticks} ticks in {:.2}s",
        args.frames,
        started.elapsed().as_secs_f64()
    );
    println!(
        "skipped {}, late {}, queue {}/{}/{} (queued/discard/free)",
        stats.skipped, stats.late_frames, stats.queued, stats.discard, stats.free
    );

    if let Some(path) = &args.trace {
        if args.pretty {
            log::warn!("--pretty streams events; nothing was recorded for --trace");
        } else {
            let file =
                File::create(path).with_context(|| format!("creating {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            chrome::export(recorder.lock().as_bytes(), &mut writer)?;
            writer.flush()?;
            println!("trace written to {}", path.display());
        }
    }
    Ok(())
}
