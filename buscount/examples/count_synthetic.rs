/// Synthetic Counting Example
///
/// Runs the parallel counting pipeline on generated frames:
/// 1. A handful of people walk back and forth across a horizontal line
/// 2. Detection runs on a background executor thread
/// 3. The last annotated frame is saved to disk
///
/// Passing a MOT ground-truth file replays its boxes instead of the
/// generated walkers. A world file replaces the default crossing line.
///
/// Usage:
///   cargo run --release --example count_synthetic [mot_file] [world_file] [output_path]
use anyhow::Context;
use buscount::{
    BusCounter, CounterConfig, Detector, DetectorExecutor, DetectorResult, Frame, MotDetector,
    Event, WorldConfig,
};
use image::{Rgb, RgbImage};
use linetrack::{Detection, Line, Rect};
use std::env;
use std::time::Instant;

const WIDTH: u32 = 320;
const HEIGHT: u32 = 240;
const FRAMES: u64 = 300;

/// People moving horizontally, bouncing off the frame edges
struct Walkers {
    people: Vec<(f32, f32, f32)>,
}

impl Detector for Walkers {
    fn name(&self) -> &str {
        "walkers"
    }

    fn process(&mut self, frame: &Frame) -> DetectorResult {
        let t = frame.frame_no as f32;
        Ok(self
            .people
            .iter()
            .map(|&(start, y, speed)| {
                // Triangle wave between 0.05 and 0.85
                let phase = (start + speed * t) % 1.6;
                let x = 0.05 + if phase < 0.8 { phase } else { 1.6 - phase };
                Detection::new(Rect::new(x - 0.03, y, 0.06, 0.15), 0.9)
            })
            .collect())
    }
}

fn background() -> RgbImage {
    RgbImage::from_fn(WIDTH, HEIGHT, |x, y| {
        Rgb([(x % 64) as u8 + 40, (y % 48) as u8 + 40, 60])
    })
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("🚌 Bus counter - synthetic run\n");

    let args: Vec<String> = env::args().collect();
    let mot_path = args.get(1).filter(|p| p.as_str() != "-");
    let world = match args.get(2).filter(|p| p.as_str() != "-") {
        Some(path) => WorldConfig::from_file(path)
            .with_context(|| format!("loading world file {}", path))?,
        None => WorldConfig::new(Line::from_coords(0.45, 0.5, 0.55, 0.5), vec![]),
    };
    let output_path = args
        .get(3)
        .cloned()
        .unwrap_or_else(|| "output_count_annotated.png".to_string());

    let detector: Box<dyn Detector> = match mot_path {
        Some(path) => {
            let mut mot = MotDetector::new(0.5, 1.0);
            mot.load_file(path)
                .with_context(|| format!("loading detections from {}", path))?;
            println!("📦 Replaying {} frames of detections from {}", mot.frame_count(), path);
            Box::new(mot)
        }
        None => Box::new(Walkers {
            people: vec![
                (0.0, 0.35, 0.011),
                (0.4, 0.4, 0.008),
                (0.9, 0.5, 0.014),
                (1.3, 0.3, 0.006),
            ],
        }),
    };
    let mut executor = DetectorExecutor::new(detector)?;

    let mut counter = BusCounter::new(CounterConfig::default(), world)?;
    counter.set_event_listener(|event: Event, _frame: &RgbImage, frame_no: u64| {
        println!("  frame {:>4}: {}", frame_no, event);
    });

    let base = background();
    let mut next = 0;
    let mut source = || {
        (next < FRAMES).then(|| {
            next += 1;
            Frame::new(next - 1, base.clone())
        })
    };

    let start = Instant::now();
    let mut last_frame = None;
    let stats = counter.run(
        &mut source,
        &mut executor,
        |processed| last_frame = Some(processed.image.clone()),
        || false,
    )?;
    let elapsed = start.elapsed();

    println!("\n✓ {} frames in {:.2?}", stats.frames, elapsed);
    println!("  Events:         {}", stats.events);
    println!("  Counts:         {}", stats.counts);
    println!("  Peak in flight: {}", stats.peak_in_flight);
    if let Some(fps) = stats.fps {
        println!("  Throughput:     {:.1} fps", fps);
    }

    if let Some(image) = last_frame {
        image
            .save(&output_path)
            .with_context(|| format!("saving {}", output_path))?;
        println!("💾 Saved last annotated frame to {}", output_path);
    }

    Ok(())
}
