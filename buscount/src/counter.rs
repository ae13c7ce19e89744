//! Counting pipeline: source, detector, tracker and sink
//!
//! ```text
//!   source ──gate──► detect start ──► detect join ──► track ──► display queue ──► caller
//!      ▲                                                                            │
//!      └──────────────────────────── token returned after sink ◄────────────────────┘
//! ```
//!
//! In parallel mode every stage runs on its own scoped thread and talks to
//! the next over a bounded crossbeam channel. The admission gate caps the
//! number of frames between leaving the source and being handed to the sink,
//! so a slow consumer stalls the source instead of growing queues. Frames
//! reach the sink in source order. The sink and the exit predicate always
//! run on the calling thread.

use crate::admission::{admission_gate, GatePermits, GateReturns};
use crate::config::{CounterConfig, RunStyle};
use crate::detector_trait::{Detector, DetectorResult, PendingDetections};
use crate::error::{CounterError, Result};
use crate::image_utils::annotate;
use crate::source::{Frame, FrameSource};
use crate::tick_counter::TickCounter;
use crossbeam::channel::{bounded, Receiver, RecvTimeoutError, Sender};
use image::RgbImage;
use linetrack::{AssociationEngine, Counts, Detection, Event, Tracker, WorldConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::thread;
use std::time::Duration;

/// Receives every crossing event together with the frame it happened on
pub trait EventListener: Send {
    fn on_event(&mut self, event: Event, frame: &RgbImage, frame_no: u64);
}

impl<F> EventListener for F
where
    F: FnMut(Event, &RgbImage, u64) + Send,
{
    fn on_event(&mut self, event: Event, frame: &RgbImage, frame_no: u64) {
        self(event, frame, frame_no)
    }
}

/// Shared, replaceable world configuration.
///
/// The tracker takes a snapshot once per frame, so an update lands on the
/// next frame it processes.
#[derive(Debug, Clone)]
pub struct WorldHandle(Arc<RwLock<WorldConfig>>);

impl WorldHandle {
    pub fn new(world: WorldConfig) -> Self {
        Self(Arc::new(RwLock::new(world)))
    }

    pub fn update(&self, world: WorldConfig) {
        let mut current = self.0.write().unwrap_or_else(|e| e.into_inner());
        *current = world;
    }

    pub fn snapshot(&self) -> WorldConfig {
        self.0.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

/// A frame after tracking, as handed to the sink
#[derive(Debug, Clone)]
pub struct ProcessedFrame {
    pub frame_no: u64,
    /// Annotated when drawing is enabled, otherwise the source image
    pub image: RgbImage,
    pub detections: Vec<Detection>,
    /// Events this frame produced, in track order
    pub events: Vec<Event>,
    /// Totals including this frame
    pub counts: Counts,
    pub live_tracks: usize,
}

/// Summary of a finished run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunStats {
    pub frames: u64,
    pub events: u64,
    /// Most frames that were in flight at once
    pub peak_in_flight: usize,
    pub counts: Counts,
    pub fps: Option<f32>,
}

/// Cooperative stop request shared with the pipeline stages
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Counts people crossing a line in a stream of frames
pub struct BusCounter<T = AssociationEngine> {
    config: CounterConfig,
    world: WorldHandle,
    tracker: T,
    counts: Counts,
    listener: Option<Box<dyn EventListener>>,
    stop: StopHandle,
}

impl BusCounter<AssociationEngine> {
    /// Counter with the association engine described by `config`
    pub fn new(config: CounterConfig, world: WorldConfig) -> Result<Self> {
        let tracker = config.build_engine();
        Self::with_tracker(config, world, tracker)
    }
}

impl<T: Tracker> BusCounter<T> {
    pub fn with_tracker(config: CounterConfig, world: WorldConfig, tracker: T) -> Result<Self> {
        config.validate()?;
        log::info!(
            "Bus counter ready: {:?} mode, {} frames in flight, drawing {}",
            config.run_style,
            config.max_in_flight,
            if config.draw { "on" } else { "off" }
        );
        Ok(Self {
            config,
            world: WorldHandle::new(world),
            tracker,
            counts: Counts::default(),
            listener: None,
            stop: StopHandle::default(),
        })
    }

    pub fn set_event_listener<L: EventListener + 'static>(&mut self, listener: L) {
        self.listener = Some(Box::new(listener));
    }

    /// Replace the world configuration, effective from the next tracked frame
    pub fn update_world_config(&self, world: WorldConfig) {
        log::info!("World configuration updated");
        self.world.update(world);
    }

    pub fn world_handle(&self) -> WorldHandle {
        self.world.clone()
    }

    /// Handle that ends the current run as if the exit predicate fired
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn config(&self) -> &CounterConfig {
        &self.config
    }

    pub fn counts(&self) -> Counts {
        self.counts
    }

    pub fn tracker(&self) -> &T {
        &self.tracker
    }

    /// Run until the source is exhausted, `exit` returns true, the stop
    /// handle fires or a stage fails. Frames already in flight when intake
    /// stops are still delivered to `sink`. Counts carry over between runs.
    pub fn run<S, D, K, X>(
        &mut self,
        source: &mut S,
        detector: &mut D,
        mut sink: K,
        mut exit: X,
    ) -> Result<RunStats>
    where
        S: FrameSource + Send,
        D: Detector + ?Sized,
        K: FnMut(&ProcessedFrame),
        X: FnMut() -> bool,
    {
        self.stop.reset();
        let stats = match self.config.run_style {
            RunStyle::Serial => self.run_serial(source, detector, &mut sink, &mut exit),
            RunStyle::Parallel => self.run_parallel(source, detector, &mut sink, &mut exit),
        }?;
        log::info!(
            "Run finished: {} frames, {} events, {}",
            stats.frames,
            stats.events,
            stats.counts
        );
        Ok(stats)
    }

    fn run_serial<S, D, K, X>(
        &mut self,
        source: &mut S,
        detector: &mut D,
        sink: &mut K,
        exit: &mut X,
    ) -> Result<RunStats>
    where
        S: FrameSource,
        D: Detector + ?Sized,
        K: FnMut(&ProcessedFrame),
        X: FnMut() -> bool,
    {
        let ticks = TickCounter::default();
        let mut stage = TrackStage {
            tracker: &mut self.tracker,
            world: &self.world,
            counts: &mut self.counts,
            listener: &mut self.listener,
            draw: self.config.draw,
            events: 0,
        };
        let mut frames = 0;

        while !self.stop.is_stopped() && !exit() {
            let Some(frame) = source.next_frame() else {
                log::info!("Frame source exhausted after {} frames", frames);
                break;
            };
            let detections = detector.process(&frame)?;
            let processed = stage.process(frame, detections)?;
            sink(&processed);

            frames += 1;
            ticks.tick();
            log_stats(self.config.stats_interval, frames, &processed.counts, &ticks);
        }

        Ok(RunStats {
            frames,
            events: stage.events,
            peak_in_flight: usize::from(frames > 0),
            counts: *stage.counts,
            fps: ticks.fps(),
        })
    }

    fn run_parallel<S, D, K, X>(
        &mut self,
        source: &mut S,
        detector: &mut D,
        sink: &mut K,
        exit: &mut X,
    ) -> Result<RunStats>
    where
        S: FrameSource + Send,
        D: Detector + ?Sized,
        K: FnMut(&ProcessedFrame),
        X: FnMut() -> bool,
    {
        let Self {
            config,
            world,
            tracker,
            counts,
            listener,
            stop,
        } = self;
        let config: &CounterConfig = config;
        let stop: &StopHandle = stop;

        let capacity = config.max_in_flight;
        let (permits, returns, monitor) = admission_gate(capacity);
        let (frame_tx, frame_rx) = bounded::<Frame>(capacity);
        let (started_tx, started_rx) = bounded::<(Frame, PendingDetections)>(capacity);
        let (joined_tx, joined_rx) = bounded::<(Frame, DetectorResult)>(capacity);
        let (display_tx, display_rx) = bounded::<Result<ProcessedFrame>>(capacity);
        let ticks = TickCounter::default();

        let mut stage = TrackStage {
            tracker,
            world: &*world,
            counts: &mut *counts,
            listener,
            draw: config.draw,
            events: 0,
        };

        let (frames, events) = thread::scope(|s| {
            let source_stage = s.spawn(move || source_loop(source, permits, frame_tx, stop));
            let detect_stage = s.spawn(move || {
                for frame in frame_rx {
                    let pending = detector.start_async(&frame);
                    if started_tx.send((frame, pending)).is_err() {
                        break;
                    }
                }
            });
            let join_stage = s.spawn(move || {
                for (frame, pending) in started_rx {
                    let result = pending.wait();
                    if joined_tx.send((frame, result)).is_err() {
                        break;
                    }
                }
            });
            let track_stage = s.spawn(move || {
                for (frame, result) in joined_rx {
                    let processed = result
                        .map_err(CounterError::from)
                        .and_then(|detections| stage.process(frame, detections));
                    let failed = processed.is_err();
                    if display_tx.send(processed).is_err() || failed {
                        break;
                    }
                }
                stage.events
            });

            let drained = drain_display(
                display_rx,
                returns,
                DrainControl {
                    sink,
                    exit,
                    stop,
                    poll: config.poll_interval(),
                    stats_interval: config.stats_interval,
                    ticks: &ticks,
                },
            );
            // Every stage is joined by hand, an unjoined panic would abort the scope
            let source_joined = join_stage_thread("source", source_stage);
            let detect_joined = join_stage_thread("detect", detect_stage);
            let join_joined = join_stage_thread("join", join_stage);
            let track_joined = join_stage_thread("track", track_stage);

            let frames = drained?;
            source_joined?;
            detect_joined?;
            join_joined?;
            Ok::<_, CounterError>((frames, track_joined?))
        })?;

        Ok(RunStats {
            frames,
            events,
            peak_in_flight: monitor.peak(),
            counts: *counts,
            fps: ticks.fps(),
        })
    }
}

/// Tracker-side state borrowed for the duration of a run
struct TrackStage<'a, T> {
    tracker: &'a mut T,
    world: &'a WorldHandle,
    counts: &'a mut Counts,
    listener: &'a mut Option<Box<dyn EventListener>>,
    draw: bool,
    events: u64,
}

impl<T: Tracker> TrackStage<'_, T> {
    fn process(&mut self, frame: Frame, detections: Vec<Detection>) -> Result<ProcessedFrame> {
        let world = self.world.snapshot();
        let events = self
            .tracker
            .process(&world, &detections, &frame.image, frame.frame_no)?;

        for &event in &events {
            self.counts.apply(event);
            log::info!("Frame {}: {} ({})", frame.frame_no, event, self.counts);
            if let Some(listener) = self.listener.as_mut() {
                listener.on_event(event, &frame.image, frame.frame_no);
            }
        }
        self.events += events.len() as u64;

        let mut image = Arc::try_unwrap(frame.image).unwrap_or_else(|shared| (*shared).clone());
        if self.draw {
            annotate(&mut image, &world, self.tracker.tracks(), &detections, &*self.counts);
        }

        Ok(ProcessedFrame {
            frame_no: frame.frame_no,
            image,
            detections,
            events,
            counts: *self.counts,
            live_tracks: self.tracker.tracks().len(),
        })
    }
}

fn source_loop<S: FrameSource + ?Sized>(
    source: &mut S,
    permits: GatePermits,
    frame_tx: Sender<Frame>,
    stop: &StopHandle,
) -> u64 {
    let mut admitted = 0;
    while !stop.is_stopped() {
        if !permits.acquire() || stop.is_stopped() {
            break;
        }
        let Some(frame) = source.next_frame() else {
            log::info!("Frame source exhausted after {} frames", admitted);
            break;
        };
        permits.admitted();
        if frame_tx.send(frame).is_err() {
            break;
        }
        admitted += 1;
    }
    admitted
}

struct DrainControl<'a, K, X> {
    sink: &'a mut K,
    exit: &'a mut X,
    stop: &'a StopHandle,
    poll: Duration,
    stats_interval: u64,
    ticks: &'a TickCounter,
}

/// Caller side of the parallel pipeline: hand frames to the sink, return
/// their tokens and poll for exit between frames.
fn drain_display<K, X>(
    display_rx: Receiver<Result<ProcessedFrame>>,
    returns: GateReturns,
    control: DrainControl<'_, K, X>,
) -> Result<u64>
where
    K: FnMut(&ProcessedFrame),
    X: FnMut() -> bool,
{
    let DrainControl {
        sink,
        exit,
        stop,
        poll,
        stats_interval,
        ticks,
    } = control;
    let mut frames = 0;

    loop {
        if !stop.is_stopped() && exit() {
            log::info!("Exit requested, draining frames in flight");
            stop.stop();
        }

        match display_rx.recv_timeout(poll) {
            Ok(Ok(processed)) => {
                sink(&processed);
                returns.release();
                frames += 1;
                ticks.tick();
                log_stats(stats_interval, frames, &processed.counts, ticks);
            }
            Ok(Err(e)) => {
                log::error!("Counting pipeline failed: {}", e);
                stop.stop();
                return Err(e);
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => return Ok(frames),
        }
    }
}

fn join_stage_thread<R>(name: &str, handle: thread::ScopedJoinHandle<'_, R>) -> Result<R> {
    handle.join().map_err(|_| {
        log::error!("Pipeline stage '{}' panicked", name);
        CounterError::StagePanicked(name.to_string())
    })
}

fn log_stats(interval: u64, frames: u64, counts: &Counts, ticks: &TickCounter) {
    if interval > 0 && frames % interval == 0 {
        log::info!(
            "Bus counter: {} frames, {}, {:.1} fps",
            frames,
            counts,
            ticks.fps().unwrap_or(0.0)
        );
    }
}

impl<T> std::fmt::Debug for BusCounter<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BusCounter")
            .field("config", &self.config)
            .field("counts", &self.counts)
            .field("has_listener", &self.listener.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DetectorError;
    use crate::frame_executor::DetectorExecutor;
    use linetrack::{EngineConfig, Line, Rect, Track, TrackError};
    use std::sync::atomic::AtomicIsize;
    use std::sync::Mutex;

    /// Crossing from x = 0.45 to x = 0.55 at mid height
    fn world() -> WorldConfig {
        WorldConfig::new(Line::from_coords(0.45, 0.5, 0.55, 0.5), vec![])
    }

    fn config(run_style: RunStyle) -> CounterConfig {
        CounterConfig {
            run_style,
            feature_weight: 0.0,
            draw: false,
            poll_interval_ms: 5,
            ..Default::default()
        }
    }

    /// Frames numbered from zero, `None` after `count` frames
    fn frames(count: u64) -> impl FnMut() -> Option<Frame> + Send {
        let mut next = 0;
        move || {
            (next < count).then(|| {
                next += 1;
                Frame::new(next - 1, RgbImage::new(32, 32))
            })
        }
    }

    /// One person walking along mid height, anchor at `start + step * frame_no`
    struct Walker {
        start: f32,
        step: f32,
        fail_at: Option<u64>,
    }

    impl Walker {
        fn left_to_right() -> Self {
            Self {
                start: 0.3,
                step: 0.02,
                fail_at: None,
            }
        }
    }

    impl Detector for Walker {
        fn name(&self) -> &str {
            "walker"
        }

        fn process(&mut self, frame: &Frame) -> DetectorResult {
            if self.fail_at == Some(frame.frame_no) {
                return Err(DetectorError::new("walker", "lost the camera"));
            }
            let x = self.start + self.step * frame.frame_no as f32;
            Ok(vec![Detection::new(Rect::new(x - 0.05, 0.45, 0.1, 0.2), 0.9)])
        }
    }

    fn run(
        style: RunStyle,
        frame_count: u64,
        detector: &mut dyn Detector,
    ) -> (Result<RunStats>, Vec<ProcessedFrame>) {
        let mut counter = BusCounter::new(config(style), world()).unwrap();
        let mut seen = Vec::new();
        let result =
            counter.run(&mut frames(frame_count), detector, |f| seen.push(f.clone()), || false);
        (result, seen)
    }

    #[test]
    fn test_serial_counts_crossing() {
        let (stats, seen) = run(RunStyle::Serial, 21, &mut Walker::left_to_right());
        let stats = stats.unwrap();

        assert_eq!(stats.frames, 21);
        assert_eq!(stats.events, 1);
        assert_eq!(stats.counts, Counts { inside: 0, outside: 1 });
        assert_eq!(stats.peak_in_flight, 1);
        let events: Vec<Event> = seen.iter().flat_map(|f| f.events.clone()).collect();
        assert_eq!(events, vec![Event::CountOut]);
    }

    #[test]
    fn test_parallel_matches_serial() {
        let (serial, serial_seen) = run(RunStyle::Serial, 21, &mut Walker::left_to_right());
        let (parallel, parallel_seen) = run(RunStyle::Parallel, 21, &mut Walker::left_to_right());
        let (serial, parallel) = (serial.unwrap(), parallel.unwrap());

        assert_eq!(parallel.counts, serial.counts);
        assert_eq!(parallel.frames, serial.frames);
        assert_eq!(parallel.events, serial.events);

        let order: Vec<u64> = parallel_seen.iter().map(|f| f.frame_no).collect();
        assert_eq!(order, (0..21).collect::<Vec<u64>>());
        let per_frame = |seen: &[ProcessedFrame]| -> Vec<Vec<Event>> {
            seen.iter().map(|f| f.events.clone()).collect()
        };
        assert_eq!(per_frame(&parallel_seen), per_frame(&serial_seen));
    }

    #[test]
    fn test_parallel_with_async_detector() {
        let mut executor = DetectorExecutor::new(Walker::left_to_right()).unwrap();
        let (stats, _) = run(RunStyle::Parallel, 21, &mut executor);
        assert_eq!(stats.unwrap().counts, Counts { inside: 0, outside: 1 });
    }

    #[test]
    fn test_slow_sink_bounds_frames_in_flight() {
        let mut counter = BusCounter::new(config(RunStyle::Parallel), world()).unwrap();
        let in_flight = Arc::new(AtomicIsize::new(0));
        let peak = Arc::new(AtomicIsize::new(0));

        let mut inner = frames(30);
        let produced = in_flight.clone();
        let max_seen = peak.clone();
        let mut source = move || {
            let frame = inner()?;
            let now = produced.fetch_add(1, Ordering::SeqCst) + 1;
            max_seen.fetch_max(now, Ordering::SeqCst);
            Some(frame)
        };

        let consumed = in_flight.clone();
        let stats = counter
            .run(
                &mut source,
                &mut Walker::left_to_right(),
                |_| {
                    thread::sleep(Duration::from_millis(5));
                    consumed.fetch_sub(1, Ordering::SeqCst);
                },
                || false,
            )
            .unwrap();

        assert_eq!(stats.frames, 30);
        assert!(stats.peak_in_flight >= 1 && stats.peak_in_flight <= 2);
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[test]
    fn test_detector_error_stops_run() {
        for style in [RunStyle::Serial, RunStyle::Parallel] {
            let mut detector = Walker {
                fail_at: Some(3),
                ..Walker::left_to_right()
            };
            let (result, seen) = run(style, 21, &mut detector);

            match result {
                Err(CounterError::Detector(e)) => assert_eq!(e.message, "lost the camera"),
                other => panic!("expected detector error, got {:?}", other),
            }
            let order: Vec<u64> = seen.iter().map(|f| f.frame_no).collect();
            assert_eq!(order, vec![0, 1, 2]);
        }
    }

    struct BrokenTracker;

    impl Tracker for BrokenTracker {
        fn process(
            &mut self,
            _world: &WorldConfig,
            _detections: &[Detection],
            _frame: &RgbImage,
            frame_no: u64,
        ) -> linetrack::Result<Vec<Event>> {
            if frame_no == 2 {
                return Err(TrackError::invariant("broken on purpose"));
            }
            Ok(vec![])
        }

        fn tracks(&self) -> &[Track] {
            &[]
        }
    }

    #[test]
    fn test_tracker_error_stops_run() {
        for style in [RunStyle::Serial, RunStyle::Parallel] {
            let mut counter =
                BusCounter::with_tracker(config(style), world(), BrokenTracker).unwrap();
            let mut delivered = 0;
            let result = counter.run(
                &mut frames(10),
                &mut Walker::left_to_right(),
                |_| delivered += 1,
                || false,
            );
            assert!(matches!(result, Err(CounterError::Track(_))));
            assert_eq!(delivered, 2);
        }
    }

    #[test]
    fn test_exit_drains_in_flight_frames() {
        for style in [RunStyle::Serial, RunStyle::Parallel] {
            let mut counter = BusCounter::new(config(style), world()).unwrap();
            let mut endless = {
                let mut next = 0;
                move || {
                    next += 1;
                    Some(Frame::new(next - 1, RgbImage::new(8, 8)))
                }
            };
            let seen = Mutex::new(Vec::new());
            let stats = counter
                .run(
                    &mut endless,
                    &mut Walker::left_to_right(),
                    |f| seen.lock().unwrap().push(f.frame_no),
                    || seen.lock().unwrap().len() >= 5,
                )
                .unwrap();

            let seen = seen.into_inner().unwrap();
            assert!(stats.frames >= 5 && stats.frames <= 7, "{:?}", stats);
            assert_eq!(seen.len() as u64, stats.frames);
            assert_eq!(seen, (0..stats.frames).collect::<Vec<u64>>());
        }
    }

    #[test]
    fn test_stop_handle_ends_run() {
        let mut counter = BusCounter::new(config(RunStyle::Parallel), world()).unwrap();
        let stop = counter.stop_handle();
        let mut source = {
            let mut next = 0;
            move || {
                next += 1;
                Some(Frame::new(next - 1, RgbImage::new(8, 8)))
            }
        };
        let stats = counter
            .run(
                &mut source,
                &mut Walker::left_to_right(),
                |f| {
                    if f.frame_no == 3 {
                        stop.stop();
                    }
                },
                || false,
            )
            .unwrap();
        assert!(stats.frames >= 4 && stats.frames <= 6);
    }

    #[test]
    fn test_world_update_applies_to_later_frames() {
        let mut counter = BusCounter::new(
            config(RunStyle::Serial),
            // Far below the walker, nothing is ever inside
            WorldConfig::new(Line::from_coords(0.45, 5.0, 0.55, 5.0), vec![]),
        )
        .unwrap();
        let handle = counter.world_handle();

        let stats = counter
            .run(
                &mut frames(21),
                &mut Walker::left_to_right(),
                |f| {
                    if f.frame_no == 0 {
                        handle.update(world());
                    }
                },
                || false,
            )
            .unwrap();
        assert_eq!(stats.counts, Counts { inside: 0, outside: 1 });
        assert_eq!(counter.world_handle().snapshot(), world());
    }

    #[test]
    fn test_listener_and_annotation() {
        let mut counter = BusCounter::new(
            CounterConfig {
                draw: true,
                ..config(RunStyle::Parallel)
            },
            world(),
        )
        .unwrap();
        let heard = Arc::new(Mutex::new(Vec::new()));
        let sink = heard.clone();
        counter.set_event_listener(move |event: Event, frame: &RgbImage, frame_no: u64| {
            sink.lock().unwrap().push((event, frame_no, frame.width()));
        });

        let mut drawn = 0;
        let stats = counter
            .run(
                &mut frames(21),
                &mut Walker::left_to_right(),
                |f| drawn += f.image.pixels().filter(|p| p.0 != [0, 0, 0]).count(),
                || false,
            )
            .unwrap();

        let heard = heard.lock().unwrap();
        assert_eq!(heard.len(), 1);
        let (event, frame_no, width) = heard[0];
        assert_eq!(event, Event::CountOut);
        // First anchor at or beyond x = 0.55
        assert_eq!(frame_no, 13);
        assert_eq!(width, 32);
        assert!(drawn > 0);
        assert_eq!(counter.counts(), stats.counts);
    }

    #[test]
    fn test_counts_carry_over_between_runs() {
        let mut counter = BusCounter::new(config(RunStyle::Serial), world()).unwrap();
        counter
            .run(&mut frames(21), &mut Walker::left_to_right(), |_| {}, || false)
            .unwrap();

        // Same person walks back, frame numbers keep increasing
        let mut back = {
            let mut next = 21;
            move || {
                (next < 42).then(|| {
                    next += 1;
                    Frame::new(next - 1, RgbImage::new(32, 32))
                })
            }
        };
        let mut walker = Walker {
            start: 0.7 + 21.0 * 0.02,
            step: -0.02,
            fail_at: None,
        };
        let stats = counter.run(&mut back, &mut walker, |_| {}, || false).unwrap();
        assert_eq!(stats.events, 1);
        assert_eq!(stats.counts, Counts { inside: 0, outside: 0 });
        assert_eq!(counter.tracker().frames_processed(), 42);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = CounterConfig {
            max_in_flight: 0,
            ..Default::default()
        };
        assert!(matches!(
            BusCounter::new(config, world()),
            Err(CounterError::Config(_))
        ));
        let engine = AssociationEngine::new(EngineConfig::default());
        assert!(BusCounter::with_tracker(CounterConfig::default(), world(), engine).is_ok());
    }
}
