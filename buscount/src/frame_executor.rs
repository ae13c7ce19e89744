//! Detector executor - runs a detector on its own worker thread
//!
//! Lets the pipeline submit frame k+1 while frame k is still being detected:
//! - Requests are processed strictly in submission order
//! - No frame is ever dropped, the admission gate bounds the queue instead
//! - Every request is answered on its own response channel

use crate::detector_trait::{Detector, DetectorResult, PendingDetections};
use crate::error::DetectorError;
use crate::source::Frame;
use crossbeam::channel::{bounded, unbounded, Receiver, Sender};
use std::thread;

/// A command to be processed by the detector executor
enum DetectorCommand {
    /// Detect people in a frame and answer on `response_tx`
    Detect {
        frame: Frame,
        response_tx: Sender<DetectorResult>,
    },
    /// Shutdown the executor
    Shutdown,
}

/// Runs a [`Detector`] on a dedicated thread
pub struct DetectorExecutor {
    command_tx: Sender<DetectorCommand>,
    name: String,
    thread: Option<thread::JoinHandle<()>>,
}

impl DetectorExecutor {
    /// Move `detector` onto a new worker thread
    pub fn new<D: Detector + 'static>(mut detector: D) -> Result<Self, DetectorError> {
        let name = format!("executor({})", detector.name());
        let (command_tx, command_rx) = unbounded::<DetectorCommand>();

        let thread = thread::Builder::new()
            .name("detector-executor".into())
            .spawn(move || Self::executor_loop(&mut detector, command_rx))
            .map_err(|e| DetectorError::new(name.clone(), format!("cannot spawn worker: {}", e)))?;

        Ok(Self {
            command_tx,
            name,
            thread: Some(thread),
        })
    }

    /// Submit a frame without waiting for the result
    pub fn submit(&self, frame: Frame) -> PendingDetections {
        let (response_tx, response_rx) = bounded(1);
        match self
            .command_tx
            .send(DetectorCommand::Detect { frame, response_tx })
        {
            Ok(()) => PendingDetections::Waiting {
                detector: self.name.clone(),
                response_rx,
            },
            Err(_) => {
                log::error!("Detector executor disconnected");
                PendingDetections::Ready(Err(DetectorError::new(
                    self.name.clone(),
                    "executor disconnected",
                )))
            }
        }
    }

    /// Shutdown the executor, pending requests are still answered
    pub fn shutdown(&self) {
        let _ = self.command_tx.send(DetectorCommand::Shutdown);
    }

    fn executor_loop<D: Detector>(detector: &mut D, command_rx: Receiver<DetectorCommand>) {
        log::info!("Detector executor started for {}", detector.name());
        let mut frames_processed = 0_u64;
        let mut frames_failed = 0_u64;

        while let Ok(command) = command_rx.recv() {
            match command {
                DetectorCommand::Detect { frame, response_tx } => {
                    let result = detector.process(&frame);
                    if result.is_err() {
                        frames_failed += 1;
                    }
                    // The requester may have given up on the result
                    let _ = response_tx.send(result);
                    frames_processed += 1;

                    if frames_processed % 100 == 0 {
                        log::info!(
                            "Detector executor: {} processed, {} failed",
                            frames_processed,
                            frames_failed
                        );
                    }
                }
                DetectorCommand::Shutdown => break,
            }
        }

        log::info!(
            "Detector executor stopped: {} processed, {} failed",
            frames_processed,
            frames_failed
        );
    }
}

impl Detector for DetectorExecutor {
    fn name(&self) -> &str {
        &self.name
    }

    fn process(&mut self, frame: &Frame) -> DetectorResult {
        self.submit(frame.clone()).wait()
    }

    fn start_async(&mut self, frame: &Frame) -> PendingDetections {
        self.submit(frame.clone())
    }
}

impl Drop for DetectorExecutor {
    fn drop(&mut self) {
        self.shutdown();
        if let Some(thread) = self.thread.take() {
            thread.join().ok();
        }
    }
}
