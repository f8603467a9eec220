//! Main application module for gaze proctoring.
//!
//! Two loop shapes are provided. [`RunMode::Inline`] owns the capture device and
//! runs the pipeline inline on every read. [`RunMode::Streaming`] pushes frames
//! through a bounded channel to a worker thread, which publishes snapshots that
//! a timer-driven loop on the main thread turns into attention assessments.

use crate::{
    attention::{classify_gaze, Assessment, AttentionMonitor, AttentionStatus, CheatEvent},
    capture::{resize_frame, CaptureSource, FrameRead, FrameSource, VideoSource},
    config::Config,
    constants::FRAME_CHANNEL_CAPACITY,
    error::{Error, Result},
    gaze_processor::{GazePoint, GazeProcessor},
    overlay,
    session::{FrameSlot, SnapshotCell, StatusSnapshot},
};
use chrono::Utc;
use crossbeam_channel::{bounded, tick, TrySendError};
use log::{debug, error, info, warn};
use opencv::{
    core::Mat,
    highgui::{self, WINDOW_NORMAL},
    prelude::*,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

const WINDOW_NAME: &str = "Gaze Proctor";

/// How frames flow through the application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Blocking pull loop, inference inline
    Inline,
    /// Capture thread, worker thread, polling main loop
    Streaming,
}

/// GUI display mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuiMode {
    /// Show the annotated camera window
    Window,
    /// Log only
    Headless,
}

/// Runtime options chosen on the command line
#[derive(Debug, Clone)]
pub struct AppOptions {
    /// Camera index or video file path
    pub source: VideoSource,
    /// Loop shape
    pub mode: RunMode,
    /// Display mode
    pub gui: GuiMode,
}

/// Output of one processed frame
pub struct ProcessedFrame {
    /// Status snapshot for the polling loop
    pub snapshot: StatusSnapshot,
    /// Frame with the gaze overlay, when rendering succeeded
    pub rendered: Option<Mat>,
}

/// Per-frame step shared by both loop shapes.
///
/// Runs inference on every Nth frame only and reuses the last estimate in
/// between. Errors are caught here and become [`AttentionStatus::Error`].
pub struct FrameWorker {
    processor: GazeProcessor,
    skip_frames: u64,
    resize_to_screen: bool,
    frame_index: u64,
    last_estimate: Option<Option<GazePoint>>,
}

impl FrameWorker {
    /// Create a worker around a processor
    #[must_use]
    pub fn new(processor: GazeProcessor, skip_frames: u32, resize_to_screen: bool) -> Self {
        Self {
            processor,
            skip_frames: u64::from(skip_frames.max(1)),
            resize_to_screen,
            frame_index: 0,
            last_estimate: None,
        }
    }

    /// Number of frames seen so far
    #[must_use]
    pub const fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Process one frame; never fails
    pub fn process(&mut self, frame: &Mat) -> ProcessedFrame {
        self.frame_index += 1;
        match self.try_process(frame) {
            Ok(processed) => processed,
            Err(e) => {
                warn!("Frame {} processing failed: {e}", self.frame_index);
                ProcessedFrame {
                    snapshot: StatusSnapshot {
                        status: AttentionStatus::Error,
                        message: format!("Processing error: {e}"),
                        gaze: None,
                        timestamp: Utc::now(),
                        frame_index: self.frame_index,
                    },
                    rendered: None,
                }
            }
        }
    }

    fn try_process(&mut self, frame: &Mat) -> Result<ProcessedFrame> {
        if frame.empty() {
            return Err(Error::Processing("empty frame".to_string()));
        }

        let screen = self.processor.screen_size();
        let frame = if self.resize_to_screen {
            resize_frame(frame, screen.width, screen.height)?
        } else {
            frame.try_clone()?
        };

        if !self.processor.is_available() {
            return Ok(ProcessedFrame {
                snapshot: StatusSnapshot {
                    status: AttentionStatus::Error,
                    message: "Gaze inference unavailable".to_string(),
                    gaze: None,
                    timestamp: Utc::now(),
                    frame_index: self.frame_index,
                },
                rendered: Some(frame),
            });
        }

        if self.frame_index % self.skip_frames == 0 {
            self.last_estimate = Some(self.processor.get_gaze_coordinates(&frame));
        }

        let (status, message, gaze) = match self.last_estimate {
            None => (
                AttentionStatus::Instruction,
                "Initializing processing...".to_string(),
                None,
            ),
            Some(gaze) => {
                let status = classify_gaze(gaze, screen);
                let message = match (status, gaze) {
                    (AttentionStatus::Ok, Some(point)) => format!("Gaze X/Y: {point}"),
                    (_, Some(point)) => format!("Gaze off screen at {point}"),
                    (_, None) => "No face detected. Move your face to the center of the screen.".to_string(),
                };
                (status, message, gaze)
            }
        };

        let rendered = self.processor.draw_gaze(&frame, gaze)?;

        Ok(ProcessedFrame {
            snapshot: StatusSnapshot {
                status,
                message,
                gaze,
                timestamp: Utc::now(),
                frame_index: self.frame_index,
            },
            rendered: Some(rendered),
        })
    }
}

/// Main application struct
pub struct GazeApp {
    config: Config,
    options: AppOptions,
    processor: GazeProcessor,
}

impl GazeApp {
    /// Validate the configuration and load the gaze pipeline.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` for invalid configuration. Model and cascade
    /// load failures do not fail construction; they disable inference.
    pub fn new(config: Config, options: AppOptions) -> Result<Self> {
        info!("Initializing Gaze Proctor application");
        config.validate()?;

        let processor = GazeProcessor::from_config(&config);
        if !processor.is_available() {
            warn!("Gaze inference disabled for this session; frames are reported as errors");
        }

        Ok(Self::with_processor(config, options, processor))
    }

    /// Build the application around an existing processor
    #[must_use]
    pub fn with_processor(config: Config, options: AppOptions, processor: GazeProcessor) -> Self {
        Self {
            config,
            options,
            processor,
        }
    }

    /// Open the configured source and run until it ends or the operator quits
    ///
    /// # Errors
    ///
    /// Returns `DeviceUnavailable` if the source cannot be opened, or an
    /// `OpenCV` error from the display
    pub fn run(self) -> Result<RunSummary> {
        let capture = CaptureSource::open(&self.options.source, &self.config.capture)?;
        self.run_with_source(Box::new(capture))
    }

    /// Run the configured loop shape over an already opened frame source.
    ///
    /// The source is dropped, and so released, before this returns.
    ///
    /// # Errors
    ///
    /// Returns an `OpenCV` error from the display, or `Io` if a thread cannot
    /// be spawned
    pub fn run_with_source(self, source: Box<dyn FrameSource>) -> Result<RunSummary> {
        match self.options.mode {
            RunMode::Inline => self.run_inline(source),
            RunMode::Streaming => self.run_streaming(source),
        }
    }

    /// Blocking pull loop owning the capture device
    fn run_inline(self, mut source: Box<dyn FrameSource>) -> Result<RunSummary> {
        info!("Starting inline capture loop");
        let Self {
            config,
            options,
            processor,
        } = self;

        let viewer = Viewer::open(options.gui)?;
        let mut worker = FrameWorker::new(
            processor,
            config.processing.skip_frames,
            config.processing.resize_to_screen,
        );
        let mut monitor = AttentionMonitor::new(&config.attention);
        let mut reporter = StatusReporter::default();
        let mut frames_read = 0;

        loop {
            let frame = match source.read() {
                Ok(FrameRead::Frame(frame)) => frame,
                Ok(FrameRead::Retry) => {
                    warn!("Could not read a frame from the camera, retrying...");
                    thread::sleep(config.capture.read_retry());
                    continue;
                }
                Ok(FrameRead::EndOfStream) => {
                    info!("End of video file reached");
                    break;
                }
                Err(e) => {
                    warn!("Capture error: {e}");
                    thread::sleep(config.capture.read_retry());
                    continue;
                }
            };
            frames_read += 1;

            let processed = worker.process(&frame);
            let assessment = monitor.observe(processed.snapshot.status, Utc::now());
            reporter.report(&processed.snapshot);

            if viewer.show(processed.rendered, &processed.snapshot, &assessment)? {
                info!("Exit requested by user");
                break;
            }
        }

        drop(source);
        Ok(RunSummary::finish(
            CaptureStats {
                frames_read,
                frames_dropped: 0,
            },
            worker.frame_index(),
            &monitor,
        ))
    }

    /// Capture thread, worker thread and a timer-driven polling loop
    fn run_streaming(self, mut source: Box<dyn FrameSource>) -> Result<RunSummary> {
        info!("Starting streaming capture loop");
        let Self {
            config,
            options,
            processor,
        } = self;

        let viewer = Viewer::open(options.gui)?;

        let stop = Arc::new(AtomicBool::new(false));
        let cell = SnapshotCell::new(StatusSnapshot::waiting(Utc::now()));
        let slot = FrameSlot::new();
        let (frame_tx, frame_rx) = bounded::<Mat>(FRAME_CHANNEL_CAPACITY);

        let capture_handle = {
            let stop = Arc::clone(&stop);
            let retry = config.capture.read_retry();
            thread::Builder::new().name("capture".to_string()).spawn(move || {
                let mut stats = CaptureStats::default();
                while !stop.load(Ordering::Relaxed) {
                    match source.read() {
                        Ok(FrameRead::Frame(frame)) => {
                            stats.frames_read += 1;
                            match frame_tx.try_send(frame) {
                                Ok(()) => {}
                                Err(TrySendError::Full(_)) => stats.frames_dropped += 1,
                                Err(TrySendError::Disconnected(_)) => break,
                            }
                        }
                        Ok(FrameRead::Retry) => {
                            warn!("Could not read a frame from the camera, retrying...");
                            thread::sleep(retry);
                        }
                        Ok(FrameRead::EndOfStream) => {
                            info!("End of video file reached");
                            break;
                        }
                        Err(e) => {
                            warn!("Capture error: {e}");
                            thread::sleep(retry);
                        }
                    }
                }
                drop(source);
                stats
            })?
        };

        let worker_handle = {
            let stop = Arc::clone(&stop);
            let cell = cell.clone();
            let slot = slot.clone();
            let mut worker = FrameWorker::new(
                processor,
                config.processing.skip_frames,
                config.processing.resize_to_screen,
            );
            thread::Builder::new().name("gaze-worker".to_string()).spawn(move || {
                for frame in &frame_rx {
                    if stop.load(Ordering::Relaxed) {
                        break;
                    }
                    let processed = worker.process(&frame);
                    if let Some(rendered) = processed.rendered {
                        slot.put(rendered);
                    }
                    cell.publish(processed.snapshot);
                }
                debug!("Gaze worker finished after {} frames", worker.frame_index());
                worker.frame_index()
            })?
        };

        let mut monitor = AttentionMonitor::new(&config.attention);
        let mut reporter = StatusReporter::default();
        let ticker = tick(config.attention.poll_interval());

        let result = loop {
            if ticker.recv().is_err() {
                break Ok(());
            }

            let snapshot = cell.latest();
            let assessment = monitor.observe(snapshot.status, Utc::now());
            reporter.report(&snapshot);

            match viewer.show(slot.take(), &snapshot, &assessment) {
                Ok(true) => {
                    info!("Exit requested by user");
                    break Ok(());
                }
                Ok(false) => {}
                Err(e) => break Err(e),
            }

            if capture_handle.is_finished() && worker_handle.is_finished() {
                break Ok(());
            }
        };

        stop.store(true, Ordering::Relaxed);
        let stats = capture_handle.join().unwrap_or_else(|_| {
            error!("Capture thread panicked");
            CaptureStats::default()
        });
        let frames_processed = worker_handle.join().unwrap_or_else(|_| {
            error!("Gaze worker thread panicked");
            0
        });

        result.map(|()| RunSummary::finish(stats, frames_processed, &monitor))
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct CaptureStats {
    frames_read: u64,
    frames_dropped: u64,
}

/// What a finished run saw
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Frames delivered by the source
    pub frames_read: u64,
    /// Frames handed to the gaze pipeline
    pub frames_processed: u64,
    /// Frames discarded because the worker was busy
    pub frames_dropped: u64,
    /// Alerts logged during the session, oldest first
    pub history: Vec<CheatEvent>,
}

impl RunSummary {
    fn finish(stats: CaptureStats, frames_processed: u64, monitor: &AttentionMonitor) -> Self {
        if stats.frames_dropped > 0 {
            info!("{} frames dropped while the worker was busy", stats.frames_dropped);
        }
        log_history(monitor);
        info!("Application shutting down");

        Self {
            frames_read: stats.frames_read,
            frames_processed,
            frames_dropped: stats.frames_dropped,
            history: monitor.history().cloned().collect(),
        }
    }
}

/// Optional highgui window
struct Viewer {
    gui: GuiMode,
}

impl Viewer {
    fn open(gui: GuiMode) -> Result<Self> {
        if gui == GuiMode::Window {
            highgui::named_window(WINDOW_NAME, WINDOW_NORMAL)?;
        }
        Ok(Self { gui })
    }

    /// Show a frame; returns true when the operator asked to quit
    fn show(&self, frame: Option<Mat>, snapshot: &StatusSnapshot, assessment: &Assessment) -> Result<bool> {
        if self.gui != GuiMode::Window {
            return Ok(false);
        }

        if let Some(mut frame) = frame {
            let text = match assessment {
                Assessment::Deviating { .. } | Assessment::Alert { .. } => assessment.message(),
                _ => snapshot.message.clone(),
            };
            overlay::draw_status(&mut frame, snapshot.status, &text)?;
            highgui::imshow(WINDOW_NAME, &frame)?;
        }

        let key = highgui::wait_key(1)?;
        Ok(key == 27 || key == i32::from(b'q'))
    }
}

impl Drop for Viewer {
    fn drop(&mut self) {
        if self.gui == GuiMode::Window {
            if let Err(e) = highgui::destroy_all_windows() {
                warn!("Failed to close display window: {e}");
            }
        }
    }
}

/// Logs status transitions
#[derive(Default)]
struct StatusReporter {
    last_status: Option<AttentionStatus>,
}

impl StatusReporter {
    fn report(&mut self, snapshot: &StatusSnapshot) {
        if self.last_status != Some(snapshot.status) {
            info!("Status {}: {}", snapshot.status, snapshot.message);
            self.last_status = Some(snapshot.status);
        }
        if let Some(gaze) = snapshot.gaze {
            debug!("Frame {} gaze {gaze}", snapshot.frame_index);
        }
    }
}

/// Print the alert history table
fn log_history(monitor: &AttentionMonitor) {
    let rows = monitor.history_rows();
    if rows.is_empty() {
        info!("No gaze-away alerts recorded");
        return;
    }

    info!("Alert history ({} entries):", rows.len());
    for row in rows {
        info!("  {}  {}  {}", row.time, row.label, row.duration);
    }
}
