//! Latest-snapshot sharing between the frame worker and the polling loop.
//!
//! The worker publishes whole immutable [`StatusSnapshot`]s; readers clone the
//! current `Arc`. A reader therefore never sees a status from one frame paired
//! with coordinates from another. Intermediate snapshots published between two
//! reads are skipped.

use crate::attention::AttentionStatus;
use crate::gaze_processor::GazePoint;
use chrono::{DateTime, Utc};
use opencv::core::Mat;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;

/// Immutable per-frame status published by the frame worker
#[derive(Debug, Clone, PartialEq)]
pub struct StatusSnapshot {
    /// Classification of the frame
    pub status: AttentionStatus,
    /// Message for the operator
    pub message: String,
    /// Gaze estimate of the frame, if any
    pub gaze: Option<GazePoint>,
    /// When the frame was processed
    pub timestamp: DateTime<Utc>,
    /// Sequence number of the frame that produced the snapshot
    pub frame_index: u64,
}

impl StatusSnapshot {
    /// Snapshot published before any frame arrives
    #[must_use]
    pub fn waiting(now: DateTime<Utc>) -> Self {
        Self {
            status: AttentionStatus::Waiting,
            message: "Waiting for the webcam stream...".to_string(),
            gaze: None,
            timestamp: now,
            frame_index: 0,
        }
    }
}

/// Atomically replaced holder of the latest snapshot
#[derive(Debug, Clone)]
pub struct SnapshotCell {
    inner: Arc<RwLock<Arc<StatusSnapshot>>>,
}

impl SnapshotCell {
    /// Create a cell holding `initial`
    #[must_use]
    pub fn new(initial: StatusSnapshot) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(initial))),
        }
    }

    /// Replace the current snapshot
    pub fn publish(&self, snapshot: StatusSnapshot) {
        *self.inner.write() = Arc::new(snapshot);
    }

    /// Current snapshot
    #[must_use]
    pub fn latest(&self) -> Arc<StatusSnapshot> {
        Arc::clone(&self.inner.read())
    }
}

/// Latest rendered frame, handed from the worker to the display thread
#[derive(Clone, Default)]
pub struct FrameSlot {
    inner: Arc<Mutex<Option<Mat>>>,
}

impl FrameSlot {
    /// Create an empty slot
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored frame
    pub fn put(&self, frame: Mat) {
        *self.inner.lock() = Some(frame);
    }

    /// Take the stored frame, leaving the slot empty
    #[must_use]
    pub fn take(&self) -> Option<Mat> {
        self.inner.lock().take()
    }
}
