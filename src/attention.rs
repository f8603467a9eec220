//! Attention state machine turning per-poll statuses into debounced alerts.
//!
//! The monitor is driven by a polling loop that hands it the latest observed
//! status; statuses between two polls are never seen. A deviation timer starts
//! when the status becomes `Cheating` and is cleared by any other status, so a
//! single non-cheating poll restarts the count from zero.

use crate::config::{AttentionConfig, ScreenConfig};
use crate::constants::DEVIATION_EVENT_LABEL;
use crate::gaze_processor::GazePoint;
use chrono::{DateTime, Local, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

/// Status of the monitored subject as seen by one poll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttentionStatus {
    /// Subject needs guidance, e.g. during start-up
    Instruction,
    /// Gaze is on screen
    Ok,
    /// Gaze is off screen or no face is visible
    Cheating,
    /// Frame processing failed
    Error,
    /// No video stream yet
    Waiting,
}

impl AttentionStatus {
    /// Upper-case label used in overlays and logs
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Instruction => "INSTRUCTION",
            Self::Ok => "OK",
            Self::Cheating => "CHEATING",
            Self::Error => "ERROR",
            Self::Waiting => "WAITING",
        }
    }
}

impl fmt::Display for AttentionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Classify one gaze estimate.
///
/// No gaze, or a gaze outside the screen, is a cheating candidate.
#[must_use]
pub fn classify_gaze(gaze: Option<GazePoint>, screen: ScreenConfig) -> AttentionStatus {
    match gaze {
        Some(point) if point.is_on_screen(screen) => AttentionStatus::Ok,
        _ => AttentionStatus::Cheating,
    }
}

/// One logged alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheatEvent {
    /// When the alert was logged
    pub timestamp: DateTime<Utc>,
    /// Alert kind
    pub label: String,
    /// Continuous deviation at logging time
    pub duration: Duration,
}

/// Display row of the alert history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRow {
    /// Local wall-clock time, `HH:MM:SS`
    pub time: String,
    /// Alert kind
    pub label: String,
    /// Deviation with one decimal, e.g. `3.0s`
    pub duration: String,
}

impl CheatEvent {
    /// Format the event for the history table
    #[must_use]
    pub fn to_row(&self) -> HistoryRow {
        HistoryRow {
            time: self.timestamp.with_timezone(&Local).format("%H:%M:%S").to_string(),
            label: self.label.clone(),
            duration: format!("{:.1}s", self.duration.as_secs_f64()),
        }
    }
}

/// Outcome of one poll, rendered by the UI layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assessment {
    /// No stream yet
    Waiting,
    /// Subject needs guidance
    Instruction,
    /// Gaze on screen
    Ok,
    /// Processing failed this poll
    Error,
    /// Deviating, threshold not reached
    Deviating {
        /// Continuous deviation so far
        elapsed: Duration,
    },
    /// Deviation reached the threshold
    Alert {
        /// Continuous deviation so far
        elapsed: Duration,
        /// Whether this poll appended a history event
        logged: bool,
    },
}

impl Assessment {
    /// Whether an alert is active
    #[must_use]
    pub const fn is_alert(&self) -> bool {
        matches!(self, Self::Alert { .. })
    }

    /// Human-readable summary of the assessment
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Waiting => "Waiting for the webcam stream...".to_string(),
            Self::Instruction => "Move your face to the center of the screen.".to_string(),
            Self::Ok => "Gaze on screen".to_string(),
            Self::Error => "Frame processing error".to_string(),
            Self::Deviating { elapsed } => {
                format!("Attention: deviation, count {:.1}s", elapsed.as_secs_f64())
            }
            Self::Alert { elapsed, .. } => {
                format!("Gaze away! Continuous time: {:.1}s", elapsed.as_secs_f64())
            }
        }
    }
}

/// Debounced gaze-away alert state machine
#[derive(Debug, Clone)]
pub struct AttentionMonitor {
    threshold: Duration,
    debounce: Duration,
    history_limit: usize,
    status: AttentionStatus,
    deviation_start: Option<DateTime<Utc>>,
    history: VecDeque<CheatEvent>,
}

impl Default for AttentionMonitor {
    fn default() -> Self {
        Self::new(&AttentionConfig::default())
    }
}

impl AttentionMonitor {
    /// Create a monitor in the `Waiting` state with an empty history
    #[must_use]
    pub fn new(config: &AttentionConfig) -> Self {
        Self {
            threshold: seconds(config.cheat_threshold_secs),
            debounce: seconds(config.debounce_secs),
            history_limit: config.history_limit.max(1),
            status: AttentionStatus::Waiting,
            deviation_start: None,
            history: VecDeque::new(),
        }
    }

    /// Consume the latest status observed at `now`
    pub fn observe(&mut self, status: AttentionStatus, now: DateTime<Utc>) -> Assessment {
        self.status = status;

        match status {
            AttentionStatus::Cheating => self.observe_deviation(now),
            AttentionStatus::Instruction => self.clear(Assessment::Instruction),
            AttentionStatus::Ok => self.clear(Assessment::Ok),
            AttentionStatus::Error => self.clear(Assessment::Error),
            AttentionStatus::Waiting => self.clear(Assessment::Waiting),
        }
    }

    fn clear(&mut self, assessment: Assessment) -> Assessment {
        self.deviation_start = None;
        assessment
    }

    fn observe_deviation(&mut self, now: DateTime<Utc>) -> Assessment {
        let start = *self.deviation_start.get_or_insert(now);
        let elapsed = span(start, now);

        if elapsed < self.threshold {
            return Assessment::Deviating { elapsed };
        }

        let logged = self.should_log(now);
        if logged {
            self.push_event(CheatEvent {
                timestamp: now,
                label: DEVIATION_EVENT_LABEL.to_string(),
                duration: elapsed,
            });
        }

        Assessment::Alert { elapsed, logged }
    }

    fn should_log(&self, now: DateTime<Utc>) -> bool {
        self.history
            .back()
            .map_or(true, |last| span(last.timestamp, now) > self.debounce)
    }

    fn push_event(&mut self, event: CheatEvent) {
        warn!(
            "Gaze-away alert: {} after {:.1}s",
            event.label,
            event.duration.as_secs_f64()
        );
        self.history.push_back(event);
        while self.history.len() > self.history_limit {
            self.history.pop_front();
        }
    }

    /// Most recently observed status
    #[must_use]
    pub const fn current_status(&self) -> AttentionStatus {
        self.status
    }

    /// Start of the ongoing deviation, if any
    #[must_use]
    pub const fn deviation_start(&self) -> Option<DateTime<Utc>> {
        self.deviation_start
    }

    /// Length of the ongoing deviation at `now`, zero when not deviating
    #[must_use]
    pub fn deviation_elapsed(&self, now: DateTime<Utc>) -> Duration {
        self.deviation_start.map_or(Duration::ZERO, |start| span(start, now))
    }

    /// Logged alerts, oldest first
    pub fn history(&self) -> impl Iterator<Item = &CheatEvent> {
        self.history.iter()
    }

    /// Number of logged alerts
    #[must_use]
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Most recent alert
    #[must_use]
    pub fn last_event(&self) -> Option<&CheatEvent> {
        self.history.back()
    }

    /// History formatted for display
    #[must_use]
    pub fn history_rows(&self) -> Vec<HistoryRow> {
        self.history.iter().map(CheatEvent::to_row).collect()
    }

    /// Return to `Waiting` and drop the history
    pub fn reset(&mut self) {
        info!("Attention monitor reset, {} alerts discarded", self.history.len());
        self.status = AttentionStatus::Waiting;
        self.deviation_start = None;
        self.history.clear();
    }
}

/// Configured seconds as a `Duration`; negative or NaN is zero, overflow saturates
fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value.max(0.0)).unwrap_or(Duration::MAX)
}

/// Non-negative time between two instants; clock steps backwards count as zero
fn span(from: DateTime<Utc>, to: DateTime<Utc>) -> Duration {
    (to - from).to_std().unwrap_or(Duration::ZERO)
}
