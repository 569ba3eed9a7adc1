//! Video recording lifecycle.
//!
//! ```text
//! Idle -> Starting -> Recording <-> Paused -> Finalizing -> Finalized -> Idle
//! ```
//!
//! User commands (`start`, `pause`, `resume`, `stop`) and platform events
//! ([`RecordingEvent`]) drive the machine. Every transition yields the status
//! line shown to the user; mapping an event to that text is pure.

use crate::errors::CaptureError;
use crate::photo::MediaDestination;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordingState {
    Idle,
    Starting,
    Recording,
    Paused,
    Finalizing,
    Finalized,
}

impl RecordingState {
    pub fn name(&self) -> &'static str {
        match self {
            RecordingState::Idle => "Idle",
            RecordingState::Starting => "Starting",
            RecordingState::Recording => "Recording",
            RecordingState::Paused => "Paused",
            RecordingState::Finalizing => "Finalizing",
            RecordingState::Finalized => "Finalized",
        }
    }

    /// A recording holds the pipeline: no lens, mode or selection changes.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            RecordingState::Starting
                | RecordingState::Recording
                | RecordingState::Paused
                | RecordingState::Finalizing
        )
    }
}

impl fmt::Display for RecordingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Counters embedded in every platform recording event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingStats {
    pub bytes_recorded: u64,
    pub duration: Duration,
}

impl RecordingStats {
    pub fn new(bytes_recorded: u64, duration: Duration) -> Self {
        Self {
            bytes_recorded,
            duration,
        }
    }

    pub fn kilobytes(&self) -> u64 {
        self.bytes_recorded / 1000
    }
}

/// Tagged union of the recording events the host delivers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordingEvent {
    Start(RecordingStats),
    Status(RecordingStats),
    Pause(RecordingStats),
    Resume(RecordingStats),
    Finalize {
        stats: RecordingStats,
        output_location: String,
        error: Option<String>,
    },
}

impl RecordingEvent {
    pub fn stats(&self) -> RecordingStats {
        match self {
            RecordingEvent::Start(s)
            | RecordingEvent::Status(s)
            | RecordingEvent::Pause(s)
            | RecordingEvent::Resume(s) => *s,
            RecordingEvent::Finalize { stats, .. } => *stats,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordingSession {
    pub id: Uuid,
    pub state: RecordingState,
    pub stats: RecordingStats,
    pub destination: MediaDestination,
    pub output_location: Option<String>,
    pub audio_enabled: bool,
    pub started_at: DateTime<Utc>,
    pub error: Option<String>,
}

/// Label of the main capture button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaptureButton {
    Start,
    Pause,
    Resume,
}

/// Visibility and enablement of the recording controls for one state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Affordances {
    pub capture_button: CaptureButton,
    pub capture_enabled: bool,
    pub stop_visible: bool,
    pub stop_enabled: bool,
    pub lens_switch_enabled: bool,
    pub selectors_enabled: bool,
    pub audio_toggle_enabled: bool,
}

impl Affordances {
    pub fn for_state(state: RecordingState) -> Self {
        let idle = Self {
            capture_button: CaptureButton::Start,
            capture_enabled: true,
            stop_visible: false,
            stop_enabled: false,
            lens_switch_enabled: true,
            selectors_enabled: true,
            audio_toggle_enabled: true,
        };
        let busy = Self {
            lens_switch_enabled: false,
            selectors_enabled: false,
            audio_toggle_enabled: false,
            ..idle
        };

        match state {
            RecordingState::Idle | RecordingState::Finalized => idle,
            RecordingState::Starting => Self {
                capture_enabled: false,
                ..busy
            },
            RecordingState::Recording => Self {
                capture_button: CaptureButton::Pause,
                stop_visible: true,
                stop_enabled: true,
                ..busy
            },
            RecordingState::Paused => Self {
                capture_button: CaptureButton::Resume,
                stop_visible: true,
                stop_enabled: true,
                ..busy
            },
            RecordingState::Finalizing => Self {
                capture_enabled: false,
                stop_visible: true,
                ..busy
            },
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecordingStateMachine {
    session: Option<RecordingSession>,
}

impl RecordingStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> RecordingState {
        self.session
            .as_ref()
            .map(|s| s.state)
            .unwrap_or(RecordingState::Idle)
    }

    pub fn session(&self) -> Option<&RecordingSession> {
        self.session.as_ref()
    }

    /// Begin a fresh recording. Allowed from Idle and from a finished session.
    pub fn start(
        &mut self,
        destination: MediaDestination,
        audio_enabled: bool,
    ) -> Result<&RecordingSession, CaptureError> {
        match self.state() {
            RecordingState::Idle | RecordingState::Finalized => {}
            _ => return Err(CaptureError::AlreadyRecording),
        }

        let session = RecordingSession {
            id: Uuid::new_v4(),
            state: RecordingState::Starting,
            stats: RecordingStats::default(),
            destination,
            output_location: None,
            audio_enabled,
            started_at: Utc::now(),
            error: None,
        };
        log::info!(
            "Recording {} starting ({}, audio {})",
            session.id,
            session.destination.display_name,
            if audio_enabled { "on" } else { "off" }
        );
        Ok(self.session.insert(session))
    }

    pub fn pause(&mut self) -> Result<String, CaptureError> {
        self.command(RecordingState::Recording, RecordingState::Paused, "pause")
    }

    pub fn resume(&mut self) -> Result<String, CaptureError> {
        self.command(RecordingState::Paused, RecordingState::Recording, "resume")
    }

    pub fn stop(&mut self) -> Result<String, CaptureError> {
        let from = self.state();
        match from {
            RecordingState::Recording | RecordingState::Paused => {
                self.transition(RecordingState::Finalizing);
                Ok(self.status_text())
            }
            _ => Err(CaptureError::invalid_transition(from, "stop")),
        }
    }

    /// Drop a session the host refused to start.
    pub fn abort(&mut self, reason: &str) {
        if let Some(session) = self.session.take() {
            log::warn!("Recording {} aborted: {}", session.id, reason);
        }
    }

    /// Apply a host event and return the new status line.
    pub fn on_event(&mut self, event: RecordingEvent) -> Result<String, CaptureError> {
        let from = self.state();
        let stats = event.stats();

        match (&event, from) {
            (RecordingEvent::Start(_), RecordingState::Starting) => {
                self.transition(RecordingState::Recording);
            }
            (RecordingEvent::Finalize { output_location, error, .. }, s) if s.is_active() => {
                if let Some(session) = self.session.as_mut() {
                    session.output_location = Some(output_location.clone());
                    session.error = error.clone();
                }
                if let Some(err) = error {
                    log::error!("Recording finalized with error: {}", err);
                }
                self.transition(RecordingState::Finalized);
            }
            (
                RecordingEvent::Status(_) | RecordingEvent::Pause(_) | RecordingEvent::Resume(_),
                RecordingState::Recording | RecordingState::Paused | RecordingState::Finalizing,
            ) => {}
            (_, s) => {
                log::warn!("Ignoring {:?} while {}", event, s);
                return Err(CaptureError::invalid_transition(s, event_action(&event)));
            }
        }

        if let Some(session) = self.session.as_mut() {
            session.stats = stats;
        }
        Ok(self.status_text())
    }

    /// `"<State>: recorded <KB>KB, in <seconds>second"`, plus the saved file
    /// (or the failure) once finalized.
    pub fn status_text(&self) -> String {
        let state = self.state();
        let stats = self.session.as_ref().map(|s| s.stats).unwrap_or_default();
        let mut text = format!(
            "{}: recorded {}KB, in {}second",
            state.name(),
            stats.kilobytes(),
            stats.duration.as_secs()
        );

        if let Some(session) = self.session.as_ref().filter(|_| state == RecordingState::Finalized)
        {
            match (&session.error, &session.output_location) {
                (Some(err), _) => text.push_str(&format!("\nRecording failed: {}", err)),
                (None, Some(location)) => text.push_str(&format!("\nFile saved to: {}", location)),
                (None, None) => {}
            }
        }
        text
    }

    pub fn affordances(&self) -> Affordances {
        Affordances::for_state(self.state())
    }

    fn command(
        &mut self,
        expected: RecordingState,
        next: RecordingState,
        action: &str,
    ) -> Result<String, CaptureError> {
        let from = self.state();
        if from != expected {
            return Err(CaptureError::invalid_transition(from, action));
        }
        self.transition(next);
        Ok(self.status_text())
    }

    fn transition(&mut self, next: RecordingState) {
        if let Some(session) = self.session.as_mut() {
            log::info!("Recording {}: {} -> {}", session.id, session.state, next);
            session.state = next;
        }
    }
}

fn event_action(event: &RecordingEvent) -> &'static str {
    match event {
        RecordingEvent::Start(_) => "handle start event",
        RecordingEvent::Status(_) => "handle status event",
        RecordingEvent::Pause(_) => "handle pause event",
        RecordingEvent::Resume(_) => "handle resume event",
        RecordingEvent::Finalize { .. } => "handle finalize event",
    }
}
