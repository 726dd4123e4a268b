//! Recording session state machine

use std::fmt;
use thiserror::Error;

/// Session states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Recording,
    Paused,
}

impl SessionState {
    /// Get the string representation
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Recording => "recording",
            Self::Paused => "paused",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error when an invalid state transition is attempted
#[derive(Debug, Clone, Error)]
#[error("Invalid state transition: cannot {action} while {current_state}")]
pub struct InvalidStateTransition {
    pub current_state: SessionState,
    pub action: String,
}

/// Outcome of a tolerant transition (pause/resume).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The session changed state
    Applied,
    /// The call was outside its originating state and did nothing
    Ignored,
}

impl Transition {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// What a session leaves behind once it is stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoppedSession {
    /// Seconds accrued while recording
    pub elapsed_seconds: u64,
    /// Label supplied at start, if any
    pub pending_name: Option<String>,
}

/// Recording session value.
///
/// State machine:
///   IDLE -> RECORDING (start)
///   RECORDING -> PAUSED (pause)
///   PAUSED -> RECORDING (resume)
///   RECORDING | PAUSED -> IDLE (stop)
///
/// Elapsed time only moves through [`RecordingSession::tick`], and only while
/// recording. Pause and resume outside their originating state are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordingSession {
    state: SessionState,
    elapsed_seconds: u64,
    pending_name: Option<String>,
}

impl RecordingSession {
    /// Create a new session in idle state
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed_seconds
    }

    pub fn pending_name(&self) -> Option<&str> {
        self.pending_name.as_deref()
    }

    pub fn is_idle(&self) -> bool {
        self.state == SessionState::Idle
    }

    pub fn is_recording(&self) -> bool {
        self.state == SessionState::Recording
    }

    pub fn is_paused(&self) -> bool {
        self.state == SessionState::Paused
    }

    /// True while a capture is in progress (recording or paused)
    pub fn is_active(&self) -> bool {
        !self.is_idle()
    }

    /// Transition from IDLE to RECORDING.
    ///
    /// Resets the elapsed counter. A blank label counts as no label.
    pub fn start(&mut self, label: Option<String>) -> Result<(), InvalidStateTransition> {
        if self.state != SessionState::Idle {
            return Err(InvalidStateTransition {
                current_state: self.state,
                action: "start recording".to_string(),
            });
        }
        self.state = SessionState::Recording;
        self.elapsed_seconds = 0;
        self.pending_name = label
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty());
        Ok(())
    }

    /// Transition from RECORDING to PAUSED, freezing the elapsed counter
    pub fn pause(&mut self) -> Transition {
        if self.state != SessionState::Recording {
            return Transition::Ignored;
        }
        self.state = SessionState::Paused;
        Transition::Applied
    }

    /// Transition from PAUSED back to RECORDING
    pub fn resume(&mut self) -> Transition {
        if self.state != SessionState::Paused {
            return Transition::Ignored;
        }
        self.state = SessionState::Recording;
        Transition::Applied
    }

    /// Transition from RECORDING or PAUSED to IDLE.
    ///
    /// Consumes the pending name. The elapsed counter keeps its final value
    /// until the next start.
    pub fn stop(&mut self) -> Result<StoppedSession, InvalidStateTransition> {
        if self.state == SessionState::Idle {
            return Err(InvalidStateTransition {
                current_state: self.state,
                action: "stop recording".to_string(),
            });
        }
        self.state = SessionState::Idle;
        Ok(StoppedSession {
            elapsed_seconds: self.elapsed_seconds,
            pending_name: self.pending_name.take(),
        })
    }

    /// Return to IDLE after a start the device refused to honour
    pub fn abandon(&mut self) {
        self.state = SessionState::Idle;
        self.elapsed_seconds = 0;
        self.pending_name = None;
    }

    /// Accrue one second. Returns false (and changes nothing) unless recording.
    pub fn tick(&mut self) -> bool {
        if self.state != SessionState::Recording {
            return false;
        }
        self.elapsed_seconds = self.elapsed_seconds.saturating_add(1);
        true
    }
}
