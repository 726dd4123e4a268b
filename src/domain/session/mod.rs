//! Recording session domain module

mod state;

pub use state::{
    InvalidStateTransition, RecordingSession, SessionState, StoppedSession, Transition,
};
