//! Real-time play engine: streams chart events from a producer thread into a
//! bounded buffer, schedules falling notes against wall-clock time, judges lane
//! presses, and emits one frame per tick.

pub mod buffer;
pub mod config;
pub mod error;
pub mod judge;
pub mod note;
pub mod producer;
pub mod render;
pub mod scheduler;
pub mod session;

pub use buffer::{BufferClosed, StopSignal, StreamBuffer};
pub use config::{EngineConfig, LaneLayout, LaneStyle};
pub use error::EngineError;
pub use judge::{ComboState, JudgeEvent, JudgeStats, JudgmentEngine, TimingDirection};
pub use note::{Note, NoteId, NoteState, Verdict};
pub use producer::{run_producer, spawn_producer};
pub use render::{Color, CommandRecorder, DrawCommand, FrameRenderer, FrameSink};
pub use scheduler::{NoteScheduler, Tally, TickReport};
pub use session::{Cadence, FixedCadence, Session, SessionReport, TickSummary, run_session};
