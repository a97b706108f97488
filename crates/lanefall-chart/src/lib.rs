//! Chart model and streaming chart reader.
//!
//! A chart is a small text header declaring the lane count followed by a
//! `[HitObjects]` section of comma-separated event records. Events are read
//! lazily, one line at a time, in file order.

mod error;
mod event;
mod source;

pub use error::ParseError;
pub use event::{COLUMN_SPACE, ChartEvent, LaneCount};
pub use source::{ChartSource, ChartSummary, EVENT_SECTION_MARKER, LANE_COUNT_KEY, validate};
