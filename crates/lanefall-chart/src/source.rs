use std::io::{BufRead, Cursor};
use std::iter::FusedIterator;
use std::sync::Arc;

use log::debug;

use crate::{ChartEvent, LaneCount, ParseError};

/// Header key declaring the lane count.
pub const LANE_COUNT_KEY: &str = "CircleSize:";

/// Line that opens the event section.
pub const EVENT_SECTION_MARKER: &str = "[HitObjects]";

/// Minimum number of comma-separated fields in an event record.
const MIN_EVENT_FIELDS: usize = 3;

/// Lazy, single-pass reader over a chart's events.
///
/// The header is consumed eagerly by [`ChartSource::new`]; events are decoded
/// one line at a time as the iterator is pulled. Malformed records are
/// fail-fast: the offending line is reported once as
/// [`ParseError::MalformedEvent`] and the iterator is fused afterwards.
pub struct ChartSource<R> {
    reader: R,
    lane_count: LaneCount,
    line: String,
    line_no: usize,
    last_timestamp: Option<i64>,
    emitted: usize,
    done: bool,
}

impl<R: BufRead> ChartSource<R> {
    /// Read the chart header up to the event section.
    pub fn new(mut reader: R) -> Result<Self, ParseError> {
        let mut line = String::new();
        let mut line_no = 0;
        let mut lane_count = None;
        let mut in_events = false;

        loop {
            line.clear();
            if reader.read_line(&mut line)? == 0 {
                break;
            }
            line_no += 1;
            let trimmed = line.trim();

            if trimmed == EVENT_SECTION_MARKER {
                in_events = true;
                break;
            }
            if let Some(value) = trimmed.strip_prefix(LANE_COUNT_KEY) {
                lane_count = Some(parse_lane_count(value.trim(), line_no)?);
            }
        }

        let lane_count = lane_count.ok_or(ParseError::MissingLaneCount)?;
        debug!("chart header: {lane_count}, event section at line {line_no}");

        Ok(Self {
            reader,
            lane_count,
            line,
            line_no,
            last_timestamp: None,
            emitted: 0,
            done: !in_events,
        })
    }

    /// Lane count declared by the header.
    pub fn lane_count(&self) -> LaneCount {
        self.lane_count
    }

    /// Number of events yielded so far.
    pub fn emitted(&self) -> usize {
        self.emitted
    }
}

impl<'a> ChartSource<Cursor<&'a [u8]>> {
    pub fn from_text(text: &'a str) -> Result<Self, ParseError> {
        Self::new(Cursor::new(text.as_bytes()))
    }
}

impl ChartSource<Cursor<Arc<[u8]>>> {
    /// Read from a shared in-memory chart, e.g. one handed to a producer thread.
    pub fn from_shared(bytes: Arc<[u8]>) -> Result<Self, ParseError> {
        Self::new(Cursor::new(bytes))
    }
}

impl<R: BufRead> Iterator for ChartSource<R> {
    type Item = Result<ChartEvent, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            self.line.clear();
            match self.reader.read_line(&mut self.line) {
                Ok(0) => {
                    self.done = true;
                    return None;
                }
                Ok(_) => {}
                Err(e) => {
                    self.done = true;
                    return Some(Err(ParseError::Io(e)));
                }
            }
            self.line_no += 1;

            let record = self.line.trim();
            if record.is_empty() {
                continue;
            }

            return match parse_event(record, self.line_no, self.lane_count, self.last_timestamp) {
                Ok(event) => {
                    self.last_timestamp = Some(event.timestamp_ms);
                    self.emitted += 1;
                    Some(Ok(event))
                }
                Err(e) => {
                    self.done = true;
                    Some(Err(e))
                }
            };
        }
    }
}

impl<R: BufRead> FusedIterator for ChartSource<R> {}

/// Shape of a chart established by a full validation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartSummary {
    pub lane_count: LaneCount,
    pub event_count: usize,
    pub first_ms: Option<i64>,
    pub last_ms: Option<i64>,
}

/// Walk an entire chart without retaining its events.
pub fn validate<R: BufRead>(reader: R) -> Result<ChartSummary, ParseError> {
    let mut source = ChartSource::new(reader)?;
    let mut first_ms = None;
    let mut last_ms = None;

    for event in source.by_ref() {
        let event = event?;
        first_ms.get_or_insert(event.timestamp_ms);
        last_ms = Some(event.timestamp_ms);
    }

    Ok(ChartSummary {
        lane_count: source.lane_count(),
        event_count: source.emitted(),
        first_ms,
        last_ms,
    })
}

fn parse_lane_count(value: &str, line: usize) -> Result<LaneCount, ParseError> {
    let invalid = || ParseError::InvalidLaneCount {
        line,
        value: value.to_string(),
    };

    let count = match value.parse::<usize>() {
        Ok(count) => count,
        // Some editors write the key count as a float ("7.0").
        Err(_) => {
            let float: f64 = value.parse().map_err(|_| invalid())?;
            if float.fract() != 0.0 || float < 0.0 {
                return Err(invalid());
            }
            float as usize
        }
    };

    LaneCount::new(count).ok_or_else(invalid)
}

fn parse_event(
    record: &str,
    line: usize,
    lane_count: LaneCount,
    last_timestamp: Option<i64>,
) -> Result<ChartEvent, ParseError> {
    let fields: Vec<&str> = record.split(',').map(str::trim).collect();
    if fields.len() < MIN_EVENT_FIELDS {
        return Err(ParseError::malformed(
            line,
            format!("expected at least {MIN_EVENT_FIELDS} fields, found {}", fields.len()),
        ));
    }

    let column: i64 = fields[0]
        .parse()
        .map_err(|_| ParseError::malformed(line, format!("column {:?} is not an integer", fields[0])))?;
    let lane = lane_count
        .lane_for_column(column)
        .ok_or_else(|| ParseError::malformed(line, format!("column {column} outside [0, 512)")))?;

    let timestamp_ms: i64 = fields[2]
        .parse()
        .map_err(|_| ParseError::malformed(line, format!("timestamp {:?} is not an integer", fields[2])))?;
    if timestamp_ms < 0 {
        return Err(ParseError::malformed(line, format!("timestamp {timestamp_ms} is negative")));
    }
    if let Some(last) = last_timestamp {
        if timestamp_ms < last {
            return Err(ParseError::malformed(
                line,
                format!("timestamp decreases ({timestamp_ms} after {last})"),
            ));
        }
    }

    Ok(ChartEvent { lane, timestamp_ms })
}
