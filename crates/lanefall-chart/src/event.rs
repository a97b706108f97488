use std::fmt;

/// Width of the legacy column coordinate space used by event records.
pub const COLUMN_SPACE: i64 = 512;

/// A single authored note: which lane it falls in and when it must be hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChartEvent {
    pub lane: usize,
    pub timestamp_ms: i64,
}

impl ChartEvent {
    pub fn new(lane: usize, timestamp_ms: i64) -> Self {
        Self { lane, timestamp_ms }
    }
}

/// Number of lanes (keys) a chart is authored for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LaneCount(usize);

impl LaneCount {
    pub const MAX: usize = COLUMN_SPACE as usize;

    /// Returns `None` unless `1 <= count <= 512`.
    pub fn new(count: usize) -> Option<Self> {
        (1..=Self::MAX).contains(&count).then_some(Self(count))
    }

    pub fn get(self) -> usize {
        self.0
    }

    /// Map a legacy column coordinate onto a lane index.
    ///
    /// Computes `floor(column / (512 / K))` with exact rational division, i.e.
    /// `column * K / 512` in integers, so every column in `[0, 512)` lands in
    /// `[0, K)` even when 512 is not a multiple of K. Returns `None` for
    /// columns outside the coordinate space.
    pub fn lane_for_column(self, column: i64) -> Option<usize> {
        if !(0..COLUMN_SPACE).contains(&column) {
            return None;
        }
        Some((column * self.0 as i64 / COLUMN_SPACE) as usize)
    }

    /// Iterate over every lane index.
    pub fn lanes(self) -> std::ops::Range<usize> {
        0..self.0
    }
}

impl fmt::Display for LaneCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}K", self.0)
    }
}
