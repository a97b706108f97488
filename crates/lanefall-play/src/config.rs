use std::fs;
use std::path::Path;

use anyhow::Result;
use lanefall_chart::LaneCount;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::render::Color;

/// Display columns and colour of a single lane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneStyle {
    pub columns: Vec<i32>,
    pub color: Color,
}

impl LaneStyle {
    pub fn new(columns: impl Into<Vec<i32>>, color: Color) -> Self {
        Self {
            columns: columns.into(),
            color,
        }
    }
}

/// Lane → display mapping for charts declaring `lane_count` lanes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneLayout {
    pub lane_count: usize,
    pub lanes: Vec<LaneStyle>,
}

impl LaneLayout {
    pub fn four_key() -> Self {
        Self::from_styles(vec![
            LaneStyle::new([0, 1], Color::PURPLE),
            LaneStyle::new([3, 4], Color::GREEN),
            LaneStyle::new([6, 7], Color::BLUE),
            LaneStyle::new([9, 10], Color::CYAN),
        ])
    }

    pub fn five_key() -> Self {
        Self::from_styles(vec![
            LaneStyle::new([0, 1], Color::PURPLE),
            LaneStyle::new([2, 3], Color::GREEN),
            LaneStyle::new([5], Color::RED),
            LaneStyle::new([7, 8], Color::BLUE),
            LaneStyle::new([9, 10], Color::CYAN),
        ])
    }

    pub fn seven_key() -> Self {
        Self::from_styles(vec![
            LaneStyle::new([0], Color::PURPLE),
            LaneStyle::new([2], Color::GREEN),
            LaneStyle::new([4], Color::BLUE),
            LaneStyle::new([5], Color::RED),
            LaneStyle::new([6], Color::BLUE),
            LaneStyle::new([8], Color::GREEN),
            LaneStyle::new([10], Color::PURPLE),
        ])
    }

    pub fn nine_key() -> Self {
        Self::from_styles(vec![
            LaneStyle::new([0], Color::WHITE),
            LaneStyle::new([1], Color::YELLOW),
            LaneStyle::new([2], Color::GREEN),
            LaneStyle::new([3], Color::BLUE),
            LaneStyle::new([5], Color::RED),
            LaneStyle::new([7], Color::BLUE),
            LaneStyle::new([8], Color::GREEN),
            LaneStyle::new([9], Color::YELLOW),
            LaneStyle::new([10], Color::WHITE),
        ])
    }

    fn from_styles(lanes: Vec<LaneStyle>) -> Self {
        Self {
            lane_count: lanes.len(),
            lanes,
        }
    }

    fn validate(&self) -> Result<(), EngineError> {
        if self.lanes.len() != self.lane_count {
            return Err(EngineError::InvalidConfig(format!(
                "layout for {} lanes defines {} lanes",
                self.lane_count,
                self.lanes.len()
            )));
        }
        if let Some(lane) = self.lanes.iter().position(|s| s.columns.is_empty()) {
            return Err(EngineError::InvalidConfig(format!(
                "layout for {} lanes: lane {lane} has no display columns",
                self.lane_count
            )));
        }
        Ok(())
    }
}

/// Engine tuning and display configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Track length in display units (spawn position of a note).
    pub track_width: f64,
    /// Time for a note to travel the whole track.
    pub scroll_time_ms: i64,
    /// How far ahead of its target time an event is admitted.
    pub lookahead_ms: i64,
    /// Maximum |press - target| for a press to hit a note.
    pub hit_window_ms: i64,
    /// How long past its target a note stays on the track before expiring.
    /// Never shorter than `hit_window_ms` in effect.
    pub miss_window_ms: i64,
    /// Capacity of the producer → scheduler buffer.
    pub buffer_capacity: usize,
    /// Consumer tick interval.
    pub tick_interval_ms: u64,
    pub layouts: Vec<LaneLayout>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            track_width: 53.0,
            scroll_time_ms: 800,
            lookahead_ms: 800,
            hit_window_ms: 200,
            miss_window_ms: 200,
            buffer_capacity: 180,
            tick_interval_ms: 16,
            layouts: vec![
                LaneLayout::four_key(),
                LaneLayout::five_key(),
                LaneLayout::seven_key(),
                LaneLayout::nine_key(),
            ],
        }
    }
}

impl EngineConfig {
    /// Loads config from a specified path.
    /// Returns default config if file doesn't exist.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::read(path)
    }

    /// Read and validate config from a JSON file.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Saves config to a specified path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        let invalid = |msg: String| Err(EngineError::InvalidConfig(msg));

        if !(self.track_width.is_finite() && self.track_width > 0.0) {
            return invalid(format!("track_width must be positive, got {}", self.track_width));
        }
        if self.scroll_time_ms <= 0 {
            return invalid(format!("scroll_time_ms must be positive, got {}", self.scroll_time_ms));
        }
        if self.lookahead_ms < self.scroll_time_ms {
            return invalid(format!(
                "lookahead_ms ({}) must cover scroll_time_ms ({})",
                self.lookahead_ms, self.scroll_time_ms
            ));
        }
        if self.hit_window_ms < 0 || self.miss_window_ms < 0 {
            return invalid("judgment windows must not be negative".to_string());
        }
        if self.buffer_capacity == 0 {
            return invalid("buffer_capacity must be at least 1".to_string());
        }
        if self.tick_interval_ms == 0 {
            return invalid("tick_interval_ms must be at least 1".to_string());
        }
        self.layouts.iter().try_for_each(LaneLayout::validate)
    }

    /// Layout for a chart's declared lane count.
    pub fn layout_for(&self, lanes: LaneCount) -> Result<&LaneLayout, EngineError> {
        self.layouts
            .iter()
            .find(|l| l.lane_count == lanes.get())
            .ok_or(EngineError::UnsupportedLaneCount(lanes.get()))
    }

    /// Track units travelled per millisecond.
    pub fn scroll_speed(&self) -> f64 {
        self.track_width / self.scroll_time_ms as f64
    }
}
