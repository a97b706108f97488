use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::config::LaneLayout;
use crate::note::Note;

/// 8-bit RGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Self = Self::new(0, 0, 0);
    pub const WHITE: Self = Self::new(255, 255, 255);
    pub const PURPLE: Self = Self::new(255, 0, 255);
    pub const GREEN: Self = Self::new(0, 255, 0);
    pub const BLUE: Self = Self::new(0, 0, 255);
    pub const CYAN: Self = Self::new(0, 255, 255);
    pub const RED: Self = Self::new(255, 0, 0);
    pub const YELLOW: Self = Self::new(255, 255, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Same hue at a fraction of the brightness.
    pub fn dimmed(self, factor: f32) -> Self {
        let scale = |c: u8| (c as f32 * factor.clamp(0.0, 1.0)).round() as u8;
        Self::new(scale(self.r), scale(self.g), scale(self.b))
    }
}

/// Abstraction over the pixel display.
/// Implementations: CommandRecorder (testing), the binary's text panel.
pub trait FrameSink {
    fn clear(&mut self);
    fn set_color(&mut self, color: Color);
    fn draw_point(&mut self, x: i32, y: i32);
    fn present(&mut self) -> Result<()>;
}

impl<T: FrameSink + ?Sized> FrameSink for &mut T {
    fn clear(&mut self) {
        (**self).clear();
    }

    fn set_color(&mut self, color: Color) {
        (**self).set_color(color);
    }

    fn draw_point(&mut self, x: i32, y: i32) {
        (**self).draw_point(x, y);
    }

    fn present(&mut self) -> Result<()> {
        (**self).present()
    }
}

/// Turns the visible note set into draw calls using a lane layout.
///
/// `x` runs along the track (0 is the judgment line), `y` selects the lane's
/// display columns.
#[derive(Debug, Clone)]
pub struct FrameRenderer {
    layout: LaneLayout,
    track_width: f64,
    receptor_dim: f32,
}

impl FrameRenderer {
    const RECEPTOR_DIM: f32 = 0.25;

    pub fn new(layout: LaneLayout, track_width: f64) -> Self {
        Self {
            layout,
            track_width,
            receptor_dim: Self::RECEPTOR_DIM,
        }
    }

    pub fn layout(&self) -> &LaneLayout {
        &self.layout
    }

    /// Draw one frame and present it. Returns the number of note points drawn.
    pub fn draw<'a, S, I>(&self, sink: &mut S, notes: I) -> Result<usize>
    where
        S: FrameSink + ?Sized,
        I: IntoIterator<Item = &'a Note>,
    {
        sink.clear();

        for style in &self.layout.lanes {
            sink.set_color(style.color.dimmed(self.receptor_dim));
            for &y in &style.columns {
                sink.draw_point(0, y);
            }
        }

        let mut points = 0;
        for note in notes {
            let Some(style) = self.layout.lanes.get(note.lane()) else {
                continue;
            };
            let Some(x) = self.column_for(note.scroll_position()) else {
                continue;
            };
            sink.set_color(style.color);
            for &y in &style.columns {
                sink.draw_point(x, y);
                points += 1;
            }
        }

        sink.present()?;
        Ok(points)
    }

    /// Track column for a scroll position, if it lies on the display.
    fn column_for(&self, scroll_position: f64) -> Option<i32> {
        let x = scroll_position.floor();
        (x >= 0.0 && x < self.track_width).then_some(x as i32)
    }
}

/// Recorded draw command for testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawCommand {
    Clear,
    SetColor(Color),
    Point { x: i32, y: i32 },
    Present,
}

/// A FrameSink that records draw commands for snapshot testing.
#[derive(Debug, Default)]
pub struct CommandRecorder {
    commands: Vec<DrawCommand>,
    frames: usize,
}

impl CommandRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded commands.
    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Number of presented frames.
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Commands of the most recent frame (from its `Clear` through `Present`).
    pub fn last_frame(&self) -> &[DrawCommand] {
        let start = self
            .commands
            .iter()
            .rposition(|c| *c == DrawCommand::Clear)
            .unwrap_or(0);
        &self.commands[start..]
    }

    /// Points of the most recent frame with the colour they were drawn in.
    pub fn last_frame_points(&self) -> Vec<(Color, i32, i32)> {
        let mut color = Color::BLACK;
        let mut points = Vec::new();
        for command in self.last_frame() {
            match *command {
                DrawCommand::SetColor(c) => color = c,
                DrawCommand::Point { x, y } => points.push((color, x, y)),
                DrawCommand::Clear | DrawCommand::Present => {}
            }
        }
        points
    }

    /// Clear recorded commands.
    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }
}

impl FrameSink for CommandRecorder {
    fn clear(&mut self) {
        self.commands.push(DrawCommand::Clear);
    }

    fn set_color(&mut self, color: Color) {
        self.commands.push(DrawCommand::SetColor(color));
    }

    fn draw_point(&mut self, x: i32, y: i32) {
        self.commands.push(DrawCommand::Point { x, y });
    }

    fn present(&mut self) -> Result<()> {
        self.commands.push(DrawCommand::Present);
        self.frames += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::note::NoteId;

    fn renderer() -> FrameRenderer {
        FrameRenderer::new(LaneLayout::four_key(), 53.0)
    }

    #[test]
    fn empty_frame_draws_receptors_only() {
        let mut sink = CommandRecorder::new();
        let drawn = renderer().draw(&mut sink, std::iter::empty()).unwrap();

        assert_eq!(drawn, 0);
        assert_eq!(sink.frames(), 1);
        assert_eq!(sink.commands().first(), Some(&DrawCommand::Clear));
        assert_eq!(sink.commands().last(), Some(&DrawCommand::Present));

        let points = sink.last_frame_points();
        assert_eq!(points.len(), 8);
        assert!(points.iter().all(|&(_, x, _)| x == 0));
        assert!(points.contains(&(Color::PURPLE.dimmed(0.25), 0, 0)));
        assert!(points.contains(&(Color::CYAN.dimmed(0.25), 0, 10)));
    }

    #[test]
    fn note_drawn_in_lane_columns_and_colour() {
        let note = Note::spawn(NoteId(0), 2, 1000, 26.7);
        let mut sink = CommandRecorder::new();
        let drawn = renderer().draw(&mut sink, [&note]).unwrap();

        assert_eq!(drawn, 2);
        let points = sink.last_frame_points();
        assert!(points.contains(&(Color::BLUE, 26, 6)));
        assert!(points.contains(&(Color::BLUE, 26, 7)));
    }

    #[test]
    fn off_track_notes_skipped() {
        let beyond = Note::spawn(NoteId(0), 0, 1000, 53.0);
        let past = Note::spawn(NoteId(1), 1, 1000, -0.5);
        let wrong_lane = Note::spawn(NoteId(2), 7, 1000, 10.0);
        let mut sink = CommandRecorder::new();

        let drawn = renderer().draw(&mut sink, [&beyond, &past, &wrong_lane]).unwrap();
        assert_eq!(drawn, 0);
    }

    #[test]
    fn last_frame_only_covers_latest_clear() {
        let note = Note::spawn(NoteId(0), 0, 1000, 5.0);
        let mut sink = CommandRecorder::new();
        let r = renderer();
        r.draw(&mut sink, [&note]).unwrap();
        r.draw(&mut sink, std::iter::empty()).unwrap();

        assert_eq!(sink.frames(), 2);
        assert!(sink.last_frame_points().iter().all(|&(_, x, _)| x == 0));
    }

    #[test]
    fn dimmed_colour() {
        assert_eq!(Color::WHITE.dimmed(0.5), Color::new(128, 128, 128));
        assert_eq!(Color::RED.dimmed(2.0), Color::RED);
    }
}
