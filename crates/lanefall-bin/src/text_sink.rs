use anyhow::Result;
use lanefall_play::{Color, FrameSink};

/// Height of the display panel in rows.
pub const PANEL_HEIGHT: usize = 11;

/// Renders frames into a character grid, one row per display column `y`,
/// with the judgment line on the left.
pub struct TextFrameSink {
    width: usize,
    cells: Vec<char>,
    color: Color,
    last_frame: String,
    frames: usize,
}

impl TextFrameSink {
    pub fn new(width: usize) -> Self {
        Self {
            width,
            cells: vec![' '; width * PANEL_HEIGHT],
            color: Color::BLACK,
            last_frame: String::new(),
            frames: 0,
        }
    }

    pub fn last_frame(&self) -> &str {
        &self.last_frame
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    fn glyph(color: Color) -> char {
        match color {
            Color::PURPLE => 'P',
            Color::GREEN => 'G',
            Color::BLUE => 'B',
            Color::CYAN => 'C',
            Color::RED => 'R',
            Color::YELLOW => 'Y',
            Color::WHITE => 'W',
            Color::BLACK => ' ',
            // Dimmed lane colours mark the receptors.
            _ => '|',
        }
    }
}

impl FrameSink for TextFrameSink {
    fn clear(&mut self) {
        self.cells.fill(' ');
    }

    fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    fn draw_point(&mut self, x: i32, y: i32) {
        let (Ok(x), Ok(y)) = (usize::try_from(x), usize::try_from(y)) else {
            return;
        };
        if x < self.width && y < PANEL_HEIGHT {
            self.cells[y * self.width + x] = Self::glyph(self.color);
        }
    }

    fn present(&mut self) -> Result<()> {
        self.last_frame.clear();
        for row in self.cells.chunks(self.width.max(1)) {
            self.last_frame.extend(row.iter());
            self.last_frame.push('\n');
        }
        self.frames += 1;
        log::trace!("frame {}\n{}", self.frames, self.last_frame);
        Ok(())
    }
}
