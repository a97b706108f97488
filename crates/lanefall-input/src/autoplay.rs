use std::iter::Peekable;

use lanefall_chart::ChartEvent;
use log::warn;

use crate::InputSource;

/// Input that plays a chart perfectly.
///
/// Pulls events lazily from a second pass over the chart. A lane is pressed on
/// the first tick at or after an event's timestamp and released on the next
/// tick, so every press is a fresh edge. Events that fall due while their lane
/// is still down wait one tick.
pub struct AutoplayInput<I: Iterator<Item = ChartEvent>> {
    events: Peekable<I>,
    pending: Vec<usize>,
    pressed: Vec<bool>,
}

impl<I: Iterator<Item = ChartEvent>> AutoplayInput<I> {
    pub fn new(lanes: usize, events: I) -> Self {
        Self {
            events: events.peekable(),
            pending: vec![0; lanes],
            pressed: vec![false; lanes],
        }
    }

    /// Presses still owed, including events not yet pulled from the chart.
    pub fn is_finished(&mut self) -> bool {
        self.events.peek().is_none() && self.pending.iter().all(|&n| n == 0)
    }
}

impl<I: Iterator<Item = ChartEvent>> InputSource for AutoplayInput<I> {
    fn poll(&mut self, now_ms: i64) {
        while let Some(event) = self.events.next_if(|e| e.timestamp_ms <= now_ms) {
            match self.pending.get_mut(event.lane) {
                Some(count) => *count += 1,
                None => warn!("autoplay: lane {} out of range, event skipped", event.lane),
            }
        }

        for (pressed, pending) in self.pressed.iter_mut().zip(self.pending.iter_mut()) {
            if *pressed {
                *pressed = false;
            } else if *pending > 0 {
                *pending -= 1;
                *pressed = true;
            }
        }
    }

    fn is_pressed(&self, lane: usize) -> bool {
        self.pressed.get(lane).copied().unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn autoplay(events: Vec<ChartEvent>) -> AutoplayInput<std::vec::IntoIter<ChartEvent>> {
        AutoplayInput::new(4, events.into_iter())
    }

    #[test]
    fn presses_on_first_tick_at_or_after_event() {
        let mut input = autoplay(vec![ChartEvent::new(1, 100)]);

        input.poll(90);
        assert!(!input.is_pressed(1));
        input.poll(106);
        assert!(input.is_pressed(1));
        input.poll(122);
        assert!(!input.is_pressed(1));
        assert!(input.is_finished());
    }

    #[test]
    fn back_to_back_notes_get_separate_edges() {
        let mut input = autoplay(vec![ChartEvent::new(0, 100), ChartEvent::new(0, 105)]);

        input.poll(110);
        assert!(input.is_pressed(0));
        input.poll(126);
        assert!(!input.is_pressed(0));
        input.poll(142);
        assert!(input.is_pressed(0));
        input.poll(158);
        assert!(!input.is_pressed(0));
        assert!(input.is_finished());
    }

    #[test]
    fn chords_press_together() {
        let mut input = autoplay(vec![ChartEvent::new(0, 500), ChartEvent::new(3, 500)]);
        input.poll(500);
        assert!(input.is_pressed(0));
        assert!(input.is_pressed(3));
        assert!(!input.is_pressed(1));
    }

    #[test]
    fn out_of_range_lane_skipped() {
        let mut input = autoplay(vec![ChartEvent::new(9, 10)]);
        input.poll(10);
        assert!(!input.is_pressed(9));
        assert!(input.is_finished());
    }
}
