use crate::InputSource;

/// Hold duration used by [`ScriptedInput::tap`].
pub const TAP_HOLD_MS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Press {
    lane: usize,
    down_ms: i64,
    up_ms: i64,
}

/// Input that replays a fixed list of button holds against the tick clock.
///
/// A lane reads as pressed while `down_ms <= now < up_ms` for any of its holds.
#[derive(Debug, Clone, Default)]
pub struct ScriptedInput {
    presses: Vec<Press>,
    now_ms: i64,
}

impl ScriptedInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold `lane` from `down_ms` for `hold_ms`.
    pub fn hold(mut self, lane: usize, down_ms: i64, hold_ms: i64) -> Self {
        self.presses.push(Press {
            lane,
            down_ms,
            up_ms: down_ms + hold_ms.max(1),
        });
        self
    }

    /// Short press of `lane` at `down_ms`.
    pub fn tap(self, lane: usize, down_ms: i64) -> Self {
        self.hold(lane, down_ms, TAP_HOLD_MS)
    }

    pub fn now_ms(&self) -> i64 {
        self.now_ms
    }
}

impl InputSource for ScriptedInput {
    fn poll(&mut self, now_ms: i64) {
        self.now_ms = now_ms;
    }

    fn is_pressed(&self, lane: usize) -> bool {
        self.presses
            .iter()
            .any(|p| p.lane == lane && p.down_ms <= self.now_ms && self.now_ms < p.up_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tap_window() {
        let mut input = ScriptedInput::new().tap(2, 980);

        input.poll(979);
        assert!(!input.is_pressed(2));
        input.poll(980);
        assert!(input.is_pressed(2));
        assert!(!input.is_pressed(1));
        input.poll(980 + TAP_HOLD_MS - 1);
        assert!(input.is_pressed(2));
        input.poll(980 + TAP_HOLD_MS);
        assert!(!input.is_pressed(2));
    }

    #[test]
    fn overlapping_holds_on_different_lanes() {
        let mut input = ScriptedInput::new().hold(0, 100, 500).hold(3, 200, 50);
        input.poll(220);
        assert!(input.is_pressed(0));
        assert!(input.is_pressed(3));
        input.poll(300);
        assert!(input.is_pressed(0));
        assert!(!input.is_pressed(3));
    }

    #[test]
    fn zero_length_hold_still_lasts_a_millisecond() {
        let mut input = ScriptedInput::new().hold(1, 50, 0);
        input.poll(50);
        assert!(input.is_pressed(1));
        input.poll(51);
        assert!(!input.is_pressed(1));
    }
}
