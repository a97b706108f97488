//! Lane input: the polled press-state contract, press edge detection, and
//! the scripted / autoplay sources used by tests and the headless runner.

pub mod autoplay;
pub mod key_state;
pub mod scripted;

pub use autoplay::AutoplayInput;
pub use key_state::LaneKeyState;
pub use scripted::{ScriptedInput, TAP_HOLD_MS};

/// Abstraction over physical lane buttons.
/// Implementations: ScriptedInput (testing), AutoplayInput (demo play).
///
/// Debouncing is the implementation's job; callers treat the returned state
/// as clean.
pub trait InputSource {
    /// Sample the device for the tick at `now_ms`. Called once per tick,
    /// before any lane is queried.
    fn poll(&mut self, _now_ms: i64) {}

    /// Whether the lane's button is currently held down.
    fn is_pressed(&self, lane: usize) -> bool;
}

impl<T: InputSource + ?Sized> InputSource for &mut T {
    fn poll(&mut self, now_ms: i64) {
        (**self).poll(now_ms);
    }

    fn is_pressed(&self, lane: usize) -> bool {
        (**self).is_pressed(lane)
    }
}

impl<T: InputSource + ?Sized> InputSource for Box<T> {
    fn poll(&mut self, now_ms: i64) {
        (**self).poll(now_ms);
    }

    fn is_pressed(&self, lane: usize) -> bool {
        (**self).is_pressed(lane)
    }
}

/// Input source with every button released.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoInput;

impl InputSource for NoInput {
    fn is_pressed(&self, _lane: usize) -> bool {
        false
    }
}
