/// Per-lane previous press state, used to turn a held button into a single
/// press edge (low → high).
#[derive(Debug, Clone, Default)]
pub struct LaneKeyState {
    previous: Vec<bool>,
}

impl LaneKeyState {
    pub fn new(lanes: usize) -> Self {
        Self {
            previous: vec![false; lanes],
        }
    }

    /// Record this tick's state for `lane` and report whether it is a new press.
    /// Out-of-range lanes never produce an edge.
    pub fn update(&mut self, lane: usize, pressed: bool) -> bool {
        match self.previous.get_mut(lane) {
            Some(previous) => {
                let edge = pressed && !*previous;
                *previous = pressed;
                edge
            }
            None => false,
        }
    }

    /// State recorded on the last update.
    pub fn is_held(&self, lane: usize) -> bool {
        self.previous.get(lane).copied().unwrap_or(false)
    }

    pub fn lanes(&self) -> usize {
        self.previous.len()
    }

    /// Forget all held keys.
    pub fn reset(&mut self) {
        self.previous.fill(false);
    }
}
