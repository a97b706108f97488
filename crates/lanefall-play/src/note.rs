use std::fmt;

/// Identity of an admitted note, unique within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NoteId(pub(crate) u64);

impl NoteId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle of a note. `Visible` is left exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoteState {
    Visible,
    Hit,
    Missed,
    Expired,
}

impl NoteState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Visible)
    }

    /// Whether reaching this state breaks the combo.
    pub fn breaks_combo(self) -> bool {
        matches!(self, Self::Missed | Self::Expired)
    }
}

/// Outcome the judgment side may assign. Expiry belongs to the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Hit,
    Missed,
}

impl From<Verdict> for NoteState {
    fn from(verdict: Verdict) -> Self {
        match verdict {
            Verdict::Hit => NoteState::Hit,
            Verdict::Missed => NoteState::Missed,
        }
    }
}

/// A chart event in flight on the track.
///
/// Only the scheduler mutates notes; everyone else sees shared references or
/// retired copies.
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    id: NoteId,
    lane: usize,
    target_time_ms: i64,
    scroll_position: f64,
    state: NoteState,
}

impl Note {
    pub(crate) fn spawn(id: NoteId, lane: usize, target_time_ms: i64, scroll_position: f64) -> Self {
        Self {
            id,
            lane,
            target_time_ms,
            scroll_position,
            state: NoteState::Visible,
        }
    }

    pub fn id(&self) -> NoteId {
        self.id
    }

    pub fn lane(&self) -> usize {
        self.lane
    }

    pub fn target_time_ms(&self) -> i64 {
        self.target_time_ms
    }

    /// Distance to the judgment line in track units; negative once past it.
    pub fn scroll_position(&self) -> f64 {
        self.scroll_position
    }

    pub fn state(&self) -> NoteState {
        self.state
    }

    pub fn is_visible(&self) -> bool {
        self.state == NoteState::Visible
    }

    /// `now - target`: negative when early, positive when late.
    pub fn offset_ms(&self, now_ms: i64) -> i64 {
        now_ms - self.target_time_ms
    }

    pub(crate) fn advance(&mut self, distance: f64) {
        self.scroll_position -= distance;
    }

    /// Leave `Visible` for a terminal state. Returns `false` (and changes
    /// nothing) if the note was already retired.
    pub(crate) fn retire(&mut self, to: NoteState) -> bool {
        if self.state.is_terminal() || !to.is_terminal() {
            return false;
        }
        self.state = to;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note() -> Note {
        Note::spawn(NoteId(1), 2, 1000, 53.0)
    }

    #[test]
    fn spawned_note_is_visible() {
        let n = note();
        assert!(n.is_visible());
        assert_eq!(n.lane(), 2);
        assert_eq!(n.target_time_ms(), 1000);
        assert_eq!(n.offset_ms(980), -20);
        assert_eq!(n.offset_ms(1030), 30);
    }

    #[test]
    fn retire_happens_once() {
        let mut n = note();
        assert!(n.retire(NoteState::Hit));
        assert!(!n.retire(NoteState::Expired));
        assert!(!n.retire(NoteState::Missed));
        assert_eq!(n.state(), NoteState::Hit);
    }

    #[test]
    fn cannot_retire_to_visible() {
        let mut n = note();
        assert!(!n.retire(NoteState::Visible));
        assert!(n.is_visible());
    }

    #[test]
    fn combo_breaking_states() {
        assert!(!NoteState::Hit.breaks_combo());
        assert!(NoteState::Missed.breaks_combo());
        assert!(NoteState::Expired.breaks_combo());
        assert!(!NoteState::Visible.breaks_combo());
    }

    #[test]
    fn verdict_maps_to_state() {
        assert_eq!(NoteState::from(Verdict::Hit), NoteState::Hit);
        assert_eq!(NoteState::from(Verdict::Missed), NoteState::Missed);
    }

    #[test]
    fn display_id() {
        assert_eq!(NoteId(42).to_string(), "#42");
    }
}
