use std::collections::VecDeque;
use std::sync::Arc;

use lanefall_chart::LaneCount;
use log::{debug, trace, warn};

use crate::buffer::StreamBuffer;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::note::{Note, NoteId, NoteState, Verdict};

/// Terminal-state counts for a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub admitted: usize,
    pub hit: usize,
    pub missed: usize,
    pub expired: usize,
}

impl Tally {
    /// Notes that have left `Visible`.
    pub fn resolved(&self) -> usize {
        self.hit + self.missed + self.expired
    }

    fn record(&mut self, state: NoteState) {
        match state {
            NoteState::Hit => self.hit += 1,
            NoteState::Missed => self.missed += 1,
            NoteState::Expired => self.expired += 1,
            NoteState::Visible => {}
        }
    }
}

/// What a single scheduler tick changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub now_ms: i64,
    pub elapsed_ms: i64,
    pub admitted: usize,
    /// Notes retired as `Expired` this tick, earliest first.
    pub expired: Vec<Note>,
}

/// Owns the in-flight notes: admits due events from the buffer, scrolls
/// notes by measured wall time, and retires notes that fell past the miss
/// window.
///
/// Notes are kept in arrival order, which is chronological order, so every
/// scan sees the earliest target first.
pub struct NoteScheduler {
    buffer: Arc<StreamBuffer>,
    lanes: LaneCount,
    track_width: f64,
    scroll_speed: f64,
    lookahead_ms: i64,
    miss_window_ms: i64,
    active: VecDeque<Note>,
    next_id: u64,
    last_tick_ms: Option<i64>,
    tally: Tally,
}

impl NoteScheduler {
    pub fn new(config: &EngineConfig, lanes: LaneCount, buffer: Arc<StreamBuffer>) -> Self {
        Self {
            buffer,
            lanes,
            track_width: config.track_width,
            scroll_speed: config.scroll_speed(),
            lookahead_ms: config.lookahead_ms,
            // A note stays on the track at least until its hit window closes.
            miss_window_ms: config.miss_window_ms.max(config.hit_window_ms),
            active: VecDeque::new(),
            next_id: 0,
            last_tick_ms: None,
            tally: Tally::default(),
        }
    }

    /// Start the session clock. Ticks before this are rejected.
    pub fn start(&mut self, now_ms: i64) -> Result<(), EngineError> {
        if let Some(started) = self.last_tick_ms {
            return Err(EngineError::invalid_state(format!(
                "scheduler already started (last tick at {started} ms)"
            )));
        }
        self.last_tick_ms = Some(now_ms);
        debug!("scheduler started at {now_ms} ms");
        Ok(())
    }

    pub fn is_started(&self) -> bool {
        self.last_tick_ms.is_some()
    }

    /// Advance visible notes, admit due events, then expire overdue notes.
    pub fn tick(&mut self, now_ms: i64) -> Result<TickReport, EngineError> {
        let last = self.last_tick_ms.ok_or_else(|| {
            EngineError::invalid_state("scheduler ticked before the session clock started")
        })?;
        if now_ms < last {
            return Err(EngineError::invalid_state(format!(
                "clock moved backwards ({now_ms} ms after {last} ms)"
            )));
        }
        let elapsed_ms = now_ms - last;
        self.last_tick_ms = Some(now_ms);

        let distance = elapsed_ms as f64 * self.scroll_speed;
        for note in &mut self.active {
            note.advance(distance);
        }

        let admitted = self.admit(now_ms);
        let expired = self.expire(now_ms);

        Ok(TickReport {
            now_ms,
            elapsed_ms,
            admitted,
            expired,
        })
    }

    fn admit(&mut self, now_ms: i64) -> usize {
        let horizon = now_ms.saturating_add(self.lookahead_ms);
        let ready = self.buffer.pop_ready(horizon);
        let count = ready.len();

        for event in ready {
            if event.lane >= self.lanes.get() {
                warn!(
                    "event at {} ms targets lane {} outside {}",
                    event.timestamp_ms, event.lane, self.lanes
                );
            }
            let id = NoteId(self.next_id);
            self.next_id += 1;
            // Placed where it would be had it been admitted exactly at its
            // spawn instant, so a late tick does not delay its arrival.
            let position = self.position_at(event.timestamp_ms, now_ms);
            trace!("admit {id} lane {} target {} ms", event.lane, event.timestamp_ms);
            self.active
                .push_back(Note::spawn(id, event.lane, event.timestamp_ms, position));
        }

        self.tally.admitted += count;
        count
    }

    fn expire(&mut self, now_ms: i64) -> Vec<Note> {
        let mut expired = Vec::new();
        for note in &mut self.active {
            if note.offset_ms(now_ms) <= self.miss_window_ms {
                break;
            }
            if note.retire(NoteState::Expired) {
                expired.push(note.clone());
            }
        }

        if !expired.is_empty() {
            self.active.retain(Note::is_visible);
            self.tally.expired += expired.len();
            debug!("{} notes expired at {now_ms} ms", expired.len());
        }
        expired
    }

    /// Scroll position of a note targeting `target_ms`, as seen at `now_ms`.
    pub fn position_at(&self, target_ms: i64, now_ms: i64) -> f64 {
        (target_ms - now_ms) as f64 * self.scroll_speed
    }

    /// Notes currently on the track, earliest target first.
    pub fn visible_notes(&self) -> impl Iterator<Item = &Note> + '_ {
        self.active.iter()
    }

    pub fn get(&self, id: NoteId) -> Option<&Note> {
        self.active.iter().find(|n| n.id() == id)
    }

    /// Earliest visible note in `lane` whose target lies within `window_ms`
    /// of `now_ms`.
    pub fn find_hittable(&self, lane: usize, now_ms: i64, window_ms: i64) -> Option<NoteId> {
        self.active
            .iter()
            .filter(|n| n.lane() == lane)
            .take_while(|n| n.offset_ms(now_ms) >= -window_ms)
            .find(|n| n.offset_ms(now_ms) <= window_ms)
            .map(Note::id)
    }

    /// Visible notes whose target is more than `window_ms` in the past.
    pub fn overdue(&self, now_ms: i64, window_ms: i64) -> Vec<NoteId> {
        self.active
            .iter()
            .take_while(|n| n.offset_ms(now_ms) > window_ms)
            .map(Note::id)
            .collect()
    }

    /// Retire a visible note with a judgment verdict and remove it from the
    /// track. A note leaves `Visible` once; later attempts are rejected.
    pub fn resolve(&mut self, id: NoteId, verdict: Verdict) -> Result<Note, EngineError> {
        let index = self
            .active
            .iter()
            .position(|n| n.id() == id && n.is_visible())
            .ok_or(EngineError::NoteNotVisible(id))?;

        let mut note = self
            .active
            .remove(index)
            .ok_or(EngineError::NoteNotVisible(id))?;
        note.retire(verdict.into());
        self.tally.record(note.state());
        Ok(note)
    }

    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    pub fn lanes(&self) -> LaneCount {
        self.lanes
    }

    pub fn track_width(&self) -> f64 {
        self.track_width
    }

    pub fn last_tick_ms(&self) -> Option<i64> {
        self.last_tick_ms
    }

    pub fn tally(&self) -> Tally {
        self.tally
    }

    /// No note on the track and nothing more to come from the buffer.
    pub fn is_drained(&self) -> bool {
        self.active.is_empty() && self.buffer.is_exhausted()
    }
}
