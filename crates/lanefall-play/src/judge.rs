use lanefall_input::{InputSource, LaneKeyState};
use log::{debug, trace};

use crate::note::{Note, NoteId, NoteState, Verdict};
use crate::scheduler::{NoteScheduler, TickReport};

/// Timing direction for FAST/SLOW display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimingDirection {
    Fast,
    Exact,
    Slow,
}

impl TimingDirection {
    const EXACT_THRESHOLD_MS: i64 = 1;

    /// `offset_ms` is `press - target`.
    pub fn from_offset(offset_ms: i64) -> Self {
        if offset_ms < -Self::EXACT_THRESHOLD_MS {
            TimingDirection::Fast
        } else if offset_ms > Self::EXACT_THRESHOLD_MS {
            TimingDirection::Slow
        } else {
            TimingDirection::Exact
        }
    }
}

/// Consecutive-hit counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ComboState {
    count: u32,
    max: u32,
}

impl ComboState {
    pub fn hit(&mut self) {
        self.count += 1;
        self.max = self.max.max(self.count);
    }

    pub fn break_combo(&mut self) {
        self.count = 0;
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn max(&self) -> u32 {
        self.max
    }
}

/// A note leaving `Visible`, as seen by the judgment side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JudgeEvent {
    pub note_id: NoteId,
    pub lane: usize,
    pub state: NoteState,
    /// `now - target` at the moment of judgment.
    pub offset_ms: i64,
}

impl JudgeEvent {
    fn from_note(note: &Note, now_ms: i64) -> Self {
        Self {
            note_id: note.id(),
            lane: note.lane(),
            state: note.state(),
            offset_ms: note.offset_ms(now_ms),
        }
    }

    pub fn direction(&self) -> TimingDirection {
        TimingDirection::from_offset(self.offset_ms)
    }
}

/// Cumulative judgment counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JudgeStats {
    pub hits: u32,
    pub misses: u32,
    pub expirations: u32,
    /// Presses with no hittable note in the lane.
    pub ghost_presses: u32,
    pub fast: u32,
    pub slow: u32,
}

impl JudgeStats {
    fn record(&mut self, event: &JudgeEvent) {
        match event.state {
            NoteState::Hit => {
                self.hits += 1;
                match event.direction() {
                    TimingDirection::Fast => self.fast += 1,
                    TimingDirection::Slow => self.slow += 1,
                    TimingDirection::Exact => {}
                }
            }
            NoteState::Missed => self.misses += 1,
            NoteState::Expired => self.expirations += 1,
            NoteState::Visible => {}
        }
    }
}

/// Turns lane presses into hits and keeps the combo.
pub struct JudgmentEngine {
    hit_window_ms: i64,
    keys: LaneKeyState,
    combo: ComboState,
    stats: JudgeStats,
}

impl JudgmentEngine {
    pub fn new(lanes: usize, hit_window_ms: i64) -> Self {
        Self {
            hit_window_ms,
            keys: LaneKeyState::new(lanes),
            combo: ComboState::default(),
            stats: JudgeStats::default(),
        }
    }

    /// Judge one tick: account for the scheduler's expirations, miss notes
    /// left past the hit window, then process new presses lane by lane.
    pub fn tick<I>(
        &mut self,
        now_ms: i64,
        input: &mut I,
        scheduler: &mut NoteScheduler,
        report: &TickReport,
    ) -> Vec<JudgeEvent>
    where
        I: InputSource + ?Sized,
    {
        let mut events = Vec::new();

        for note in &report.expired {
            let event = JudgeEvent::from_note(note, now_ms);
            self.apply(&event);
            events.push(event);
        }

        for id in scheduler.overdue(now_ms, self.hit_window_ms) {
            if let Ok(note) = scheduler.resolve(id, Verdict::Missed) {
                let event = JudgeEvent::from_note(&note, now_ms);
                self.apply(&event);
                events.push(event);
            }
        }

        input.poll(now_ms);
        for lane in 0..self.keys.lanes() {
            if self.keys.update(lane, input.is_pressed(lane)) {
                if let Some(event) = self.judge_press(lane, now_ms, scheduler) {
                    events.push(event);
                }
            }
        }

        events
    }

    /// Resolve a press on `lane` against the earliest hittable note.
    /// Returns `None` (a ghost press) when nothing is in the window.
    pub fn judge_press(
        &mut self,
        lane: usize,
        now_ms: i64,
        scheduler: &mut NoteScheduler,
    ) -> Option<JudgeEvent> {
        let Some(id) = scheduler.find_hittable(lane, now_ms, self.hit_window_ms) else {
            trace!("ghost press on lane {lane} at {now_ms} ms");
            self.stats.ghost_presses += 1;
            return None;
        };

        let note = scheduler.resolve(id, Verdict::Hit).ok()?;
        let event = JudgeEvent::from_note(&note, now_ms);
        self.apply(&event);
        Some(event)
    }

    fn apply(&mut self, event: &JudgeEvent) {
        if event.state.breaks_combo() {
            if self.combo.count() > 0 {
                debug!(
                    "combo {} broken by {} ({:?})",
                    self.combo.count(),
                    event.note_id,
                    event.state
                );
            }
            self.combo.break_combo();
        } else if event.state == NoteState::Hit {
            self.combo.hit();
        }
        self.stats.record(event);
    }

    pub fn combo(&self) -> ComboState {
        self.combo
    }

    pub fn stats(&self) -> JudgeStats {
        self.stats
    }

    pub fn hit_window_ms(&self) -> i64 {
        self.hit_window_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::StreamBuffer;
    use crate::config::EngineConfig;
    use lanefall_chart::{ChartEvent, LaneCount};
    use lanefall_input::{NoInput, ScriptedInput};
    use std::sync::Arc;

    fn scheduler(config: &EngineConfig, events: &[(usize, i64)]) -> NoteScheduler {
        let buffer = Arc::new(StreamBuffer::new(64));
        for &(lane, t) in events {
            buffer.push(ChartEvent::new(lane, t)).unwrap();
        }
        buffer.finish();
        let mut scheduler = NoteScheduler::new(config, LaneCount::new(4).unwrap(), buffer);
        scheduler.start(0).unwrap();
        scheduler
    }

    fn run<I: InputSource>(
        engine: &mut JudgmentEngine,
        scheduler: &mut NoteScheduler,
        input: &mut I,
        until_ms: i64,
    ) -> Vec<JudgeEvent> {
        let mut events = Vec::new();
        let mut now = 0;
        while now <= until_ms {
            let report = scheduler.tick(now).unwrap();
            events.extend(engine.tick(now, input, scheduler, &report));
            now += 10;
        }
        events
    }

    #[test]
    fn timing_direction_thresholds() {
        assert_eq!(TimingDirection::from_offset(-20), TimingDirection::Fast);
        assert_eq!(TimingDirection::from_offset(-1), TimingDirection::Exact);
        assert_eq!(TimingDirection::from_offset(0), TimingDirection::Exact);
        assert_eq!(TimingDirection::from_offset(1), TimingDirection::Exact);
        assert_eq!(TimingDirection::from_offset(2), TimingDirection::Slow);
    }

    #[test]
    fn combo_tracks_max() {
        let mut combo = ComboState::default();
        combo.hit();
        combo.hit();
        combo.break_combo();
        combo.hit();
        assert_eq!(combo.count(), 1);
        assert_eq!(combo.max(), 2);
    }

    #[test]
    fn early_press_inside_window_hits() {
        let config = EngineConfig::default();
        let mut scheduler = scheduler(&config, &[(2, 1000)]);
        let mut engine = JudgmentEngine::new(4, config.hit_window_ms);
        let mut input = ScriptedInput::new().tap(2, 980);

        let events = run(&mut engine, &mut scheduler, &mut input, 1500);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].state, NoteState::Hit);
        assert_eq!(events[0].offset_ms, -20);
        assert_eq!(events[0].direction(), TimingDirection::Fast);
        assert_eq!(engine.combo().count(), 1);
        assert_eq!(engine.stats().fast, 1);
    }

    #[test]
    fn unpressed_note_expires_and_breaks_combo() {
        let config = EngineConfig::default();
        let mut scheduler = scheduler(&config, &[(0, 100), (2, 1000)]);
        let mut engine = JudgmentEngine::new(4, config.hit_window_ms);
        let mut input = ScriptedInput::new().tap(0, 100);

        let events = run(&mut engine, &mut scheduler, &mut input, 1500);
        let states: Vec<NoteState> = events.iter().map(|e| e.state).collect();
        assert_eq!(states, vec![NoteState::Hit, NoteState::Expired]);
        assert_eq!(engine.combo().count(), 0);
        assert_eq!(engine.combo().max(), 1);
        assert_eq!(engine.stats().expirations, 1);
    }

    #[test]
    fn narrow_hit_window_misses_before_expiry() {
        let config = EngineConfig {
            hit_window_ms: 50,
            ..Default::default()
        };
        let mut scheduler = scheduler(&config, &[(1, 500)]);
        let mut engine = JudgmentEngine::new(4, config.hit_window_ms);

        let events = run(&mut engine, &mut scheduler, &mut NoInput, 800);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].state, NoteState::Missed);
        assert_eq!(events[0].offset_ms, 60);
        assert_eq!(scheduler.tally().missed, 1);
        assert_eq!(scheduler.tally().expired, 0);
    }

    #[test]
    fn missed_note_breaks_running_combo() {
        let config = EngineConfig {
            hit_window_ms: 50,
            ..Default::default()
        };
        let mut scheduler = scheduler(&config, &[(0, 300), (1, 600)]);
        let mut engine = JudgmentEngine::new(4, config.hit_window_ms);
        let mut input = ScriptedInput::new().tap(0, 300);

        let events = run(&mut engine, &mut scheduler, &mut input, 900);
        let states: Vec<NoteState> = events.iter().map(|e| e.state).collect();
        assert_eq!(states, vec![NoteState::Hit, NoteState::Missed]);
        assert_eq!(engine.combo().count(), 0);
        assert_eq!(engine.combo().max(), 1);
        assert_eq!(engine.stats().misses, 1);
        assert_eq!(engine.stats().expirations, 0);
    }

    #[test]
    fn press_outside_window_is_ghost() {
        let config = EngineConfig::default();
        let mut scheduler = scheduler(&config, &[(3, 1000)]);
        let mut engine = JudgmentEngine::new(4, config.hit_window_ms);
        let mut input = ScriptedInput::new().tap(3, 700).tap(1, 1000);

        run(&mut engine, &mut scheduler, &mut input, 1000);
        assert_eq!(engine.stats().ghost_presses, 2);
        assert_eq!(scheduler.active_len(), 1);
    }

    #[test]
    fn held_button_judges_once() {
        let config = EngineConfig::default();
        let mut scheduler = scheduler(&config, &[(0, 1000), (0, 1100)]);
        let mut engine = JudgmentEngine::new(4, config.hit_window_ms);
        let mut input = ScriptedInput::new().hold(0, 990, 400);

        let events = run(&mut engine, &mut scheduler, &mut input, 1250);
        let hits = events.iter().filter(|e| e.state == NoteState::Hit).count();
        assert_eq!(hits, 1);
        assert_eq!(engine.stats().hits, 1);
    }

    #[test]
    fn simultaneous_candidates_pick_earliest() {
        let config = EngineConfig::default();
        let mut scheduler = scheduler(&config, &[(0, 1000), (0, 1150)]);
        let mut engine = JudgmentEngine::new(4, config.hit_window_ms);

        let report = scheduler.tick(1100).unwrap();
        engine.tick(1100, &mut NoInput, &mut scheduler, &report);
        let event = engine.judge_press(0, 1100, &mut scheduler).unwrap();
        assert_eq!(event.offset_ms, 100);
        assert_eq!(scheduler.active_len(), 1);
    }
}
