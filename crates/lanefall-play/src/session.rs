use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use lanefall_chart::LaneCount;
use lanefall_input::InputSource;
use lanefall_timing::Clock;
use log::{debug, info, warn};

use crate::buffer::{StopSignal, StreamBuffer};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::judge::{ComboState, JudgeEvent, JudgeStats, JudgmentEngine};
use crate::producer::spawn_producer;
use crate::render::{FrameRenderer, FrameSink};
use crate::scheduler::{NoteScheduler, Tally};

/// How long `Session::start` waits for the producer to fill the buffer.
const PRIME_TIMEOUT: Duration = Duration::from_secs(2);

type ProducerHandle = JoinHandle<Result<usize, EngineError>>;

/// Result of one consumer tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickSummary {
    /// Session time, i.e. chart time.
    pub now_ms: i64,
    pub admitted: usize,
    pub judgments: Vec<JudgeEvent>,
    pub visible: usize,
    pub points_drawn: usize,
    pub combo: u32,
}

/// Totals for a finished session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub lane_count: LaneCount,
    pub events_produced: usize,
    pub tally: Tally,
    pub max_combo: u32,
    pub final_combo: u32,
    pub ghost_presses: u32,
    pub fast: u32,
    pub slow: u32,
    pub ticks: u64,
    pub stopped_early: bool,
}

impl SessionReport {
    /// Every produced event reached exactly one terminal state.
    pub fn is_complete(&self) -> bool {
        self.tally.resolved() == self.events_produced
    }
}

/// One play-through of a chart: the producer thread on one side, and on the
/// other the consumer state advanced by [`Session::tick`].
pub struct Session {
    lanes: LaneCount,
    buffer: Arc<StreamBuffer>,
    stop: StopSignal,
    producer: Option<ProducerHandle>,
    scheduler: NoteScheduler,
    judge: JudgmentEngine,
    renderer: FrameRenderer,
    epoch_ms: i64,
    ticks: u64,
}

impl Session {
    /// Validate the chart, start the producer, wait for the buffer to prime,
    /// then start the session clock at the clock's current reading.
    ///
    /// Parse errors and unsupported lane counts are reported here, before any
    /// thread is started.
    pub fn start<C>(
        config: &EngineConfig,
        chart: impl Into<Arc<[u8]>>,
        clock: &C,
    ) -> Result<Self, EngineError>
    where
        C: Clock + ?Sized,
    {
        config.validate()?;
        let chart = chart.into();

        let summary = lanefall_chart::validate(&chart[..])?;
        let lanes = summary.lane_count;
        let layout = config.layout_for(lanes)?.clone();
        info!(
            "starting {} session: {} events, {:?}..{:?} ms",
            lanes, summary.event_count, summary.first_ms, summary.last_ms
        );

        let buffer = Arc::new(StreamBuffer::new(config.buffer_capacity));
        let stop = StopSignal::new();
        let producer = spawn_producer(chart, Arc::clone(&buffer), stop.clone())?;

        let mut session = Self {
            lanes,
            buffer: Arc::clone(&buffer),
            stop,
            producer: Some(producer),
            scheduler: NoteScheduler::new(config, lanes, buffer),
            judge: JudgmentEngine::new(lanes.get(), config.hit_window_ms),
            renderer: FrameRenderer::new(layout, config.track_width),
            epoch_ms: 0,
            ticks: 0,
        };

        if !session.buffer.wait_primed(PRIME_TIMEOUT) {
            warn!(
                "buffer not primed after {:?} ({} events ready)",
                PRIME_TIMEOUT,
                session.buffer.len()
            );
        }

        session.epoch_ms = clock.now_ms();
        session.scheduler.start(0)?;
        debug!("session clock started at {} ms", session.epoch_ms);
        Ok(session)
    }

    /// Run one scheduler tick, one judgment tick, and one frame, in that order.
    ///
    /// `now_ms` is a reading of the clock the session was started with.
    pub fn tick<I, S>(
        &mut self,
        now_ms: i64,
        input: &mut I,
        sink: &mut S,
    ) -> Result<TickSummary, EngineError>
    where
        I: InputSource + ?Sized,
        S: FrameSink + ?Sized,
    {
        let now_ms = now_ms - self.epoch_ms;
        let report = self.scheduler.tick(now_ms)?;
        let judgments = self.judge.tick(now_ms, input, &mut self.scheduler, &report);
        let points_drawn = self.renderer.draw(sink, self.scheduler.visible_notes())?;
        self.ticks += 1;

        Ok(TickSummary {
            now_ms,
            admitted: report.admitted,
            judgments,
            visible: self.scheduler.active_len(),
            points_drawn,
            combo: self.judge.combo().count(),
        })
    }

    /// Every event has been produced and judged, or the session was stopped.
    pub fn is_finished(&self) -> bool {
        self.stop.is_stopped() || self.scheduler.is_drained()
    }

    /// Handle for stopping the session from elsewhere.
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    pub fn lane_count(&self) -> LaneCount {
        self.lanes
    }

    pub fn combo(&self) -> ComboState {
        self.judge.combo()
    }

    pub fn stats(&self) -> JudgeStats {
        self.judge.stats()
    }

    pub fn scheduler(&self) -> &NoteScheduler {
        &self.scheduler
    }

    pub fn buffer(&self) -> &StreamBuffer {
        &self.buffer
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Stop the producer, wait for it, and summarize the session.
    pub fn finish(mut self) -> Result<SessionReport, EngineError> {
        let stopped_early = !self.scheduler.is_drained();
        self.shutdown()?;

        let combo = self.judge.combo();
        let stats = self.judge.stats();
        let report = SessionReport {
            lane_count: self.lanes,
            events_produced: self.buffer.pushed(),
            tally: self.scheduler.tally(),
            max_combo: combo.max(),
            final_combo: combo.count(),
            ghost_presses: stats.ghost_presses,
            fast: stats.fast,
            slow: stats.slow,
            ticks: self.ticks,
            stopped_early,
        };
        info!(
            "session finished: {} hit, {} missed, {} expired of {} (max combo {})",
            report.tally.hit,
            report.tally.missed,
            report.tally.expired,
            report.events_produced,
            report.max_combo
        );
        Ok(report)
    }

    fn shutdown(&mut self) -> Result<(), EngineError> {
        self.stop.stop();
        self.buffer.close();

        let Some(handle) = self.producer.take() else {
            return Ok(());
        };
        match handle.join() {
            Ok(result) => result.map(|pushed| debug!("producer joined after {pushed} events")),
            Err(_) => Err(EngineError::ProducerFailed(
                "producer thread panicked".to_string(),
            )),
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!("session shutdown: {e}");
        }
    }
}

/// Paces the consumer loop.
pub trait Cadence {
    /// Block until the next tick is due.
    fn wait(&mut self);
}

/// Sleeps to fixed-interval deadlines. A late tick resynchronizes instead of
/// bursting to catch up.
#[derive(Debug, Clone)]
pub struct FixedCadence {
    interval: Duration,
    next: Option<Instant>,
}

impl FixedCadence {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next: None,
        }
    }

    pub fn from_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Cadence for FixedCadence {
    fn wait(&mut self) {
        let now = Instant::now();
        let deadline = self.next.unwrap_or(now) + self.interval;
        if deadline > now {
            thread::sleep(deadline - now);
            self.next = Some(deadline);
        } else {
            self.next = Some(now);
        }
    }
}

/// Drive a session to completion: tick at the cadence until the chart is
/// drained or the stop signal is raised, then finish.
pub fn run_session<C, I, S, K>(
    mut session: Session,
    clock: &C,
    input: &mut I,
    sink: &mut S,
    cadence: &mut K,
) -> Result<SessionReport, EngineError>
where
    C: Clock + ?Sized,
    I: InputSource + ?Sized,
    S: FrameSink + ?Sized,
    K: Cadence + ?Sized,
{
    while !session.is_finished() {
        let summary = session.tick(clock.now_ms(), input, sink)?;
        for judgment in &summary.judgments {
            debug!(
                "{:?} {} lane {} ({:+} ms), combo {}",
                judgment.state, judgment.note_id, judgment.lane, judgment.offset_ms, summary.combo
            );
        }
        cadence.wait();
    }
    session.finish()
}
