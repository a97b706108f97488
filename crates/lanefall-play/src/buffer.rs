use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use lanefall_chart::ChartEvent;
use log::debug;
use thiserror::Error;

/// Returned by [`StreamBuffer::push`] once the consumer side has closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("stream buffer closed")]
pub struct BufferClosed;

/// Stop flag shared by the producer and consumer tasks.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

#[derive(Debug, Default)]
struct BufferState {
    queue: VecDeque<ChartEvent>,
    /// Producer has pushed its last event.
    finished: bool,
    /// Consumer is gone; pushes fail and blocked producers wake.
    closed: bool,
    pushed: usize,
    high_water: usize,
    blocked_pushes: usize,
}

/// Bounded FIFO handing chart events from the producer thread to the
/// scheduler.
///
/// `push` blocks while the queue is at capacity and never drops events.
/// `pop_ready` never blocks.
#[derive(Debug)]
pub struct StreamBuffer {
    state: Mutex<BufferState>,
    not_full: Condvar,
    not_empty: Condvar,
    capacity: usize,
}

impl StreamBuffer {
    /// Capacities below 1 are raised to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            state: Mutex::new(BufferState {
                queue: VecDeque::with_capacity(capacity),
                ..Default::default()
            }),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
            capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, BufferState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append an event, waiting for a free slot while the buffer is full.
    pub fn push(&self, event: ChartEvent) -> Result<(), BufferClosed> {
        let mut state = self.lock();
        if state.queue.len() >= self.capacity && !state.closed {
            state.blocked_pushes += 1;
        }
        while state.queue.len() >= self.capacity && !state.closed {
            state = self
                .not_full
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        if state.closed {
            return Err(BufferClosed);
        }

        state.queue.push_back(event);
        state.pushed += 1;
        state.high_water = state.high_water.max(state.queue.len());
        drop(state);
        self.not_empty.notify_all();
        Ok(())
    }

    /// Remove and return every buffered event with `timestamp_ms <= horizon_ms`,
    /// in push order. Returns an empty vector when none are due.
    pub fn pop_ready(&self, horizon_ms: i64) -> Vec<ChartEvent> {
        let mut state = self.lock();
        // Timestamps are non-decreasing, so the due events form a prefix.
        let due = state
            .queue
            .iter()
            .take_while(|e| e.timestamp_ms <= horizon_ms)
            .count();
        if due == 0 {
            return Vec::new();
        }
        let ready: Vec<ChartEvent> = state.queue.drain(..due).collect();
        drop(state);
        self.not_full.notify_all();
        ready
    }

    /// Mark the end of the stream. Called by the producer after its last push.
    pub fn finish(&self) {
        self.lock().finished = true;
        self.not_empty.notify_all();
    }

    /// Reject further pushes and wake a producer blocked on a full buffer.
    pub fn close(&self) {
        let mut state = self.lock();
        if !state.closed {
            debug!(
                "stream buffer closed with {} events pending",
                state.queue.len()
            );
        }
        state.closed = true;
        drop(state);
        self.not_full.notify_all();
        self.not_empty.notify_all();
    }

    /// Block until the buffer is full, the producer has finished, or the
    /// buffer is closed. Returns `false` on timeout.
    pub fn wait_primed(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.lock();
        loop {
            if state.queue.len() >= self.capacity || state.finished || state.closed {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            state = self
                .not_empty
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().queue.is_empty()
    }

    pub fn is_finished(&self) -> bool {
        self.lock().finished
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Producer finished and every event has been taken.
    pub fn is_exhausted(&self) -> bool {
        let state = self.lock();
        state.finished && state.queue.is_empty()
    }

    /// Total events accepted.
    pub fn pushed(&self) -> usize {
        self.lock().pushed
    }

    /// Largest queue length observed.
    pub fn high_water_mark(&self) -> usize {
        self.lock().high_water
    }

    /// Number of pushes that had to wait for a free slot.
    pub fn blocked_pushes(&self) -> usize {
        self.lock().blocked_pushes
    }
}
