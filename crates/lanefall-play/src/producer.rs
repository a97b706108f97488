use std::io::BufRead;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use lanefall_chart::ChartSource;
use log::{debug, error, info};

use crate::buffer::{StopSignal, StreamBuffer};
use crate::error::EngineError;

/// Stream every chart event into `buffer`, in order, blocking on backpressure.
///
/// Always marks the buffer finished on return so the consumer can drain.
/// Returns the number of events pushed. Stops early, without error, when the
/// stop signal is raised or the buffer is closed.
pub fn run_producer<R: BufRead>(
    source: ChartSource<R>,
    buffer: &StreamBuffer,
    stop: &StopSignal,
) -> Result<usize, EngineError> {
    info!("chart producer started ({})", source.lane_count());
    let mut pushed = 0;
    let mut result: Result<(), EngineError> = Ok(());

    for event in source {
        if stop.is_stopped() {
            debug!("chart producer stopped after {pushed} events");
            break;
        }
        let event = match event {
            Ok(event) => event,
            Err(e) => {
                error!("chart producer aborted after {pushed} events: {e}");
                result = Err(e.into());
                break;
            }
        };
        if buffer.push(event).is_err() {
            debug!("chart producer: buffer closed after {pushed} events");
            break;
        }
        pushed += 1;
    }

    buffer.finish();
    info!("chart producer finished, {pushed} events pushed");
    result.map(|()| pushed)
}

/// Start the producer on its own thread over a shared in-memory chart.
///
/// Header errors are returned here, before the thread starts.
pub fn spawn_producer(
    chart: Arc<[u8]>,
    buffer: Arc<StreamBuffer>,
    stop: StopSignal,
) -> Result<JoinHandle<Result<usize, EngineError>>, EngineError> {
    let source = ChartSource::from_shared(chart)?;
    thread::Builder::new()
        .name("chart-producer".to_string())
        .spawn(move || run_producer(source, &buffer, &stop))
        .map_err(|e| EngineError::ProducerFailed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lanefall_chart::{ChartEvent, ParseError};
    use std::time::Duration;

    const CHART: &str = "CircleSize:4\n[HitObjects]\n64,192,100\n200,192,200\n448,192,300\n";

    #[test]
    fn pushes_every_event_in_order() {
        let buffer = StreamBuffer::new(8);
        let pushed = run_producer(
            ChartSource::from_text(CHART).unwrap(),
            &buffer,
            &StopSignal::new(),
        )
        .unwrap();

        assert_eq!(pushed, 3);
        assert!(buffer.is_finished());
        assert_eq!(
            buffer.pop_ready(i64::MAX),
            vec![
                ChartEvent::new(0, 100),
                ChartEvent::new(1, 200),
                ChartEvent::new(3, 300),
            ]
        );
    }

    #[test]
    fn malformed_record_stops_stream_and_finishes_buffer() {
        let text = "CircleSize:4\n[HitObjects]\n64,192,100\nbad\n64,192,300\n";
        let buffer = StreamBuffer::new(8);
        let err = run_producer(
            ChartSource::from_text(text).unwrap(),
            &buffer,
            &StopSignal::new(),
        )
        .unwrap_err();

        assert!(matches!(
            err,
            EngineError::Parse(ParseError::MalformedEvent { line: 4, .. })
        ));
        assert!(buffer.is_finished());
        assert_eq!(buffer.pushed(), 1);
    }

    #[test]
    fn stop_signal_halts_producer() {
        let buffer = StreamBuffer::new(8);
        let stop = StopSignal::new();
        stop.stop();
        let pushed = run_producer(ChartSource::from_text(CHART).unwrap(), &buffer, &stop).unwrap();
        assert_eq!(pushed, 0);
        assert!(buffer.is_finished());
    }

    #[test]
    fn spawned_producer_respects_backpressure() {
        let mut text = String::from("CircleSize:4\n[HitObjects]\n");
        for t in 0..50 {
            text.push_str(&format!("64,192,{}\n", t * 10));
        }
        let buffer = Arc::new(StreamBuffer::new(4));
        let handle = spawn_producer(
            Arc::from(text.as_bytes()),
            Arc::clone(&buffer),
            StopSignal::new(),
        )
        .unwrap();

        assert!(buffer.wait_primed(Duration::from_secs(5)));
        let mut drained = 0;
        while !buffer.is_exhausted() {
            assert!(buffer.len() <= 4);
            drained += buffer.pop_ready(i64::MAX).len();
            std::thread::yield_now();
        }

        assert_eq!(handle.join().unwrap().unwrap(), 50);
        assert_eq!(drained, 50);
        assert!(buffer.high_water_mark() <= 4);
    }

    #[test]
    fn closing_buffer_releases_blocked_producer() {
        let mut text = String::from("CircleSize:4\n[HitObjects]\n");
        for t in 0..20 {
            text.push_str(&format!("64,192,{t}\n"));
        }
        let buffer = Arc::new(StreamBuffer::new(2));
        let handle = spawn_producer(
            Arc::from(text.as_bytes()),
            Arc::clone(&buffer),
            StopSignal::new(),
        )
        .unwrap();

        assert!(buffer.wait_primed(Duration::from_secs(5)));
        buffer.close();

        assert_eq!(handle.join().unwrap().unwrap(), 2);
    }

    #[test]
    fn header_error_reported_before_spawn() {
        let buffer = Arc::new(StreamBuffer::new(2));
        let err = spawn_producer(
            Arc::from(&b"[HitObjects]\n64,192,1\n"[..]),
            buffer,
            StopSignal::new(),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::Parse(ParseError::MissingLaneCount)));
    }
}
