// lanefall: plays a chart headlessly in real time and prints the session report.

mod text_sink;

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use lanefall_chart::ChartSource;
use lanefall_input::{AutoplayInput, InputSource, NoInput};
use lanefall_play::{EngineConfig, FixedCadence, Session, SessionReport, run_session};
use lanefall_timing::SystemClock;
use log::info;

use text_sink::TextFrameSink;

#[derive(Parser, Debug)]
#[command(name = "lanefall", about = "Falling-note rhythm engine")]
struct Args {
    /// Chart file to play.
    chart: PathBuf,

    /// Path to engine config JSON file.
    #[arg(long, default_value = "lanefall.json")]
    config: PathBuf,

    /// Press every note perfectly.
    #[arg(long)]
    autoplay: bool,

    /// Consumer tick interval in milliseconds.
    #[arg(long, env = "LANEFALL_TICK_MS")]
    tick_ms: Option<u64>,

    /// Capacity of the event buffer between producer and scheduler.
    #[arg(long)]
    capacity: Option<usize>,

    /// Log at debug level.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let mut config = EngineConfig::load_from(&args.config)
        .with_context(|| format!("failed to load config {}", args.config.display()))?;
    if let Some(tick_ms) = args.tick_ms {
        config.tick_interval_ms = tick_ms;
    }
    if let Some(capacity) = args.capacity {
        config.buffer_capacity = capacity;
    }

    let chart: Arc<[u8]> = fs::read(&args.chart)
        .with_context(|| format!("failed to read chart {}", args.chart.display()))?
        .into();
    info!("loaded chart {} ({} bytes)", args.chart.display(), chart.len());

    let report = play(&config, chart, args.autoplay)?;
    print_report(&report);
    Ok(())
}

fn play(config: &EngineConfig, chart: Arc<[u8]>, autoplay: bool) -> Result<SessionReport> {
    let clock = SystemClock::new();
    let mut input: Box<dyn InputSource> = if autoplay {
        autoplay_input(&chart)?
    } else {
        Box::new(NoInput)
    };

    let session = Session::start(config, chart, &clock)?;
    let mut sink = TextFrameSink::new(config.track_width.ceil() as usize);
    let mut cadence = FixedCadence::from_millis(config.tick_interval_ms);

    let report = run_session(session, &clock, &mut input, &mut sink, &mut cadence)?;
    log::debug!("last frame:\n{}", sink.last_frame());
    Ok(report)
}

/// Autoplay reading its own lazy pass over the shared chart bytes.
fn autoplay_input(chart: &Arc<[u8]>) -> Result<Box<dyn InputSource>> {
    let source = ChartSource::from_shared(Arc::clone(chart))?;
    let lanes = source.lane_count().get();
    // The session validates the chart, so the autoplay pass sees no errors.
    Ok(Box::new(AutoplayInput::new(lanes, source.map_while(Result::ok))))
}

fn print_report(report: &SessionReport) {
    let tally = &report.tally;
    println!("chart:      {}", report.lane_count);
    println!("events:     {}", report.events_produced);
    println!("hit:        {}", tally.hit);
    println!("missed:     {}", tally.missed);
    println!("expired:    {}", tally.expired);
    println!("max combo:  {}", report.max_combo);
    println!("fast/slow:  {}/{}", report.fast, report.slow);
    println!("ghost:      {}", report.ghost_presses);
    println!("ticks:      {}", report.ticks);
    if report.stopped_early {
        println!("(stopped early)");
    }
}
