use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use combo_core::Engine;
use simplelog::{ColorChoice, ConfigBuilder, LevelFilter, TermLogger, TerminalMode};

use combod::clock::Clock;
use combod::sim::{self, FixedLayer, Recorder, TraceEvent, MAX_KEYS_PER_COMBO};
use combod::timer::{ChannelTimer, TimerHub};

#[derive(Parser, Debug)]
#[command(author, version, about = "demo host for the combo-core chord decision engine")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Active layer to evaluate combos against.
    #[arg(long, global = true, default_value_t = 0)]
    layer: u16,

    /// Enable debug logging.
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the built-in illustrative combo table against a canned script
    /// and print the resulting behavior press/release trace.
    Demo,
    /// Run a script file in virtual time: `t:<ms>` advances the clock,
    /// `d:<pos>`/`u:<pos>` press/release a position. Deterministic and
    /// instant, regardless of declared timeouts.
    Script {
        path: PathBuf,
    },
    /// Like `script`, but replays the same token script against a real
    /// clock and a background timer thread, actually sleeping between
    /// ticks. Useful for sanity-checking the threaded `ChannelTimer` path.
    Replay {
        path: PathBuf,
    },
}

fn init_logging(debug: bool) {
    let level = if debug { LevelFilter::Debug } else { LevelFilter::Info };
    let _ = TermLogger::init(
        level,
        ConfigBuilder::new().build(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    );
}

fn print_trace(trace: &[TraceEvent]) {
    for event in trace {
        match event {
            TraceEvent::Press { behavior, timestamp } => {
                println!("t={timestamp:>5}ms  press   {behavior}")
            }
            TraceEvent::Release { behavior, timestamp } => {
                println!("t={timestamp:>5}ms  release {behavior}")
            }
        }
    }
}

const DEMO_SCRIPT: &str = "d:1 t:5 d:2 t:60 d:1 t:5 d:2 t:5 d:3 t:60";

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.debug);

    match args.command {
        Command::Demo => {
            log::info!("running built-in demo script against the demo combo table");
            let combos = sim::demo_combos();
            let trace = sim::simulate(&combos, DEMO_SCRIPT, args.layer);
            print_trace(&trace);
        }
        Command::Script { path } => {
            let script = std::fs::read_to_string(&path)
                .with_context(|| format!("reading script {}", path.display()))?;
            let combos = sim::demo_combos();
            let trace = sim::simulate(&combos, &script, args.layer);
            print_trace(&trace);
        }
        Command::Replay { path } => {
            let script = std::fs::read_to_string(&path)
                .with_context(|| format!("reading script {}", path.display()))?;
            replay_realtime(&script, args.layer)?;
        }
    }
    Ok(())
}

/// Drives the demo combo table through real wall-clock time: sleeps for
/// each `t:<ms>` token instead of just advancing a counter, and polls
/// [`TimerHub`] for fired slot timeouts the way a real event-loop host
/// would, rather than scanning candidate deadlines by hand as `sim::simulate`
/// does for deterministic tests.
fn replay_realtime(script: &str, layer: u16) -> Result<()> {
    let combos = sim::demo_combos();
    let hub = TimerHub::spawn();
    let clock = Clock::default();
    let layer = FixedLayer(layer);
    let mut rec = Recorder::default();

    let mut engine: sim::DemoEngine<'_, ChannelTimer> =
        Engine::new(&combos, |slot| hub.timer_for(slot)).context("invalid demo combo table")?;

    for token in script.split_whitespace() {
        let (kind, val) = token.split_once(':').with_context(|| format!("invalid token {token}"))?;
        for (slot_idx, now) in hub.poll_fired() {
            let _ = engine.handle_timeout::<{ MAX_KEYS_PER_COMBO + 1 }>(slot_idx, now, &layer, &mut rec);
        }
        match kind {
            "t" => {
                let delay: u64 = val.parse().with_context(|| format!("invalid tick {val}"))?;
                thread::sleep(Duration::from_millis(delay));
                for (slot_idx, now) in hub.poll_fired() {
                    let _ = engine.handle_timeout::<{ MAX_KEYS_PER_COMBO + 1 }>(slot_idx, now, &layer, &mut rec);
                }
            }
            "d" => {
                let position: u16 = val.parse().with_context(|| format!("invalid position {val}"))?;
                let _ = engine.handle_press::<{ MAX_KEYS_PER_COMBO + 1 }>(position, clock.now_ms(), &layer, &mut rec);
            }
            "u" => {
                let position: u16 = val.parse().with_context(|| format!("invalid position {val}"))?;
                let _ = engine.handle_release::<{ MAX_KEYS_PER_COMBO + 1 }>(position, clock.now_ms(), &layer, &mut rec);
            }
            _ => bail!("invalid token {token}"),
        }
    }

    print_trace(&rec.trace);
    Ok(())
}
