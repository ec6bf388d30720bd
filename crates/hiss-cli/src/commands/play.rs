//! Real-time playback command.

use super::common::{EngineArgs, print_chain};
use clap::Args;
use hiss_io::{BridgeState, CpalSink, NoiseEngine};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Args)]
pub struct PlayArgs {
    /// Stop after this many seconds (plays until Ctrl+C when omitted)
    #[arg(short, long)]
    seconds: Option<f64>,

    /// Output device name (substring match)
    #[arg(long)]
    device: Option<String>,

    #[command(flatten)]
    engine: EngineArgs,
}

pub fn run(args: PlayArgs) -> anyhow::Result<()> {
    let limit = match args.seconds {
        Some(s) if s.is_finite() && s > 0.0 => Some(Duration::from_secs_f64(s)),
        Some(s) => anyhow::bail!("Duration must be a positive number of seconds, got {}", s),
        None => None,
    };

    let config = args.engine.load_config()?;
    let sink = match &args.device {
        Some(name) => CpalSink::with_device(name.clone()),
        None => CpalSink::new(),
    };

    let mut engine = NoiseEngine::new(&config, Box::new(sink))?;
    args.engine.apply(&engine)?;

    // Set up Ctrl+C handler
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        println!("\nStopping...");
        r.store(false, Ordering::SeqCst);
    })?;

    print_chain(&engine);
    engine.start()?;
    match limit {
        Some(limit) => println!("Playing for {:.2}s...", limit.as_secs_f64()),
        None => println!("Playing... Press Ctrl+C to stop."),
    }

    let started = Instant::now();
    while running.load(Ordering::SeqCst) && engine.is_running() {
        if limit.is_some_and(|limit| started.elapsed() >= limit) {
            break;
        }
        std::thread::sleep(POLL_INTERVAL);
    }

    let failed = engine.state() == BridgeState::Failed;
    engine.stop()?;
    if failed {
        anyhow::bail!("Playback failed; see the log for details");
    }

    println!("Stopped after {} blocks.", engine.blocks_rendered());
    Ok(())
}
