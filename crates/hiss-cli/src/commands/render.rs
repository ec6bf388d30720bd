//! Offline rendering to a WAV file.

use super::common::{EngineArgs, print_chain};
use clap::Args;
use hiss_io::{BridgeState, NoiseEngine, WavSink};
use std::path::PathBuf;

#[derive(Args)]
pub struct RenderArgs {
    /// Output WAV file
    output: PathBuf,

    /// Duration in seconds
    #[arg(short, long, default_value = "5.0")]
    seconds: f64,

    /// Bits per sample (16 or 24 for integer, 32 for float)
    #[arg(long, default_value = "32")]
    bits: u16,

    #[command(flatten)]
    engine: EngineArgs,
}

pub fn run(args: RenderArgs) -> anyhow::Result<()> {
    anyhow::ensure!(
        args.seconds.is_finite() && args.seconds > 0.0,
        "Duration must be a positive number of seconds, got {}",
        args.seconds
    );

    let config = args.engine.load_config()?;
    let frames = config.render.frames_for(args.seconds);
    let sink = WavSink::new(&args.output, frames).with_bits(args.bits);

    let mut engine = NoiseEngine::new(&config, Box::new(sink))?;
    args.engine.apply(&engine)?;

    print_chain(&engine);
    println!(
        "Rendering {:.2}s ({} frames at {} Hz) to {}",
        args.seconds,
        frames,
        config.render.sample_rate,
        args.output.display()
    );

    engine.start()?;
    match engine.wait(None)? {
        BridgeState::Stopped => {
            println!("Done. {} blocks rendered.", engine.blocks_rendered());
            Ok(())
        }
        state => anyhow::bail!("Rendering ended in state {:?}; see the log for details", state),
    }
}
