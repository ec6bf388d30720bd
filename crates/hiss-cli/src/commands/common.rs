//! Shared CLI helpers used across multiple commands.

use clap::Args;
use hiss_config::{EngineConfig, parse_assignment, parse_param_value};
use hiss_core::ParamValue;
use hiss_io::NoiseEngine;
use std::path::PathBuf;

/// Parse a `name=value` string for clap's `value_parser`.
pub fn parse_key_val(s: &str) -> Result<(String, String), String> {
    parse_assignment(s)
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .ok_or_else(|| format!("Invalid parameter format: '{}' (expected name=value)", s))
}

/// Options shared by every command that runs the engine.
#[derive(Args)]
pub struct EngineArgs {
    /// Engine configuration file (TOML)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Set a parameter after the chain is loaded (e.g. "cutoff=0.3")
    #[arg(long = "set", value_name = "NAME=VALUE", value_parser = parse_key_val)]
    set: Vec<(String, String)>,

    /// Sample rate override
    #[arg(long)]
    sample_rate: Option<u32>,

    /// Block size override (frames)
    #[arg(long)]
    block_size: Option<usize>,
}

impl EngineArgs {
    /// Load the configuration file, or the defaults, and apply overrides.
    pub fn load_config(&self) -> anyhow::Result<EngineConfig> {
        let mut config = match &self.config {
            Some(path) => EngineConfig::load(path)?,
            None => EngineConfig::default(),
        };
        if let Some(rate) = self.sample_rate {
            config.render.sample_rate = rate;
        }
        if let Some(size) = self.block_size {
            config.render.block_size = size;
        }
        config.render.validate()?;
        Ok(config)
    }

    /// Apply the `--set` assignments as one atomic update.
    pub fn apply(&self, engine: &NoiseEngine) -> anyhow::Result<()> {
        if self.set.is_empty() {
            return Ok(());
        }
        let changes = parse_changes(engine, &self.set)?;
        engine.update_parameters(changes)?;
        Ok(())
    }
}

/// Typed parameter changes from textual assignments.
pub fn parse_changes(
    engine: &NoiseEngine,
    assignments: &[(String, String)],
) -> anyhow::Result<Vec<(String, ParamValue)>> {
    assignments
        .iter()
        .map(|(name, raw)| -> anyhow::Result<(String, ParamValue)> {
            let def = engine.store().definition(name).ok_or_else(|| {
                anyhow::anyhow!(
                    "Unknown parameter: {} (see 'hiss processors' for the schema)",
                    name
                )
            })?;
            Ok((name.clone(), parse_param_value(raw, def)?))
        })
        .collect()
}

/// Print the chain the engine is about to run.
pub fn print_chain(engine: &NoiseEngine) {
    let stages: Vec<&str> = engine.chain().iter().map(|p| p.kind.as_str()).collect();
    println!("Chain: {}", stages.join(" -> "));
}
