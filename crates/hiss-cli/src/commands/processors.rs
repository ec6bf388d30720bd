//! Processor listing and schema command.

#![allow(clippy::print_literal)] // Table headers use literal strings intentionally

use clap::Args;
use hiss_config::ProcessorRegistry;
use hiss_core::{ParamType, ParameterDefinition, ProcessorCategory};

#[derive(Args)]
pub struct ProcessorsArgs {
    /// Show the parameters of a specific processor
    #[arg(value_name = "PROCESSOR")]
    processor: Option<String>,
}

pub fn run(args: ProcessorsArgs) -> anyhow::Result<()> {
    let registry = ProcessorRegistry::new();

    if let Some(id) = &args.processor {
        let descriptor = registry
            .get(&id.to_ascii_lowercase())
            .ok_or_else(|| anyhow::anyhow!("Unknown processor: {}", id))?;

        println!("{} ({})", descriptor.name, descriptor.id);
        println!("{}", "=".repeat(descriptor.name.len() + descriptor.id.len() + 3));
        println!();
        println!("{}", descriptor.description);
        println!("Role: {}", descriptor.category);
        println!();

        println!("Parameters:");
        println!();
        println!(
            "  {:14}  {:6}  {:8}  {:20}  {}",
            "Name", "Type", "Default", "Range", "Description"
        );
        println!(
            "  {:14}  {:6}  {:8}  {:20}  {}",
            "----", "----", "-------", "-----", "-----------"
        );
        for param in &descriptor.params {
            println!(
                "  {:14}  {:6}  {:8}  {:20}  {}",
                param.name,
                param.param_type.name(),
                param.default.to_string(),
                describe_range(param),
                param.description
            );
        }

        println!();
        println!("Example usage:");
        println!();
        let example: Vec<String> = descriptor
            .params
            .iter()
            .take(2)
            .map(|p| format!("--set {}={}", p.name, p.default))
            .collect();
        println!("  hiss render out.wav --seconds 5 {}", example.join(" "));
    } else {
        println!("Available Processors");
        println!("====================");

        for category in ProcessorCategory::ALL {
            println!();
            println!("{} - {}", category, category.description());
            for descriptor in registry.by_category(category) {
                println!("  {:18} - {}", descriptor.id, descriptor.description);
            }
        }

        println!();
        println!("Use 'hiss processors <id>' for detailed parameter info.");
    }

    Ok(())
}

/// Accepted values of a parameter, as shown in the schema table.
fn describe_range(param: &ParameterDefinition) -> String {
    match param.param_type {
        ParamType::Enum => param.choices.join("|"),
        ParamType::Bool => "on|off".to_string(),
        ParamType::String => "text".to_string(),
        ParamType::Float | ParamType::Int => param
            .range
            .map(|r| format!("{} to {}", r.min, r.max))
            .unwrap_or_else(|| "any".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_range() {
        let registry = ProcessorRegistry::new();
        let poles = registry.get("lowpass").unwrap().param("poles").unwrap();
        assert_eq!(describe_range(poles), "1 to 4");

        let mapping = registry
            .get("resonant_lowpass")
            .unwrap()
            .param("mapping")
            .unwrap();
        assert!(describe_range(mapping).contains("cubic"));
    }

    #[test]
    fn test_unknown_processor_fails() {
        let args = ProcessorsArgs {
            processor: Some("wah".to_string()),
        };
        assert!(run(args).is_err());
    }
}
