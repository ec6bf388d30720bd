//! Property-based tests for every registered processor.
//!
//! Uses proptest to verify that overrides inside a declared range are always
//! accepted, overrides outside it are always rejected with the offending
//! parameter named, and that every processor created from random valid
//! settings produces bounded output.

use hiss_core::{ParamValue, ParameterSnapshot, Processor};
use hiss_registry::{ProcessorRegistry, RegistryError};
use proptest::prelude::*;

/// Map normalized values onto every ranged parameter of `id`.
fn random_overrides(registry: &ProcessorRegistry, id: &str, t: &[f64; 8]) -> ParameterSnapshot {
    let schema = registry.schema(id).unwrap();
    schema
        .iter()
        .enumerate()
        .filter_map(|(i, def)| {
            let range = def.range?;
            let x = range.min + t[i % 8] * (range.max - range.min);
            let value = match def.default {
                ParamValue::Int(_) => ParamValue::Int(x.round() as i64),
                _ => ParamValue::Float(x as f32),
            };
            Some((def.name.to_string(), value))
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Random in-range settings create a processor whose output is bounded.
    #[test]
    fn valid_overrides_create_bounded_processors(
        t in prop::array::uniform8(0.0f64..=1.0),
        input in prop::array::uniform32(-1.0f32..=1.0f32),
        index in 0usize..5,
    ) {
        let registry = ProcessorRegistry::new();
        let id = registry.ids()[index];
        let overrides = random_overrides(&registry, id, &t);
        let processor = registry.create(id, &overrides).unwrap();
        let params = registry.resolve(id, &overrides).unwrap();

        let output = match processor {
            Processor::Noise(mut source) => {
                source.update(&params);
                source.generate(input.len())
            }
            Processor::Filter(mut filter) => filter.process(&input, &params).unwrap(),
        };
        for s in output {
            prop_assert!(s.is_finite() && (-1.0..=1.0).contains(&s), "{}: {}", id, s);
        }
    }

    /// A value past either end of a declared range is rejected and named.
    #[test]
    fn out_of_range_overrides_rejected(
        excess in 0.01f64..100.0,
        above in any::<bool>(),
        index in 0usize..5,
    ) {
        let registry = ProcessorRegistry::new();
        let id = registry.ids()[index];
        for def in registry.schema(id).unwrap() {
            let Some(range) = def.range else { continue };
            let x = if above { range.max + excess } else { range.min - excess };
            let rounded = if above { x.ceil() } else { x.floor() };
            let value = match def.default {
                ParamValue::Int(_) => ParamValue::Int(rounded as i64),
                _ => ParamValue::Float(x as f32),
            };
            let overrides = ParameterSnapshot::new().with(def.name, value);

            match registry.create(id, &overrides) {
                Err(RegistryError::Validation { source, .. }) => {
                    prop_assert_eq!(source.param(), Some(def.name));
                }
                Err(other) => prop_assert!(false, "unexpected error {other}"),
                Ok(_) => prop_assert!(false, "{}.{} accepted {}", id, def.name, x),
            }
        }
    }
}
