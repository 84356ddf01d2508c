//! The calculator capabilities served by this binary.
//!
//! | Kind     | Name                            |
//! |----------|---------------------------------|
//! | Tool     | `calculate`                     |
//! | Tool     | `generate-random-number`        |
//! | Resource | `math-constants`                |
//! | Prompt   | `calculation-explanation`       |
//! | Prompt   | `generate-random-number-prompt` |

pub mod prompts;
pub mod random;
pub mod resources;
pub mod tools;

use crate::config::RandomConfig;
use crate::error::RegistryError;
use crate::registry::{handler_fn, CapabilityKind, Registry, RegistryBuilder};

/// Registers every calculator capability.
///
/// # Errors
///
/// Returns an error if any name is already taken in `builder`.
pub fn register_all(
    builder: &mut RegistryBuilder,
    random: RandomConfig,
) -> Result<(), RegistryError> {
    builder
        .register(
            CapabilityKind::Tool,
            tools::calculate_declaration(),
            handler_fn(tools::calculate),
        )?
        .register(
            CapabilityKind::Tool,
            tools::random_number_declaration(random),
            handler_fn(move |args| tools::generate_random_number(args, random)),
        )?;
    tracing::info!("Loaded tools: {}, {}", tools::CALCULATE, tools::GENERATE_RANDOM_NUMBER);

    builder.register(
        CapabilityKind::Resource,
        resources::math_constants_declaration(),
        handler_fn(resources::math_constants),
    )?;
    tracing::info!("Loaded resources: {}", resources::MATH_CONSTANTS);

    builder
        .register(
            CapabilityKind::Prompt,
            prompts::calculation_explanation_declaration(),
            handler_fn(prompts::calculation_explanation),
        )?
        .register(
            CapabilityKind::Prompt,
            prompts::random_number_prompt_declaration(random),
            handler_fn(move |args| prompts::random_number_prompt(args, random)),
        )?;
    tracing::info!(
        "Loaded prompts: {}, {}",
        prompts::CALCULATION_EXPLANATION,
        prompts::GENERATE_RANDOM_NUMBER_PROMPT
    );

    Ok(())
}

/// Builds a sealed registry holding the calculator capabilities.
///
/// # Errors
///
/// Returns an error if registration fails.
pub fn build_registry(random: RandomConfig) -> Result<Registry, RegistryError> {
    let mut builder = Registry::builder();
    register_all(&mut builder, random)?;
    Ok(builder.build())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_every_capability_in_order() {
        let registry = build_registry(RandomConfig::default()).unwrap();

        let names = |kind| -> Vec<String> {
            registry.list(kind).map(|d| d.name.clone()).collect()
        };
        assert_eq!(
            names(CapabilityKind::Tool),
            ["calculate", "generate-random-number"]
        );
        assert_eq!(names(CapabilityKind::Resource), ["math-constants"]);
        assert_eq!(
            names(CapabilityKind::Prompt),
            ["calculation-explanation", "generate-random-number-prompt"]
        );
    }

    #[test]
    fn registering_twice_fails_fast() {
        let mut builder = Registry::builder();
        register_all(&mut builder, RandomConfig::default()).unwrap();
        let err = register_all(&mut builder, RandomConfig::default()).unwrap_err();
        assert_eq!(
            err,
            RegistryError::Duplicate {
                kind: CapabilityKind::Tool,
                name: tools::CALCULATE.to_string(),
            }
        );
    }
}
