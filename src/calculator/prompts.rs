//! Prompts: `calculation-explanation` and `generate-random-number-prompt`.
//!
//! Prompt arguments arrive as strings; the validator coerces the numeric
//! ones. The rendering of each [`Output`] becomes the prompt message.

use serde_json::json;

use crate::calculator::tools::{
    arithmetic_args, arithmetic_params, random_params, Operation, RandomRequest,
};
use crate::config::RandomConfig;
use crate::error::HandlerError;
use crate::registry::{Arguments, Declaration, Output, Rule};

/// Name of the calculation explanation prompt.
pub const CALCULATION_EXPLANATION: &str = "calculation-explanation";

/// Name of the random-number prompt.
pub const GENERATE_RANDOM_NUMBER_PROMPT: &str = "generate-random-number-prompt";

/// Declaration of the calculation explanation prompt.
#[must_use]
pub fn calculation_explanation_declaration() -> Declaration {
    arithmetic_params(Declaration::new(
        CALCULATION_EXPLANATION,
        "Explain how a mathematical calculation works",
    ))
    .rule(Rule::non_zero_when(
        "num2",
        "operation",
        "divide",
        "Cannot divide by zero. Division by zero is undefined in mathematics.",
    ))
}

/// Handler of the calculation explanation prompt.
///
/// # Errors
///
/// Returns an error if the arguments bypassed validation or the result is
/// not finite.
pub fn calculation_explanation(args: &Arguments) -> Result<Output, HandlerError> {
    let (operation, a, b) = arithmetic_args(args)?;
    let result = operation.apply(a, b)?;
    let symbol = operation.symbol();

    let explanation = match operation {
        Operation::Add => format!(
            "To add {a} and {b}, you simply combine the two numbers: {a} {symbol} {b} = {result}"
        ),
        Operation::Subtract => format!(
            "To subtract {b} from {a}, you take away the second number from the first: {a} {symbol} {b} = {result}"
        ),
        Operation::Multiply => format!(
            "To multiply {a} by {b}, you calculate the product: {a} {symbol} {b} = {result}"
        ),
        Operation::Divide => format!(
            "To divide {a} by {b}, you calculate the quotient: {a} {symbol} {b} = {result}"
        ),
    };

    Ok(Output::new(json!({
        "operation": operation.as_str(),
        "num1": a,
        "num2": b,
        "result": result,
    }))
    .with_rendering(format!("{explanation}\n\nResult: {result}")))
}

/// Declaration of the random-number prompt.
#[must_use]
pub fn random_number_prompt_declaration(defaults: RandomConfig) -> Declaration {
    random_params(
        Declaration::new(
            GENERATE_RANDOM_NUMBER_PROMPT,
            "Generate and explain a random number",
        ),
        defaults,
    )
}

/// Handler of the random-number prompt.
///
/// # Errors
///
/// Returns an error if the distribution or range is unusable.
pub fn random_number_prompt(
    args: &Arguments,
    defaults: RandomConfig,
) -> Result<Output, HandlerError> {
    let request = RandomRequest::from_args(args, defaults)?;
    let number = request.draw();
    let explanation = request.distribution.explain(request.min, request.max);

    Ok(Output::new(json!({
        "number": number,
        "min": request.min,
        "max": request.max,
        "distribution": request.distribution.as_str(),
    }))
    .with_rendering(format!(
        "{explanation}\n\nGenerated random number: {number}\nRange: [{}, {}]\nDistribution: {}",
        request.min, request.max, request.distribution
    )))
}
