//! Calculator tools: `calculate` and `generate-random-number`.

use std::fmt;
use std::str::FromStr;

use serde_json::json;

use crate::calculator::random::{self, Distribution};
use crate::config::RandomConfig;
use crate::error::HandlerError;
use crate::registry::{ArgValue, Arguments, Declaration, Output, ParamSpec, Rule};

/// Name of the arithmetic tool.
pub const CALCULATE: &str = "calculate";

/// Name of the random-number tool.
pub const GENERATE_RANDOM_NUMBER: &str = "generate-random-number";

/// A basic arithmetic operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// `a + b`
    Add,
    /// `a - b`
    Subtract,
    /// `a × b`
    Multiply,
    /// `a ÷ b`
    Divide,
}

impl Operation {
    /// Names accepted by [`FromStr`].
    pub const NAMES: [&'static str; 4] = ["add", "subtract", "multiply", "divide"];

    /// Applies the operation.
    ///
    /// # Errors
    ///
    /// Returns an error if the result overflows to infinity or is NaN,
    /// since JSON has no representation for either.
    pub fn apply(self, a: f64, b: f64) -> Result<f64, HandlerError> {
        let result = match self {
            Self::Add => a + b,
            Self::Subtract => a - b,
            Self::Multiply => a * b,
            Self::Divide => a / b,
        };
        if result.is_finite() {
            Ok(result)
        } else {
            Err(HandlerError::new("Result is not a finite number"))
        }
    }

    /// Operator symbol used in explanations.
    #[must_use]
    pub const fn symbol(self) -> char {
        match self {
            Self::Add => '+',
            Self::Subtract => '-',
            Self::Multiply => '×',
            Self::Divide => '÷',
        }
    }

    /// Lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Subtract => "subtract",
            Self::Multiply => "multiply",
            Self::Divide => "divide",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = HandlerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "add" => Ok(Self::Add),
            "subtract" => Ok(Self::Subtract),
            "multiply" => Ok(Self::Multiply),
            "divide" => Ok(Self::Divide),
            other => Err(HandlerError::new(format!(
                "Invalid operation: {other}. Valid operations are: {}",
                Self::NAMES.join(", ")
            ))),
        }
    }
}

/// Parameters shared by the `calculate` tool and the explanation prompt.
pub(crate) fn arithmetic_params(declaration: Declaration) -> Declaration {
    declaration
        .param(
            ParamSpec::string("operation", "operation to be performed on the numbers")
                .required()
                .one_of(Operation::NAMES),
        )
        .param(ParamSpec::number("num1", "first number").required())
        .param(ParamSpec::number("num2", "second number").required())
}

/// Reads the validated arithmetic arguments.
pub(crate) fn arithmetic_args(args: &Arguments) -> Result<(Operation, f64, f64), HandlerError> {
    let operation = args.text("operation").unwrap_or_default().parse()?;
    let missing = |name: &str| HandlerError::new(format!("Missing required parameter: {name}"));
    let num1 = args.number("num1").ok_or_else(|| missing("num1"))?;
    let num2 = args.number("num2").ok_or_else(|| missing("num2"))?;
    Ok((operation, num1, num2))
}

/// Declaration of the `calculate` tool.
#[must_use]
pub fn calculate_declaration() -> Declaration {
    arithmetic_params(Declaration::new(
        CALCULATE,
        "Perform basic mathematical operations like add, subtract, multiply, and divide",
    ))
    .rule(Rule::non_zero_when(
        "num2",
        "operation",
        "divide",
        "cannot divide by zero",
    ))
}

/// Handler of the `calculate` tool.
///
/// # Errors
///
/// Returns an error if the arguments bypassed validation or the result is
/// not finite.
pub fn calculate(args: &Arguments) -> Result<Output, HandlerError> {
    let (operation, num1, num2) = arithmetic_args(args)?;
    let result = operation.apply(num1, num2)?;

    Ok(Output::new(json!({ "result": result })).with_rendering(format!("Result: {result}")))
}

/// Parameters shared by the random-number tool and prompt.
pub(crate) fn random_params(declaration: Declaration, defaults: RandomConfig) -> Declaration {
    #[allow(clippy::cast_precision_loss)]
    let limit = RandomConfig::LIMIT as f64;

    declaration
        .param(
            ParamSpec::integer(
                "min",
                &format!("minimum value (default: {})", defaults.default_min),
            )
            .bounds(Some(-limit), Some(limit))
            .with_default(ArgValue::Integer(defaults.default_min)),
        )
        .param(
            ParamSpec::integer(
                "max",
                &format!("maximum value (default: {})", defaults.default_max),
            )
            .bounds(Some(-limit), Some(limit))
            .with_default(ArgValue::Integer(defaults.default_max)),
        )
        .param(
            ParamSpec::string(
                "distribution",
                "probability distribution: 'uniform' (default), 'normal' (Gaussian/bell curve), or 'exponential' (exponential decay)",
            )
            .one_of(std::iter::once("").chain(Distribution::NAMES)),
        )
        .rule(Rule::less_than("min", "max"))
}

/// Validated random-number arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RandomRequest {
    pub min: i64,
    pub max: i64,
    pub distribution: Distribution,
}

impl RandomRequest {
    pub(crate) fn from_args(args: &Arguments, defaults: RandomConfig) -> Result<Self, HandlerError> {
        let distribution: Distribution = args.text("distribution").unwrap_or_default().parse()?;
        let min = args.integer("min").unwrap_or(defaults.default_min);
        let max = args.integer("max").unwrap_or(defaults.default_max);
        if min >= max {
            return Err(HandlerError::new(format!(
                "Invalid range: min ({min}) must be less than max ({max})"
            )));
        }
        Ok(Self {
            min,
            max,
            distribution,
        })
    }

    pub(crate) fn draw(&self) -> i64 {
        random::sample(&mut rand::thread_rng(), self.distribution, self.min, self.max)
    }
}

/// Declaration of the `generate-random-number` tool.
#[must_use]
pub fn random_number_declaration(defaults: RandomConfig) -> Declaration {
    random_params(
        Declaration::new(
            GENERATE_RANDOM_NUMBER,
            format!(
                "Generate a random number between {} and {} (or a custom range) using a uniform, normal, or exponential distribution",
                defaults.default_min, defaults.default_max
            ),
        ),
        defaults,
    )
}

/// Handler of the `generate-random-number` tool.
///
/// # Errors
///
/// Returns an error if the distribution or range is unusable.
pub fn generate_random_number(
    args: &Arguments,
    defaults: RandomConfig,
) -> Result<Output, HandlerError> {
    let request = RandomRequest::from_args(args, defaults)?;
    let number = request.draw();

    Ok(Output::new(json!({ "number": number })).with_rendering(format!(
        "Generated random number: {number} (distribution: {}, range: [{}, {}])",
        request.distribution, request.min, request.max
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::validate;
    use serde_json::{Map, Value};

    fn args(decl: &Declaration, value: Value) -> Arguments {
        let map: Map<String, Value> = value.as_object().cloned().unwrap();
        validate(decl, &map).unwrap()
    }

    #[test]
    fn calculate_each_operation() {
        let decl = calculate_declaration();
        for (op, expected) in [
            ("add", 8.0),
            ("subtract", 4.0),
            ("multiply", 12.0),
            ("divide", 3.0),
        ] {
            let output = calculate(&args(
                &decl,
                json!({"operation": op, "num1": 6, "num2": 2}),
            ))
            .unwrap();
            assert_eq!(output.payload, json!({ "result": expected }), "{op}");
        }
    }

    #[test]
    fn calculate_rendering() {
        let output = calculate(&args(
            &calculate_declaration(),
            json!({"operation": "divide", "num1": 1, "num2": 4}),
        ))
        .unwrap();
        assert_eq!(output.rendering.as_deref(), Some("Result: 0.25"));
    }

    #[test]
    fn calculate_schema_rejects_divide_by_zero() {
        let map = json!({"operation": "divide", "num1": 1, "num2": 0});
        let err = validate(&calculate_declaration(), map.as_object().unwrap()).unwrap_err();
        assert!(err.mentions("num2"));
    }

    #[test]
    fn calculate_overflow_is_an_error() {
        let decl = calculate_declaration();
        for (op, num1, num2) in [
            ("multiply", 1e200, 1e200),
            ("add", f64::MAX, f64::MAX),
            ("divide", 1e300, 1e-300),
        ] {
            let err = calculate(&args(
                &decl,
                json!({"operation": op, "num1": num1, "num2": num2}),
            ))
            .unwrap_err();
            assert_eq!(err.message, "Result is not a finite number", "{op}");
        }
    }

    #[test]
    fn operation_parse_rejects_unknown() {
        let err = "power".parse::<Operation>().unwrap_err();
        assert!(err.message.contains("Valid operations are: add, subtract, multiply, divide"));
    }

    #[test]
    fn random_number_uses_defaults() {
        let defaults = RandomConfig::default();
        let decl = random_number_declaration(defaults);
        for _ in 0..50 {
            let output = generate_random_number(&args(&decl, json!({})), defaults).unwrap();
            let n = output.payload["number"].as_i64().unwrap();
            assert!((1..=100).contains(&n));
            assert!(output
                .rendering
                .unwrap()
                .ends_with("(distribution: uniform, range: [1, 100])"));
        }
    }

    #[test]
    fn random_number_respects_custom_range() {
        let defaults = RandomConfig::default();
        let decl = random_number_declaration(defaults);
        for distribution in ["uniform", "normal", "exponential"] {
            for _ in 0..50 {
                let output = generate_random_number(
                    &args(
                        &decl,
                        json!({"min": 9, "max": 10, "distribution": distribution}),
                    ),
                    defaults,
                )
                .unwrap();
                let n = output.payload["number"].as_i64().unwrap();
                assert!((9..=10).contains(&n), "{distribution}: {n}");
            }
        }
    }

    #[test]
    fn random_handler_rejects_unvalidated_distribution() {
        let mut raw = Arguments::new();
        raw.insert("distribution", ArgValue::Text("triangular".into()));
        let err = generate_random_number(&raw, RandomConfig::default()).unwrap_err();
        assert!(err.message.starts_with("Invalid distribution: triangular"));
    }

    #[test]
    fn random_schema_lists_distributions() {
        let schema = random_number_declaration(RandomConfig::default()).input_schema();
        assert_eq!(
            schema["properties"]["distribution"]["enum"],
            json!(["", "uniform", "normal", "exponential"])
        );
        assert_eq!(schema["properties"]["min"]["default"], json!(1));
    }
}
