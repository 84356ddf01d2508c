//! Argument validation.
//!
//! [`validate`] turns an untyped JSON argument payload into a typed
//! [`Arguments`] set, or reports every rule the payload violates.
//!
//! Validation runs in two phases:
//!
//! 1. **Per parameter**: presence, type coercion, domain constraint. Absent
//!    optional parameters take their declared default.
//! 2. **Per rule**: cross-field [`Rule`]s over the typed set. A rule whose
//!    parameters already failed phase 1 is skipped so one bad value is not
//!    reported twice.
//!
//! All violations are collected. Numeric parameters also accept numeric
//! strings, since MCP prompt arguments always arrive as strings.

use indexmap::IndexMap;
use serde_json::{json, Map, Value};

use crate::error::{ValidationError, Violation};
use crate::registry::schema::{Constraint, Declaration, ParamSpec, ParamType, Rule};

/// A typed argument value.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    /// Floating point number.
    Number(f64),
    /// Whole number.
    Integer(i64),
    /// Text.
    Text(String),
    /// Boolean.
    Bool(bool),
}

impl ArgValue {
    /// Converts back into JSON.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Number(n) => json!(n),
            Self::Integer(i) => json!(i),
            Self::Text(s) => json!(s),
            Self::Bool(b) => json!(b),
        }
    }

    /// Numeric value as `f64` (integers are widened).
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }
}

/// A validated, fully-populated argument set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    values: IndexMap<String, ArgValue>,
}

impl Arguments {
    /// Creates an empty argument set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a value, replacing any previous one.
    pub fn insert(&mut self, name: impl Into<String>, value: ArgValue) {
        self.values.insert(name.into(), value);
    }

    /// Returns the raw typed value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.values.get(name)
    }

    /// Returns `true` if the parameter is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Returns a numeric parameter as `f64` (integers are widened).
    #[must_use]
    pub fn number(&self, name: &str) -> Option<f64> {
        self.values.get(name)?.as_f64()
    }

    /// Returns an integer parameter.
    #[must_use]
    pub fn integer(&self, name: &str) -> Option<i64> {
        match self.values.get(name)? {
            ArgValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns a string parameter.
    #[must_use]
    pub fn text(&self, name: &str) -> Option<&str> {
        match self.values.get(name)? {
            ArgValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns a boolean parameter.
    #[must_use]
    pub fn boolean(&self, name: &str) -> Option<bool> {
        match self.values.get(name)? {
            ArgValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Number of present parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if no parameters are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates parameters in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ArgValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Validates `payload` against the declaration's parameters and rules.
///
/// Keys that the declaration does not mention are ignored.
///
/// # Errors
///
/// Returns a [`ValidationError`] listing every violation found.
pub fn validate(
    declaration: &Declaration,
    payload: &Map<String, Value>,
) -> Result<Arguments, ValidationError> {
    let mut args = Arguments::new();
    let mut violations = Vec::new();

    for spec in &declaration.params {
        match check_param(spec, payload.get(&spec.name)) {
            Ok(Some(value)) => args.insert(spec.name.clone(), value),
            Ok(None) => {}
            Err(message) => violations.push(Violation::new(&spec.name, message)),
        }
    }

    for rule in &declaration.rules {
        let blocked = rule
            .fields()
            .iter()
            .any(|field| violations.iter().any(|v: &Violation| v.field == *field));
        if blocked {
            continue;
        }
        if let Some(violation) = check_rule(rule, &args) {
            violations.push(violation);
        }
    }

    if violations.is_empty() {
        Ok(args)
    } else {
        Err(ValidationError { violations })
    }
}

/// Phase 1 for one parameter. `Ok(None)` means absent and optional.
fn check_param(spec: &ParamSpec, raw: Option<&Value>) -> Result<Option<ArgValue>, String> {
    let Some(raw) = raw.filter(|v| !is_empty(v)) else {
        if let Some(default) = &spec.default {
            return Ok(Some(default.clone()));
        }
        if spec.required {
            return Err("is required".to_string());
        }
        return Ok(None);
    };

    let value = coerce(spec.param_type, raw)?;
    check_constraint(spec.constraint.as_ref(), &value)?;
    Ok(Some(value))
}

/// `null` and blank strings count as "not supplied".
fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn coerce(param_type: ParamType, raw: &Value) -> Result<ArgValue, String> {
    match param_type {
        ParamType::Number => {
            let n = match raw {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            };
            n.filter(|n| n.is_finite())
                .map(ArgValue::Number)
                .ok_or_else(|| "expected a number".to_string())
        }
        ParamType::Integer => {
            let f = match raw {
                Value::Number(n) => {
                    if let Some(i) = n.as_i64() {
                        return Ok(ArgValue::Integer(i));
                    }
                    n.as_f64()
                }
                Value::String(s) => {
                    if let Ok(i) = s.trim().parse::<i64>() {
                        return Ok(ArgValue::Integer(i));
                    }
                    s.trim().parse::<f64>().ok()
                }
                _ => None,
            };
            f.filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| ArgValue::Integer(f as i64))
                .ok_or_else(|| "expected an integer".to_string())
        }
        ParamType::String => match raw {
            Value::String(s) => Ok(ArgValue::Text(s.clone())),
            _ => Err("expected a string".to_string()),
        },
        ParamType::Boolean => match raw {
            Value::Bool(b) => Ok(ArgValue::Bool(*b)),
            Value::String(s) => match s.trim() {
                "true" => Ok(ArgValue::Bool(true)),
                "false" => Ok(ArgValue::Bool(false)),
                _ => Err("expected a boolean".to_string()),
            },
            _ => Err("expected a boolean".to_string()),
        },
    }
}

fn check_constraint(constraint: Option<&Constraint>, value: &ArgValue) -> Result<(), String> {
    match (constraint, value) {
        (Some(Constraint::OneOf(allowed)), ArgValue::Text(s)) => {
            if allowed.iter().any(|a| a == s) {
                Ok(())
            } else {
                let listed: Vec<&str> = allowed
                    .iter()
                    .filter(|a| !a.is_empty())
                    .map(String::as_str)
                    .collect();
                Err(format!("must be one of: {}", listed.join(", ")))
            }
        }
        (Some(Constraint::Bounds { min, max }), value) => {
            let Some(n) = value.as_f64() else {
                return Ok(());
            };
            if let Some(min) = min {
                if n < *min {
                    return Err(format!("must be at least {min}"));
                }
            }
            if let Some(max) = max {
                if n > *max {
                    return Err(format!("must be at most {max}"));
                }
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn check_rule(rule: &Rule, args: &Arguments) -> Option<Violation> {
    match rule {
        Rule::NonZeroWhen {
            field,
            when,
            equals,
            message,
        } => {
            let active = args.text(when) == Some(equals.as_str());
            let zero = args.number(field).is_some_and(|n| n == 0.0);
            (active && zero).then(|| Violation::new(field, message))
        }
        Rule::LessThan { lower, upper } => {
            let (lo, hi) = (args.number(lower)?, args.number(upper)?);
            (lo >= hi).then(|| Violation::new(lower, format!("{lower} must be less than {upper}")))
        }
        Rule::Check(check) => check(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calculate() -> Declaration {
        Declaration::new("calculate", "Perform arithmetic")
            .param(
                ParamSpec::string("operation", "operation")
                    .required()
                    .one_of(["add", "subtract", "multiply", "divide"]),
            )
            .param(ParamSpec::number("num1", "first number").required())
            .param(ParamSpec::number("num2", "second number").required())
            .rule(Rule::non_zero_when(
                "num2",
                "operation",
                "divide",
                "cannot divide by zero",
            ))
    }

    fn random() -> Declaration {
        Declaration::new("random", "Random number")
            .param(ParamSpec::integer("min", "minimum").with_default(ArgValue::Integer(1)))
            .param(ParamSpec::integer("max", "maximum").with_default(ArgValue::Integer(100)))
            .param(
                ParamSpec::string("distribution", "distribution").one_of([
                    "",
                    "uniform",
                    "normal",
                    "exponential",
                ]),
            )
            .rule(Rule::less_than("min", "max"))
    }

    fn payload(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn accepts_complete_payload() {
        let args = validate(
            &calculate(),
            &payload(json!({"operation": "add", "num1": 2, "num2": 3.5})),
        )
        .unwrap();
        assert_eq!(args.text("operation"), Some("add"));
        assert_eq!(args.number("num1"), Some(2.0));
        assert_eq!(args.number("num2"), Some(3.5));
    }

    #[test]
    fn reports_every_missing_field() {
        let err = validate(&calculate(), &Map::new()).unwrap_err();
        assert_eq!(err.violations.len(), 3);
        for field in ["operation", "num1", "num2"] {
            assert!(err.mentions(field), "missing {field}");
        }
    }

    #[test]
    fn blank_string_counts_as_missing() {
        let err = validate(
            &calculate(),
            &payload(json!({"operation": "  ", "num1": 1, "num2": 2})),
        )
        .unwrap_err();
        assert_eq!(err.violations, [Violation::new("operation", "is required")]);
    }

    #[test]
    fn zero_is_a_present_number() {
        let args = validate(
            &calculate(),
            &payload(json!({"operation": "multiply", "num1": 0, "num2": 0})),
        )
        .unwrap();
        assert_eq!(args.number("num1"), Some(0.0));
    }

    #[test]
    fn rejects_value_outside_enum() {
        let err = validate(
            &calculate(),
            &payload(json!({"operation": "modulo", "num1": 1, "num2": 2})),
        )
        .unwrap_err();
        assert_eq!(err.violations.len(), 1);
        assert_eq!(err.violations[0].field, "operation");
        assert!(err.violations[0]
            .message
            .contains("add, subtract, multiply, divide"));
    }

    #[test]
    fn divide_by_zero_is_cross_field_violation() {
        let err = validate(
            &calculate(),
            &payload(json!({"operation": "divide", "num1": 1, "num2": 0})),
        )
        .unwrap_err();
        assert_eq!(
            err.violations,
            [Violation::new("num2", "cannot divide by zero")]
        );

        // Zero is only invalid for division.
        assert!(validate(
            &calculate(),
            &payload(json!({"operation": "subtract", "num1": 1, "num2": 0})),
        )
        .is_ok());
    }

    #[test]
    fn rule_skipped_when_its_fields_already_failed() {
        let err = validate(
            &calculate(),
            &payload(json!({"operation": "divide", "num1": 1, "num2": "zero"})),
        )
        .unwrap_err();
        assert_eq!(err.violations, [Violation::new("num2", "expected a number")]);
    }

    #[test]
    fn numeric_strings_are_coerced() {
        let args = validate(
            &calculate(),
            &payload(json!({"operation": "add", "num1": "2.5", "num2": " 4 "})),
        )
        .unwrap();
        assert_eq!(args.number("num1"), Some(2.5));
        assert_eq!(args.number("num2"), Some(4.0));
    }

    #[test]
    fn defaults_fill_absent_parameters() {
        let args = validate(&random(), &Map::new()).unwrap();
        assert_eq!(args.integer("min"), Some(1));
        assert_eq!(args.integer("max"), Some(100));
        assert!(!args.contains("distribution"));
    }

    #[test]
    fn empty_distribution_is_unset_sentinel() {
        let args = validate(&random(), &payload(json!({"distribution": ""}))).unwrap();
        assert!(!args.contains("distribution"));
    }

    #[test]
    fn range_rule_boundaries() {
        let equal = validate(&random(), &payload(json!({"min": 5, "max": 5}))).unwrap_err();
        assert_eq!(
            equal.violations,
            [Violation::new("min", "min must be less than max")]
        );

        assert!(validate(&random(), &payload(json!({"min": 4, "max": 5}))).is_ok());
        assert!(validate(&random(), &payload(json!({"min": 6, "max": 5}))).is_err());
    }

    #[test]
    fn range_rule_uses_defaults_for_absent_bound() {
        let err = validate(&random(), &payload(json!({"min": 150}))).unwrap_err();
        assert!(err.mentions("min"));
    }

    #[test]
    fn integer_rejects_fractions() {
        let err = validate(&random(), &payload(json!({"min": 1.5}))).unwrap_err();
        assert_eq!(err.violations, [Violation::new("min", "expected an integer")]);

        let args = validate(&random(), &payload(json!({"min": 2.0, "max": "7"}))).unwrap();
        assert_eq!(args.integer("min"), Some(2));
        assert_eq!(args.integer("max"), Some(7));
    }

    #[test]
    fn collects_field_and_rule_violations_together() {
        let err = validate(
            &random(),
            &payload(json!({"min": 10, "max": 3, "distribution": "poisson"})),
        )
        .unwrap_err();
        assert_eq!(err.violations.len(), 2);
        assert_eq!(err.violations[0].field, "distribution");
        assert_eq!(err.violations[1].field, "min");
    }

    #[test]
    fn bounds_constraint() {
        let decl = Declaration::new("sqrt", "Square root")
            .param(ParamSpec::number("x", "value").required().bounds(Some(0.0), None));
        let err = validate(&decl, &payload(json!({"x": -1}))).unwrap_err();
        assert_eq!(err.violations, [Violation::new("x", "must be at least 0")]);
        assert!(validate(&decl, &payload(json!({"x": 0}))).is_ok());
    }

    #[test]
    fn custom_check_sees_whole_argument_set() {
        let decl = Declaration::new("flags", "Flags")
            .param(ParamSpec::boolean("a", "a"))
            .param(ParamSpec::boolean("b", "b"))
            .rule(Rule::check(|args| {
                (args.boolean("a") == Some(true) && args.boolean("b") == Some(true))
                    .then(|| Violation::new("b", "a and b are mutually exclusive"))
            }));
        assert!(validate(&decl, &payload(json!({"a": true, "b": "false"}))).is_ok());
        let err = validate(&decl, &payload(json!({"a": true, "b": true}))).unwrap_err();
        assert!(err.mentions("b"));
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let args = validate(
            &calculate(),
            &payload(json!({"operation": "add", "num1": 1, "num2": 2, "extra": true})),
        )
        .unwrap();
        assert_eq!(args.len(), 3);
    }
}
