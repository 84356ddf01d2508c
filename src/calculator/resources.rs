//! The `math-constants` resource.
//!
//! `math://constants` returns every constant as a JSON document.
//! `math://constants/<name>` returns a single constant as plain text.

use std::f64::consts;

use serde_json::{Map, Value};

use crate::error::HandlerError;
use crate::registry::dispatcher::RESOURCE_PATH_ARG;
use crate::registry::{Arguments, Declaration, Output, ParamSpec};

/// Resource name.
pub const MATH_CONSTANTS: &str = "math-constants";

/// Resource URI.
pub const MATH_CONSTANTS_URI: &str = "math://constants";

/// The published constants, in document order.
pub const CONSTANTS: [(&str, f64); 8] = [
    ("pi", consts::PI),
    ("e", consts::E),
    ("golden_ratio", 1.618_033_988_749_895),
    ("sqrt2", consts::SQRT_2),
    ("sqrt3", 1.732_050_807_568_877_2),
    ("ln2", consts::LN_2),
    ("ln10", consts::LN_10),
    ("euler", 0.577_215_664_901_532_9),
];

/// Declaration of the constants resource.
#[must_use]
pub fn math_constants_declaration() -> Declaration {
    Declaration::new(MATH_CONSTANTS, "Mathematical constants")
        .uri(MATH_CONSTANTS_URI)
        .mime_type("application/json")
        .param(ParamSpec::string(
            RESOURCE_PATH_ARG,
            "name of a single constant to read",
        ))
}

/// Handler of the constants resource.
///
/// # Errors
///
/// Returns an error if a single constant is requested that does not exist.
pub fn math_constants(args: &Arguments) -> Result<Output, HandlerError> {
    if let Some(name) = args.text(RESOURCE_PATH_ARG) {
        let (_, value) = CONSTANTS
            .iter()
            .find(|(n, _)| *n == name)
            .ok_or_else(|| HandlerError::new(format!("Unknown constant: {name}")))?;

        return Ok(Output::new(Value::from(*value))
            .with_rendering(value.to_string())
            .with_mime_type("text/plain"));
    }

    let document: Map<String, Value> = CONSTANTS
        .iter()
        .map(|(name, value)| ((*name).to_string(), Value::from(*value)))
        .collect();
    let document = Value::Object(document);
    let rendering = serde_json::to_string_pretty(&document)
        .map_err(|e| HandlerError::new(format!("Failed to render constants: {e}")))?;

    Ok(Output::new(document)
        .with_rendering(rendering)
        .with_mime_type("application/json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ArgValue;

    #[test]
    fn whole_document() {
        let output = math_constants(&Arguments::new()).unwrap();
        let doc = output.payload.as_object().unwrap();
        let keys: Vec<&str> = doc.keys().map(String::as_str).collect();
        assert_eq!(keys, CONSTANTS.map(|(name, _)| name));
        assert!((doc["pi"].as_f64().unwrap() - consts::PI).abs() < f64::EPSILON);
        assert_eq!(output.mime_type.as_deref(), Some("application/json"));

        let reparsed: Value = serde_json::from_str(output.rendering.as_deref().unwrap()).unwrap();
        assert_eq!(reparsed, output.payload);
    }

    #[test]
    fn single_constant() {
        let mut args = Arguments::new();
        args.insert(RESOURCE_PATH_ARG, ArgValue::Text("golden_ratio".into()));
        let output = math_constants(&args).unwrap();
        assert_eq!(output.rendering.as_deref(), Some("1.618033988749895"));
        assert_eq!(output.mime_type.as_deref(), Some("text/plain"));
    }

    #[test]
    fn unknown_constant() {
        let mut args = Arguments::new();
        args.insert(RESOURCE_PATH_ARG, ArgValue::Text("tau".into()));
        let err = math_constants(&args).unwrap_err();
        assert_eq!(err.message, "Unknown constant: tau");
    }
}
