//! Capability declarations and parameter specifications.
//!
//! A [`Declaration`] is the immutable metadata half of a registry entry: its
//! name, description, the ordered [`ParamSpec`] list and the cross-field
//! [`Rule`]s the validator applies to the whole argument set. Declarations
//! also render themselves into the JSON shapes MCP clients expect for
//! discovery (`inputSchema` for tools, `arguments` for prompts).

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::error::Violation;
use crate::registry::validator::{ArgValue, Arguments};

/// The three capability tables of the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityKind {
    /// An invocable computation.
    Tool,
    /// URI-addressed readable data.
    Resource,
    /// A templated message built from arguments.
    Prompt,
}

impl CapabilityKind {
    /// All kinds, in listing order.
    pub const ALL: [Self; 3] = [Self::Tool, Self::Resource, Self::Prompt];

    /// Lowercase name of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tool => "tool",
            Self::Resource => "resource",
            Self::Prompt => "prompt",
        }
    }
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Semantic type of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    /// Floating point number.
    Number,
    /// Whole number.
    Integer,
    /// Free text.
    String,
    /// `true` / `false`.
    Boolean,
}

impl ParamType {
    /// JSON Schema type name.
    #[must_use]
    pub const fn json_type(self) -> &'static str {
        match self {
            Self::Number => "number",
            Self::Integer => "integer",
            Self::String => "string",
            Self::Boolean => "boolean",
        }
    }
}

/// Domain restriction on a single parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    /// Value must be one of the listed strings.
    OneOf(Vec<String>),
    /// Numeric value must lie within the inclusive bounds.
    Bounds {
        /// Lower bound.
        min: Option<f64>,
        /// Upper bound.
        max: Option<f64>,
    },
}

/// Declaration of one parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    /// Parameter name (key in the argument payload).
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Semantic type.
    pub param_type: ParamType,
    /// Whether the parameter must be present and non-empty.
    pub required: bool,
    /// Optional domain restriction.
    pub constraint: Option<Constraint>,
    /// Value used when the parameter is absent.
    pub default: Option<ArgValue>,
}

impl ParamSpec {
    fn new(name: &str, description: &str, param_type: ParamType) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            param_type,
            required: false,
            constraint: None,
            default: None,
        }
    }

    /// An optional number parameter.
    #[must_use]
    pub fn number(name: &str, description: &str) -> Self {
        Self::new(name, description, ParamType::Number)
    }

    /// An optional integer parameter.
    #[must_use]
    pub fn integer(name: &str, description: &str) -> Self {
        Self::new(name, description, ParamType::Integer)
    }

    /// An optional string parameter.
    #[must_use]
    pub fn string(name: &str, description: &str) -> Self {
        Self::new(name, description, ParamType::String)
    }

    /// An optional boolean parameter.
    #[must_use]
    pub fn boolean(name: &str, description: &str) -> Self {
        Self::new(name, description, ParamType::Boolean)
    }

    /// Marks the parameter as required.
    #[must_use]
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Restricts the value to a fixed set of strings.
    #[must_use]
    pub fn one_of<I, S>(mut self, allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.constraint = Some(Constraint::OneOf(
            allowed.into_iter().map(Into::into).collect(),
        ));
        self
    }

    /// Restricts a numeric value to inclusive bounds.
    #[must_use]
    pub fn bounds(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.constraint = Some(Constraint::Bounds { min, max });
        self
    }

    /// Sets the value used when the parameter is absent.
    #[must_use]
    pub fn with_default(mut self, value: ArgValue) -> Self {
        self.default = Some(value);
        self
    }

    /// Renders this parameter as a JSON Schema property.
    #[must_use]
    pub fn json_schema(&self) -> Value {
        let mut property = Map::new();
        property.insert("type".into(), json!(self.param_type.json_type()));
        property.insert("description".into(), json!(self.description));

        match &self.constraint {
            Some(Constraint::OneOf(allowed)) => {
                property.insert("enum".into(), json!(allowed));
            }
            Some(Constraint::Bounds { min, max }) => {
                if let Some(min) = min {
                    property.insert("minimum".into(), json!(min));
                }
                if let Some(max) = max {
                    property.insert("maximum".into(), json!(max));
                }
            }
            None => {}
        }

        if let Some(default) = &self.default {
            property.insert("default".into(), default.to_json());
        }

        Value::Object(property)
    }
}

/// Signature of a free-form whole-payload check.
pub type CheckFn = dyn Fn(&Arguments) -> Option<Violation> + Send + Sync;

/// A validation rule spanning more than one parameter.
///
/// Rules see the whole typed argument set at once. They only run once every
/// parameter they name has passed its own checks.
#[derive(Clone)]
pub enum Rule {
    /// `field` must not be zero while `when` equals `equals`.
    NonZeroWhen {
        /// Numeric parameter that must be non-zero.
        field: String,
        /// String parameter selecting the condition.
        when: String,
        /// Value of `when` that activates the rule.
        equals: String,
        /// Message reported on violation.
        message: String,
    },
    /// `lower` must be strictly less than `upper` when both are present.
    LessThan {
        /// Lower bound parameter.
        lower: String,
        /// Upper bound parameter.
        upper: String,
    },
    /// Arbitrary check over the whole argument set.
    Check(Arc<CheckFn>),
}

impl Rule {
    /// Builds a [`Rule::NonZeroWhen`].
    #[must_use]
    pub fn non_zero_when(field: &str, when: &str, equals: &str, message: &str) -> Self {
        Self::NonZeroWhen {
            field: field.to_string(),
            when: when.to_string(),
            equals: equals.to_string(),
            message: message.to_string(),
        }
    }

    /// Builds a [`Rule::LessThan`].
    #[must_use]
    pub fn less_than(lower: &str, upper: &str) -> Self {
        Self::LessThan {
            lower: lower.to_string(),
            upper: upper.to_string(),
        }
    }

    /// Builds a [`Rule::Check`] from a closure.
    #[must_use]
    pub fn check<F>(f: F) -> Self
    where
        F: Fn(&Arguments) -> Option<Violation> + Send + Sync + 'static,
    {
        Self::Check(Arc::new(f))
    }

    /// Parameters this rule reads.
    #[must_use]
    pub fn fields(&self) -> Vec<&str> {
        match self {
            Self::NonZeroWhen { field, when, .. } => vec![field.as_str(), when.as_str()],
            Self::LessThan { lower, upper } => vec![lower.as_str(), upper.as_str()],
            Self::Check(_) => Vec::new(),
        }
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonZeroWhen {
                field,
                when,
                equals,
                ..
            } => write!(f, "NonZeroWhen({field} when {when} == {equals:?})"),
            Self::LessThan { lower, upper } => write!(f, "LessThan({lower} < {upper})"),
            Self::Check(_) => f.write_str("Check(..)"),
        }
    }
}

/// Immutable metadata describing one capability.
#[derive(Debug, Clone)]
pub struct Declaration {
    /// Unique name within its kind.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Address of a resource. Unused for tools and prompts.
    pub uri: Option<String>,
    /// MIME type of a resource's whole-document read.
    pub mime_type: Option<String>,
    /// Ordered parameter list.
    pub params: Vec<ParamSpec>,
    /// Cross-field rules.
    pub rules: Vec<Rule>,
}

impl Declaration {
    /// Creates a declaration with no parameters.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            uri: None,
            mime_type: None,
            params: Vec::new(),
            rules: Vec::new(),
        }
    }

    /// Appends a parameter.
    #[must_use]
    pub fn param(mut self, spec: ParamSpec) -> Self {
        self.params.push(spec);
        self
    }

    /// Appends a cross-field rule.
    #[must_use]
    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Sets the resource URI.
    #[must_use]
    pub fn uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    /// Sets the resource MIME type.
    #[must_use]
    pub fn mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Looks up a parameter by name.
    #[must_use]
    pub fn find_param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    /// JSON Schema object describing the parameters (`inputSchema`).
    #[must_use]
    pub fn input_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .params
            .iter()
            .map(|p| (p.name.clone(), p.json_schema()))
            .collect();
        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Prompt argument list (`arguments` in `prompts/list`).
    #[must_use]
    pub fn prompt_arguments(&self) -> Value {
        self.params
            .iter()
            .map(|p| {
                json!({
                    "name": p.name,
                    "description": p.description,
                    "required": p.required,
                })
            })
            .collect()
    }
}
