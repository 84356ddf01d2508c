//! Error types for calculator-mcp-server.
//!
//! Errors fall into two groups. Startup errors ([`ConfigError`],
//! [`RegistryError`]) are fatal and stop the process before any client is
//! served. Invocation errors are split by how they reach the caller:
//!
//! - [`DispatchError`] is a protocol-level fault (unknown capability,
//!   malformed payload, cancellation) and becomes a JSON-RPC error object.
//! - [`ValidationError`] and [`HandlerError`] are expected outcomes. The
//!   dispatcher turns them into an error envelope, which is a successful
//!   response carrying an error flag.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::registry::CapabilityKind;

/// Errors that can occur during configuration operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("failed to read configuration file: {path}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be parsed.
    #[error("failed to parse configuration file: {path}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Configuration file not found.
    #[error("configuration file not found: {path}")]
    NotFound {
        /// Path where the configuration file was expected.
        path: PathBuf,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation failure.
        message: String,
    },
}

/// Errors raised while registering capabilities at startup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A capability with the same kind and name is already registered.
    #[error("duplicate {kind} registration: {name}")]
    Duplicate {
        /// Kind of the conflicting capability.
        kind: CapabilityKind,
        /// The conflicting name.
        name: String,
    },

    /// Two resources claim the same URI.
    #[error("duplicate resource URI: {uri}")]
    DuplicateUri {
        /// The conflicting URI.
        uri: String,
    },

    /// A resource was declared without a URI.
    #[error("resource '{name}' has no URI")]
    MissingUri {
        /// Name of the resource.
        name: String,
    },

    /// A declaration lists the same parameter twice.
    #[error("{capability}: parameter '{parameter}' declared more than once")]
    DuplicateParameter {
        /// Name of the capability.
        capability: String,
        /// The repeated parameter name.
        parameter: String,
    },

    /// A validation rule refers to a parameter the declaration does not have.
    #[error("{capability}: rule refers to undeclared parameter '{parameter}'")]
    UnknownRuleParameter {
        /// Name of the capability.
        capability: String,
        /// The missing parameter name.
        parameter: String,
    },
}

/// Protocol-level invocation faults.
///
/// These never carry business meaning; they say the invocation could not be
/// carried out at all.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// No capability of this kind is registered under the name.
    #[error("unknown {kind}: {name}")]
    UnknownCapability {
        /// Requested kind.
        kind: CapabilityKind,
        /// Requested name.
        name: String,
    },

    /// The argument payload is not a key-value mapping.
    #[error("arguments for {name} must be an object")]
    MalformedPayload {
        /// Requested name.
        name: String,
    },

    /// The invocation context was cancelled before the handler finished.
    #[error("{kind} '{name}' was cancelled")]
    Cancelled {
        /// Requested kind.
        kind: CapabilityKind,
        /// Requested name.
        name: String,
    },

    /// The host's per-request deadline elapsed.
    #[error("{kind} '{name}' timed out after {seconds}s")]
    TimedOut {
        /// Requested kind.
        kind: CapabilityKind,
        /// Requested name.
        name: String,
        /// The deadline that elapsed.
        seconds: u64,
    },
}

/// A single violated parameter rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Parameter the violation is attributed to.
    pub field: String,
    /// What is wrong with it.
    pub message: String,
}

impl Violation {
    /// Creates a new violation.
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Every rule an argument payload violated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid parameters: {}", join_violations(.violations))]
pub struct ValidationError {
    /// The violations, in parameter declaration order followed by rule order.
    pub violations: Vec<Violation>,
}

impl ValidationError {
    /// Returns `true` if a violation is attributed to `field`.
    #[must_use]
    pub fn mentions(&self, field: &str) -> bool {
        self.violations.iter().any(|v| v.field == field)
    }
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// A business failure reported by a capability handler.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct HandlerError {
    /// Human-readable description.
    pub message: String,
}

impl HandlerError {
    /// Creates a new handler error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
