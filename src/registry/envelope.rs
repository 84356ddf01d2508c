//! Invocation results.
//!
//! A handler produces an [`Output`]. The dispatcher wraps it, or the
//! validation/business failure that replaced it, in an [`Envelope`]. Protocol
//! faults are not envelopes; they are [`DispatchError`](crate::error::DispatchError)s.

use serde_json::Value;

/// Successful handler result.
#[derive(Debug, Clone, PartialEq)]
pub struct Output {
    /// Structured result.
    pub payload: Value,
    /// Human-readable rendering of the result.
    pub rendering: Option<String>,
    /// MIME type of the rendering, for resource reads.
    pub mime_type: Option<String>,
}

impl Output {
    /// Creates an output with no rendering.
    #[must_use]
    pub const fn new(payload: Value) -> Self {
        Self {
            payload,
            rendering: None,
            mime_type: None,
        }
    }

    /// Attaches a human-readable rendering.
    #[must_use]
    pub fn with_rendering(mut self, text: impl Into<String>) -> Self {
        self.rendering = Some(text.into());
        self
    }

    /// Declares the MIME type of the rendering.
    #[must_use]
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// The rendering, or the compact JSON payload when there is none.
    #[must_use]
    pub fn text(&self) -> String {
        self.rendering
            .clone()
            .unwrap_or_else(|| self.payload.to_string())
    }
}

/// Why an envelope carries an error flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The payload broke a declared parameter rule.
    Validation,
    /// The handler rejected structurally valid input.
    Business,
}

/// Uniform result of a completed invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    /// The handler ran and succeeded.
    Success(Output),
    /// Validation or the handler reported an expected failure.
    Failure {
        /// Where the failure came from.
        kind: FailureKind,
        /// Human-readable message.
        message: String,
    },
}

impl Envelope {
    /// Builds a validation failure.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Failure {
            kind: FailureKind::Validation,
            message: message.into(),
        }
    }

    /// Builds a business failure.
    #[must_use]
    pub fn business(message: impl Into<String>) -> Self {
        Self::Failure {
            kind: FailureKind::Business,
            message: message.into(),
        }
    }

    /// Returns `true` for failures.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Failure { .. })
    }

    /// The structured payload of a success.
    #[must_use]
    pub const fn payload(&self) -> Option<&Value> {
        match self {
            Self::Success(output) => Some(&output.payload),
            Self::Failure { .. } => None,
        }
    }

    /// The failure category, if any.
    #[must_use]
    pub const fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Success(_) => None,
            Self::Failure { kind, .. } => Some(*kind),
        }
    }

    /// Text to show a human: the rendering or the failure message.
    #[must_use]
    pub fn text(&self) -> String {
        match self {
            Self::Success(output) => output.text(),
            Self::Failure { message, .. } => message.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_text_prefers_rendering() {
        let plain = Envelope::Success(Output::new(json!({"result": 5})));
        assert_eq!(plain.text(), r#"{"result":5}"#);

        let rendered =
            Envelope::Success(Output::new(json!({"result": 5})).with_rendering("Result: 5"));
        assert_eq!(rendered.text(), "Result: 5");
        assert!(!rendered.is_error());
        assert_eq!(rendered.payload(), Some(&json!({"result": 5})));
    }

    #[test]
    fn failure_has_no_payload() {
        let envelope = Envelope::business("unsupported distribution");
        assert!(envelope.is_error());
        assert_eq!(envelope.payload(), None);
        assert_eq!(envelope.failure_kind(), Some(FailureKind::Business));
        assert_eq!(envelope.text(), "unsupported distribution");
    }
}
