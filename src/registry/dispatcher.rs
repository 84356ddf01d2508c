//! End-to-end execution of one invocation.
//!
//! ```text
//! Received ──lookup──▶ (unknown) ─────────────────────────▶ DispatchError
//!    │
//!    └──validate──▶ Rejected ─────────────────────────────▶ Envelope::Failure
//!           │
//!           └──▶ Validated ──handler──▶ Failed ───────────▶ Envelope::Failure
//!                    │           └────▶ Executed ─────────▶ Envelope::Success
//!                    └──cancelled──────────────────────────▶ DispatchError
//! ```
//!
//! Invocations are one-shot and share nothing but the read-only registry.
//! The envelope is built only after the handler has fully completed, so a
//! cancelled invocation never yields a partial payload.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::DispatchError;
use crate::registry::context::CallContext;
use crate::registry::envelope::Envelope;
use crate::registry::schema::{CapabilityKind, Declaration};
use crate::registry::validator::validate;
use crate::registry::{Entry, Registry};

/// Name of the argument a resource handler receives its URI sub-path in.
pub const RESOURCE_PATH_ARG: &str = "path";

/// Runs invocations against a sealed [`Registry`].
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<Registry>,
}

impl Dispatcher {
    /// Creates a dispatcher over a sealed registry.
    #[must_use]
    pub const fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    /// The registry this dispatcher serves.
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Declarations of one kind, in registration order.
    pub fn list(&self, kind: CapabilityKind) -> impl Iterator<Item = &Declaration> + Clone {
        self.registry.list(kind)
    }

    /// Invokes the capability `(kind, name)` with a raw argument payload.
    ///
    /// `payload` must be a JSON object or `null` (no arguments).
    ///
    /// # Errors
    ///
    /// Returns a [`DispatchError`] if the capability does not exist, the
    /// payload is not an object, or `ctx` is cancelled before the handler
    /// finishes. Validation and handler failures are *not* errors; they come
    /// back as [`Envelope::Failure`].
    pub async fn invoke(
        &self,
        kind: CapabilityKind,
        name: &str,
        payload: &Value,
        ctx: &CallContext,
    ) -> Result<Envelope, DispatchError> {
        let entry = self
            .registry
            .lookup(kind, name)
            .ok_or_else(|| DispatchError::UnknownCapability {
                kind,
                name: name.to_string(),
            })?;

        let empty = Map::new();
        let arguments = match payload {
            Value::Null => &empty,
            Value::Object(map) => map,
            _ => {
                return Err(DispatchError::MalformedPayload {
                    name: name.to_string(),
                })
            }
        };

        execute(kind, entry, arguments, ctx).await
    }

    /// Reads a resource by URI.
    ///
    /// A sub-path below the resource's URI is passed to the handler as the
    /// [`RESOURCE_PATH_ARG`] argument.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::UnknownCapability`] if no resource matches
    /// the URI, or [`DispatchError::Cancelled`] on cancellation.
    pub async fn read_resource(
        &self,
        uri: &str,
        ctx: &CallContext,
    ) -> Result<Envelope, DispatchError> {
        let (entry, rest) =
            self.registry
                .resolve_uri(uri)
                .ok_or_else(|| DispatchError::UnknownCapability {
                    kind: CapabilityKind::Resource,
                    name: uri.to_string(),
                })?;

        let mut arguments = Map::new();
        if let Some(rest) = rest {
            arguments.insert(RESOURCE_PATH_ARG.to_string(), Value::from(rest));
        }

        execute(CapabilityKind::Resource, entry, &arguments, ctx).await
    }
}

async fn execute(
    kind: CapabilityKind,
    entry: &Entry,
    arguments: &Map<String, Value>,
    ctx: &CallContext,
) -> Result<Envelope, DispatchError> {
    let declaration = entry.declaration();
    let cancelled = || DispatchError::Cancelled {
        kind,
        name: declaration.name.clone(),
    };

    if ctx.is_cancelled() {
        return Err(cancelled());
    }

    let args = match validate(declaration, arguments) {
        Ok(args) => args,
        Err(e) => {
            tracing::warn!(%kind, name = %declaration.name, error = %e, "Rejected invocation");
            return Ok(Envelope::validation(e.to_string()));
        }
    };

    tracing::debug!(%kind, name = %declaration.name, "Invoking capability");

    let handler = entry.handler();
    tokio::select! {
        biased;

        () = ctx.token().cancelled() => {
            tracing::info!(%kind, name = %declaration.name, "Invocation cancelled");
            Err(cancelled())
        }

        result = handler.call(ctx, args) => match result {
            Ok(output) => Ok(Envelope::Success(output)),
            Err(e) => {
                tracing::warn!(%kind, name = %declaration.name, error = %e, "Handler reported failure");
                Ok(Envelope::business(e.message))
            }
        },
    }
}
