//! Capability registry and validating dispatch.
//!
//! This is the part of the server that does not know about JSON-RPC. It holds
//! three name-keyed tables (tools, resources, prompts), validates argument
//! payloads against each entry's declaration, and runs the entry's handler.
//!
//! # Lifecycle
//!
//! Registration and serving are separate types. All `register` calls go
//! through a [`RegistryBuilder`]; [`RegistryBuilder::build`] seals it into an
//! immutable [`Registry`] that can be shared behind an `Arc` by any number of
//! concurrent invocations without locking. Holding a `Registry` is the
//! "ready" signal: there is no way to register after serving starts.
//!
//! ```text
//!   RegistryBuilder ──register()──▶ RegistryBuilder ──build()──▶ Registry
//!                                                                  │
//!                         Dispatcher::invoke(kind, name, payload) ◀┘
//! ```

pub mod context;
pub mod dispatcher;
pub mod envelope;
pub mod handler;
pub mod schema;
pub mod validator;

use std::collections::HashSet;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::RegistryError;

pub use context::{CallContext, CancellationToken};
pub use dispatcher::Dispatcher;
pub use envelope::{Envelope, FailureKind, Output};
pub use handler::{handler_fn, FnHandler, Handler};
pub use schema::{CapabilityKind, Constraint, Declaration, ParamSpec, ParamType, Rule};
pub use validator::{validate, ArgValue, Arguments};

/// A declaration paired with the handler that serves it.
pub struct Entry {
    declaration: Declaration,
    handler: Arc<dyn Handler>,
}

impl Entry {
    /// The entry's declaration.
    #[must_use]
    pub const fn declaration(&self) -> &Declaration {
        &self.declaration
    }

    /// The entry's handler.
    #[must_use]
    pub fn handler(&self) -> Arc<dyn Handler> {
        Arc::clone(&self.handler)
    }
}

impl std::fmt::Debug for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entry")
            .field("declaration", &self.declaration)
            .finish_non_exhaustive()
    }
}

/// One table per capability kind, each in registration order.
#[derive(Default)]
struct Tables {
    tools: IndexMap<String, Entry>,
    resources: IndexMap<String, Entry>,
    prompts: IndexMap<String, Entry>,
}

impl Tables {
    const fn table(&self, kind: CapabilityKind) -> &IndexMap<String, Entry> {
        match kind {
            CapabilityKind::Tool => &self.tools,
            CapabilityKind::Resource => &self.resources,
            CapabilityKind::Prompt => &self.prompts,
        }
    }

    fn table_mut(&mut self, kind: CapabilityKind) -> &mut IndexMap<String, Entry> {
        match kind {
            CapabilityKind::Tool => &mut self.tools,
            CapabilityKind::Resource => &mut self.resources,
            CapabilityKind::Prompt => &mut self.prompts,
        }
    }
}

/// Collects registrations during startup.
#[derive(Default)]
pub struct RegistryBuilder {
    tables: Tables,
}

impl RegistryBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a capability.
    ///
    /// # Errors
    ///
    /// Returns an error if `(kind, name)` is already registered, if a
    /// resource has no URI or reuses another resource's URI, or if the
    /// declaration itself is inconsistent (repeated parameter, rule naming an
    /// undeclared parameter). Any of these is a programming error and should
    /// stop the server.
    pub fn register<H>(
        &mut self,
        kind: CapabilityKind,
        declaration: Declaration,
        handler: H,
    ) -> Result<&mut Self, RegistryError>
    where
        H: Handler + 'static,
    {
        check_declaration(&declaration)?;

        if self.tables.table(kind).contains_key(&declaration.name) {
            return Err(RegistryError::Duplicate {
                kind,
                name: declaration.name,
            });
        }

        if kind == CapabilityKind::Resource {
            let Some(uri) = declaration.uri.as_deref() else {
                return Err(RegistryError::MissingUri {
                    name: declaration.name,
                });
            };
            let taken = self
                .tables
                .resources
                .values()
                .any(|e| e.declaration.uri.as_deref() == Some(uri));
            if taken {
                return Err(RegistryError::DuplicateUri {
                    uri: uri.to_string(),
                });
            }
        }

        tracing::debug!(%kind, name = %declaration.name, "Registered capability");

        self.tables.table_mut(kind).insert(
            declaration.name.clone(),
            Entry {
                declaration,
                handler: Arc::new(handler),
            },
        );
        Ok(self)
    }

    /// Seals the builder into a read-only registry.
    #[must_use]
    pub fn build(self) -> Registry {
        let registry = Registry {
            tables: self.tables,
        };
        tracing::info!(
            tools = registry.len(CapabilityKind::Tool),
            resources = registry.len(CapabilityKind::Resource),
            prompts = registry.len(CapabilityKind::Prompt),
            "Capability registry ready"
        );
        registry
    }
}

impl std::fmt::Debug for RegistryBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryBuilder")
            .field("tools", &self.tables.tools.len())
            .field("resources", &self.tables.resources.len())
            .field("prompts", &self.tables.prompts.len())
            .finish()
    }
}

fn check_declaration(declaration: &Declaration) -> Result<(), RegistryError> {
    let mut seen = HashSet::new();
    for param in &declaration.params {
        if !seen.insert(param.name.as_str()) {
            return Err(RegistryError::DuplicateParameter {
                capability: declaration.name.clone(),
                parameter: param.name.clone(),
            });
        }
    }

    for rule in &declaration.rules {
        if let Some(missing) = rule.fields().into_iter().find(|f| !seen.contains(f)) {
            return Err(RegistryError::UnknownRuleParameter {
                capability: declaration.name.clone(),
                parameter: missing.to_string(),
            });
        }
    }
    Ok(())
}

/// Immutable capability tables, safe to share across invocations.
pub struct Registry {
    tables: Tables,
}

impl Registry {
    /// Starts a new registration phase.
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Looks up an entry. `None` means nothing of that kind has that name.
    #[must_use]
    pub fn lookup(&self, kind: CapabilityKind, name: &str) -> Option<&Entry> {
        self.tables.table(kind).get(name)
    }

    /// Declarations of one kind, in registration order.
    ///
    /// The iterator is lazy and `Clone`, so a listing can be restarted.
    pub fn list(
        &self,
        kind: CapabilityKind,
    ) -> impl Iterator<Item = &Declaration> + Clone + ExactSizeIterator {
        self.tables.table(kind).values().map(Entry::declaration)
    }

    /// Number of entries of one kind.
    #[must_use]
    pub fn len(&self, kind: CapabilityKind) -> usize {
        self.tables.table(kind).len()
    }

    /// Returns `true` if nothing at all is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        CapabilityKind::ALL.iter().all(|&k| self.len(k) == 0)
    }

    /// Resolves a resource URI.
    ///
    /// An exact match returns the resource with `None` as the sub-path. A URI
    /// of the form `<resource uri>/<rest>` returns the resource and `rest`,
    /// which the resource handler receives as its `path` argument.
    #[must_use]
    pub fn resolve_uri<'a>(&self, uri: &'a str) -> Option<(&Entry, Option<&'a str>)> {
        self.tables.resources.values().find_map(|entry| {
            let base = entry.declaration.uri.as_deref()?;
            if uri == base {
                return Some((entry, None));
            }
            let rest = uri.strip_prefix(base)?.strip_prefix('/')?;
            (!rest.is_empty()).then_some((entry, Some(rest)))
        })
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("tools", &self.len(CapabilityKind::Tool))
            .field("resources", &self.len(CapabilityKind::Resource))
            .field("prompts", &self.len(CapabilityKind::Prompt))
            .finish()
    }
}
