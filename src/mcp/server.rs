//! MCP session over a line transport.
//!
//! This module implements the MCP server lifecycle:
//!
//! 1. **Initialisation**: Capability negotiation and version agreement
//! 2. **Operation**: Listing and invoking tools, resources and prompts
//! 3. **Shutdown**: Signal or end of input; in-flight invocations are
//!    drained on end of input
//!
//! The session is the single writer of the output stream. Invocations
//! (`tools/call`, `resources/read`, `prompts/get`) run as spawned tasks and
//! report back over a channel, so responses go out in completion order
//! rather than request order.

use std::collections::HashMap;
use std::io;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncWrite};
use tokio::sync::mpsc;

use crate::error::DispatchError;
use crate::mcp::protocol::{
    parse_message, CancelledParams, IncomingMessage, JsonRpcError, JsonRpcNotification,
    JsonRpcRequest, JsonRpcResponse, RequestId, MCP_PROTOCOL_VERSION, SERVER_NAME,
};
use crate::mcp::transport::{LineTransport, StdioTransport};
use crate::registry::{
    CallContext, CancellationToken, CapabilityKind, Declaration, Dispatcher, Envelope, Output,
};

/// Server state in the MCP lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Waiting for initialize request.
    AwaitingInit,
    /// Initialize received, waiting for initialized notification.
    Initialising,
    /// Ready for normal operation.
    Running,
    /// Shutdown in progress.
    ShuttingDown,
}

/// Server capabilities advertised during initialisation.
#[derive(Debug, Clone, Serialize)]
pub struct ServerCapabilities {
    /// Tool capabilities.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<ListCapabilities>,
    /// Resource capabilities.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<ListCapabilities>,
    /// Prompt capabilities.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompts: Option<ListCapabilities>,
}

impl ServerCapabilities {
    /// Advertises each kind the dispatcher has at least one entry for.
    fn for_dispatcher(dispatcher: &Dispatcher) -> Self {
        let advertise = |kind| {
            (dispatcher.registry().len(kind) > 0).then(ListCapabilities::default)
        };
        Self {
            tools: advertise(CapabilityKind::Tool),
            resources: advertise(CapabilityKind::Resource),
            prompts: advertise(CapabilityKind::Prompt),
        }
    }
}

/// Capabilities of one listable kind.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ListCapabilities {
    /// Whether the list can change during the session. Always `false`: the
    /// registry is sealed before serving starts.
    #[serde(rename = "listChanged")]
    pub list_changed: bool,
}

/// Server information for initialisation response.
#[derive(Debug, Clone, Serialize)]
pub struct ServerInfo {
    /// Server name.
    pub name: String,
    /// Server version.
    pub version: String,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            name: SERVER_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Client information received during initialisation.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientInfo {
    /// Client name.
    pub name: String,
    /// Client version.
    #[serde(default)]
    pub version: Option<String>,
}

/// Parameters for the initialize request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    /// Protocol version requested by client.
    pub protocol_version: String,
    /// Client capabilities.
    #[serde(default)]
    pub capabilities: Value,
    /// Client information.
    #[serde(default)]
    pub client_info: Option<ClientInfo>,
}

/// A tool entry in the `tools/list` response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    /// Unique tool name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// JSON Schema for the tool's input parameters.
    pub input_schema: Value,
}

impl From<&Declaration> for ToolDefinition {
    fn from(declaration: &Declaration) -> Self {
        Self {
            name: declaration.name.clone(),
            description: declaration.description.clone(),
            input_schema: declaration.input_schema(),
        }
    }
}

/// A resource entry in the `resources/list` response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDefinition {
    /// Address of the resource.
    pub uri: String,
    /// Resource name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// MIME type of the whole-document read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl From<&Declaration> for ResourceDefinition {
    fn from(declaration: &Declaration) -> Self {
        Self {
            uri: declaration.uri.clone().unwrap_or_default(),
            name: declaration.name.clone(),
            description: declaration.description.clone(),
            mime_type: declaration.mime_type.clone(),
        }
    }
}

/// A prompt entry in the `prompts/list` response.
#[derive(Debug, Clone, Serialize)]
pub struct PromptDefinition {
    /// Prompt name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Accepted arguments.
    pub arguments: Value,
}

impl From<&Declaration> for PromptDefinition {
    fn from(declaration: &Declaration) -> Self {
        Self {
            name: declaration.name.clone(),
            description: declaration.description.clone(),
            arguments: declaration.prompt_arguments(),
        }
    }
}

/// Parameters for `tools/call` and `prompts/get`.
#[derive(Debug, Clone, Deserialize)]
pub struct InvocationParams {
    /// Name of the tool or prompt.
    pub name: String,
    /// Argument payload.
    #[serde(default)]
    pub arguments: Value,
}

/// Parameters for `resources/read`.
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceReadParams {
    /// URI to read.
    pub uri: String,
}

/// Content item in a tool or prompt response.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Content {
    /// Text content.
    Text {
        /// The text content.
        text: String,
    },
}

/// Result of a tool call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallResult {
    /// Content returned by the tool.
    pub content: Vec<Content>,
    /// Structured result of a successful call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structured_content: Option<Value>,
    /// Whether the tool call resulted in an error.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl ToolCallResult {
    /// Creates a successful result from a handler output.
    #[must_use]
    pub fn success(output: Output) -> Self {
        Self {
            content: vec![Content::Text {
                text: output.text(),
            }],
            structured_content: Some(output.payload),
            is_error: false,
        }
    }

    /// Creates an error text result.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![Content::Text {
                text: message.into(),
            }],
            structured_content: None,
            is_error: true,
        }
    }
}

impl From<Envelope> for ToolCallResult {
    fn from(envelope: Envelope) -> Self {
        match envelope {
            Envelope::Success(output) => Self::success(output),
            Envelope::Failure { message, .. } => Self::error(message),
        }
    }
}

/// A message in a `prompts/get` response.
#[derive(Debug, Clone, Serialize)]
pub struct PromptMessage {
    /// Always `user`.
    pub role: &'static str,
    /// Message body.
    pub content: Content,
}

/// Result of `prompts/get`.
#[derive(Debug, Clone, Serialize)]
pub struct PromptResult {
    /// Description of the prompt.
    pub description: String,
    /// Rendered messages.
    pub messages: Vec<PromptMessage>,
}

/// One piece of a `resources/read` response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceContents {
    /// URI that was read.
    pub uri: String,
    /// MIME type of `text`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// The resource body.
    pub text: String,
}

/// Result of `resources/read`.
#[derive(Debug, Clone, Serialize)]
pub struct ResourceReadResult {
    /// The contents read.
    pub contents: Vec<ResourceContents>,
}

/// An invocation handed to a spawned task.
#[derive(Debug, Clone)]
enum Invocation {
    Tool { name: String, arguments: Value },
    Prompt { name: String, arguments: Value },
    Resource { uri: String },
}

impl Invocation {
    const fn kind(&self) -> CapabilityKind {
        match self {
            Self::Tool { .. } => CapabilityKind::Tool,
            Self::Prompt { .. } => CapabilityKind::Prompt,
            Self::Resource { .. } => CapabilityKind::Resource,
        }
    }

    fn target(&self) -> &str {
        match self {
            Self::Tool { name, .. } | Self::Prompt { name, .. } => name,
            Self::Resource { uri } => uri,
        }
    }

    async fn run(&self, dispatcher: &Dispatcher, ctx: &CallContext) -> Result<Envelope, DispatchError> {
        match self {
            Self::Tool { name, arguments } => {
                dispatcher
                    .invoke(CapabilityKind::Tool, name, arguments, ctx)
                    .await
            }
            Self::Prompt { name, arguments } => {
                dispatcher
                    .invoke(CapabilityKind::Prompt, name, arguments, ctx)
                    .await
            }
            Self::Resource { uri } => dispatcher.read_resource(uri, ctx).await,
        }
    }
}

/// A finished invocation on its way back to the session.
#[derive(Debug)]
struct Completion {
    id: RequestId,
    invocation: Invocation,
    outcome: Result<Envelope, DispatchError>,
}

/// The calculator MCP server.
pub struct McpServer<R, W> {
    /// Current server state.
    state: ServerState,
    /// The transport layer.
    transport: LineTransport<R, W>,
    /// Negotiated protocol version (set after initialisation).
    protocol_version: Option<String>,
    /// Dispatcher over the sealed registry.
    dispatcher: Dispatcher,
    /// Deadline for a single invocation.
    request_timeout: Duration,
    /// Cancellation tokens of invocations that have not completed yet.
    in_flight: HashMap<RequestId, CancellationToken>,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions: mpsc::UnboundedReceiver<Completion>,
}

impl McpServer<tokio::io::BufReader<tokio::io::Stdin>, tokio::io::Stdout> {
    /// Creates a server speaking over stdin and stdout.
    #[must_use]
    pub fn new(dispatcher: Dispatcher, request_timeout: Duration) -> Self {
        Self::with_transport(dispatcher, request_timeout, StdioTransport::stdio())
    }
}

impl<R, W> McpServer<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Creates a server over an arbitrary transport.
    #[must_use]
    pub fn with_transport(
        dispatcher: Dispatcher,
        request_timeout: Duration,
        transport: LineTransport<R, W>,
    ) -> Self {
        let (completions_tx, completions) = mpsc::unbounded_channel();
        Self {
            state: ServerState::AwaitingInit,
            transport,
            protocol_version: None,
            dispatcher,
            request_timeout,
            in_flight: HashMap::new(),
            completions_tx,
            completions,
        }
    }

    /// Returns the current server state.
    #[must_use]
    pub const fn state(&self) -> ServerState {
        self.state
    }

    /// Returns the negotiated protocol version, once initialised.
    #[must_use]
    pub fn protocol_version(&self) -> Option<&str> {
        self.protocol_version.as_deref()
    }

    /// Runs the server until a shutdown signal or end of input.
    ///
    /// # Errors
    ///
    /// Returns an error if transport I/O fails.
    #[cfg(unix)]
    pub async fn run(&mut self) -> io::Result<()> {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt()).map_err(io::Error::other)?;
        let mut sigterm = signal(SignalKind::terminate()).map_err(io::Error::other)?;

        tokio::select! {
            _ = sigint.recv() => {
                tracing::info!("Received SIGINT, initiating graceful shutdown");
            }

            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM, initiating graceful shutdown");
            }

            result = self.serve() => return result,
        }

        self.abandon_in_flight();
        Ok(())
    }

    /// Runs the server until a shutdown signal or end of input.
    ///
    /// # Errors
    ///
    /// Returns an error if transport I/O fails.
    #[cfg(windows)]
    pub async fn run(&mut self) -> io::Result<()> {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received Ctrl+C, initiating graceful shutdown");
            }

            result = self.serve() => return result,
        }

        self.abandon_in_flight();
        Ok(())
    }

    /// Serves the session until end of input, then waits for every
    /// in-flight invocation and writes its response.
    ///
    /// # Errors
    ///
    /// Returns an error if transport I/O fails.
    pub async fn serve(&mut self) -> io::Result<()> {
        loop {
            tokio::select! {
                Some(completion) = self.completions.recv() => {
                    self.finish(completion).await?;
                }

                line = self.transport.read_line() => {
                    let Some(line) = line? else {
                        break;
                    };
                    if line.trim().is_empty() {
                        continue;
                    }
                    self.handle_line(&line).await?;
                }
            }
        }

        self.state = ServerState::ShuttingDown;
        self.drain().await
    }

    /// Writes the responses of invocations still running at end of input.
    async fn drain(&mut self) -> io::Result<()> {
        if !self.in_flight.is_empty() {
            tracing::info!(
                count = self.in_flight.len(),
                "Input closed, waiting for in-flight invocations"
            );
        }

        while !self.in_flight.is_empty() {
            let Some(completion) = self.completions.recv().await else {
                break;
            };
            self.finish(completion).await?;
        }
        Ok(())
    }

    /// Cancels everything still running when a signal stops the session.
    fn abandon_in_flight(&mut self) {
        self.state = ServerState::ShuttingDown;
        for (id, token) in self.in_flight.drain() {
            tracing::debug!(%id, "Cancelling in-flight invocation on shutdown");
            token.cancel();
        }
    }

    /// Handles a single line of input.
    async fn handle_line(&mut self, line: &str) -> io::Result<()> {
        match parse_message(line) {
            Ok(IncomingMessage::Request(req)) => self.handle_request(req).await,
            Ok(IncomingMessage::Notification(notif)) => {
                self.handle_notification(&notif);
                Ok(())
            }
            Err(error) => self.transport.write_error(&error).await,
        }
    }

    /// Handles an incoming request.
    async fn handle_request(&mut self, req: JsonRpcRequest) -> io::Result<()> {
        let response = match req.method.as_str() {
            "initialize" => self.handle_initialize(&req),
            "ping" => Ok(Self::handle_ping(&req)),
            "tools/list" => self.handle_list(&req, CapabilityKind::Tool),
            "resources/list" => self.handle_list(&req, CapabilityKind::Resource),
            "prompts/list" => self.handle_list(&req, CapabilityKind::Prompt),
            "tools/call" | "prompts/get" | "resources/read" => {
                match self.start_invocation(&req) {
                    Ok(()) => return Ok(()),
                    Err(error) => Err(error),
                }
            }
            _ => Err(JsonRpcError::method_not_found(req.id.clone(), &req.method)),
        };

        match response {
            Ok(resp) => self.transport.write_response(&resp).await,
            Err(error) => self.transport.write_error(&error).await,
        }
    }

    /// Handles an incoming notification.
    fn handle_notification(&mut self, notif: &JsonRpcNotification) {
        match notif.method.as_str() {
            "notifications/initialized" if self.state == ServerState::Initialising => {
                self.state = ServerState::Running;
                tracing::info!("Client initialised, session running");
            }
            "notifications/cancelled" => {
                let params = notif
                    .params
                    .clone()
                    .map(serde_json::from_value::<CancelledParams>);
                match params {
                    Some(Ok(params)) => self.cancel(&params),
                    _ => tracing::warn!("Ignoring malformed cancellation notification"),
                }
            }
            other => tracing::debug!(method = other, "Ignoring notification"),
        }
    }

    fn cancel(&self, params: &CancelledParams) {
        if let Some(token) = self.in_flight.get(&params.request_id) {
            tracing::info!(
                id = %params.request_id,
                reason = params.reason.as_deref().unwrap_or("none given"),
                "Client cancelled request"
            );
            token.cancel();
        } else {
            tracing::debug!(id = %params.request_id, "Cancellation for unknown or finished request");
        }
    }

    /// Handles the initialize request.
    fn handle_initialize(&mut self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        if self.state != ServerState::AwaitingInit {
            return Err(JsonRpcError::invalid_request_with(
                req.id.clone(),
                "Server already initialised",
            ));
        }

        let params: InitializeParams = req.parse_params("initialize")?;
        if let Some(client) = &params.client_info {
            tracing::info!(
                client = %client.name,
                version = client.version.as_deref().unwrap_or("unknown"),
                requested = %params.protocol_version,
                "Initialising session"
            );
        }

        let negotiated_version = MCP_PROTOCOL_VERSION.to_string();
        self.protocol_version = Some(negotiated_version.clone());
        self.state = ServerState::Initialising;

        let result = json!({
            "protocolVersion": negotiated_version,
            "capabilities": ServerCapabilities::for_dispatcher(&self.dispatcher),
            "serverInfo": ServerInfo::default(),
        });

        Ok(JsonRpcResponse::success(req.id.clone(), result))
    }

    /// Handles the ping request.
    fn handle_ping(req: &JsonRpcRequest) -> JsonRpcResponse {
        JsonRpcResponse::success(req.id.clone(), json!({}))
    }

    /// Handles `tools/list`, `resources/list` and `prompts/list`.
    fn handle_list(
        &self,
        req: &JsonRpcRequest,
        kind: CapabilityKind,
    ) -> Result<JsonRpcResponse, JsonRpcError> {
        self.require_running(&req.id)?;

        let declarations = self.dispatcher.list(kind);
        let result = match kind {
            CapabilityKind::Tool => json!({
                "tools": declarations.map(ToolDefinition::from).collect::<Vec<_>>(),
            }),
            CapabilityKind::Resource => json!({
                "resources": declarations.map(ResourceDefinition::from).collect::<Vec<_>>(),
            }),
            CapabilityKind::Prompt => json!({
                "prompts": declarations.map(PromptDefinition::from).collect::<Vec<_>>(),
            }),
        };

        Ok(JsonRpcResponse::success(req.id.clone(), result))
    }

    /// Parses an invocation request and spawns it.
    fn start_invocation(&mut self, req: &JsonRpcRequest) -> Result<(), JsonRpcError> {
        self.require_running(&req.id)?;

        if self.in_flight.contains_key(&req.id) {
            return Err(JsonRpcError::invalid_request_with(
                req.id.clone(),
                format!("Request id {} is already in flight", req.id),
            ));
        }

        let invocation = match req.method.as_str() {
            "tools/call" => {
                let params: InvocationParams = req.parse_params("tool call")?;
                Invocation::Tool {
                    name: params.name,
                    arguments: params.arguments,
                }
            }
            "prompts/get" => {
                let params: InvocationParams = req.parse_params("prompt get")?;
                Invocation::Prompt {
                    name: params.name,
                    arguments: params.arguments,
                }
            }
            _ => {
                let params: ResourceReadParams = req.parse_params("resource read")?;
                Invocation::Resource { uri: params.uri }
            }
        };

        let token = CancellationToken::new();
        self.in_flight.insert(req.id.clone(), token.clone());

        let id = req.id.clone();
        let dispatcher = self.dispatcher.clone();
        let timeout = self.request_timeout;
        let tx = self.completions_tx.clone();

        tokio::spawn(async move {
            let ctx = CallContext::with_token(token);
            let outcome = tokio::time::timeout(timeout, invocation.run(&dispatcher, &ctx))
                .await
                .unwrap_or_else(|_| {
                    Err(DispatchError::TimedOut {
                        kind: invocation.kind(),
                        name: invocation.target().to_string(),
                        seconds: timeout.as_secs(),
                    })
                });

            // The receiver only goes away when the session itself is gone.
            let _ = tx.send(Completion {
                id,
                invocation,
                outcome,
            });
        });

        Ok(())
    }

    /// Writes the response for a finished invocation.
    async fn finish(&mut self, completion: Completion) -> io::Result<()> {
        let Completion {
            id,
            invocation,
            outcome,
        } = completion;
        self.in_flight.remove(&id);

        match self.to_response(id, &invocation, outcome) {
            Ok(resp) => self.transport.write_response(&resp).await,
            Err(error) => self.transport.write_error(&error).await,
        }
    }

    /// Maps a dispatcher outcome onto the MCP result shape for its method.
    fn to_response(
        &self,
        id: RequestId,
        invocation: &Invocation,
        outcome: Result<Envelope, DispatchError>,
    ) -> Result<JsonRpcResponse, JsonRpcError> {
        let envelope = outcome.map_err(|e| dispatch_error(id.clone(), invocation, &e))?;

        let result = match invocation {
            Invocation::Tool { .. } => serde_json::to_value(ToolCallResult::from(envelope)),
            Invocation::Prompt { name, .. } => {
                let description = self
                    .dispatcher
                    .registry()
                    .lookup(CapabilityKind::Prompt, name)
                    .map(|entry| entry.declaration().description.clone())
                    .unwrap_or_default();
                serde_json::to_value(PromptResult {
                    description,
                    messages: vec![PromptMessage {
                        role: "user",
                        content: Content::Text {
                            text: envelope.text(),
                        },
                    }],
                })
            }
            Invocation::Resource { uri } => {
                let output = match envelope {
                    Envelope::Success(output) => output,
                    Envelope::Failure { message, .. } => {
                        return Err(JsonRpcError::resource_not_found(id, uri, message));
                    }
                };
                let mime_type = output.mime_type.clone().or_else(|| {
                    self.dispatcher
                        .registry()
                        .resolve_uri(uri)
                        .and_then(|(entry, _)| entry.declaration().mime_type.clone())
                });
                serde_json::to_value(ResourceReadResult {
                    contents: vec![ResourceContents {
                        uri: uri.clone(),
                        mime_type,
                        text: output.text(),
                    }],
                })
            }
        };

        let result = result.map_err(|e| {
            tracing::error!(error = %e, "Failed to serialise invocation result");
            JsonRpcError::internal_error(id.clone(), "Internal error: failed to serialise result")
        })?;

        Ok(JsonRpcResponse::success(id, result))
    }

    /// Ensures the server is in the Running state.
    fn require_running(&self, id: &RequestId) -> Result<(), JsonRpcError> {
        if self.state != ServerState::Running {
            return Err(JsonRpcError::invalid_request_with(
                id.clone(),
                "Server not initialised",
            ));
        }
        Ok(())
    }
}

/// Maps a protocol-level dispatch fault onto a JSON-RPC error.
fn dispatch_error(id: RequestId, invocation: &Invocation, error: &DispatchError) -> JsonRpcError {
    match error {
        DispatchError::UnknownCapability {
            kind: CapabilityKind::Resource,
            name,
        } => JsonRpcError::resource_not_found(id, name, format!("Resource not found: {name}")),
        DispatchError::UnknownCapability { kind, name } => {
            JsonRpcError::invalid_params(id, format!("Unknown {kind}: {name}"))
        }
        DispatchError::MalformedPayload { .. } => {
            JsonRpcError::invalid_params(id, error.to_string())
        }
        DispatchError::Cancelled { .. } => {
            tracing::debug!(target = invocation.target(), "Reporting cancelled invocation");
            JsonRpcError::cancelled(id)
        }
        DispatchError::TimedOut { .. } => {
            tracing::warn!(error = %error, "Invocation timed out");
            JsonRpcError::internal_error(id, error.to_string())
        }
    }
}
