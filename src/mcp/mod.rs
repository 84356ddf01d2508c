//! Model Context Protocol (MCP) server implementation.
//!
//! This module puts the capability [`registry`](crate::registry) on the wire.
//! The server communicates over stdio using newline-delimited JSON-RPC 2.0
//! messages.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          MCP Server                          │
//! │                                                              │
//! │   ┌─────────────┐    ┌─────────────┐    ┌────────────────┐   │
//! │   │  Transport  │───▶│   Session   │───▶│   Dispatcher   │   │
//! │   │   (lines)   │◀───│ (lifecycle) │◀───│ (spawned task) │   │
//! │   └─────────────┘    └─────────────┘    └────────────────┘   │
//! │          │                  │                    │           │
//! │          ▼                  ▼                    ▼           │
//! │   ┌──────────────────────────────────────────────────────┐   │
//! │   │                  JSON-RPC Messages                   │   │
//! │   └──────────────────────────────────────────────────────┘   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Protocol Version
//!
//! This implementation targets MCP protocol version 2024-11-05.

pub mod protocol;
pub mod server;
pub mod transport;

pub use protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, MCP_PROTOCOL_VERSION};
pub use server::McpServer;
pub use transport::{LineTransport, StdioTransport};
