//! calculator-mcp-server: an MCP server built on a validating capability registry
//!
//! Capabilities (tools, resources and prompts) are declared once, with their
//! parameters and cross-field rules, and registered with a handler. The
//! registry validates every invocation before the handler runs and returns
//! a uniform result envelope, so handlers only deal with well-formed input.
//!
//! # Modules
//!
//! - [`registry`]: Declarations, validation and dispatch
//! - [`calculator`]: The calculator tools, constants resource and prompts
//! - [`mcp`]: MCP protocol implementation
//! - [`config`]: Configuration loading and validation
//! - [`error`]: Error types

pub mod calculator;
pub mod config;
pub mod error;
pub mod mcp;
pub mod registry;
