//! Model Context Protocol surface.
//!
//! [`McpServer`] maps JSON-RPC methods (`initialize`, `ping`, `tools/list`,
//! `tools/call`) onto the tool registry. Two transports feed it:
//! [`http`] (POST to a single endpoint, optional bearer token) and [`stdio`]
//! (newline-delimited messages on stdin/stdout).

pub mod http;
pub mod protocol;
mod server;
pub mod stdio;

pub use http::HttpOptions;
pub use protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, PROTOCOL_VERSION};
pub use server::McpServer;

use std::net::SocketAddr;

/// Transport failures. Request-level problems never surface here; they are
/// answered with JSON-RPC errors instead.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The HTTP listener could not be bound
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        /// Address that was requested
        addr: SocketAddr,
        /// Underlying socket error
        #[source]
        source: std::io::Error,
    },

    /// Reading or writing the transport stream failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
