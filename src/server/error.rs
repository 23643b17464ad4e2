//! Error types for the static file server.

use std::net::SocketAddr;

use thiserror::Error;

use crate::server::registry::Token;

/// Errors that can occur while setting up or running the server.
#[derive(Debug, Error)]
pub enum Error {
    /// Creating, configuring, binding or listening on the socket failed.
    #[error("Failed to listen on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Waiting for listener readiness failed; the event loop cannot continue.
    #[error("Readiness wait failed: {0}")]
    Wait(#[source] std::io::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Violations of the one-shot interest discipline.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// The connection is already owned by a worker.
    #[error("Connection {0} is already dispatched")]
    AlreadyDispatched(Token),

    /// The connection is armed and has not been dispatched.
    #[error("Connection {0} is already armed")]
    AlreadyArmed(Token),

    /// The connection is not registered.
    #[error("Unknown connection {0}")]
    UnknownToken(Token),
}
