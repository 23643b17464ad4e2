//! Static file server for microstatic-rs.
//!
//! This module provides the readiness-driven event loop, the per-connection
//! workers it dispatches to, and everything they need to turn a request into
//! a reply.

mod response;
mod config;
mod error;
mod registry;
mod resolver;
mod worker;
mod event_loop;
mod http_server;
#[cfg(test)]
mod fixtures;

// Re-export public items
pub use response::{Framing, HttpResponse, StatusCode, CONTENT_TYPE};
pub use config::{RootDir, ServerConfig};
pub use error::{Error, RegistryError};
pub use registry::{Interest, Registry, Token};
pub use resolver::{resolve, Resolution};
pub use worker::{respond, Connection, ConnectionState, Wakeup, WorkerOutcome};
pub use event_loop::{EventLoop, LoopStats};
pub use http_server::StaticServer;
