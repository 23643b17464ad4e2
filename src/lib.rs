//! A minimal static file HTTP server.
//!
//! This library serves files from a single root directory over plain TCP. It
//! understands exactly one request shape, `GET /<path> HTTP/1.x`, and answers
//! with either the file's contents or a 404.
//!
//! # Features
//!
//! - Readiness-driven event loop with one-shot connection arming
//! - Bounded, supervised per-connection workers
//! - Fragmented requests are reassembled across readiness notifications
//! - Idle timeout and graceful shutdown
//! - Configuration from command-line flags or a JSON file
//!
//! # Examples
//!
//! ## Parsing a request
//!
//! ```
//! use microstatic_rs::parse_request;
//!
//! let path = parse_request(b"GET /foo.html?x=1 HTTP/1.0\r\n\r\n").unwrap();
//! assert_eq!(path.as_str(), "foo.html");
//!
//! let path = parse_request(b"GET / HTTP/1.0\r\n\r\n").unwrap();
//! assert_eq!(path.as_str(), "index.html");
//! ```
//!
//! ## Formatting a reply
//!
//! ```
//! use microstatic_rs::{Framing, HttpResponse};
//!
//! let bytes = HttpResponse::found("hi").to_bytes(Framing::Legacy);
//! assert!(bytes.starts_with(b"HTTP/1.0 200 OK\r\nContent-length: 2\r\n"));
//! ```
//!
//! ## Running a server
//!
//! ```no_run
//! use microstatic_rs::{RootDir, ServerConfig, StaticServer};
//!
//! # async fn run() -> Result<(), microstatic_rs::ServerError> {
//! let config = ServerConfig {
//!     addr: "127.0.0.1:8080".parse().unwrap(),
//!     root: RootDir::new("/srv/www"),
//!     ..ServerConfig::default()
//! };
//!
//! let server = StaticServer::bind(config).await?;
//! server.serve().await?;
//! # Ok(())
//! # }
//! ```

// Export the parser module
pub mod parser;

// Export the server module
pub mod server;

// Re-export commonly used items for convenience
pub use parser::{parse_request, Error as ParserError, ResourcePath};
pub use server::{
    Error as ServerError, Framing, HttpResponse, LoopStats, RootDir, ServerConfig, StaticServer, StatusCode,
};
