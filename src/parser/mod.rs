//! Request parser module.
//!
//! Extracts the requested resource path from the raw bytes a connection has
//! accumulated so far. Only `GET` request lines are recognized.

mod request;
mod error;

// Re-export public items
pub use request::{ResourcePath, DEFAULT_RESOURCE};
pub use error::Error;

// Re-export the parse_request function
pub use request::{is_complete, parse_request};
