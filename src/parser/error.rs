//! Error types for the request parser.

use thiserror::Error;

/// Errors that can occur while extracting a resource path.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// The request line lacks the `GET /` or ` HTTP/1` marker.
    #[error("No request: missing `{0}` marker")]
    NoRequest(&'static str),

    /// The extracted path is not valid UTF-8.
    #[error("Invalid resource path")]
    InvalidPath,
}
