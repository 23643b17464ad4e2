//! Request line parsing and the resource path it yields.

use std::fmt;

use crate::parser::error::Error;

/// Resource served when the request targets the root (`GET / HTTP/1.x`).
pub const DEFAULT_RESOURCE: &str = "index.html";

const GET_MARKER: &[u8] = b"GET /";
const VERSION_MARKER: &[u8] = b" HTTP/1";
const QUERY_SEPARATOR: char = '?';

/// A file path relative to the server root, with any query string removed.
///
/// Never empty: a bare `/` target becomes [`DEFAULT_RESOURCE`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourcePath(String);

impl ResourcePath {
    /// Get the path as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check whether any `/`-separated segment of the path is `..`.
    pub fn has_parent_segment(&self) -> bool {
        self.0.split('/').any(|segment| segment == "..")
    }
}

impl fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ResourcePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}

/// Extract the resource path from a raw request buffer.
///
/// The path is whatever sits between `GET /` and ` HTTP/1` on the request
/// line. Anything from the first `?` onwards is dropped, and an empty path
/// maps to [`DEFAULT_RESOURCE`]. No further normalization happens here.
///
/// # Arguments
///
/// * `input` - The bytes received on the connection so far
///
/// # Returns
///
/// The resource path, or [`Error::NoRequest`] if either marker is absent
pub fn parse_request(input: &[u8]) -> Result<ResourcePath, Error> {
    // Only the first line carries the request target
    let line_end = input.iter().position(|&b| b == b'\n').unwrap_or(input.len());
    let line = &input[..line_end];

    let start = find(line, GET_MARKER).ok_or(Error::NoRequest("GET /"))? + GET_MARKER.len();
    let len = find(&line[start..], VERSION_MARKER).ok_or(Error::NoRequest(" HTTP/1"))?;

    let target = std::str::from_utf8(&line[start..start + len]).map_err(|_| Error::InvalidPath)?;
    let path = match target.split_once(QUERY_SEPARATOR) {
        Some((path, _query)) => path,
        None => target,
    };

    // `GET /?q=1` targets the root as well
    if path.is_empty() {
        return Ok(ResourcePath(DEFAULT_RESOURCE.to_string()));
    }

    Ok(ResourcePath(path.to_string()))
}

/// Check whether a buffer holds a complete request head.
///
/// A head is complete once the blank line that ends it has arrived, with
/// either `\r\n` or bare `\n` line endings.
pub fn is_complete(input: &[u8]) -> bool {
    find(input, b"\r\n\r\n").is_some() || find(input, b"\n\n").is_some()
}
