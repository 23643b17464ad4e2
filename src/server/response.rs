//! HTTP response types and wire framing.

use serde::Deserialize;

/// The only content type the server announces.
pub const CONTENT_TYPE: &str = "text/html";

/// Status codes the server can reply with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    Ok = 200,
    NotFound = 404,
}

impl StatusCode {
    /// Get the reason phrase for this status code.
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::NotFound => "NOT FOUND",
        }
    }
}

/// Where the payload goes on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Framing {
    /// Payload inside the header block behind a `Content: ` label, followed
    /// by the blank line. Wire-compatible with existing clients.
    #[default]
    Legacy,
    /// Payload after the blank line, as plain HTTP/1.0.
    Standard,
}

/// Represents an HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// The HTTP status code
    pub status: StatusCode,
    /// The file contents, empty for not-found replies
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Reply carrying the contents of a served file.
    pub fn found(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: StatusCode::Ok,
            body: body.into(),
        }
    }

    /// Reply for missing files and unrecognized requests.
    pub fn not_found() -> Self {
        Self {
            status: StatusCode::NotFound,
            body: Vec::new(),
        }
    }

    /// Convert the response to bytes.
    ///
    /// Not-found replies are identical in both framings: the header block
    /// with `Content-length: 0` and nothing after it.
    pub fn to_bytes(&self, framing: Framing) -> Vec<u8> {
        let head = format!(
            "HTTP/1.0 {code} {reason}\r\nContent-length: {len}\r\nContent-type: {CONTENT_TYPE}\r\n",
            code = self.status as u16,
            reason = self.status.reason_phrase(),
            len = self.body.len(),
        );

        let mut bytes = Vec::with_capacity(head.len() + self.body.len() + 16);
        bytes.extend_from_slice(head.as_bytes());

        match (self.status, framing) {
            (StatusCode::NotFound, _) => bytes.extend_from_slice(b"\r\n"),
            (StatusCode::Ok, Framing::Legacy) => {
                bytes.extend_from_slice(b"Content: ");
                bytes.extend_from_slice(&self.body);
                bytes.extend_from_slice(b"\r\n\r\n");
            }
            (StatusCode::Ok, Framing::Standard) => {
                bytes.extend_from_slice(b"\r\n");
                bytes.extend_from_slice(&self.body);
            }
        }

        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_bytes() {
        let bytes = HttpResponse::not_found().to_bytes(Framing::Legacy);
        assert_eq!(
            bytes,
            b"HTTP/1.0 404 NOT FOUND\r\nContent-length: 0\r\nContent-type: text/html\r\n\r\n".to_vec()
        );
        assert_eq!(bytes, HttpResponse::not_found().to_bytes(Framing::Standard));
    }

    #[test]
    fn test_found_legacy_framing() {
        let bytes = HttpResponse::found("hi").to_bytes(Framing::Legacy);
        assert_eq!(
            bytes,
            b"HTTP/1.0 200 OK\r\nContent-length: 2\r\nContent-type: text/html\r\nContent: hi\r\n\r\n".to_vec()
        );
    }

    #[test]
    fn test_found_standard_framing() {
        let bytes = HttpResponse::found("hi").to_bytes(Framing::Standard);
        assert_eq!(
            bytes,
            b"HTTP/1.0 200 OK\r\nContent-length: 2\r\nContent-type: text/html\r\n\r\nhi".to_vec()
        );
    }

    #[test]
    fn test_content_length_counts_bytes_not_chars() {
        let body = "héllo\0\r\n".as_bytes().to_vec();
        let bytes = HttpResponse::found(body.clone()).to_bytes(Framing::Legacy);
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains(&format!("Content-length: {}\r\n", body.len())));
        assert!(bytes.windows(body.len()).any(|w| w == body.as_slice()));
    }

    #[test]
    fn test_empty_file_is_still_found() {
        let bytes = HttpResponse::found(Vec::new()).to_bytes(Framing::Legacy);
        assert!(bytes.starts_with(b"HTTP/1.0 200 OK\r\nContent-length: 0\r\n"));
        assert!(bytes.ends_with(b"Content: \r\n\r\n"));
    }
}
