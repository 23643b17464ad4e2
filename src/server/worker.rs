//! Per-connection worker.
//!
//! A worker owns one [`Connection`] from dispatch until it either closes the
//! connection or hands it back to the event loop to be re-armed.

use std::io::ErrorKind;
use std::net::{Shutdown, SocketAddr};

use log::debug;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

use crate::parser::{is_complete, parse_request};
use crate::server::config::{RootDir, ServerConfig};
use crate::server::registry::Token;
use crate::server::resolver::{resolve, Resolution};
use crate::server::response::{Framing, HttpResponse};

/// One accepted connection together with the request bytes read so far.
#[derive(Debug)]
pub struct Connection {
    token: Token,
    peer: SocketAddr,
    stream: TcpStream,
    buffer: Vec<u8>,
}

/// What the one-shot registration delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wakeup {
    /// The socket became readable.
    Readable,
    /// The idle timeout expired first.
    Idle,
}

/// Worker state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Reading,
    Processing,
    Closed,
}

/// How a worker finished with its connection.
#[derive(Debug)]
pub enum WorkerOutcome {
    /// The request is incomplete; ownership goes back to the event loop.
    Rearm(Connection),
    /// The connection was shut down and released.
    Closed {
        token: Token,
        /// Whether a reply was written successfully.
        replied: bool,
    },
}

enum ReadProgress {
    Complete,
    Pending,
    PeerClosed,
    Failed,
}

impl Connection {
    /// Wrap a freshly accepted stream.
    pub fn new(token: Token, peer: SocketAddr, stream: TcpStream) -> Self {
        Self {
            token,
            peer,
            stream,
            buffer: Vec::new(),
        }
    }

    pub fn token(&self) -> Token {
        self.token
    }

    /// Wait for the socket to become readable.
    pub async fn readable(&self) -> std::io::Result<()> {
        self.stream.readable().await
    }

    /// Drive the connection through Reading, Processing and Closed.
    pub async fn run(mut self, wakeup: Wakeup, config: &ServerConfig) -> WorkerOutcome {
        let mut state = match wakeup {
            Wakeup::Readable => ConnectionState::Reading,
            Wakeup::Idle if self.buffer.is_empty() => ConnectionState::Closed,
            Wakeup::Idle => ConnectionState::Processing,
        };
        let mut replied = false;

        loop {
            state = match state {
                ConnectionState::Reading => match self.read_available(config) {
                    ReadProgress::Complete => ConnectionState::Processing,
                    ReadProgress::Pending => {
                        debug!("Connection {} waiting for more data ({} bytes so far)", self.token, self.buffer.len());
                        return WorkerOutcome::Rearm(self);
                    }
                    ReadProgress::PeerClosed | ReadProgress::Failed => ConnectionState::Closed,
                },
                ConnectionState::Processing => {
                    let reply = respond(&self.buffer, &config.root, config.framing).await;
                    match self.stream.write_all(&reply).await {
                        Ok(()) => replied = true,
                        Err(e) => debug!("Failed to reply to {}: {e}", self.peer),
                    }
                    ConnectionState::Closed
                }
                ConnectionState::Closed => {
                    let token = self.token;
                    self.close();
                    return WorkerOutcome::Closed { token, replied };
                }
            };
        }
    }

    /// Drain whatever the socket holds without blocking.
    fn read_available(&mut self, config: &ServerConfig) -> ReadProgress {
        let mut chunk = vec![0; config.read_buffer_size];

        loop {
            match self.stream.try_read(&mut chunk) {
                Ok(0) => {
                    debug!("Connection {} closed by {}", self.token, self.peer);
                    return ReadProgress::PeerClosed;
                }
                Ok(n) => {
                    self.buffer.extend_from_slice(&chunk[..n]);
                    if is_complete(&self.buffer) || self.buffer.len() >= config.max_request_size {
                        return ReadProgress::Complete;
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => return ReadProgress::Pending,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    debug!("Read from {} failed: {e}", self.peer);
                    return ReadProgress::Failed;
                }
            }
        }
    }

    /// Shut the socket down in both directions and release it.
    fn close(self) {
        match self.stream.into_std() {
            Ok(stream) => {
                if let Err(e) = stream.shutdown(Shutdown::Both) {
                    debug!("Shutdown of {} failed: {e}", self.peer);
                }
            }
            Err(e) => debug!("Cannot detach {} from the reactor: {e}", self.peer),
        }
        debug!("Connection {} released", self.token);
    }
}

/// Turn a buffered request into reply bytes.
///
/// Unrecognized requests and unreadable files both produce the not-found
/// reply.
pub async fn respond(request: &[u8], root: &RootDir, framing: Framing) -> Vec<u8> {
    let response = match parse_request(request) {
        Ok(path) => match resolve(root, &path).await {
            Resolution::Found(contents) => HttpResponse::found(contents),
            Resolution::NotFound => HttpResponse::not_found(),
        },
        Err(e) => {
            debug!("Unrecognized request: {e}");
            HttpResponse::not_found()
        }
    };

    response.to_bytes(framing)
}
