//! Readiness-driven event loop.
//!
//! The loop owns the listener, the [`Registry`] and every connection that is
//! not currently held by a worker. Connections are armed one-shot: each arm
//! waits for a single readiness notification and then hands the connection
//! straight back to the loop, which dispatches it to a worker. A worker
//! either closes the connection or returns it for re-arming.

use std::collections::HashMap;
use std::future::{poll_fn, Future};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::task::Poll;
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tokio::task::{self, JoinError, JoinSet};
use tokio::time::{self, Instant};

use crate::server::config::ServerConfig;
use crate::server::error::Error;
use crate::server::registry::{Registry, Token};
use crate::server::worker::{Connection, Wakeup, WorkerOutcome};

/// Counters collected over the lifetime of an event loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    /// Connections accepted from the listener.
    pub accepted: u64,
    /// Readiness notifications handed to workers.
    pub dispatched: u64,
    /// Connections handed back by workers for another notification.
    pub rearmed: u64,
    /// Dispatches caused by the idle timeout rather than readability.
    pub idle: u64,
    /// Replies written successfully.
    pub replied: u64,
    /// Connections shut down and released by workers.
    pub closed: u64,
    /// Notifications dropped because the connection was not armed.
    pub refused_dispatches: u64,
    /// Connections closed on accept because `max_connections` was reached.
    pub rejected: u64,
    /// Accept failures that paused the listener, such as running out of descriptors.
    pub accept_backoffs: u64,
}

/// How long the listener is left alone after a resource error on accept.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Result of one one-shot arm.
struct Readiness {
    conn: Connection,
    wakeup: io::Result<Wakeup>,
}

/// The event loop. Build one with [`EventLoop::new`] and drive it with
/// [`EventLoop::run`].
pub struct EventLoop {
    listener: TcpListener,
    config: Arc<ServerConfig>,
    registry: Registry,
    armed: JoinSet<Readiness>,
    armed_tokens: HashMap<task::Id, Token>,
    workers: JoinSet<WorkerOutcome>,
    worker_tokens: HashMap<task::Id, Token>,
    permits: Arc<Semaphore>,
    stats: LoopStats,
    draining: bool,
}

/// What the loop does after a failed accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AcceptFailure {
    /// The peer went away before it was accepted.
    Skip,
    /// A local resource ran out (descriptors, buffers, memory). Pause, then retry.
    Backoff,
    /// The listener itself is unusable.
    Fatal,
}

fn classify_accept_error(e: &io::Error) -> AcceptFailure {
    match e.kind() {
        io::ErrorKind::ConnectionAborted
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionRefused
        | io::ErrorKind::Interrupted
        | io::ErrorKind::WouldBlock
        | io::ErrorKind::TimedOut => AcceptFailure::Skip,
        io::ErrorKind::InvalidInput => AcceptFailure::Fatal,
        _ => AcceptFailure::Backoff,
    }
}

impl EventLoop {
    /// Create an event loop around a listening socket.
    pub fn new(listener: TcpListener, config: Arc<ServerConfig>) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_workers));
        Self {
            listener,
            config,
            registry: Registry::new(),
            armed: JoinSet::new(),
            armed_tokens: HashMap::new(),
            workers: JoinSet::new(),
            worker_tokens: HashMap::new(),
            permits,
            stats: LoopStats::default(),
            draining: false,
        }
    }

    /// Run until `shutdown` resolves or the listener fails.
    ///
    /// Either way, parked connections are dropped and in-flight workers get
    /// up to `shutdown_timeout` to finish before the stats are returned.
    pub async fn run<F>(mut self, shutdown: F) -> Result<LoopStats, Error>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut fatal = None;

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutting down event loop");
                    break;
                }

                accepted = self.listener.accept() => {
                    let result = match self.on_accept(accepted).await {
                        Ok(true) => self.drain_accept_queue().await,
                        Ok(false) => Ok(()),
                        Err(e) => Err(e),
                    };
                    if let Err(e) = result {
                        error!("Listener failed, stopping event loop: {e}");
                        fatal = Some(e);
                        break;
                    }
                }

                Some(ready) = self.armed.join_next_with_id() => self.on_readiness(ready),

                Some(done) = self.workers.join_next_with_id() => self.on_worker_done(done),
            }
        }

        self.drain().await;

        match fatal {
            Some(e) => Err(e),
            None => Ok(self.stats),
        }
    }

    /// Accept every connection already queued on the listener.
    async fn drain_accept_queue(&mut self) -> Result<(), Error> {
        loop {
            let next = poll_fn(|cx| match self.listener.poll_accept(cx) {
                Poll::Ready(result) => Poll::Ready(Some(result)),
                Poll::Pending => Poll::Ready(None),
            })
            .await;

            let Some(accepted) = next else {
                return Ok(());
            };
            if !self.on_accept(accepted).await? {
                return Ok(());
            }
        }
    }

    /// Register and arm an accepted connection.
    ///
    /// Returns `false` when the listener backed off and should not be
    /// drained any further this round.
    async fn on_accept(&mut self, accepted: io::Result<(TcpStream, SocketAddr)>) -> Result<bool, Error> {
        match accepted {
            Ok((stream, peer)) => {
                self.stats.accepted += 1;
                if self.registry.len() >= self.config.max_connections {
                    warn!("Connection limit reached, rejecting connection from {peer}");
                    self.stats.rejected += 1;
                    drop(stream);
                    return Ok(true);
                }
                let token = self.registry.register();
                debug!("Accepted {peer} as connection {token}");
                self.arm(Connection::new(token, peer, stream));
                Ok(true)
            }
            Err(e) => match classify_accept_error(&e) {
                AcceptFailure::Skip => {
                    warn!("Error accepting connection: {e}");
                    Ok(true)
                }
                AcceptFailure::Backoff => {
                    error!("Error accepting connection, retrying in {ACCEPT_BACKOFF:?}: {e}");
                    self.stats.accept_backoffs += 1;
                    time::sleep(ACCEPT_BACKOFF).await;
                    Ok(false)
                }
                AcceptFailure::Fatal => Err(Error::Wait(e)),
            },
        }
    }

    /// Wait for exactly one notification on `conn`.
    fn arm(&mut self, conn: Connection) {
        let token = conn.token();
        let idle_timeout = self.config.idle_timeout;
        let handle = self.armed.spawn(async move {
            let wakeup = match idle_timeout {
                Some(limit) => match time::timeout(limit, conn.readable()).await {
                    Ok(result) => result.map(|()| Wakeup::Readable),
                    Err(_elapsed) => Ok(Wakeup::Idle),
                },
                None => conn.readable().await.map(|()| Wakeup::Readable),
            };
            Readiness { conn, wakeup }
        });
        self.armed_tokens.insert(handle.id(), token);
    }

    /// Forget a connection the loop no longer tracks.
    fn release(&mut self, token: Token) {
        if let Err(e) = self.registry.deregister(token) {
            warn!("Released connection was not registered: {e}");
        }
    }

    fn on_readiness(&mut self, ready: Result<(task::Id, Readiness), JoinError>) {
        let Readiness { conn, wakeup } = match ready {
            Ok((id, ready)) => {
                self.armed_tokens.remove(&id);
                ready
            }
            Err(e) => {
                error!("Readiness task failed: {e}");
                if let Some(token) = self.armed_tokens.remove(&e.id()) {
                    self.release(token);
                }
                return;
            }
        };
        let token = conn.token();

        let wakeup = match wakeup {
            Ok(wakeup) => wakeup,
            Err(e) => {
                debug!("Readiness wait on connection {token} failed: {e}");
                self.release(token);
                return;
            }
        };

        if let Err(e) = self.registry.dispatch(token) {
            error!("Dropping notification: {e}");
            self.stats.refused_dispatches += 1;
            return;
        }
        self.stats.dispatched += 1;
        if wakeup == Wakeup::Idle {
            self.stats.idle += 1;
        }

        let config = Arc::clone(&self.config);
        let permits = Arc::clone(&self.permits);
        let handle = self.workers.spawn(async move {
            // Held until the worker returns
            let Ok(_permit) = permits.acquire_owned().await else {
                return WorkerOutcome::Closed {
                    token: conn.token(),
                    replied: false,
                };
            };
            conn.run(wakeup, &config).await
        });
        self.worker_tokens.insert(handle.id(), token);
    }

    fn on_worker_done(&mut self, done: Result<(task::Id, WorkerOutcome), JoinError>) {
        let outcome = match done {
            Ok((id, outcome)) => {
                self.worker_tokens.remove(&id);
                outcome
            }
            Err(e) => {
                error!("Worker task failed: {e}");
                if let Some(token) = self.worker_tokens.remove(&e.id()) {
                    self.release(token);
                }
                return;
            }
        };

        match outcome {
            WorkerOutcome::Rearm(conn) => {
                let token = conn.token();
                if self.draining {
                    debug!("Dropping connection {token} during shutdown");
                    self.release(token);
                    return;
                }
                match self.registry.rearm(token) {
                    Ok(()) => {
                        self.stats.rearmed += 1;
                        self.arm(conn);
                    }
                    Err(e) => error!("Cannot re-arm: {e}"),
                }
            }
            WorkerOutcome::Closed { token, replied } => {
                self.release(token);
                self.stats.closed += 1;
                if replied {
                    self.stats.replied += 1;
                }
            }
        }
    }

    /// Drop parked connections and wait for workers to finish.
    async fn drain(&mut self) {
        self.draining = true;

        let parked = self.armed.len();
        self.armed.shutdown().await;
        for (_, token) in std::mem::take(&mut self.armed_tokens) {
            self.release(token);
        }
        if parked > 0 {
            info!("Dropped {parked} idle connections");
        }

        info!("Waiting for {len} active workers to complete...", len = self.workers.len());
        let deadline = Instant::now() + self.config.shutdown_timeout;
        while !self.workers.is_empty() {
            match time::timeout_at(deadline, self.workers.join_next_with_id()).await {
                Ok(Some(done)) => self.on_worker_done(done),
                Ok(None) => break,
                Err(_) => {
                    warn!("Shutdown timeout reached, aborting {len} workers", len = self.workers.len());
                    self.workers.shutdown().await;
                    for (_, token) in std::mem::take(&mut self.worker_tokens) {
                        self.release(token);
                    }
                    break;
                }
            }
        }

        info!("Event loop stopped: {stats:?}", stats = self.stats);
    }
}
