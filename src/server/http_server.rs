//! Server bootstrap: socket setup and the top-level run loop.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use log::{error, info};
use tokio::net::{TcpListener, TcpSocket};
use tokio::signal;

use crate::server::config::ServerConfig;
use crate::server::error::Error;
use crate::server::event_loop::{EventLoop, LoopStats};

/// Pending connections the kernel may queue before `accept`.
const LISTEN_BACKLOG: u32 = 1024;

/// A static file server with its listening socket already bound.
pub struct StaticServer {
    config: Arc<ServerConfig>,
    listener: TcpListener,
}

impl StaticServer {
    /// Create, configure, bind and listen on the configured address.
    pub async fn bind(config: ServerConfig) -> Result<Self, Error> {
        let listener = Self::setup_listener(config.addr)?;
        let server = Self {
            config: Arc::new(config),
            listener,
        };
        server.display_server_info();
        Ok(server)
    }

    /// Set up the TCP listener with `SO_REUSEADDR`.
    fn setup_listener(addr: SocketAddr) -> Result<TcpListener, Error> {
        let bind_error = |source| Error::Bind { addr, source };

        let socket = match addr {
            SocketAddr::V4(_) => TcpSocket::new_v4(),
            SocketAddr::V6(_) => TcpSocket::new_v6(),
        }
        .map_err(bind_error)?;
        socket.set_reuseaddr(true).map_err(bind_error)?;
        socket.bind(addr).map_err(bind_error)?;
        socket.listen(LISTEN_BACKLOG).map_err(bind_error)
    }

    fn display_server_info(&self) {
        match self.listener.local_addr() {
            Ok(addr) => info!("Server listening on http://{addr}"),
            Err(e) => error!("Listening, but the local address is unavailable: {e}"),
        }
        info!("Serving files from {root}", root = self.config.root);
        info!(
            "Workers: {max}, connections: {conns}, idle timeout: {idle:?}, framing: {framing:?}",
            max = self.config.max_workers,
            conns = self.config.max_connections,
            idle = self.config.idle_timeout,
            framing = self.config.framing,
        );
    }

    /// The address the listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, Error> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve until Ctrl+C.
    pub async fn serve(self) -> Result<LoopStats, Error> {
        self.serve_with_shutdown(ctrl_c()).await
    }

    /// Serve until `shutdown` resolves.
    pub async fn serve_with_shutdown<F>(self, shutdown: F) -> Result<LoopStats, Error>
    where
        F: Future<Output = ()>,
    {
        EventLoop::new(self.listener, self.config).run(shutdown).await
    }
}

/// Resolve on Ctrl+C. Never resolves if the handler cannot be installed.
async fn ctrl_c() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, initiating graceful shutdown"),
        Err(e) => {
            error!("Error setting up Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    }
}
