use axum::{middleware, response::IntoResponse, Router};
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::services::ServeDir;

pub mod session;

#[cfg(test)]
mod tests;

pub const DEFAULT_PORT: u16 = 8000;
pub const FALLBACK_PORT: u16 = 8080;
pub const PORT_SCAN_ATTEMPTS: u16 = 10;

/// Scans `start..start + attempts` for the first port a loopback listener can
/// bind, releasing the probe listener immediately so the caller can rebind.
///
/// Advisory only: another process can grab the port between the probe and the
/// real bind. The real bind is the authority; callers handle `PortInUse`.
pub fn find_available_port(start: u16, attempts: u16) -> Option<u16> {
    for offset in 0..attempts {
        let port = start.checked_add(offset)?;
        if std::net::TcpListener::bind((Ipv4Addr::LOCALHOST, port)).is_ok() {
            return Some(port);
        }
    }
    None
}

/// Bind failures callers may want to fall back on ("the port is taken") are
/// kept distinct from ones they should not (permissions, no such interface).
#[derive(Debug, Error)]
pub enum BindError {
    #[error("port {0} is already in use")]
    PortInUse(u16),
    #[error("failed to bind listener: {0}")]
    Io(#[from] io::Error),
}

/// Router serving the game tree verbatim: `/` resolves to `index.html`,
/// content types come from file extensions, missing paths are 404.
pub fn build_router(root: impl AsRef<Path>) -> Router {
    Router::new()
        .fallback_service(ServeDir::new(root.as_ref()))
        // This server exists for local development only; never expose the
        // game tree beyond the machine it runs on.
        .layer(middleware::from_fn(ip_allowlist))
}

async fn ip_allowlist(
    axum::extract::ConnectInfo(peer): axum::extract::ConnectInfo<SocketAddr>,
    req: axum::http::Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> axum::response::Response {
    if peer.ip().is_loopback() {
        return next.run(req).await;
    }
    (axum::http::StatusCode::FORBIDDEN, "forbidden").into_response()
}

/// A running file-server binding: the accept loop lives on its own task so
/// the caller stays free to probe the served endpoint, and `stop` both closes
/// the listener and joins the task so the port is rebindable on return.
#[derive(Debug)]
pub struct ServerHandle {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<io::Result<()>>>,
}

/// Binds a loopback listener on `port` (0 picks an ephemeral port) rooted at
/// `root` and spawns the accept loop. The root directory is explicit
/// configuration; the process working directory is never touched.
pub async fn start(root: PathBuf, port: u16) -> Result<ServerHandle, BindError> {
    let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port);
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        if e.kind() == io::ErrorKind::AddrInUse {
            BindError::PortInUse(port)
        } else {
            BindError::Io(e)
        }
    })?;
    let addr = listener.local_addr().map_err(BindError::Io)?;

    let app = build_router(&root);
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let task = tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        })
        .await
    });

    tracing::debug!(%addr, root = %root.display(), "file server started");
    Ok(ServerHandle {
        addr,
        shutdown: Some(shutdown_tx),
        task: Some(task),
    })
}

impl ServerHandle {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn base_url(&self) -> String {
        format!("http://localhost:{}", self.addr.port())
    }

    /// Signals the accept loop to exit and waits for it, releasing the port.
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            match task.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::warn!(error = %e, "file server exited with error"),
                Err(e) => tracing::warn!(error = %e, "file server task panicked"),
            }
        }
        tracing::debug!(addr = %self.addr, "file server stopped");
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        // Best effort if the handle is dropped without `stop`.
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}
