use crate::{find_available_port, start, BindError, ServerHandle, PORT_SCAN_ATTEMPTS};
use anyhow::{bail, Context};
use gearspin_harness::Verifier;
use gearspin_manifest::TestReport;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Starting,
    Running,
    Stopping,
    Stopped,
    Failed,
}

/// Owns the single server handle for one launch and drives it through
/// `Idle -> Starting -> Running -> Stopping -> Stopped`, with `Failed` as the
/// terminal arm when nothing binds.
pub struct Session {
    root: PathBuf,
    state: SessionState,
    handle: Option<ServerHandle>,
}

impl Session {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            state: SessionState::Idle,
            handle: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    /// URL of the running server, once there is one.
    pub fn base_url(&self) -> Option<String> {
        self.handle.as_ref().map(ServerHandle::base_url)
    }

    pub fn port(&self) -> Option<u16> {
        self.handle.as_ref().map(ServerHandle::port)
    }

    fn transition(&mut self, next: SessionState) {
        tracing::debug!(from = ?self.state, to = ?next, "session transition");
        self.state = next;
    }

    /// Quick-start path: scan upward from `start_port` for a free port and
    /// bind it. Port exhaustion is fatal here, with no fallback retry.
    pub async fn start_scanning(&mut self, start_port: u16) -> anyhow::Result<()> {
        self.begin_starting()?;
        let Some(port) = find_available_port(start_port, PORT_SCAN_ATTEMPTS) else {
            self.transition(SessionState::Failed);
            bail!(
                "no available port in {start_port}..{} - close other applications and try again",
                u32::from(start_port) + u32::from(PORT_SCAN_ATTEMPTS)
            );
        };
        // The scan is advisory; the port can still be lost before this bind.
        match start(self.root.clone(), port).await {
            Ok(handle) => {
                self.handle = Some(handle);
                self.transition(SessionState::Running);
                Ok(())
            }
            Err(e) => {
                self.transition(SessionState::Failed);
                Err(e).context("start file server")
            }
        }
    }

    /// Test-harness path: bind the requested port, retrying exactly once on
    /// `fallback` when the requested port is taken. Both busy is fatal.
    pub async fn start_with_fallback(&mut self, port: u16, fallback: u16) -> anyhow::Result<()> {
        self.begin_starting()?;
        let handle = match start(self.root.clone(), port).await {
            Ok(handle) => handle,
            Err(BindError::PortInUse(_)) if port != fallback => {
                tracing::info!(port, fallback, "port in use, trying fallback");
                match start(self.root.clone(), fallback).await {
                    Ok(handle) => handle,
                    Err(e) => {
                        self.transition(SessionState::Failed);
                        return Err(e)
                            .with_context(|| format!("ports {port} and {fallback} both failed"));
                    }
                }
            }
            Err(e) => {
                self.transition(SessionState::Failed);
                return Err(e).context("start file server");
            }
        };
        self.handle = Some(handle);
        self.transition(SessionState::Running);
        Ok(())
    }

    /// One verification run against the session's own server.
    pub async fn verify(&self) -> anyhow::Result<TestReport> {
        let base_url = self
            .base_url()
            .context("verification requires a running server")?;
        let verifier = Verifier::new(base_url)?;
        Ok(verifier.run().await)
    }

    /// Closes the listener and joins the accept loop. Idempotent; safe to
    /// call from the interrupt path.
    pub async fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.transition(SessionState::Stopping);
            handle.stop().await;
        }
        self.transition(SessionState::Stopped);
    }

    fn begin_starting(&mut self) -> anyhow::Result<()> {
        // At most one server handle per session.
        if self.handle.is_some() {
            bail!("session already has a running server");
        }
        self.transition(SessionState::Starting);
        Ok(())
    }
}
