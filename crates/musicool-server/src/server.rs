//! TCP listener: one thread per accepted connection.

use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};

use crate::config::StreamerSettings;
use crate::session::{SessionOutcome, serve_session};

pub struct Server {
    listener: TcpListener,
    settings: Arc<StreamerSettings>,
}

impl Server {
    /// Bind the listener described by `settings`.
    pub fn bind(settings: StreamerSettings) -> Result<Self> {
        let listener =
            TcpListener::bind(settings.bind).with_context(|| format!("bind {}", settings.bind))?;
        Ok(Self {
            listener,
            settings: Arc::new(settings),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener.local_addr().context("listener local_addr")
    }

    /// Accept connections forever, handing each to its own thread.
    pub fn run(self) -> Result<()> {
        tracing::info!(
            bind = %self.local_addr()?,
            library_root = %self.settings.library_root.display(),
            chunk_size = self.settings.chunk_size,
            extension = %self.settings.extension,
            "listening"
        );
        for conn in self.listener.incoming() {
            let stream = match conn {
                Ok(stream) => stream,
                Err(err) => {
                    tracing::warn!(error = %err, "accept failed");
                    continue;
                }
            };
            let peer = match stream.peer_addr() {
                Ok(peer) => peer,
                Err(err) => {
                    tracing::debug!(error = %err, "peer vanished before handling");
                    continue;
                }
            };
            let settings = self.settings.clone();
            let spawned = thread::Builder::new()
                .name(format!("stream-{peer}"))
                .spawn(move || handle_connection(stream, peer, &settings));
            if let Err(err) = spawned {
                tracing::error!(%peer, error = %err, "failed to spawn connection thread");
            }
        }
        Ok(())
    }

    /// Run the accept loop on a background thread.
    pub fn spawn(self) -> Result<thread::JoinHandle<()>> {
        thread::Builder::new()
            .name("accept".to_string())
            .spawn(move || {
                if let Err(err) = self.run() {
                    tracing::error!(error = %err, "accept loop ended");
                }
            })
            .context("spawn accept thread")
    }
}

fn handle_connection(mut stream: TcpStream, peer: SocketAddr, settings: &StreamerSettings) {
    stream.set_nodelay(true).ok();
    if let Err(err) = stream.set_write_timeout(settings.send_timeout) {
        tracing::warn!(%peer, error = %err, "could not set write timeout");
    }
    tracing::debug!(%peer, "client connected");

    match serve_session(&mut stream, settings) {
        SessionOutcome::Completed(summary) => {
            tracing::debug!(%peer, chunks = summary.chunks, "connection done")
        }
        SessionOutcome::Rejected(code) => tracing::debug!(%peer, ?code, "connection rejected"),
        SessionOutcome::Disconnected => tracing::debug!(%peer, "client disconnected"),
    }
}
