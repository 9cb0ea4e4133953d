use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use anyhow::{Context, Result};
use tokio::net::UnixListener;
use tokio_stream::wrappers::UnixListenerStream;
use tonic::transport::Server;
use tracing::{info, warn};

use crate::core::{CoordinatorServer, MRCoordinator};

/// Serve `coordinator` on the Unix socket at `socket` until its job is done.
///
/// A socket file left behind by an earlier run is removed first. Failing to
/// bind is returned as an error; the caller cannot do anything useful
/// without the socket.
pub async fn serve(coordinator: MRCoordinator, socket: &Path) -> Result<()> {
    match fs::remove_file(socket) {
        Ok(()) => info!("Removed stale socket {}", socket.display()),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => {
            return Err(e).with_context(|| format!("removing stale socket {}", socket.display()))
        }
    }

    let listener = UnixListener::bind(socket)
        .with_context(|| format!("binding coordinator socket {}", socket.display()))?;
    info!("CoordinatorServer listening on {}", socket.display());

    let shutdown = coordinator.shutdown_token();
    Server::builder()
        .add_service(CoordinatorServer::new(coordinator))
        .serve_with_incoming_shutdown(UnixListenerStream::new(listener), shutdown.cancelled())
        .await
        .context("coordinator server failed")?;

    match fs::remove_file(socket) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!("Could not remove socket {}: {e}", socket.display()),
    }
    info!("CoordinatorServer stopped");
    Ok(())
}
