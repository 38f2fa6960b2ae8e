// ABOUTME: hosts the unix socket listener and the per-connection protocol.
// ABOUTME: one bounded read, one reply, and the connection is closed on every path.

use std::io::ErrorKind;
use std::os::unix::io::AsRawFd;
use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tracing::{debug, info, warn};

use crate::dispatch::Dispatcher;

// One read covers the whole request; 4096 gives ample headroom over any
// interactive shell line.
const MAX_REQUEST_BYTES: usize = 4096;
#[cfg(test)]
const READ_TIMEOUT: std::time::Duration = std::time::Duration::from_millis(200);
#[cfg(not(test))]
const READ_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(60);

/// Binds the socket and accepts forever. Bind failures abort; everything
/// after accept stays inside the spawned connection task.
pub async fn run(socket_path: &str, dispatcher: Arc<Dispatcher>) -> anyhow::Result<()> {
    match tokio::fs::remove_file(socket_path).await {
        Ok(()) => info!(socket = socket_path, "removed stale socket file"),
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => {
            return Err(err).with_context(|| format!("remove existing socket at {socket_path}"))
        }
    }

    let listener =
        UnixListener::bind(socket_path).with_context(|| format!("bind {socket_path}"))?;
    info!(socket = socket_path, "listening");

    loop {
        let stream = match listener.accept().await {
            Ok((stream, _addr)) => stream,
            Err(err) => {
                warn!(error = %err, "accept failed");
                continue;
            }
        };
        let dispatcher = Arc::clone(&dispatcher);
        tokio::spawn(async move {
            if let Err(err) = handle_client(stream, dispatcher).await {
                warn!(error = %err, "connection handler failed");
            }
        });
    }
}

/// Connect-then-close liveness check for supervisor tooling.
pub async fn probe(socket_path: &str) -> bool {
    match UnixStream::connect(socket_path).await {
        Ok(_) => true,
        Err(err) => {
            debug!(error = %err, "probe failed");
            false
        }
    }
}

async fn handle_client(mut stream: UnixStream, dispatcher: Arc<Dispatcher>) -> anyhow::Result<()> {
    if let Some(peer) = peer_credentials(&stream) {
        debug!(pid = peer.pid, uid = peer.uid, gid = peer.gid, "client connected");
    }

    let mut buf = [0u8; MAX_REQUEST_BYTES];
    let n = match tokio::time::timeout(READ_TIMEOUT, stream.read(&mut buf)).await {
        Ok(res) => res?,
        Err(_) => {
            warn!("read timed out before any data arrived");
            return Ok(());
        }
    };

    let request = match std::str::from_utf8(&buf[..n]) {
        Ok(text) => text.trim(),
        Err(_) => {
            warn!("request was not valid utf-8");
            let _ = stream.write_all(b"Error: request is not valid utf-8").await;
            let _ = stream.shutdown().await;
            return Ok(());
        }
    };
    if request.is_empty() {
        return Ok(());
    }

    info!(request = %request, "received request");
    let response = dispatcher.handle(request).await;
    stream.write_all(response.as_bytes()).await?;
    stream.flush().await?;
    stream.shutdown().await?;
    debug!(bytes = response.len(), "response sent");
    Ok(())
}

struct PeerCredentials {
    pid: i32,
    uid: u32,
    gid: u32,
}

fn peer_credentials(stream: &UnixStream) -> Option<PeerCredentials> {
    let fd = stream.as_raw_fd();

    let mut ucred: libc::ucred = unsafe { std::mem::zeroed() };
    let mut len = std::mem::size_of::<libc::ucred>() as libc::socklen_t;
    let rc = unsafe {
        libc::getsockopt(
            fd,
            libc::SOL_SOCKET,
            libc::SO_PEERCRED,
            (&mut ucred as *mut libc::ucred).cast(),
            &mut len,
        )
    };
    if rc != 0 {
        return None;
    }
    if len as usize != std::mem::size_of::<libc::ucred>() {
        return None;
    }

    Some(PeerCredentials {
        pid: ucred.pid,
        uid: ucred.uid,
        gid: ucred.gid,
    })
}
