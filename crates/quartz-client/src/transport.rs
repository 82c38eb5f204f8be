//! TCP transport for the engine.
//!
//! A thin byte-moving layer: chunks travel verbatim between the socket and
//! a pair of channels, and all protocol logic stays in the sans-IO
//! [`crate::RouterClient`]. Record framing happens in the engine, so the
//! reader forwards whatever chunk sizes the kernel hands it.

use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    sync::mpsc,
    task::AbortHandle,
};

use thiserror::Error;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Dialing the router failed.
    #[error("connect to {host}:{port} failed: {source}")]
    Connect {
        /// Configured host.
        host: String,
        /// Configured port.
        port: u16,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Handle to an open router connection.
///
/// Bytes written to `to_router` go to the socket; chunks read from the
/// socket arrive on `from_router`. The channel closing means the socket
/// closed (EOF or error) — the distinction is logged, not surfaced, since
/// the engine reacts identically.
pub struct ConnectedRouter {
    /// Send wire bytes to the router.
    pub to_router: mpsc::Sender<Vec<u8>>,
    /// Receive raw chunks from the router.
    pub from_router: mpsc::Receiver<Vec<u8>>,
    abort_handle: AbortHandle,
}

impl ConnectedRouter {
    /// Tear the connection down. Safe to call more than once.
    pub fn stop(&self) {
        self.abort_handle.abort();
    }
}

impl Drop for ConnectedRouter {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Dial a router and spawn the I/O task.
pub async fn connect(host: &str, port: u16) -> Result<ConnectedRouter, TransportError> {
    let stream = TcpStream::connect((host, port)).await.map_err(|source| {
        TransportError::Connect { host: host.to_string(), port, source }
    })?;

    // Command traffic is tiny and latency-sensitive.
    stream.set_nodelay(true).map_err(|source| TransportError::Connect {
        host: host.to_string(),
        port,
        source,
    })?;

    let (to_router_tx, to_router_rx) = mpsc::channel::<Vec<u8>>(32);
    let (from_router_tx, from_router_rx) = mpsc::channel::<Vec<u8>>(32);

    let handle = tokio::spawn(run_connection(stream, to_router_rx, from_router_tx));

    Ok(ConnectedRouter {
        to_router: to_router_tx,
        from_router: from_router_rx,
        abort_handle: handle.abort_handle(),
    })
}

/// Bridge between the socket and the channels until either side closes.
async fn run_connection(
    stream: TcpStream,
    mut to_router: mpsc::Receiver<Vec<u8>>,
    from_router: mpsc::Sender<Vec<u8>>,
) {
    let (mut read_half, mut write_half) = stream.into_split();

    let reader = tokio::spawn(async move {
        let mut buf = [0u8; 4096];
        loop {
            match read_half.read(&mut buf).await {
                Ok(0) => {
                    tracing::debug!("router closed the connection");
                    break;
                }
                Ok(n) => {
                    if from_router.send(buf[..n].to_vec()).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::debug!("router read failed: {e}");
                    break;
                }
            }
        }
    });

    while let Some(bytes) = to_router.recv().await {
        if let Err(e) = write_half.write_all(&bytes).await {
            tracing::debug!("router write failed: {e}");
            break;
        }
    }

    reader.abort();
}
