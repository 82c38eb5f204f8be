//! Async session driver.
//!
//! [`Session`] owns the engine, the socket handle, and the tick interval,
//! and its select loop is the only place engine state is mutated — records
//! are applied strictly in arrival order, never in parallel. The
//! integration layer talks to a running session through the
//! [`SessionHandle`]: requests in, [`RouterEvent`]s out.
//!
//! Reconnection is externally triggered (send another
//! [`SessionRequest::Connect`] after a configuration change or a manual
//! retry); the session never retries on its own.

use std::time::{Duration, Instant};

use tokio::{sync::mpsc, time};

use crate::{
    client::RouterClient,
    config::RouterConfig,
    event::{ClientAction, ClientEvent, Command, RouterEvent},
    transport::{self, ConnectedRouter},
};

/// Requests accepted by a running session.
#[derive(Debug, Clone)]
pub enum SessionRequest {
    /// Dial (or re-dial) the configured router.
    Connect,
    /// Tear the socket down; the session stays alive for a later `Connect`.
    Disconnect,
    /// Submit a command intent. Dropped (not queued) while disconnected.
    Submit(Command),
    /// Stop the session loop.
    Shutdown,
}

/// Handle held by the integration layer.
pub struct SessionHandle {
    /// Send requests into the running session.
    pub requests: mpsc::Sender<SessionRequest>,
    /// Receive typed notifications.
    pub events: mpsc::Receiver<RouterEvent>,
}

/// Async driver for one engine instance.
pub struct Session {
    engine: RouterClient<Instant>,
    connection: Option<ConnectedRouter>,
    requests: mpsc::Receiver<SessionRequest>,
    events: mpsc::Sender<RouterEvent>,
}

impl Session {
    /// Build a session and the handle the integration layer keeps.
    #[must_use]
    pub fn new(config: RouterConfig) -> (Self, SessionHandle) {
        let (requests_tx, requests_rx) = mpsc::channel(32);
        let (events_tx, events_rx) = mpsc::channel(256);

        let session = Self {
            engine: RouterClient::new(config),
            connection: None,
            requests: requests_rx,
            events: events_tx,
        };
        (session, SessionHandle { requests: requests_tx, events: events_rx })
    }

    /// Read access to the engine before the loop starts (tests, warm-up
    /// inspection). While [`Session::run`] is executing, state is reachable
    /// only through the event stream.
    #[must_use]
    pub fn engine(&self) -> &RouterClient<Instant> {
        &self.engine
    }

    /// Run until shutdown is requested or the handle is dropped.
    pub async fn run(mut self) {
        let mut ticker = time::interval(Duration::from_secs(1));
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                request = self.requests.recv() => {
                    match request {
                        None | Some(SessionRequest::Shutdown) => break,
                        Some(SessionRequest::Connect) => self.connect().await,
                        Some(SessionRequest::Disconnect) => self.disconnect().await,
                        Some(SessionRequest::Submit(intent)) => {
                            self.dispatch(ClientEvent::Submit(intent)).await;
                        }
                    }
                }
                chunk = recv_chunk(&mut self.connection) => {
                    match chunk {
                        Some(data) => {
                            self.dispatch(ClientEvent::BytesReceived {
                                data,
                                now: Instant::now(),
                            })
                            .await;
                        }
                        None => {
                            self.connection = None;
                            self.dispatch(ClientEvent::Closed).await;
                        }
                    }
                }
                _ = ticker.tick() => {
                    self.dispatch(ClientEvent::Tick { now: Instant::now() }).await;
                }
            }
        }

        self.connection = None;
    }

    async fn connect(&mut self) {
        // Drop any previous socket before re-dialing.
        self.connection = None;

        match self.engine.handle(ClientEvent::ConnectRequested) {
            Ok(actions) => self.execute(actions).await,
            Err(e) => {
                tracing::warn!("connect refused: {e}");
                self.emit(RouterEvent::ProtocolError { raw: e.to_string() }).await;
                return;
            }
        }

        let host = self.engine.config().host.clone();
        let port = self.engine.config().port;

        match transport::connect(&host, port).await {
            Ok(conn) => {
                self.connection = Some(conn);
                self.dispatch(ClientEvent::Opened { now: Instant::now() }).await;
            }
            Err(e) => {
                self.dispatch(ClientEvent::Failed { reason: e.to_string() }).await;
            }
        }
    }

    async fn disconnect(&mut self) {
        self.connection = None;
        self.dispatch(ClientEvent::Closed).await;
    }

    async fn dispatch(&mut self, event: ClientEvent<Instant>) {
        match self.engine.handle(event) {
            Ok(actions) => self.execute(actions).await,
            Err(e) => tracing::warn!("engine rejected event: {e}"),
        }
    }

    async fn execute(&mut self, actions: Vec<ClientAction>) {
        for action in actions {
            match action {
                ClientAction::Send(bytes) => {
                    if let Some(conn) = &self.connection {
                        if conn.to_router.send(bytes).await.is_err() {
                            tracing::debug!("transport task gone, dropping write");
                        }
                    }
                }
                ClientAction::Notify(event) => self.emit(event).await,
            }
        }
    }

    async fn emit(&mut self, event: RouterEvent) {
        if self.events.send(event).await.is_err() {
            tracing::debug!("event receiver dropped");
        }
    }
}

/// Receive the next chunk, or park forever while no socket is open so the
/// select arm stays quiet.
async fn recv_chunk(connection: &mut Option<ConnectedRouter>) -> Option<Vec<u8>> {
    match connection {
        Some(conn) => conn.from_router.recv().await,
        None => std::future::pending().await,
    }
}
