//! Sans-IO protocol engine.
//!
//! [`RouterClient`] is the single owner of all protocol state: the record
//! framer, the state store, the link state, and the poll clock. The driver
//! feeds it [`ClientEvent`]s and executes the returned [`ClientAction`]s;
//! nothing here touches a socket or a timer, which keeps the engine pure
//! and directly testable.
//!
//! # State machine
//!
//! ```text
//! ┌──────────────┐ ConnectRequested ┌────────────┐   Opened    ┌───────────┐
//! │ Disconnected │─────────────────>│ Connecting │────────────>│ Connected │
//! └──────────────┘                  └────────────┘             └───────────┘
//!        ^                                │                       │      │
//!        │                             Failed                  Closed  Failed
//!        │                                ↓                       │      ↓
//!        │                          ┌─────────┐                   │ ┌─────────┐
//!        └──────────────────────────│ Faulted │<──────────────────┘ │ Faulted │
//!          (next ConnectRequested)  └─────────┘                     └─────────┘
//! ```
//!
//! Every state re-enters `Connecting` on a new `ConnectRequested`;
//! reconnection itself is externally triggered, never an internal retry
//! loop.

use std::{
    ops::Sub,
    time::{Duration, Instant},
};

use quartz_proto::{Message, RecordFramer, TERMINATOR, command, encode_text};

use crate::{
    config::RouterConfig,
    error::ClientError,
    event::{ClientAction, ClientEvent, Command, RouterEvent},
    state::RouterState,
};

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// No socket and no attempt in flight.
    Disconnected,
    /// Dialing.
    Connecting,
    /// Socket open; commands are accepted.
    Connected,
    /// The last attempt or session ended with a transport error.
    Faulted,
}

/// Protocol engine for one router session.
///
/// Generic over `Instant` so tests can drive virtual time; production uses
/// [`std::time::Instant`].
///
/// Submitted commands are never queued: [`ClientEvent::Submit`] produces a
/// [`ClientAction::Send`] only while the link is `Connected`, so an empty
/// action set tells the caller no write was attempted.
pub struct RouterClient<I = Instant>
where
    I: Copy + Ord + Sub<Output = Duration>,
{
    config: RouterConfig,
    framer: RecordFramer,
    state: RouterState,
    link: LinkState,
    /// Poll clock; armed only while connected.
    last_refresh: Option<I>,
}

impl<I> RouterClient<I>
where
    I: Copy + Ord + Sub<Output = Duration>,
{
    /// Create a disconnected engine with fresh directories.
    #[must_use]
    pub fn new(config: RouterConfig) -> Self {
        Self {
            config,
            framer: RecordFramer::new(),
            state: RouterState::new(),
            link: LinkState::Disconnected,
            last_refresh: None,
        }
    }

    /// Current link state.
    #[must_use]
    pub fn link(&self) -> LinkState {
        self.link
    }

    /// Whether commands would currently be written to the wire.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.link == LinkState::Connected
    }

    /// Read access to directories, crosspoints, and locks.
    #[must_use]
    pub fn state(&self) -> &RouterState {
        &self.state
    }

    /// The configuration this engine was built with.
    #[must_use]
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Process one event and return the actions for the driver to execute.
    ///
    /// Events must be fed strictly in arrival order: crosspoint records for
    /// the same (level, destination) are last-writer-wins, so reordering
    /// would silently corrupt displayed state.
    pub fn handle(&mut self, event: ClientEvent<I>) -> Result<Vec<ClientAction>, ClientError> {
        match event {
            ClientEvent::ConnectRequested => self.handle_connect_requested(),
            ClientEvent::Opened { now } => self.handle_opened(now),
            ClientEvent::BytesReceived { data, now } => Ok(self.handle_bytes(&data, now)),
            ClientEvent::Tick { now } => Ok(self.handle_tick(now)),
            ClientEvent::Closed => Ok(self.set_link(LinkState::Disconnected)),
            ClientEvent::Failed { reason } => Ok(self.handle_failed(&reason)),
            ClientEvent::Submit(intent) => Ok(self.handle_submit(&intent)),
        }
    }

    fn handle_connect_requested(&mut self) -> Result<Vec<ClientAction>, ClientError> {
        if self.config.host.is_empty() {
            return Err(ClientError::EmptyHost);
        }

        // A stale fragment or route table from the previous session must
        // not leak into this one. Names are retained; see RouterState.
        self.framer.reset();
        self.state.clear_session();

        Ok(self.set_link(LinkState::Connecting))
    }

    fn handle_opened(&mut self, now: I) -> Result<Vec<ClientAction>, ClientError> {
        if self.link != LinkState::Connecting {
            return Err(ClientError::UnexpectedEvent { link: self.link, event: "socket open" });
        }

        let mut actions = self.set_link(LinkState::Connected);
        actions.extend(self.refresh(now));
        Ok(actions)
    }

    fn handle_failed(&mut self, reason: &str) -> Vec<ClientAction> {
        tracing::warn!(reason, "router link failed");
        self.set_link(LinkState::Faulted)
    }

    fn handle_bytes(&mut self, data: &[u8], now: I) -> Vec<ClientAction> {
        let mut actions = Vec::new();
        for record in self.framer.push(data) {
            let message = Message::parse(&record);
            actions.extend(self.apply_message(&message, now));
        }
        actions
    }

    fn apply_message(&mut self, message: &Message, now: I) -> Vec<ClientAction> {
        let mut actions: Vec<ClientAction> =
            self.state.apply(message).into_iter().map(ClientAction::Notify).collect();

        match message {
            Message::PowerUp => {
                // The router reset and may have dropped names and routes;
                // re-request everything rather than trusting retained state.
                tracing::info!("router reports power-up, re-reading names and crosspoints");
                if self.link == LinkState::Connected {
                    actions.extend(self.refresh(now));
                }
            }
            Message::Acknowledge { data } if self.config.verbose => {
                let shown = if data.is_empty() { "no data" } else { data.as_str() };
                tracing::debug!(data = shown, "router acknowledged");
            }
            Message::Unknown { raw } if self.config.verbose => {
                tracing::warn!(record = raw.as_str(), "unrecognized record");
            }
            _ => {}
        }
        actions
    }

    fn handle_tick(&mut self, now: I) -> Vec<ClientAction> {
        if self.link != LinkState::Connected {
            return vec![];
        }
        match self.last_refresh {
            Some(last) if now - last < self.config.poll_interval() => vec![],
            _ => self.refresh(now),
        }
    }

    fn handle_submit(&mut self, intent: &Command) -> Vec<ClientAction> {
        if self.link != LinkState::Connected {
            tracing::debug!(?intent, "dropping command while link is down");
            return vec![];
        }

        if let Command::Route { levels, .. } = intent
            && levels.is_empty()
        {
            tracing::warn!("dropping route with no levels");
            return vec![];
        }

        vec![ClientAction::Send(encode_wire(&self.render(intent)))]
    }

    fn render(&self, intent: &Command) -> String {
        match intent {
            Command::ReadDestinationName { id } => command::read_destination_name(*id),
            Command::ReadSourceName { id } => command::read_source_name(*id),
            Command::ReadAllNames => {
                command::read_all_names(self.config.max_destinations, self.config.max_sources)
            }
            Command::Route { levels, destination, source } => {
                command::route(levels, *destination, *source)
            }
            Command::FireSalvo { id } => command::fire_salvo(*id),
            Command::Lock { destination } => command::lock_destination(*destination),
            Command::Unlock { destination } => command::unlock_destination(*destination),
            Command::Interrogate { level, destination } => {
                command::interrogate(*level, *destination)
            }
            Command::InterrogateAll { level } => {
                command::interrogate_all(*level, self.config.max_destinations)
            }
            Command::ListRoutes { level, start } => command::list_routes(*level, *start),
            Command::Raw(text) => text.clone(),
        }
    }

    /// Issue the full refresh: every name, then interrogate every
    /// configured plane. Also (re)arms the poll clock.
    fn refresh(&mut self, now: I) -> Vec<ClientAction> {
        self.last_refresh = Some(now);

        let mut wire =
            command::read_all_names(self.config.max_destinations, self.config.max_sources);
        for level in &self.config.levels {
            wire.push_str(&command::interrogate_all(*level, self.config.max_destinations));
        }

        vec![ClientAction::Send(encode_text(&wire))]
    }

    /// Transition the link state, disarming the poll clock off-wire.
    /// Re-entering the current state is a no-op, which makes teardown
    /// idempotent.
    fn set_link(&mut self, link: LinkState) -> Vec<ClientAction> {
        if self.link == link {
            return vec![];
        }
        self.link = link;
        if link != LinkState::Connected {
            self.last_refresh = None;
        }
        vec![ClientAction::Notify(RouterEvent::ConnectionChanged(link))]
    }
}

/// Encode command text for the wire, appending the terminator if absent.
fn encode_wire(text: &str) -> Vec<u8> {
    let mut bytes = encode_text(text);
    if bytes.last() != Some(&TERMINATOR) {
        bytes.push(TERMINATOR);
    }
    bytes
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use quartz_proto::Level;

    use super::*;
    use crate::state::DirectoryKind;

    fn test_config() -> RouterConfig {
        RouterConfig {
            host: "router.local".to_string(),
            max_destinations: 2,
            max_sources: 1,
            poll_interval_secs: 30,
            ..RouterConfig::default()
        }
    }

    fn connected_client(t0: Instant) -> RouterClient {
        let mut client = RouterClient::new(test_config());
        client.handle(ClientEvent::ConnectRequested).unwrap();
        client.handle(ClientEvent::Opened { now: t0 }).unwrap();
        client
    }

    fn sent_bytes(actions: &[ClientAction]) -> Vec<u8> {
        actions
            .iter()
            .filter_map(|a| match a {
                ClientAction::Send(bytes) => Some(bytes.clone()),
                ClientAction::Notify(_) => None,
            })
            .flatten()
            .collect()
    }

    #[test]
    fn connect_walks_the_lifecycle() {
        let mut client = RouterClient::new(test_config());
        assert_eq!(client.link(), LinkState::Disconnected);

        let actions = client.handle(ClientEvent::ConnectRequested).unwrap();
        assert_eq!(client.link(), LinkState::Connecting);
        assert_eq!(
            actions,
            vec![ClientAction::Notify(RouterEvent::ConnectionChanged(LinkState::Connecting))]
        );

        let actions = client.handle(ClientEvent::Opened { now: Instant::now() }).unwrap();
        assert_eq!(client.link(), LinkState::Connected);
        assert!(matches!(
            actions.first(),
            Some(ClientAction::Notify(RouterEvent::ConnectionChanged(LinkState::Connected)))
        ));
    }

    #[test]
    fn empty_host_is_refused() {
        let mut client: RouterClient = RouterClient::new(RouterConfig::default());
        assert_eq!(client.handle(ClientEvent::ConnectRequested), Err(ClientError::EmptyHost));
        assert_eq!(client.link(), LinkState::Disconnected);
    }

    #[test]
    fn opened_outside_connecting_is_rejected() {
        let mut client: RouterClient = RouterClient::new(test_config());
        let result = client.handle(ClientEvent::Opened { now: Instant::now() });
        assert!(matches!(result, Err(ClientError::UnexpectedEvent { .. })));
    }

    #[test]
    fn open_issues_full_refresh() {
        let t0 = Instant::now();
        let mut client = RouterClient::new(test_config());
        client.handle(ClientEvent::ConnectRequested).unwrap();
        let actions = client.handle(ClientEvent::Opened { now: t0 }).unwrap();

        let wire = String::from_utf8(sent_bytes(&actions)).unwrap();
        assert_eq!(wire, ".RD1\r.RD2\r.RS1\r.IV1\r.IV2\r");
    }

    #[test]
    fn poll_reissues_refresh_after_interval() {
        let t0 = Instant::now();
        let mut client = connected_client(t0);

        // Within the interval: quiet.
        let actions =
            client.handle(ClientEvent::Tick { now: t0 + Duration::from_secs(10) }).unwrap();
        assert!(actions.is_empty());

        // Past the interval: refresh again.
        let actions =
            client.handle(ClientEvent::Tick { now: t0 + Duration::from_secs(31) }).unwrap();
        assert!(!sent_bytes(&actions).is_empty());

        // Clock re-armed by that refresh.
        let actions =
            client.handle(ClientEvent::Tick { now: t0 + Duration::from_secs(32) }).unwrap();
        assert!(actions.is_empty());
    }

    #[test]
    fn ticks_while_disconnected_are_quiet() {
        let mut client: RouterClient = RouterClient::new(test_config());
        assert!(client.handle(ClientEvent::Tick { now: Instant::now() }).unwrap().is_empty());
    }

    #[test]
    fn records_flow_into_state_and_notifications() {
        let t0 = Instant::now();
        let mut client = connected_client(t0);

        let actions = client
            .handle(ClientEvent::BytesReceived { data: b".RAD1,Cam A\r.UV1,5\r".to_vec(), now: t0 })
            .unwrap();

        assert_eq!(
            actions,
            vec![
                ClientAction::Notify(RouterEvent::DirectoryChanged {
                    kind: DirectoryKind::Destination,
                    id: 1,
                    name: "Cam A".to_string(),
                }),
                ClientAction::Notify(RouterEvent::CrosspointChanged {
                    level: Level::V,
                    destination: 1,
                    source: 5,
                }),
            ]
        );
        assert_eq!(client.state().source_for(Level::V, 1), Some(5));
    }

    #[test]
    fn fragmented_records_apply_once_complete() {
        let t0 = Instant::now();
        let mut client = connected_client(t0);

        let actions = client
            .handle(ClientEvent::BytesReceived { data: b".UV1,".to_vec(), now: t0 })
            .unwrap();
        assert!(actions.is_empty());

        let actions =
            client.handle(ClientEvent::BytesReceived { data: b"5\r".to_vec(), now: t0 }).unwrap();
        assert_eq!(actions.len(), 1);
        assert_eq!(client.state().source_for(Level::V, 1), Some(5));
    }

    #[test]
    fn power_up_triggers_immediate_refresh() {
        let t0 = Instant::now();
        let mut client = connected_client(t0);

        let actions = client
            .handle(ClientEvent::BytesReceived { data: b".P\r".to_vec(), now: t0 })
            .unwrap();
        assert!(!sent_bytes(&actions).is_empty());
    }

    #[test]
    fn submit_writes_only_while_connected() {
        let mut client: RouterClient = RouterClient::new(test_config());
        let intent = Command::Route { levels: vec![Level::V], destination: 1, source: 5 };

        assert!(client.handle(ClientEvent::Submit(intent.clone())).unwrap().is_empty());

        let t0 = Instant::now();
        let mut client = connected_client(t0);
        let actions = client.handle(ClientEvent::Submit(intent)).unwrap();
        assert_eq!(sent_bytes(&actions), b".SV1,5\r".to_vec());
    }

    #[test]
    fn raw_commands_get_a_terminator_only_if_missing() {
        let t0 = Instant::now();
        let mut client = connected_client(t0);

        let actions =
            client.handle(ClientEvent::Submit(Command::Raw(".IV1".to_string()))).unwrap();
        assert_eq!(sent_bytes(&actions), b".IV1\r".to_vec());

        let actions =
            client.handle(ClientEvent::Submit(Command::Raw(".IV2\r".to_string()))).unwrap();
        assert_eq!(sent_bytes(&actions), b".IV2\r".to_vec());
    }

    #[test]
    fn route_with_no_levels_is_dropped() {
        let t0 = Instant::now();
        let mut client = connected_client(t0);

        let intent = Command::Route { levels: vec![], destination: 1, source: 5 };
        assert!(client.handle(ClientEvent::Submit(intent)).unwrap().is_empty());
    }

    #[test]
    fn close_and_fail_surface_status_and_stop_polling() {
        let t0 = Instant::now();
        let mut client = connected_client(t0);

        let actions = client.handle(ClientEvent::Closed).unwrap();
        assert_eq!(
            actions,
            vec![ClientAction::Notify(RouterEvent::ConnectionChanged(LinkState::Disconnected))]
        );

        // Idempotent teardown: a second close is silent.
        assert!(client.handle(ClientEvent::Closed).unwrap().is_empty());

        // No refresh after teardown, however much time passes.
        let actions =
            client.handle(ClientEvent::Tick { now: t0 + Duration::from_secs(3600) }).unwrap();
        assert!(actions.is_empty());
    }

    #[test]
    fn reconnect_clears_routes_but_keeps_names() {
        let t0 = Instant::now();
        let mut client = connected_client(t0);
        client
            .handle(ClientEvent::BytesReceived { data: b".RAD1,Cam A\r.UV1,5\r".to_vec(), now: t0 })
            .unwrap();

        client.handle(ClientEvent::Failed { reason: "connection reset".to_string() }).unwrap();
        assert_eq!(client.link(), LinkState::Faulted);

        client.handle(ClientEvent::ConnectRequested).unwrap();
        assert_eq!(client.state().destinations().get(&1).map(String::as_str), Some("Cam A"));
        assert_eq!(client.state().source_for(Level::V, 1), None);
    }

    #[test]
    fn stale_fragment_does_not_survive_reconnect() {
        let t0 = Instant::now();
        let mut client = connected_client(t0);
        client
            .handle(ClientEvent::BytesReceived { data: b".RAD1,half".to_vec(), now: t0 })
            .unwrap();

        client.handle(ClientEvent::Closed).unwrap();
        client.handle(ClientEvent::ConnectRequested).unwrap();
        client.handle(ClientEvent::Opened { now: t0 }).unwrap();

        let actions = client
            .handle(ClientEvent::BytesReceived { data: b".RAS1,Mic 1\r".to_vec(), now: t0 })
            .unwrap();
        assert_eq!(
            actions,
            vec![ClientAction::Notify(RouterEvent::DirectoryChanged {
                kind: DirectoryKind::Source,
                id: 1,
                name: "Mic 1".to_string(),
            })]
        );
    }

    #[test]
    fn router_error_is_surfaced_not_fatal() {
        let t0 = Instant::now();
        let mut client = connected_client(t0);

        let actions = client
            .handle(ClientEvent::BytesReceived { data: b".E\r".to_vec(), now: t0 })
            .unwrap();
        assert_eq!(
            actions,
            vec![ClientAction::Notify(RouterEvent::ProtocolError { raw: ".E".to_string() })]
        );
        assert_eq!(client.link(), LinkState::Connected);
    }
}
