//! Engine configuration.

use std::time::Duration;

use quartz_proto::Level;
use serde::{Deserialize, Serialize};

/// Static configuration supplied by the integration layer.
///
/// The engine never mutates its configuration; re-applying changed settings
/// means building a fresh [`crate::RouterClient`] and connecting again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Router hostname or address. Connecting with an empty host is refused.
    pub host: String,

    /// TCP port. Routers conventionally listen on the telnet port.
    pub port: u16,

    /// Highest destination id covered by name refresh and interrogation.
    ///
    /// Setting this above the router's real capacity provokes `.E` records;
    /// those are surfaced as diagnostics, not failures.
    pub max_destinations: u32,

    /// Highest source id covered by name refresh.
    pub max_sources: u32,

    /// Seconds between periodic full refreshes while connected.
    ///
    /// Live updates arrive independently as unsolicited crosspoint records;
    /// polling only covers notifications lost on the wire.
    pub poll_interval_secs: u64,

    /// Signal planes interrogated by the connect-time and periodic refresh.
    pub levels: Vec<Level>,

    /// Log unknown records and acknowledge chatter.
    pub verbose: bool,
}

impl RouterConfig {
    /// Poll interval as a [`Duration`].
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 23,
            max_destinations: 32,
            max_sources: 32,
            poll_interval_secs: 30,
            levels: vec![Level::V],
            verbose: false,
        }
    }
}
