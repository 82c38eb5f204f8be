//! Authoritative in-memory model of the router's addressable state.
//!
//! The store holds the destination/source directories, the crosspoint
//! table, and the lock table, and applies interpreted messages as state
//! transitions. It is owned exclusively by the engine: external code reads
//! snapshots or receives change notifications, never mutates.
//!
//! # Invariants
//!
//! - A (level, destination) pair has at most one current source; absence
//!   means "unknown", never "source 0".
//! - The crosspoint table only reflects confirmed router records — it is
//!   never mutated speculatively when a command is sent.
//! - Directory change notifications are deduplicated; crosspoint
//!   notifications are not (they double as an audit trail).

use std::collections::BTreeMap;

use quartz_proto::{CrosspointAssignment, Level, LockState, Message, parse_ack_groups};

use crate::event::RouterEvent;

/// Which directory an entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectoryKind {
    /// Router outputs.
    Destination,
    /// Router inputs.
    Source,
}

/// Sentinel id meaning "no data received yet for this directory".
const SENTINEL_ID: u32 = 0;

/// Directories, crosspoint table, and lock table.
#[derive(Debug)]
pub struct RouterState {
    destinations: BTreeMap<u32, String>,
    sources: BTreeMap<u32, String>,
    crosspoints: BTreeMap<Level, BTreeMap<u32, u32>>,
    locks: BTreeMap<u32, LockState>,
}

impl RouterState {
    /// Placeholder entry shown while no destination name has arrived.
    pub const NO_DESTINATIONS_LABEL: &'static str = "No Destinations Loaded";

    /// Placeholder entry shown while no source name has arrived.
    pub const NO_SOURCES_LABEL: &'static str = "No Sources Loaded";

    /// Create a store holding only the sentinel directory entries.
    #[must_use]
    pub fn new() -> Self {
        let mut destinations = BTreeMap::new();
        destinations.insert(SENTINEL_ID, Self::NO_DESTINATIONS_LABEL.to_string());
        let mut sources = BTreeMap::new();
        sources.insert(SENTINEL_ID, Self::NO_SOURCES_LABEL.to_string());

        Self { destinations, sources, crosspoints: BTreeMap::new(), locks: BTreeMap::new() }
    }

    /// Clear session-scoped state for a new connection attempt.
    ///
    /// Crosspoints and locks are dropped — stale routes must not be
    /// displayed while re-interrogation is in flight. Directories are
    /// retained: names are stable labels that survive reconnects.
    pub fn clear_session(&mut self) {
        self.crosspoints.clear();
        self.locks.clear();
    }

    /// Apply one interpreted message and report the resulting changes.
    pub fn apply(&mut self, message: &Message) -> Vec<RouterEvent> {
        match message {
            Message::DestinationName { id, name } => {
                self.upsert_name(DirectoryKind::Destination, *id, name)
            }
            Message::SourceName { id, name } => self.upsert_name(DirectoryKind::Source, *id, name),
            Message::CrosspointUpdate { levels, destination, source } => levels
                .iter()
                .map(|&level| {
                    self.assign(CrosspointAssignment {
                        level,
                        destination: *destination,
                        source: *source,
                    })
                })
                .collect(),
            Message::Acknowledge { data } => {
                parse_ack_groups(data).into_iter().map(|group| self.assign(group)).collect()
            }
            Message::LockStatus { destination, lock } => {
                self.locks.insert(*destination, *lock);
                vec![RouterEvent::LockChanged { destination: *destination, lock: *lock }]
            }
            Message::Error { raw } => vec![RouterEvent::ProtocolError { raw: raw.clone() }],
            Message::PowerUp | Message::Unknown { .. } => vec![],
        }
    }

    /// Current name for an id, or a synthesized fallback.
    #[must_use]
    pub fn directory_name(&self, kind: DirectoryKind, id: u32) -> String {
        if id != SENTINEL_ID
            && let Some(name) = self.directory(kind).get(&id)
        {
            return name.clone();
        }
        match kind {
            DirectoryKind::Destination => format!("Dest {id}"),
            DirectoryKind::Source => format!("Src {id}"),
        }
    }

    /// Destination directory snapshot.
    #[must_use]
    pub fn destinations(&self) -> &BTreeMap<u32, String> {
        &self.destinations
    }

    /// Source directory snapshot.
    #[must_use]
    pub fn sources(&self) -> &BTreeMap<u32, String> {
        &self.sources
    }

    /// Crosspoint table snapshot.
    #[must_use]
    pub fn crosspoints(&self) -> &BTreeMap<Level, BTreeMap<u32, u32>> {
        &self.crosspoints
    }

    /// Lock table snapshot.
    #[must_use]
    pub fn locks(&self) -> &BTreeMap<u32, LockState> {
        &self.locks
    }

    /// Source currently feeding a destination on a plane, if observed.
    #[must_use]
    pub fn source_for(&self, level: Level, destination: u32) -> Option<u32> {
        self.crosspoints.get(&level)?.get(&destination).copied()
    }

    fn directory(&self, kind: DirectoryKind) -> &BTreeMap<u32, String> {
        match kind {
            DirectoryKind::Destination => &self.destinations,
            DirectoryKind::Source => &self.sources,
        }
    }

    fn upsert_name(&mut self, kind: DirectoryKind, id: u32, name: &str) -> Vec<RouterEvent> {
        let table = match kind {
            DirectoryKind::Destination => &mut self.destinations,
            DirectoryKind::Source => &mut self.sources,
        };

        // First real entry evicts the sentinel rather than merging with it.
        if id != SENTINEL_ID {
            table.remove(&SENTINEL_ID);
        }

        let changed = table.get(&id).map(String::as_str) != Some(name);
        table.insert(id, name.to_string());

        if changed {
            vec![RouterEvent::DirectoryChanged { kind, id, name: name.to_string() }]
        } else {
            vec![]
        }
    }

    fn assign(&mut self, group: CrosspointAssignment) -> RouterEvent {
        self.crosspoints.entry(group.level).or_default().insert(group.destination, group.source);

        RouterEvent::CrosspointChanged {
            level: group.level,
            destination: group.destination,
            source: group.source,
        }
    }
}

impl Default for RouterState {
    fn default() -> Self {
        Self::new()
    }
}
