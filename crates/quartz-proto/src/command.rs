//! Command string rendering.
//!
//! Pure functions, no state, no I/O. Single-command builders return the
//! command text without the trailing carriage return; the send path appends
//! the terminator. The batch builders (`read_all_names`,
//! `interrogate_all`) expand to one command per addressed id and therefore
//! return wire-ready text with every command terminated.
//!
//! Builders format whatever ids they are given; bounding them against the
//! router's configured capacity is the caller's concern.

use crate::Level;

/// `.RD{id}` — query one destination name.
#[must_use]
pub fn read_destination_name(id: u32) -> String {
    format!(".RD{id}")
}

/// `.RS{id}` — query one source name.
#[must_use]
pub fn read_source_name(id: u32) -> String {
    format!(".RS{id}")
}

/// Render the full name refresh: every destination, then every source.
///
/// `read_all_names(2, 1)` yields `".RD1\r.RD2\r.RS1\r"`.
#[must_use]
pub fn read_all_names(max_destinations: u32, max_sources: u32) -> String {
    let mut wire = String::new();
    for id in 1..=max_destinations {
        wire.push_str(&format!(".RD{id}\r"));
    }
    for id in 1..=max_sources {
        wire.push_str(&format!(".RS{id}\r"));
    }
    wire
}

/// `.S{levels}{dest},{src}` — route a source to a destination on the given
/// planes.
///
/// `levels` must be non-empty; routing on zero planes is not a command the
/// router understands.
#[must_use]
pub fn route(levels: &[Level], destination: u32, source: u32) -> String {
    debug_assert!(!levels.is_empty());
    let tags: String = levels.iter().map(|l| l.as_char()).collect();
    format!(".S{tags}{destination},{source}")
}

/// `.F{id}` — fire a pre-programmed salvo.
#[must_use]
pub fn fire_salvo(id: u32) -> String {
    format!(".F{id}")
}

/// `.BL{dest}` — lock a destination against other controllers.
#[must_use]
pub fn lock_destination(destination: u32) -> String {
    format!(".BL{destination}")
}

/// `.BU{dest}` — release a destination lock.
#[must_use]
pub fn unlock_destination(destination: u32) -> String {
    format!(".BU{destination}")
}

/// `.I{level}{dest}` — ask which source feeds one destination on one plane.
#[must_use]
pub fn interrogate(level: Level, destination: u32) -> String {
    format!(".I{level}{destination}")
}

/// Interrogate every destination on one plane, one command per id.
#[must_use]
pub fn interrogate_all(level: Level, max_destinations: u32) -> String {
    let mut wire = String::new();
    for id in 1..=max_destinations {
        wire.push_str(&format!(".I{level}{id}\r"));
    }
    wire
}

/// `.L{level}{start},-` — request a route listing for a batch of
/// destinations starting at `start` (the router answers up to eight per
/// request).
#[must_use]
pub fn list_routes(level: Level, start: u32) -> String {
    format!(".L{level}{start},-")
}
