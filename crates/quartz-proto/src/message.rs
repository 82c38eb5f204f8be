//! Typed model of router records.
//!
//! Each framed record (leading `.` included, terminator stripped) maps to
//! exactly one [`Message`] variant, classified by structural prefix matching
//! with the most specific prefixes tried first.
//!
//! # Invariants
//!
//! - `parse` is total: malformed router output degrades to
//!   [`Message::Unknown`] rather than erroring, so a noisy or
//!   non-conformant router can never stall the pipeline.
//! - Classification never consults protocol state; the same record always
//!   parses to the same variant.

use crate::Level;

/// One parsed router record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// `.RAD{id},{name}` — a destination directory entry.
    DestinationName {
        /// Destination id (1-based).
        id: u32,
        /// Operator-facing label.
        name: String,
    },

    /// `.RAS{id},{name}` — a source directory entry.
    SourceName {
        /// Source id (1-based).
        id: u32,
        /// Operator-facing label.
        name: String,
    },

    /// `.U{levels}{dest},{src}` — a confirmed crosspoint change.
    ///
    /// Arrives for every route change regardless of origin: this client,
    /// another controller, or an operator panel.
    CrosspointUpdate {
        /// Planes the route applies to, in reported order.
        levels: Vec<Level>,
        /// Destination id.
        destination: u32,
        /// Source id now feeding the destination.
        source: u32,
    },

    /// `.BA{dest},{code}` — destination lock status.
    LockStatus {
        /// Destination id.
        destination: u32,
        /// Decoded lock state.
        lock: LockState,
    },

    /// `.A{data}` — command acknowledgment.
    ///
    /// Interrogate and list replies pack their answer into `data`; see
    /// [`parse_ack_groups`].
    Acknowledge {
        /// Everything after the prefix; empty when the router acknowledged
        /// without data.
        data: String,
    },

    /// `.E{...}` — explicit error notification from the router.
    Error {
        /// The record verbatim.
        raw: String,
    },

    /// `.P{...}` — the router restarted and may have lost session state.
    PowerUp,

    /// Anything else, kept verbatim for diagnostics.
    Unknown {
        /// The record verbatim.
        raw: String,
    },
}

/// Decoded `.BA` status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LockState {
    /// Destination is not locked.
    Unlocked,
    /// Locked by the panel at the given address.
    LockedBy {
        /// Panel address (wire code minus one).
        panel: u8,
    },
    /// Locked with no owning panel; any controller may release it.
    Unprotected,
}

impl LockState {
    /// Decode the wire status code: 0 unlocked, 1-254 locked by panel at
    /// `code - 1`, 255 unprotected. Anything else has no meaning.
    #[must_use]
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(Self::Unlocked),
            1..=254 => Some(Self::LockedBy { panel: (code - 1) as u8 }),
            255 => Some(Self::Unprotected),
            _ => None,
        }
    }
}

impl Message {
    /// Classify one framed record.
    ///
    /// Prefix priority: `.RAD`, `.RAS`, `.U`, `.BA`, `.A`, `.E`, `.P`, then
    /// [`Message::Unknown`]. A well-prefixed record whose fields fail to
    /// parse is reclassified `Unknown` instead of surfacing an error.
    #[must_use]
    pub fn parse(record: &str) -> Self {
        if let Some(rest) = record.strip_prefix(".RAD") {
            parse_name(rest).map_or_else(
                || Self::unknown(record),
                |(id, name)| Self::DestinationName { id, name },
            )
        } else if let Some(rest) = record.strip_prefix(".RAS") {
            parse_name(rest)
                .map_or_else(|| Self::unknown(record), |(id, name)| Self::SourceName { id, name })
        } else if let Some(rest) = record.strip_prefix(".U") {
            parse_crosspoint(rest).map_or_else(
                || Self::unknown(record),
                |(levels, destination, source)| Self::CrosspointUpdate {
                    levels,
                    destination,
                    source,
                },
            )
        } else if let Some(rest) = record.strip_prefix(".BA") {
            parse_lock(rest).map_or_else(
                || Self::unknown(record),
                |(destination, lock)| Self::LockStatus { destination, lock },
            )
        } else if let Some(rest) = record.strip_prefix(".A") {
            Self::Acknowledge { data: rest.to_string() }
        } else if record.starts_with(".E") {
            Self::Error { raw: record.to_string() }
        } else if record.starts_with(".P") {
            Self::PowerUp
        } else {
            Self::unknown(record)
        }
    }

    fn unknown(record: &str) -> Self {
        Self::Unknown { raw: record.to_string() }
    }
}

/// One `{level}{destination},{source}` group recovered from acknowledge
/// data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrosspointAssignment {
    /// Plane the route applies to.
    pub level: Level,
    /// Destination id.
    pub destination: u32,
    /// Source id now feeding the destination.
    pub source: u32,
}

/// Scan acknowledge data for concatenated crosspoint groups.
///
/// Interrogate and list replies pack `{level}{destination},{source}` groups
/// back to back with no separator; the next group's level tag doubles as
/// the boundary. Scanning is greedy left to right and stops at the first
/// position that cannot start a group. A numeric parse failure abandons the
/// remainder but keeps every group already recovered.
#[must_use]
pub fn parse_ack_groups(data: &str) -> Vec<CrosspointAssignment> {
    let mut groups = Vec::new();
    let mut rest = data;

    while let Some(c) = rest.chars().next() {
        let Some(level) = Level::from_char(c) else { break };
        rest = &rest[c.len_utf8()..];

        let Some((dest_digits, tail)) = rest.split_once(',') else { break };
        let Ok(destination) = dest_digits.parse::<u32>() else { break };

        // Source digits run until the next level tag or end of data.
        let src_end = tail.find(|ch| Level::from_char(ch).is_some()).unwrap_or(tail.len());
        let Ok(source) = tail[..src_end].parse::<u32>() else { break };

        groups.push(CrosspointAssignment { level, destination, source });
        rest = &tail[src_end..];
    }
    groups
}

/// Split `{id},{name}` out of a name-response body.
fn parse_name(rest: &str) -> Option<(u32, String)> {
    let (id, name) = rest.split_once(',')?;
    Some((id.parse().ok()?, name.to_string()))
}

/// Split `{dest},{code}` out of a lock-status body.
fn parse_lock(rest: &str) -> Option<(u32, LockState)> {
    let (destination, code) = rest.split_once(',')?;
    Some((destination.parse().ok()?, LockState::from_code(code.parse().ok()?)?))
}

/// Split `{levels}{dest},{src}` out of a crosspoint-update body.
///
/// The level run is the maximal leading run of alphabet characters; it must
/// be non-empty and followed by `{dest},{src}`. Levels reported out of
/// canonical order still stop the scan at the first non-level character.
fn parse_crosspoint(rest: &str) -> Option<(Vec<Level>, u32, u32)> {
    let (levels, tail) = split_level_run(rest);
    if levels.is_empty() {
        return None;
    }
    let (destination, source) = tail.split_once(',')?;
    Some((levels, destination.parse().ok()?, source.parse().ok()?))
}

/// Consume the maximal leading run of level tags.
fn split_level_run(s: &str) -> (Vec<Level>, &str) {
    let mut levels = Vec::new();
    let mut rest = s;
    while let Some(level) = rest.chars().next().and_then(Level::from_char) {
        levels.push(level);
        rest = &rest[1..];
    }
    (levels, rest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destination_name() {
        assert_eq!(
            Message::parse(".RAD1,Cam A"),
            Message::DestinationName { id: 1, name: "Cam A".to_string() }
        );
    }

    #[test]
    fn source_name() {
        assert_eq!(
            Message::parse(".RAS12,Mic 1"),
            Message::SourceName { id: 12, name: "Mic 1".to_string() }
        );
    }

    #[test]
    fn name_keeps_commas_after_the_first() {
        assert_eq!(
            Message::parse(".RAD3,VTR 1, left"),
            Message::DestinationName { id: 3, name: "VTR 1, left".to_string() }
        );
    }

    #[test]
    fn name_without_comma_degrades_to_unknown() {
        assert_eq!(Message::parse(".RAD1"), Message::Unknown { raw: ".RAD1".to_string() });
    }

    #[test]
    fn single_level_crosspoint_update() {
        assert_eq!(
            Message::parse(".UV1,5"),
            Message::CrosspointUpdate { levels: vec![Level::V], destination: 1, source: 5 }
        );
    }

    #[test]
    fn multi_level_crosspoint_update() {
        assert_eq!(
            Message::parse(".UVA1,5"),
            Message::CrosspointUpdate {
                levels: vec![Level::V, Level::A],
                destination: 1,
                source: 5
            }
        );
    }

    #[test]
    fn crosspoint_without_levels_degrades_to_unknown() {
        assert_eq!(Message::parse(".U1,5"), Message::Unknown { raw: ".U1,5".to_string() });
    }

    #[test]
    fn crosspoint_without_comma_degrades_to_unknown() {
        assert_eq!(Message::parse(".UV15"), Message::Unknown { raw: ".UV15".to_string() });
    }

    #[test]
    fn lock_status_codes() {
        assert_eq!(
            Message::parse(".BA1,0"),
            Message::LockStatus { destination: 1, lock: LockState::Unlocked }
        );
        assert_eq!(
            Message::parse(".BA1,5"),
            Message::LockStatus { destination: 1, lock: LockState::LockedBy { panel: 4 } }
        );
        assert_eq!(
            Message::parse(".BA7,255"),
            Message::LockStatus { destination: 7, lock: LockState::Unprotected }
        );
    }

    #[test]
    fn lock_code_out_of_range_degrades_to_unknown() {
        assert_eq!(Message::parse(".BA1,300"), Message::Unknown { raw: ".BA1,300".to_string() });
    }

    #[test]
    fn acknowledge_with_and_without_data() {
        assert_eq!(Message::parse(".A"), Message::Acknowledge { data: String::new() });
        assert_eq!(
            Message::parse(".AV1,5"),
            Message::Acknowledge { data: "V1,5".to_string() }
        );
    }

    #[test]
    fn error_and_power_up() {
        assert_eq!(Message::parse(".E"), Message::Error { raw: ".E".to_string() });
        assert_eq!(Message::parse(".E42"), Message::Error { raw: ".E42".to_string() });
        assert_eq!(Message::parse(".P"), Message::PowerUp);
        assert_eq!(Message::parse(".POWER"), Message::PowerUp);
    }

    #[test]
    fn unrecognized_prefix_is_unknown() {
        assert_eq!(Message::parse(".X1,2"), Message::Unknown { raw: ".X1,2".to_string() });
        assert_eq!(Message::parse("."), Message::Unknown { raw: ".".to_string() });
    }

    #[test]
    fn ack_groups_two_entries() {
        let groups = parse_ack_groups("V001,005V002,003");
        assert_eq!(
            groups,
            vec![
                CrosspointAssignment { level: Level::V, destination: 1, source: 5 },
                CrosspointAssignment { level: Level::V, destination: 2, source: 3 },
            ]
        );
    }

    #[test]
    fn ack_groups_mixed_levels() {
        let groups = parse_ack_groups("V1,5A2,3");
        assert_eq!(
            groups,
            vec![
                CrosspointAssignment { level: Level::V, destination: 1, source: 5 },
                CrosspointAssignment { level: Level::A, destination: 2, source: 3 },
            ]
        );
    }

    #[test]
    fn ack_groups_stop_at_non_level_prefix() {
        assert!(parse_ack_groups("no data").is_empty());
        assert!(parse_ack_groups("").is_empty());
    }

    #[test]
    fn ack_groups_keep_parsed_prefix_on_numeric_failure() {
        let groups = parse_ack_groups("V001,005Vxx,003");
        assert_eq!(
            groups,
            vec![CrosspointAssignment { level: Level::V, destination: 1, source: 5 }]
        );
    }
}
