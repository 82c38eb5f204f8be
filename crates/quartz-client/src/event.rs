//! Engine events, actions, and outbound notifications.

use quartz_proto::{Level, LockState};

use crate::{client::LinkState, state::DirectoryKind};

/// Events the driver feeds into the engine.
///
/// The driver is responsible for dialing the socket, reading chunks, and
/// ticking time forward; the engine only sees these events and never blocks.
///
/// Generic over `I` (Instant type) so tests can drive virtual time.
#[derive(Debug, Clone)]
pub enum ClientEvent<I = std::time::Instant> {
    /// The integration layer asked for a (re)connect.
    ///
    /// Session-scoped state (framer buffer, crosspoint and lock tables) is
    /// cleared before the driver dials; retained directories survive.
    ConnectRequested,

    /// The transport finished dialing; the socket is open.
    Opened {
        /// Current time, arms the poll clock.
        now: I,
    },

    /// Raw bytes arrived from the socket, chunked however TCP delivered
    /// them.
    BytesReceived {
        /// The chunk, verbatim.
        data: Vec<u8>,
        /// Arrival time, so a power-up notification can re-arm the poll
        /// clock when it triggers an immediate refresh.
        now: I,
    },

    /// Periodic tick driving poll scheduling.
    Tick {
        /// Current time from the driver.
        now: I,
    },

    /// The socket closed in an orderly fashion (peer EOF or local
    /// teardown).
    Closed,

    /// The transport failed: dial error or mid-session I/O error.
    Failed {
        /// Driver-supplied description of the failure.
        reason: String,
    },

    /// The integration layer submitted a command.
    Submit(Command),
}

/// Actions the engine returns for the driver to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientAction {
    /// Write these bytes to the socket (terminator already appended).
    Send(Vec<u8>),

    /// Deliver a notification to the integration layer.
    Notify(RouterEvent),
}

/// Command intents accepted from the integration layer.
///
/// Parameterized variants render through the command builder using the
/// configured maxima where a sweep is involved; [`Command::Raw`] passes
/// pre-built text through untouched apart from terminator handling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Query one destination name.
    ReadDestinationName {
        /// Destination id.
        id: u32,
    },

    /// Query one source name.
    ReadSourceName {
        /// Source id.
        id: u32,
    },

    /// Query every name within the configured maxima.
    ReadAllNames,

    /// Route a source to a destination on the given planes.
    ///
    /// This is the commit half of the arm-then-fire ("take") pattern: the
    /// integration layer keeps its own selected/pending scalars and submits
    /// the final route here.
    Route {
        /// Planes to switch together.
        levels: Vec<Level>,
        /// Destination id.
        destination: u32,
        /// Source id.
        source: u32,
    },

    /// Fire a pre-programmed salvo.
    FireSalvo {
        /// Salvo id.
        id: u32,
    },

    /// Lock a destination against other controllers.
    Lock {
        /// Destination id.
        destination: u32,
    },

    /// Release a destination lock.
    Unlock {
        /// Destination id.
        destination: u32,
    },

    /// Ask which source feeds one destination on one plane.
    Interrogate {
        /// Plane to query.
        level: Level,
        /// Destination id.
        destination: u32,
    },

    /// Interrogate every destination on one plane.
    InterrogateAll {
        /// Plane to query.
        level: Level,
    },

    /// Request a batch route listing starting at the given destination.
    ListRoutes {
        /// Plane to list.
        level: Level,
        /// First destination of the batch.
        start: u32,
    },

    /// Pre-built command text, sent as-is with the terminator appended if
    /// missing.
    Raw(String),
}

/// Typed notifications delivered to the integration layer.
///
/// This is the engine's entire outbound surface; consumers subscribe to
/// these instead of reaching into the state store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouterEvent {
    /// A directory entry was created or relabeled.
    ///
    /// Suppressed when a periodic refresh re-reports an unchanged name.
    DirectoryChanged {
        /// Which directory.
        kind: DirectoryKind,
        /// Entry id.
        id: u32,
        /// New label.
        name: String,
    },

    /// A crosspoint was set.
    ///
    /// Emitted for every confirmed route, including re-confirmations of the
    /// current source: the stream doubles as an audit trail of route
    /// activity from every controller on the router.
    CrosspointChanged {
        /// Plane that switched.
        level: Level,
        /// Destination id.
        destination: u32,
        /// Source id now feeding the destination.
        source: u32,
    },

    /// A destination lock changed hands.
    LockChanged {
        /// Destination id.
        destination: u32,
        /// New lock state.
        lock: LockState,
    },

    /// The connection lifecycle moved to a new state.
    ConnectionChanged(LinkState),

    /// The router reported an explicit error record.
    ///
    /// Typically means a configured maximum exceeds the router's capacity.
    /// Non-fatal; the connection stays open.
    ProtocolError {
        /// The record or diagnostic verbatim.
        raw: String,
    },
}
