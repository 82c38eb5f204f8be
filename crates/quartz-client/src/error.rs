//! Engine error types.
//!
//! Malformed router input never surfaces here — the interpreter degrades it
//! to `Unknown` and the pipeline continues. Errors are reserved for driver
//! misuse and configuration problems the caller must act on.

use thiserror::Error;

use crate::client::LinkState;

/// Errors returned by [`crate::RouterClient::handle`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Connect refused: the configured host is empty.
    #[error("refusing to connect: configured host is empty")]
    EmptyHost,

    /// An event arrived that is invalid for the current link state.
    #[error("unexpected {event} in link state {link:?}")]
    UnexpectedEvent {
        /// Link state when the event arrived.
        link: LinkState,
        /// Description of the offending event.
        event: &'static str,
    },
}
