//! Control-plane client engine for Quartz routing switchers.
//!
//! The engine follows the Sans-IO and action-based patterns: the caller
//! feeds [`ClientEvent`]s into [`RouterClient::handle`], which processes
//! them through pure state machine logic and returns [`ClientAction`]s to
//! execute. All protocol state — the framer buffer, the directories, the
//! crosspoint and lock tables, the link state — lives behind one engine
//! instance and is mutated only through `handle`, so records are applied
//! strictly in arrival order.
//!
//! # Components
//!
//! - [`RouterClient`]: engine state machine (framing, interpretation,
//!   state application, poll scheduling, command dispatch)
//! - [`RouterState`]: directories, crosspoint table, lock table
//! - [`RouterConfig`]: static configuration from the integration layer
//! - [`RouterEvent`]: typed notifications delivered outward
//!
//! # Transport (optional)
//!
//! With the `transport` feature enabled, this crate also provides:
//! - [`transport::ConnectedRouter`]: TCP byte bridging over channels
//! - [`session::Session`]: async driver owning the engine, the socket, and
//!   the tick interval

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod client;
mod config;
mod error;
mod event;
mod state;

#[cfg(feature = "transport")]
pub mod session;
#[cfg(feature = "transport")]
pub mod transport;

pub use client::{LinkState, RouterClient};
pub use config::RouterConfig;
pub use error::ClientError;
pub use event::{ClientAction, ClientEvent, Command, RouterEvent};
pub use quartz_proto::{Level, LockState};
pub use state::{DirectoryKind, RouterState};
