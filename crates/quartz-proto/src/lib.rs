//! Wire layer for the Quartz router control protocol.
//!
//! Quartz is a line-oriented ASCII control protocol spoken by broadcast
//! routing switchers: every record starts at a `.` delimiter, ends at a
//! carriage return, and the TCP stream fragments or coalesces records
//! arbitrarily. This crate owns everything below the session:
//!
//! - [`Level`]: the sixteen-tag signal-plane alphabet
//! - [`RecordFramer`]: partial-input buffering and record reassembly
//! - [`Message`]: record classification into a closed set of typed variants
//! - [`command`]: stateless command string rendering
//!
//! No I/O happens here. The engine crate feeds received bytes in and writes
//! rendered commands out; both directions are 8-bit clean (payload bytes
//! 0x80-0xFF pass through unmodified).

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod command;
mod framer;
mod level;
mod message;

pub use framer::{DELIMITER, RecordFramer, TERMINATOR, encode_text};
pub use level::Level;
pub use message::{CrosspointAssignment, LockState, Message, parse_ack_groups};
