//! Fuzz target for record classification totality
//!
//! Malformed router output must degrade to `Unknown`, never panic or error:
//! the link is long-lived and unattended, so a single bad record killing
//! the pipeline is the worst failure mode this client has
//!
//! # Strategy
//!
//! - Arbitrary strings, plus variants steered toward real prefixes with
//!   corrupted field bodies
//!
//! # Invariants
//!
//! - `Message::parse` never panics
//! - `parse_ack_groups` never panics and never emits a group it did not
//!   fully parse

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use quartz_proto::{Message, parse_ack_groups};

#[derive(Debug, Arbitrary)]
enum ParseInput {
    Raw(String),
    Prefixed { prefix: u8, body: String },
    AckData(String),
}

const PREFIXES: [&str; 8] = [".RAD", ".RAS", ".U", ".BA", ".A", ".E", ".P", "."];

fuzz_target!(|input: ParseInput| {
    match input {
        ParseInput::Raw(raw) => {
            let _ = Message::parse(&raw);
        }
        ParseInput::Prefixed { prefix, body } => {
            let record = format!("{}{body}", PREFIXES[usize::from(prefix) % PREFIXES.len()]);
            let _ = Message::parse(&record);
        }
        ParseInput::AckData(data) => {
            let _ = parse_ack_groups(&data);
        }
    }
});
