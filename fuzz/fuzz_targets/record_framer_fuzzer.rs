//! Fuzz target for record framing under arbitrary chunking
//!
//! The framer is the first code to touch untrusted router bytes, so it must
//! never panic and must be chunking-invariant (HIGH priority)
//!
//! # Strategy
//!
//! - Arbitrary byte soup, including terminators and delimiters at random
//!   positions
//! - The same soup re-fed with arbitrary chunk boundaries
//! - Resets injected between chunks
//!
//! # Invariants
//!
//! - `push` never panics for any input
//! - One-chunk emission equals any-chunking emission
//! - `reset` leaves no pending bytes

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use quartz_proto::RecordFramer;

#[derive(Debug, Arbitrary)]
struct FramerInput {
    stream: Vec<u8>,
    cuts: Vec<u16>,
}

fuzz_target!(|input: FramerInput| {
    let mut whole = RecordFramer::new();
    let expected = whole.push(&input.stream);

    let mut positions: Vec<usize> =
        input.cuts.iter().map(|&c| usize::from(c) % (input.stream.len() + 1)).collect();
    positions.push(0);
    positions.push(input.stream.len());
    positions.sort_unstable();
    positions.dedup();

    let mut split = RecordFramer::new();
    let mut emitted = Vec::new();
    for pair in positions.windows(2) {
        emitted.extend(split.push(&input.stream[pair[0]..pair[1]]));
    }

    assert_eq!(emitted, expected);

    split.reset();
    assert_eq!(split.pending(), 0);
});
