//! Record reassembly for the router byte stream.
//!
//! Quartz records have no length prefix: each one starts at a `.` delimiter
//! and ends at a carriage return. TCP may split a record anywhere (including
//! mid-field) or pack several into one segment, so the framer owns the
//! partial-input buffer and turns an arbitrary chunking of the stream back
//! into whole records.
//!
//! Records are decoded one byte per `char` (Latin-1 style) rather than as
//! UTF-8: the protocol is 8-bit clean and name payloads may carry bytes in
//! the 0x80-0xFF range that must survive unmodified.

use bytes::BytesMut;

/// Record terminator byte (carriage return).
pub const TERMINATOR: u8 = 0x0D;

/// Record start delimiter.
pub const DELIMITER: u8 = b'.';

/// Reassembles delimiter-terminated records from raw byte chunks.
///
/// # Invariants
///
/// - Emission order matches arrival order; the framer never reorders.
/// - Feeding a record in one chunk or split at every byte boundary yields
///   the same emitted sequence.
/// - After [`RecordFramer::reset`], no residue from earlier chunks can
///   prefix the next record.
#[derive(Debug, Default)]
pub struct RecordFramer {
    buf: BytesMut,
}

impl RecordFramer {
    /// Create an empty framer.
    #[must_use]
    pub fn new() -> Self {
        Self { buf: BytesMut::new() }
    }

    /// Append a chunk and drain every record it completes.
    ///
    /// Each candidate runs from the buffer start to the next terminator
    /// (excluded), then is trimmed to its *last* `.` so stray bytes ahead of
    /// the real start are discarded. Candidates that are empty or contain no
    /// delimiter at all cannot be protocol messages and are dropped
    /// silently; an unterminated tail stays buffered for the next chunk.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);

        let mut records = Vec::new();
        while let Some(end) = self.buf.iter().position(|&b| b == TERMINATOR) {
            let candidate = self.buf.split_to(end + 1);
            let candidate = &candidate[..end];

            if let Some(start) = candidate.iter().rposition(|&b| b == DELIMITER) {
                records.push(decode_text(&candidate[start..]));
            }
        }
        records
    }

    /// Drop all buffered partial input without emitting anything.
    ///
    /// Called on every new connection attempt: a fragment left over from the
    /// previous session must never corrupt the next session's first record.
    pub fn reset(&mut self) {
        self.buf.clear();
    }

    /// Number of bytes buffered waiting for a terminator.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}

/// Decode record bytes one-to-one into a `String`.
fn decode_text(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Encode command text back into wire bytes, one byte per character.
///
/// The inverse of record decoding. Characters above 0xFF cannot appear in
/// builder output; if caller-supplied raw text carries one it is replaced
/// with `?` instead of being expanded to multi-byte UTF-8.
#[must_use]
pub fn encode_text(text: &str) -> Vec<u8> {
    text.chars().map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?')).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_record_in_one_chunk() {
        let mut framer = RecordFramer::new();
        assert_eq!(framer.push(b".RAD1,Cam A\r"), vec![".RAD1,Cam A"]);
        assert_eq!(framer.pending(), 0);
    }

    #[test]
    fn record_split_across_chunks() {
        let mut framer = RecordFramer::new();
        assert!(framer.push(b".RAD1,C").is_empty());
        assert!(framer.push(b"am ").is_empty());
        assert_eq!(framer.push(b"A\r"), vec![".RAD1,Cam A"]);
    }

    #[test]
    fn multiple_records_in_one_chunk() {
        let mut framer = RecordFramer::new();
        let records = framer.push(b".UV1,5\r.UV2,3\r.A\r");
        assert_eq!(records, vec![".UV1,5", ".UV2,3", ".A"]);
    }

    #[test]
    fn trims_noise_before_last_delimiter() {
        let mut framer = RecordFramer::new();
        assert_eq!(framer.push(b"garbage.UV1,5\r"), vec![".UV1,5"]);
    }

    #[test]
    fn keeps_partial_tail_after_complete_record() {
        let mut framer = RecordFramer::new();
        assert_eq!(framer.push(b".UV1,5\r.UV2"), vec![".UV1,5"]);
        assert_eq!(framer.push(b",3\r"), vec![".UV2,3"]);
    }

    #[test]
    fn drops_empty_records() {
        let mut framer = RecordFramer::new();
        assert!(framer.push(b"\r\r\r").is_empty());
    }

    #[test]
    fn drops_records_without_delimiter() {
        let mut framer = RecordFramer::new();
        assert!(framer.push(b"not a message\r").is_empty());
    }

    #[test]
    fn reset_discards_buffered_fragment() {
        let mut framer = RecordFramer::new();
        assert!(framer.push(b".RAD1,half a na").is_empty());
        framer.reset();
        assert_eq!(framer.pending(), 0);
        assert_eq!(framer.push(b".UV1,5\r"), vec![".UV1,5"]);
    }

    #[test]
    fn high_bytes_survive_decoding() {
        let mut framer = RecordFramer::new();
        let records = framer.push(b".RAD1,Caf\xe9\r");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].chars().last(), Some('\u{e9}'));
        assert_eq!(encode_text(&records[0]), b".RAD1,Caf\xe9");
    }

    #[test]
    fn encode_replaces_characters_outside_byte_range() {
        assert_eq!(encode_text(".RD\u{263a}1"), b".RD?1");
    }
}
