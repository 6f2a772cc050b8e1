use crate::relay::Frame;

/// Incremental parser for the relay's record stream.
///
/// Records are separated by a blank line and only `data:` records
/// carry a frame; comments and keep-alives fall through. Feeding
/// arbitrary network chunks is safe: a partial record, or a UTF-8
/// sequence split across reads, stays buffered until its record
/// completes.
#[derive(Default)]
pub struct FrameParser {
    buffer: Vec<u8>,
}

impl FrameParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one chunk and return the frames it completed, in
    /// stream order. Malformed records are skipped, never fatal.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Frame> {
        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        while let Some(record_end) = self.buffer.windows(2).position(|w| w == b"\n\n") {
            let record: Vec<u8> = self.buffer.drain(..record_end + 2).collect();
            let record = String::from_utf8_lossy(&record[..record_end]);

            let Some(payload) = record.trim().strip_prefix("data:") else {
                continue;
            };
            if let Some(frame) = Frame::parse(payload) {
                frames.push(frame);
            }
        }
        frames
    }
}
