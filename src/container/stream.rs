//! Docker multiplexed stream demultiplexing.
//!
//! When a command runs without a TTY, Docker interleaves its stdout and stderr
//! into a single byte stream made of frames:
//!
//! ```text
//! +--------+-----------+------------------------+-----------------+
//! | tag u8 | 3 × 0x00  | payload length u32 BE  | payload bytes   |
//! +--------+-----------+------------------------+-----------------+
//! ```
//!
//! Tag `1` is stdout and tag `2` is stderr. Any other tag is dropped.

/// Size of a frame header in bytes.
pub const HEADER_LEN: usize = 8;

/// Stream identifier carried in the first byte of a frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    /// Standard input (echoed back by some daemons)
    Stdin,
    /// Standard output
    Stdout,
    /// Standard error
    Stderr,
}

impl StreamKind {
    /// Map a frame tag to its stream, `None` for unknown tags.
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(StreamKind::Stdin),
            1 => Some(StreamKind::Stdout),
            2 => Some(StreamKind::Stderr),
            _ => None,
        }
    }
}

/// Output split back into its two streams.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DemuxedOutput {
    /// Concatenated stdout payloads in frame order
    pub stdout: Vec<u8>,
    /// Concatenated stderr payloads in frame order
    pub stderr: Vec<u8>,
}

impl DemuxedOutput {
    /// Stdout decoded lossily as UTF-8.
    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    /// Stderr decoded lossily as UTF-8.
    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// Split a complete multiplexed buffer into stdout and stderr.
///
/// Scanning stops at the first frame whose header or payload does not fit in
/// the remaining bytes; the incomplete tail is ignored.
pub fn demultiplex(bytes: &[u8]) -> DemuxedOutput {
    let mut output = DemuxedOutput::default();
    let mut offset = 0;

    while let Some((kind, payload)) = next_frame(&bytes[offset..]) {
        offset += HEADER_LEN + payload.len();
        append(&mut output, kind, payload);
    }

    output
}

/// Heuristic check for whether `bytes` starts with a multiplexed frame header.
pub fn is_multiplexed(bytes: &[u8]) -> bool {
    bytes.len() >= HEADER_LEN && bytes[0] <= 2 && bytes[1..4] == [0, 0, 0]
}

/// Incremental demultiplexer for output that arrives in chunks.
///
/// Chunk boundaries may fall anywhere, including inside a frame header.
#[derive(Debug, Default)]
pub struct StreamDemuxer {
    pending: Vec<u8>,
    output: DemuxedOutput,
}

impl StreamDemuxer {
    /// Create an empty demultiplexer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next chunk of raw bytes.
    pub fn push(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);

        let mut consumed = 0;
        while let Some((kind, payload)) = next_frame(&self.pending[consumed..]) {
            let frame_len = HEADER_LEN + payload.len();
            append(&mut self.output, kind, payload);
            consumed += frame_len;
        }

        self.pending.drain(..consumed);
    }

    /// Number of buffered bytes that do not yet form a complete frame.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Return everything demultiplexed so far, discarding any partial frame.
    pub fn finish(self) -> DemuxedOutput {
        self.output
    }
}

/// Parse one frame from the front of `bytes`.
///
/// Returns the raw tag so unknown streams can still be skipped.
fn next_frame(bytes: &[u8]) -> Option<(u8, &[u8])> {
    if bytes.len() < HEADER_LEN {
        return None;
    }

    let len = u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as usize;
    let end = HEADER_LEN.checked_add(len)?;
    if bytes.len() < end {
        return None;
    }

    Some((bytes[0], &bytes[HEADER_LEN..end]))
}

fn append(output: &mut DemuxedOutput, tag: u8, payload: &[u8]) {
    match StreamKind::from_tag(tag) {
        Some(StreamKind::Stdout) => output.stdout.extend_from_slice(payload),
        Some(StreamKind::Stderr) => output.stderr.extend_from_slice(payload),
        _ => {}
    }
}
