//! Incremental Server-Sent Events decoder.
//!
//! The transport delivers arbitrary byte chunks; events may be split across
//! chunk boundaries, including mid-character. The decoder buffers raw bytes
//! and only converts to text once a full event (terminated by a blank line)
//! is available.

/// Accumulates byte chunks and yields the `data:` payload of each complete
/// event. `event:`, `id:`, `retry:` and comment lines are ignored; multiple
/// `data:` lines within one event are joined with `\n` per the SSE spec.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one transport chunk; returns the payloads of every event
    /// completed by it, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut payloads = Vec::new();
        while let Some(end) = find_event_boundary(&self.buffer) {
            let event: Vec<u8> = self.buffer.drain(..end.total).collect();
            let text = String::from_utf8_lossy(&event[..end.body]);
            if let Some(payload) = extract_data(&text) {
                payloads.push(payload);
            }
        }
        payloads
    }
}

struct Boundary {
    /// Length of the event body, excluding the terminating blank line.
    body: usize,
    /// Length including the terminator, i.e. how much to drain.
    total: usize,
}

fn find_event_boundary(buffer: &[u8]) -> Option<Boundary> {
    // Events end with "\n\n"; tolerate "\r\n\r\n" from proxies.
    for i in 0..buffer.len().saturating_sub(1) {
        if buffer[i] == b'\n' && buffer[i + 1] == b'\n' {
            return Some(Boundary {
                body: i,
                total: i + 2,
            });
        }
        if i + 3 < buffer.len() && &buffer[i..i + 4] == b"\r\n\r\n" {
            return Some(Boundary {
                body: i,
                total: i + 4,
            });
        }
    }
    None
}

fn extract_data(event: &str) -> Option<String> {
    let mut data_lines: Vec<&str> = Vec::new();
    for line in event.lines() {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if let Some(rest) = line.strip_prefix("data:") {
            data_lines.push(rest.strip_prefix(' ').unwrap_or(rest));
        }
        // Field lines other than data, and ":" comments, carry no payload.
    }
    if data_lines.is_empty() {
        None
    } else {
        Some(data_lines.join("\n"))
    }
}
