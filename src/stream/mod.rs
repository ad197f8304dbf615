//! Live update stream: SSE decoding, frame classification, transport seam
//! and the reconnecting controller.

pub mod controller;
pub mod frame;
pub mod sse;
pub mod transport;

pub use controller::StreamController;
pub use frame::{parse_frame, Frame};
pub use sse::SseDecoder;
pub use transport::{FrameStream, SseTransport, StreamTransport};
