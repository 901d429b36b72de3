//! gdl90-core: Pure decode library for the GDL90 data interface.
//!
//! No async, no I/O. Frame extraction, CRC-16 validation, message dispatch
//! and field decoding. The `gdl90` listener binary is built on top of it.

pub mod config;
pub mod crc;
pub mod decode;
pub mod enums;
pub mod ext;
pub mod frame;
pub mod stream;
pub mod types;

// Re-export commonly used types at crate root
pub use decode::{decode, decode_frame};
pub use frame::{parse_frame, FrameExtractor, RawFrame};
pub use stream::{StreamDecoder, StreamEvent, StreamStats};
pub use types::*;
