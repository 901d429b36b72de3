//! Recover GDL90 frames from a byte-stuffed stream.
//!
//! Responsibilities:
//! - Delimit frames on the 0x7E flag byte
//! - Undo 0x7D escaping (next byte XOR 0x20)
//! - Hold partial frames across `push` calls
//! - Resynchronize on the next flag after any framing fault
//! - Validate the frame checksum and split it into a `MessageEnvelope`

use std::collections::VecDeque;

use crate::crc;
use crate::types::{Gdl90Error, MessageEnvelope, Result};

pub const FLAG_BYTE: u8 = 0x7E;
pub const ESCAPE_BYTE: u8 = 0x7D;
pub const ESCAPE_MASK: u8 = 0x20;

/// Longest unescaped GDL90 frame: uplink type byte, 435 payload bytes, CRC.
pub const LONGEST_FRAME_LEN: usize = 438;

/// Largest frame accepted before the extractor gives up and resyncs.
pub const DEFAULT_MAX_FRAME_LEN: usize = 1024;

// ---------------------------------------------------------------------------
// RawFrame
// ---------------------------------------------------------------------------

/// Unescaped bytes found between two flag bytes: message type, payload and
/// the two checksum bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    pub bytes: Vec<u8>,
}

impl RawFrame {
    pub fn new(bytes: Vec<u8>) -> Self {
        RawFrame { bytes }
    }

    pub fn message_type(&self) -> Option<u8> {
        self.bytes.first().copied()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Check the trailing CRC and split the frame into an envelope.
    pub fn validate(self) -> Result<MessageEnvelope> {
        let (message_type, body, received) = self.split()?;
        if !crc::verify(&self.bytes) {
            let computed = crc::frame_crc(&self.bytes).unwrap_or_default();
            return Err(Gdl90Error::ChecksumMismatch {
                message_type,
                computed,
                received,
                raw: self.bytes,
            });
        }
        Ok(MessageEnvelope::new(message_type, body).with_checksum(received))
    }

    /// Split without checking the CRC. The received checksum still travels
    /// with the envelope so embedded checks can use it.
    pub fn into_envelope_unchecked(self) -> Result<MessageEnvelope> {
        let (message_type, body, received) = self.split()?;
        Ok(MessageEnvelope::new(message_type, body).with_checksum(received))
    }

    fn split(&self) -> Result<(u8, &[u8], u16)> {
        let len = self.bytes.len();
        if len < 3 {
            return Err(Gdl90Error::FrameTooShort { len });
        }
        let received =
            crc::frame_checksum(&self.bytes).ok_or(Gdl90Error::FrameTooShort { len })?;
        Ok((self.bytes[0], &self.bytes[1..len - 2], received))
    }
}

// ---------------------------------------------------------------------------
// Frame extractor
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    AwaitingStart,
    InMessage,
}

/// Per-stream frame extractor.
///
/// Feed bytes with [`push`](Self::push) and pull frames with
/// [`next_frame`](Self::next_frame) (or iterate). Bytes after the last flag
/// stay buffered until more input arrives. One extractor per stream.
#[derive(Debug)]
pub struct FrameExtractor {
    input: VecDeque<u8>,
    state: State,
    frame: Vec<u8>,
    escape_pending: bool,
    max_frame_len: usize,
}

impl FrameExtractor {
    pub fn new() -> Self {
        Self::with_max_frame_len(DEFAULT_MAX_FRAME_LEN)
    }

    /// Limits below `LONGEST_FRAME_LEN` are raised to it.
    pub fn with_max_frame_len(max_frame_len: usize) -> Self {
        let max_frame_len = max_frame_len.max(LONGEST_FRAME_LEN);
        FrameExtractor {
            input: VecDeque::new(),
            state: State::AwaitingStart,
            frame: Vec::with_capacity(64),
            escape_pending: false,
            max_frame_len,
        }
    }

    /// Queue bytes received from the transport.
    pub fn push(&mut self, data: &[u8]) {
        self.input.extend(data);
    }

    /// Scan queued input for the next frame.
    ///
    /// Returns `None` when the queued bytes are exhausted without completing
    /// a frame. Faults discard the partial frame; scanning resumes at the
    /// next flag byte.
    pub fn next_frame(&mut self) -> Option<Result<RawFrame>> {
        while let Some(byte) = self.input.pop_front() {
            match self.state {
                State::AwaitingStart => {
                    if byte == FLAG_BYTE {
                        self.start_frame();
                    }
                }
                State::InMessage => {
                    if byte == FLAG_BYTE {
                        if self.escape_pending {
                            let discarded = self.frame.len();
                            self.start_frame();
                            return Some(Err(Gdl90Error::IncompleteEscape { discarded }));
                        }
                        if self.frame.is_empty() {
                            // Back-to-back flags: this one opens the next frame.
                            continue;
                        }
                        self.state = State::AwaitingStart;
                        let bytes = std::mem::replace(&mut self.frame, Vec::with_capacity(64));
                        return Some(Ok(RawFrame::new(bytes)));
                    }

                    if self.escape_pending {
                        self.escape_pending = false;
                        self.frame.push(byte ^ ESCAPE_MASK);
                    } else if byte == ESCAPE_BYTE {
                        self.escape_pending = true;
                        continue;
                    } else {
                        self.frame.push(byte);
                    }

                    if self.frame.len() > self.max_frame_len {
                        self.discard();
                        return Some(Err(Gdl90Error::OversizedFrame {
                            max: self.max_frame_len,
                        }));
                    }
                }
            }
        }
        None
    }

    /// Signal end of stream.
    ///
    /// Returns the fault for a frame left open (never the partial frame
    /// itself) and resets the extractor.
    pub fn finish(&mut self) -> Option<Gdl90Error> {
        let fault = match self.state {
            State::InMessage if self.escape_pending => Some(Gdl90Error::IncompleteEscape {
                discarded: self.frame.len(),
            }),
            State::InMessage if !self.frame.is_empty() => Some(Gdl90Error::TruncatedFrame {
                discarded: self.frame.len(),
            }),
            _ => None,
        };
        self.reset();
        fault
    }

    /// Drop all buffered input and partial state.
    pub fn reset(&mut self) {
        self.input.clear();
        self.discard();
    }

    /// True while between an opening flag and its closing flag.
    pub fn is_in_frame(&self) -> bool {
        self.state == State::InMessage
    }

    /// Bytes queued but not yet scanned.
    pub fn pending_len(&self) -> usize {
        self.input.len()
    }

    fn start_frame(&mut self) {
        self.state = State::InMessage;
        self.frame.clear();
        self.escape_pending = false;
    }

    fn discard(&mut self) {
        self.state = State::AwaitingStart;
        self.frame.clear();
        self.escape_pending = false;
    }
}

impl Default for FrameExtractor {
    fn default() -> Self {
        FrameExtractor::new()
    }
}

impl Iterator for FrameExtractor {
    type Item = Result<RawFrame>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_frame()
    }
}

/// Undo byte stuffing on a buffer that is already delimited (no flag bytes).
pub fn unescape(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len());
    let mut iter = data.iter();
    while let Some(&byte) = iter.next() {
        if byte == ESCAPE_BYTE {
            match iter.next() {
                Some(&next) => out.push(next ^ ESCAPE_MASK),
                None => {
                    return Err(Gdl90Error::IncompleteEscape {
                        discarded: out.len(),
                    })
                }
            }
        } else {
            out.push(byte);
        }
    }
    Ok(out)
}

/// Parse one frame from raw bytes, with or without the surrounding flags.
pub fn parse_frame(data: &[u8]) -> Result<RawFrame> {
    let start = usize::from(data.first() == Some(&FLAG_BYTE));
    let end = if data.len() > start && data.last() == Some(&FLAG_BYTE) {
        data.len() - 1
    } else {
        data.len()
    };
    Ok(RawFrame::new(unescape(&data[start..end])?))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
