//! Stream pipeline: frame extraction, checksum validation and dispatch.
//!
//! Pure logic, no I/O. The caller pushes whatever the transport delivered
//! and pulls `StreamEvent`s; every fault is reported as an event and the
//! stream carries on at the next flag byte.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::DecoderConfig;
use crate::decode::decode_with;
use crate::frame::{FrameExtractor, RawFrame};
use crate::types::*;

/// One outcome per extracted frame (or per framing fault).
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Decoded {
        decoded: Decoded,
        /// Unescaped frame bytes (type, payload, checksum).
        raw: Vec<u8>,
    },
    Fault(Gdl90Error),
}

/// Running counters for one stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StreamStats {
    pub bytes: u64,
    pub frames: u64,
    pub decoded: u64,
    /// Best-effort decodes; not counted again under the fault counters.
    pub suspect: u64,
    pub unsupported: u64,
    pub framing_faults: u64,
    pub integrity_faults: u64,
    pub length_faults: u64,
    pub field_faults: u64,
    pub by_kind: BTreeMap<MessageKind, u64>,
}

impl StreamStats {
    pub fn faults(&self) -> u64 {
        self.framing_faults + self.integrity_faults + self.length_faults + self.field_faults
    }

    fn record_fault(&mut self, fault: &Gdl90Error) {
        match fault.kind() {
            FaultKind::Framing => self.framing_faults += 1,
            FaultKind::Integrity => self.integrity_faults += 1,
            FaultKind::Length => self.length_faults += 1,
            FaultKind::Field => self.field_faults += 1,
            FaultKind::Io | FaultKind::Config => {}
        }
    }

    fn record_decoded(&mut self, decoded: &Decoded) {
        match decoded {
            Decoded::Message { message } => {
                self.decoded += 1;
                *self.by_kind.entry(message.kind()).or_insert(0) += 1;
            }
            Decoded::Suspect { message, .. } => {
                self.suspect += 1;
                *self.by_kind.entry(message.kind()).or_insert(0) += 1;
            }
            Decoded::Unsupported { .. } => self.unsupported += 1,
        }
    }
}

/// Decoder for a single byte stream. Not shared between streams.
#[derive(Debug)]
pub struct StreamDecoder {
    extractor: FrameExtractor,
    config: DecoderConfig,
    stats: StreamStats,
}

impl StreamDecoder {
    pub fn new(config: DecoderConfig) -> Self {
        StreamDecoder {
            extractor: FrameExtractor::with_max_frame_len(config.max_frame_len),
            config,
            stats: StreamStats::default(),
        }
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    pub fn stats(&self) -> &StreamStats {
        &self.stats
    }

    /// Queue bytes from the transport.
    pub fn push(&mut self, data: &[u8]) {
        self.stats.bytes += data.len() as u64;
        self.extractor.push(data);
    }

    /// Next event from queued bytes, `None` when more input is needed.
    pub fn next_event(&mut self) -> Option<StreamEvent> {
        let event = match self.extractor.next_frame()? {
            Ok(raw) => self.process(raw),
            Err(fault) => StreamEvent::Fault(fault),
        };
        if let StreamEvent::Fault(fault) = &event {
            self.stats.record_fault(fault);
        }
        Some(event)
    }

    /// Push a buffer and collect every event it completes.
    pub fn decode_all(&mut self, data: &[u8]) -> Vec<StreamEvent> {
        self.push(data);
        self.by_ref().collect()
    }

    /// End of stream: report a frame left open, if any.
    pub fn finish(&mut self) -> Option<StreamEvent> {
        let fault = self.extractor.finish()?;
        self.stats.record_fault(&fault);
        Some(StreamEvent::Fault(fault))
    }

    /// Drop buffered input and partial frame state; counters are kept.
    pub fn reset(&mut self) {
        self.extractor.reset();
    }

    fn process(&mut self, raw: RawFrame) -> StreamEvent {
        self.stats.frames += 1;
        let bytes = raw.bytes.clone();
        let envelope = if self.config.verify_checksum {
            raw.validate()
        } else {
            raw.into_envelope_unchecked()
        };

        match envelope.and_then(|env| decode_with(&env, &self.config)) {
            Ok(decoded) => {
                self.stats.record_decoded(&decoded);
                StreamEvent::Decoded {
                    decoded,
                    raw: bytes,
                }
            }
            Err(fault) => StreamEvent::Fault(fault),
        }
    }
}

impl Default for StreamDecoder {
    fn default() -> Self {
        StreamDecoder::new(DecoderConfig::default())
    }
}

impl Iterator for StreamDecoder {
    type Item = StreamEvent;

    fn next(&mut self) -> Option<StreamEvent> {
        self.next_event()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
