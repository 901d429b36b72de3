//! UDP listener.
//!
//! GDL90 devices broadcast frames as UDP datagrams (port 4000 by default).
//! Each sender gets its own `StreamDecoder`, so a partial frame from one
//! device never merges with bytes from another.

use std::collections::BTreeMap;
use std::io;
use std::net::SocketAddr;

use tokio::net::UdpSocket;
use tracing::{debug, error, info, trace, warn};

use gdl90_core::config::DecoderConfig;
use gdl90_core::{StreamDecoder, StreamEvent, StreamStats};

use crate::render::Renderer;

/// Largest datagram accepted. GDL90 frames are well under this.
const MAX_DATAGRAM: usize = 65_535;

/// Sources tracked at once. The least recently heard one is dropped to make
/// room for a new sender.
pub const MAX_SOURCES: usize = 64;

struct Source {
    decoder: StreamDecoder,
    last_seen: u64,
}

/// Per-source decoders for one listening socket.
pub struct Sources {
    config: DecoderConfig,
    max_sources: usize,
    datagrams: u64,
    decoders: BTreeMap<SocketAddr, Source>,
}

impl Sources {
    pub fn new(config: DecoderConfig) -> Self {
        Self::with_max_sources(config, MAX_SOURCES)
    }

    pub fn with_max_sources(config: DecoderConfig, max_sources: usize) -> Self {
        Sources {
            config,
            max_sources: max_sources.max(1),
            datagrams: 0,
            decoders: BTreeMap::new(),
        }
    }

    /// Decode one datagram from `peer`.
    ///
    /// A new sender beyond the cap evicts the least recently heard source;
    /// a frame that source left open is reported first.
    pub fn datagram(&mut self, peer: SocketAddr, data: &[u8]) -> Vec<StreamEvent> {
        self.datagrams += 1;
        let mut events = Vec::new();

        if !self.decoders.contains_key(&peer) {
            if self.decoders.len() >= self.max_sources {
                events.extend(self.evict_idle());
            }
            info!(peer = %peer, "new GDL90 source");
            self.decoders.insert(
                peer,
                Source {
                    decoder: StreamDecoder::new(self.config.clone()),
                    last_seen: 0,
                },
            );
        }

        if let Some(source) = self.decoders.get_mut(&peer) {
            source.last_seen = self.datagrams;
            events.extend(source.decoder.decode_all(data));
        }
        events
    }

    fn evict_idle(&mut self) -> Option<StreamEvent> {
        let idle = self
            .decoders
            .iter()
            .min_by_key(|(_, source)| source.last_seen)
            .map(|(peer, _)| *peer)?;
        let mut source = self.decoders.remove(&idle)?;
        let stats = source.decoder.stats();
        info!(
            peer = %idle,
            frames = stats.frames,
            decoded = stats.decoded,
            faults = stats.faults(),
            "dropping idle GDL90 source"
        );
        source.decoder.finish()
    }

    /// Close every stream, returning any frames left open.
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        self.decoders
            .values_mut()
            .filter_map(|source| source.decoder.finish())
            .collect()
    }

    pub fn stats(&self) -> Vec<(SocketAddr, StreamStats)> {
        self.decoders
            .iter()
            .map(|(peer, source)| (*peer, source.decoder.stats().clone()))
            .collect()
    }
}

/// Receive and render datagrams until Ctrl-C.
pub async fn run(
    addr: &str,
    config: DecoderConfig,
    renderer: Renderer,
) -> io::Result<Vec<(SocketAddr, StreamStats)>> {
    let socket = UdpSocket::bind(addr).await.map_err(|e| {
        error!(addr = %addr, error = %e, "failed to bind UDP socket");
        e
    })?;
    let local_addr = socket.local_addr()?;
    info!(local_addr = %local_addr, "listening for GDL90 datagrams");

    let mut sources = Sources::new(config);
    let mut buf = vec![0u8; MAX_DATAGRAM];

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = &mut shutdown => {
                if let Err(e) = result {
                    warn!(error = %e, "failed to listen for Ctrl-C");
                }
                info!("shutting down");
                break;
            }
            received = socket.recv_from(&mut buf) => {
                match received {
                    Ok((n, peer)) => {
                        trace!(peer = %peer, bytes = n, "datagram");
                        for event in sources.datagram(peer, &buf[..n]) {
                            emit(&renderer, &event);
                        }
                    }
                    Err(e) => warn!(error = %e, "UDP recv error"),
                }
            }
        }
    }

    for event in sources.finish() {
        emit(&renderer, &event);
    }
    Ok(sources.stats())
}

fn emit(renderer: &Renderer, event: &StreamEvent) {
    if let StreamEvent::Fault(fault) = event {
        debug!(kind = fault.kind().as_str(), error = %fault, "frame rejected");
    }
    println!("{}", renderer.event(event));
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
