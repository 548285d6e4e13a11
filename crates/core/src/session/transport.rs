use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::shared::face::AcceptedFace;

/// Opaque per-connection identifier, unique for the life of the process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "connection {}", self.0)
    }
}

/// Hands out increasing `ConnectionId`s starting at 1.
#[derive(Debug)]
pub struct ConnectionIdAllocator {
    next: AtomicU64,
}

impl ConnectionIdAllocator {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    pub fn allocate(&self) -> ConnectionId {
        ConnectionId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ConnectionIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// One outbound event. Serializes as `{"event": ..., "data": ...}`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", content = "data")]
pub enum OutboundMessage {
    /// Annotated frame as a `data:image/jpeg;base64,` URI.
    #[serde(rename = "camera-frame")]
    CameraFrame(String),
    /// Accepted faces as `[x1, y1, x2, y2, label]` tuples.
    #[serde(rename = "faces")]
    Faces(Vec<AcceptedFace>),
}

/// Delivers outbound events to one connection.
///
/// Sending to a connection that has already gone away must be a silent
/// no-op; late results from in-flight work land there.
pub trait Transport: Send + Sync {
    fn send(&self, connection: ConnectionId, message: OutboundMessage);
}
