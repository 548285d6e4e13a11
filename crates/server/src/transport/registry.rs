use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::mpsc::UnboundedSender;

use facestream_core::session::transport::{ConnectionId, OutboundMessage, Transport};

/// Routes outbound events to the writer task of each open socket.
///
/// Events are serialized to JSON text here. A connection that has been
/// unregistered, or whose writer has stopped, silently swallows events.
#[derive(Default)]
pub struct ConnectionRegistry {
    outbound: Mutex<HashMap<ConnectionId, UnboundedSender<String>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, id: ConnectionId, tx: UnboundedSender<String>) {
        self.lock().insert(id, tx);
    }

    pub fn unregister(&self, id: ConnectionId) {
        self.lock().remove(&id);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<ConnectionId, UnboundedSender<String>>> {
        // A panic while holding the lock cannot leave the map half-updated
        self.outbound
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Transport for ConnectionRegistry {
    fn send(&self, connection: ConnectionId, message: OutboundMessage) {
        let Some(tx) = self.lock().get(&connection).cloned() else {
            log::trace!("{connection}: gone, dropping outbound event");
            return;
        };
        match serde_json::to_string(&message) {
            Ok(text) => {
                let _ = tx.send(text);
            }
            Err(e) => log::error!("{connection}: failed to serialize outbound event: {e}"),
        }
    }
}
