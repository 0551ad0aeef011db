// Transport seam — one-shot, best-effort blob delivery
//
// The transport that actually moves bytes between processes is an external
// collaborator. Delivery is fire-and-forget: one attempt, no retry, no
// timeout, and the ack is an ignorable-but-observable result so tests can
// assert that failures were surfaced rather than swallowed.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::message::HopAddress;

/// Basic delivery acknowledgement — all a sender is entitled to observe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryAck;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("no route to address {0}")]
    Unroutable(HopAddress),
    #[error("delivery to {0} failed: {1}")]
    Failed(HopAddress, String),
}

/// Transport collaborator seam.
pub trait Transport: Send + Sync {
    /// Whether the token currently resolves to a live endpoint
    fn routes(&self, address: &HopAddress) -> bool;

    /// Deliver an opaque blob to an address token. At-most-once; a failure
    /// is terminal for the message.
    fn deliver(&self, address: &HopAddress, blob: &[u8]) -> Result<DeliveryAck, DeliveryError>;
}

/// An endpoint reachable through a transport. The transport hands itself to
/// the handler so a relay can forward onward without holding a reference
/// cycle.
pub trait InboundHandler: Send + Sync {
    fn handle_inbound(&self, blob: &[u8], transport: &dyn Transport);
}

/// In-process transport: dispatches synchronously to bound handlers.
///
/// Used by the demo overlay and integration tests; a real deployment speaks
/// through its own `Transport` implementation instead.
#[derive(Default)]
pub struct LoopbackTransport {
    endpoints: RwLock<HashMap<HopAddress, Arc<dyn InboundHandler>>>,
}

impl LoopbackTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a handler to an address token, replacing any previous binding
    pub fn bind(&self, address: HopAddress, handler: Arc<dyn InboundHandler>) {
        self.endpoints.write().insert(address, handler);
    }
}

impl Transport for LoopbackTransport {
    fn routes(&self, address: &HopAddress) -> bool {
        self.endpoints.read().contains_key(address)
    }

    fn deliver(&self, address: &HopAddress, blob: &[u8]) -> Result<DeliveryAck, DeliveryError> {
        // Clone the handler out so the lock is not held across re-entrant
        // delivery while a relay forwards down the circuit.
        let handler = self
            .endpoints
            .read()
            .get(address)
            .cloned()
            .ok_or(DeliveryError::Unroutable(*address))?;
        handler.handle_inbound(blob, self);
        Ok(DeliveryAck)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct RecordingEndpoint {
        received: Mutex<Vec<Vec<u8>>>,
    }

    impl RecordingEndpoint {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                received: Mutex::new(Vec::new()),
            })
        }
    }

    impl InboundHandler for RecordingEndpoint {
        fn handle_inbound(&self, blob: &[u8], _transport: &dyn Transport) {
            self.received.lock().push(blob.to_vec());
        }
    }

    #[test]
    fn test_deliver_to_bound_endpoint() {
        let transport = LoopbackTransport::new();
        let endpoint = RecordingEndpoint::new();
        let address = HopAddress::new(4001).unwrap();

        transport.bind(address, endpoint.clone());
        assert!(transport.routes(&address));

        transport.deliver(&address, b"blob").unwrap();
        assert_eq!(endpoint.received.lock().as_slice(), &[b"blob".to_vec()]);
    }

    #[test]
    fn test_unbound_address_is_unroutable() {
        let transport = LoopbackTransport::new();
        let address = HopAddress::new(4009).unwrap();

        assert!(!transport.routes(&address));
        let result = transport.deliver(&address, b"blob");
        assert!(matches!(result, Err(DeliveryError::Unroutable(a)) if a == address));
    }

    #[test]
    fn test_rebind_replaces_handler() {
        let transport = LoopbackTransport::new();
        let first = RecordingEndpoint::new();
        let second = RecordingEndpoint::new();
        let address = HopAddress::new(4001).unwrap();

        transport.bind(address, first.clone());
        transport.bind(address, second.clone());
        transport.deliver(&address, b"blob").unwrap();

        assert!(first.received.lock().is_empty());
        assert_eq!(second.received.lock().len(), 1);
    }
}
