// User endpoint — builds circuits, sends onions, receives plaintext
//
// The send path is: snapshot the directory, pick a fresh circuit, wrap the
// message, and only then touch the network — a single delivery to the entry
// hop. Circuit selection and every per-hop encryption run to completion
// before any network call is issued; a failure aborts the send with nothing
// on the wire.

use parking_lot::Mutex;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::{ConfigError, ProtocolConfig};
use crate::message::{AddressError, HopAddress};
use crate::privacy::{build_circuit, build_onion, CircuitError, OnionError};
use crate::registry::Directory;
use crate::transport::{DeliveryAck, DeliveryError, InboundHandler, Transport};

#[derive(Debug, Error)]
pub enum SendError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Address(#[from] AddressError),
    #[error(transparent)]
    Circuit(#[from] CircuitError),
    #[error(transparent)]
    Onion(#[from] OnionError),
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

/// Sender-side observability slots, one overwritten slot each.
#[derive(Debug, Clone, Default)]
struct UserTelemetry {
    last_received_message: Option<String>,
    last_sent_message: Option<String>,
    /// Node ids of the last constructed circuit, entry first
    last_circuit: Vec<u32>,
}

/// An end-user process on the overlay: originates onions and is the final
/// recipient of other users' messages.
pub struct UserNode {
    user_id: u32,
    address: HopAddress,
    config: ProtocolConfig,
    telemetry: Mutex<UserTelemetry>,
}

impl UserNode {
    pub fn new(user_id: u32, config: ProtocolConfig) -> Result<Arc<Self>, SendError> {
        config.validate()?;
        let address = config.user_address(user_id)?;
        info!(user_id, %address, "user endpoint up");
        Ok(Arc::new(Self {
            user_id,
            address,
            config,
            telemetry: Mutex::new(UserTelemetry::default()),
        }))
    }

    pub fn user_id(&self) -> u32 {
        self.user_id
    }

    /// Address token other overlay participants deliver to
    pub fn address(&self) -> HopAddress {
        self.address
    }

    /// Send a message to another user through a fresh circuit.
    ///
    /// Selects the circuit from a point-in-time directory snapshot, builds
    /// the onion innermost-first, then performs the single entry-hop
    /// delivery. The returned ack is all there is — no retry, no queueing.
    pub fn send_message(
        &self,
        message: &str,
        destination_user_id: u32,
        directory: &dyn Directory,
        transport: &dyn Transport,
    ) -> Result<DeliveryAck, SendError> {
        let snapshot = directory.snapshot();
        let circuit = build_circuit(&snapshot, self.config.circuit_hops)?;
        let destination = self.config.user_address(destination_user_id)?;

        let (entry, blob) = build_onion(message.as_bytes(), destination, &circuit, &self.config)?;

        {
            let mut t = self.telemetry.lock();
            t.last_sent_message = Some(message.to_string());
            t.last_circuit = circuit.iter().map(|n| n.node_id).collect();
        }

        debug!(
            user_id = self.user_id,
            %entry,
            hops = circuit.len(),
            "onion handed to transport"
        );
        Ok(transport.deliver(&entry, blob.as_bytes())?)
    }

    pub fn last_received_message(&self) -> Option<String> {
        self.telemetry.lock().last_received_message.clone()
    }

    pub fn last_sent_message(&self) -> Option<String> {
        self.telemetry.lock().last_sent_message.clone()
    }

    /// Node ids of the last constructed circuit, entry first
    pub fn last_circuit(&self) -> Vec<u32> {
        self.telemetry.lock().last_circuit.clone()
    }
}

impl InboundHandler for UserNode {
    fn handle_inbound(&self, blob: &[u8], _transport: &dyn Transport) {
        let text = String::from_utf8_lossy(blob).into_owned();
        debug!(user_id = self.user_id, "message delivered");
        self.telemetry.lock().last_received_message = Some(text);
    }
}
