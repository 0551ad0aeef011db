// Relay node — peel one layer, forward the remainder
//
// Startup order is fixed: generate keys, then register with the directory,
// and only then accept traffic. Per-message processing is strictly
// sequential; the transport collaborator owns whatever concurrency exists
// around it.

use parking_lot::Mutex;
use rsa::{RsaPrivateKey, RsaPublicKey};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{ConfigError, ProtocolConfig};
use crate::crypto::{decrypt_layer, export_public, generate_keypair, CipherError, KeyError};
use crate::message::{AddressError, HopAddress, PlaintextEnvelope};
use crate::registry::{Directory, NodeDescriptor, RegistryError};
use crate::transport::{DeliveryError, InboundHandler, Transport};

#[derive(Debug, Error)]
pub enum RelayError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Key(#[from] KeyError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Address(#[from] AddressError),
    #[error(transparent)]
    Cipher(#[from] CipherError),
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

/// What a relay did with one inbound message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    /// One layer peeled, remainder forwarded to the next hop
    Forwarded(HopAddress),
    /// The decrypted address was not routable: this relay is the exit and
    /// the payload went to the local sink
    ExitDelivered,
}

/// Last-seen observability slots. Each is a single overwritten slot with
/// last-writer-wins semantics — a deliberate weak guarantee for harnesses,
/// not a history.
#[derive(Debug, Clone, Default)]
struct RelayTelemetry {
    /// Raw inbound blob, recorded before any decryption is attempted
    last_raw_blob: Option<Vec<u8>>,
    /// Decrypted payload with the address field already stripped
    last_decrypted_payload: Option<Vec<u8>>,
    /// The relay's own node id (matching what existing observers expect in
    /// the source slot)
    last_source: Option<u32>,
    /// Address parsed out of the last decrypted envelope
    last_destination: Option<HopAddress>,
    /// Final plaintext delivered locally when this relay acted as the exit
    last_exit_payload: Option<Vec<u8>>,
}

/// A relay that peels exactly one onion layer per inbound message.
pub struct RelayNode {
    node_id: u32,
    address: HopAddress,
    public_key: RsaPublicKey,
    private_key: RsaPrivateKey,
    telemetry: Mutex<RelayTelemetry>,
}

impl RelayNode {
    /// Generate this relay's keypair and register it with the directory.
    ///
    /// Both steps must succeed, in that order, before the relay is handed to
    /// a transport; a registration conflict aborts startup.
    pub fn start(
        node_id: u32,
        config: &ProtocolConfig,
        directory: &dyn Directory,
    ) -> Result<Arc<Self>, RelayError> {
        config.validate()?;
        let address = config.relay_address(node_id)?;

        let (public_key, private_key) = generate_keypair(config.rsa_modulus_bits)?;
        directory.register(NodeDescriptor {
            node_id,
            pub_key: export_public(&public_key)?,
        })?;

        info!(node_id, %address, "relay started");
        Ok(Arc::new(Self {
            node_id,
            address,
            public_key,
            private_key,
            telemetry: Mutex::new(RelayTelemetry::default()),
        }))
    }

    pub fn node_id(&self) -> u32 {
        self.node_id
    }

    /// Inbound address token this relay listens on
    pub fn address(&self) -> HopAddress {
        self.address
    }

    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public_key
    }

    /// Peel one layer off an inbound blob and forward or exit-deliver.
    ///
    /// A cryptographic failure is terminal for this message only: the error
    /// is returned, nothing is forwarded, and the relay keeps serving. A
    /// failed forward is equally terminal — surfaced, never retried.
    pub fn handle_message(
        &self,
        blob: &[u8],
        transport: &dyn Transport,
    ) -> Result<RelayOutcome, RelayError> {
        self.telemetry.lock().last_raw_blob = Some(blob.to_vec());

        let envelope_bytes = match std::str::from_utf8(blob)
            .map_err(|_| CipherError::DecryptionFailed)
            .and_then(|text| decrypt_layer(text, &self.private_key))
        {
            Ok(bytes) => bytes,
            Err(e) => {
                let mut t = self.telemetry.lock();
                t.last_decrypted_payload = None;
                t.last_destination = None;
                t.last_source = Some(self.node_id);
                return Err(e.into());
            }
        };

        // A decrypted envelope shorter than the address field means the
        // layer split was misaligned; same terminal failure as a bad key.
        let envelope = match PlaintextEnvelope::split(&envelope_bytes) {
            Ok(envelope) => envelope,
            Err(_) => {
                let mut t = self.telemetry.lock();
                t.last_decrypted_payload = None;
                t.last_destination = None;
                t.last_source = Some(self.node_id);
                return Err(CipherError::DecryptionFailed.into());
            }
        };
        let next_hop = envelope.next_hop();

        {
            let mut t = self.telemetry.lock();
            t.last_decrypted_payload = Some(envelope.payload().to_vec());
            t.last_source = Some(self.node_id);
            t.last_destination = next_hop.as_ref().ok().copied();
        }

        match next_hop {
            Ok(next) if transport.routes(&next) => {
                debug!(node_id = self.node_id, %next, "forwarding peeled layer");
                transport.deliver(&next, envelope.payload())?;
                Ok(RelayOutcome::Forwarded(next))
            }
            _ => {
                // Terminal marker or dead address: act as the exit.
                debug!(node_id = self.node_id, "exit delivery to local sink");
                self.telemetry.lock().last_exit_payload = Some(envelope.payload().to_vec());
                Ok(RelayOutcome::ExitDelivered)
            }
        }
    }

    // Observability accessors — read-only views for harnesses, no protocol
    // logic may depend on them.

    pub fn last_received_encrypted_message(&self) -> Option<Vec<u8>> {
        self.telemetry.lock().last_raw_blob.clone()
    }

    pub fn last_received_decrypted_message(&self) -> Option<Vec<u8>> {
        self.telemetry.lock().last_decrypted_payload.clone()
    }

    pub fn last_message_source(&self) -> Option<u32> {
        self.telemetry.lock().last_source
    }

    pub fn last_message_destination(&self) -> Option<HopAddress> {
        self.telemetry.lock().last_destination
    }

    pub fn last_exit_payload(&self) -> Option<Vec<u8>> {
        self.telemetry.lock().last_exit_payload.clone()
    }
}

impl InboundHandler for RelayNode {
    fn handle_inbound(&self, blob: &[u8], transport: &dyn Transport) {
        if let Err(e) = self.handle_message(blob, transport) {
            warn!(node_id = self.node_id, error = %e, "message dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::encrypt_for_hop;
    use crate::registry::MemoryDirectory;
    use crate::transport::{DeliveryAck, LoopbackTransport};
    use mockall::mock;
    use mockall::predicate::always;

    mock! {
        FlakyTransport {}

        impl Transport for FlakyTransport {
            fn routes(&self, address: &HopAddress) -> bool;
            fn deliver(&self, address: &HopAddress, blob: &[u8]) -> Result<DeliveryAck, DeliveryError>;
        }
    }

    fn test_relay(node_id: u32, directory: &MemoryDirectory) -> Arc<RelayNode> {
        RelayNode::start(node_id, &ProtocolConfig::default(), directory).unwrap()
    }

    fn wrap_for(relay: &RelayNode, next: &HopAddress, payload: &[u8]) -> Vec<u8> {
        let envelope = PlaintextEnvelope::encode(next, payload);
        encrypt_for_hop(&envelope, relay.public_key())
            .unwrap()
            .into_bytes()
    }

    #[test]
    fn test_startup_registers_exported_key() {
        let directory = MemoryDirectory::new();
        let relay = test_relay(1, &directory);

        let snapshot = directory.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].node_id, 1);
        assert_eq!(snapshot[0].pub_key, export_public(relay.public_key()).unwrap());
    }

    #[test]
    fn test_registration_conflict_aborts_startup() {
        let directory = MemoryDirectory::new();
        let _first = test_relay(1, &directory);

        let result = RelayNode::start(1, &ProtocolConfig::default(), &directory);
        assert!(matches!(
            result,
            Err(RelayError::Registry(RegistryError::AlreadyRegistered(1)))
        ));
    }

    #[test]
    fn test_forward_peels_one_layer_and_updates_slots() {
        let directory = MemoryDirectory::new();
        let relay = test_relay(1, &directory);
        let next = HopAddress::new(4002).unwrap();
        let blob = wrap_for(&relay, &next, b"inner payload");

        let mut transport = MockFlakyTransport::new();
        transport.expect_routes().return_const(true);
        transport
            .expect_deliver()
            .with(always(), always())
            .times(1)
            .returning(|_, _| Ok(DeliveryAck));

        let outcome = relay.handle_message(&blob, &transport).unwrap();
        assert_eq!(outcome, RelayOutcome::Forwarded(next));

        assert_eq!(relay.last_received_encrypted_message().unwrap(), blob);
        assert_eq!(
            relay.last_received_decrypted_message().unwrap(),
            b"inner payload"
        );
        assert_eq!(relay.last_message_source(), Some(1));
        assert_eq!(relay.last_message_destination(), Some(next));
        assert!(relay.last_exit_payload().is_none());
    }

    #[test]
    fn test_unroutable_address_means_exit_delivery() {
        let directory = MemoryDirectory::new();
        let relay = test_relay(1, &directory);
        let dead = HopAddress::new(9_999_999_998).unwrap();
        let blob = wrap_for(&relay, &dead, b"final plaintext");

        // Nothing is bound on the transport, so the address cannot route.
        let transport = LoopbackTransport::new();
        let outcome = relay.handle_message(&blob, &transport).unwrap();

        assert_eq!(outcome, RelayOutcome::ExitDelivered);
        assert_eq!(relay.last_exit_payload().unwrap(), b"final plaintext");
        assert_eq!(relay.last_message_destination(), Some(dead));
    }

    #[test]
    fn test_decrypt_failure_is_terminal_but_relay_survives() {
        let directory = MemoryDirectory::new();
        let relay = test_relay(1, &directory);
        let transport = LoopbackTransport::new();

        let garbage = b"A".repeat(400);
        let result = relay.handle_message(&garbage, &transport);
        assert!(matches!(result, Err(RelayError::Cipher(_))));

        // Slots reflect the failed message: raw recorded, nothing decrypted.
        assert_eq!(relay.last_received_encrypted_message().unwrap(), garbage);
        assert!(relay.last_received_decrypted_message().is_none());
        assert!(relay.last_message_destination().is_none());
        assert_eq!(relay.last_message_source(), Some(1));

        // Next well-formed message still goes through.
        let next = HopAddress::new(4002).unwrap();
        let blob = wrap_for(&relay, &next, b"after the storm");
        let outcome = relay.handle_message(&blob, &transport).unwrap();
        assert_eq!(outcome, RelayOutcome::ExitDelivered);
    }

    #[test]
    fn test_failed_forward_is_surfaced_not_swallowed() {
        let directory = MemoryDirectory::new();
        let relay = test_relay(1, &directory);
        let next = HopAddress::new(4002).unwrap();
        let blob = wrap_for(&relay, &next, b"doomed");

        let mut transport = MockFlakyTransport::new();
        transport.expect_routes().return_const(true);
        transport
            .expect_deliver()
            .times(1)
            .returning(|address, _| Err(DeliveryError::Failed(*address, "link down".into())));

        let result = relay.handle_message(&blob, &transport);
        assert!(matches!(result, Err(RelayError::Delivery(_))));
        // The payload was still observed before the forward attempt.
        assert_eq!(relay.last_received_decrypted_message().unwrap(), b"doomed");
    }

    #[test]
    fn test_slots_are_last_writer_wins() {
        let directory = MemoryDirectory::new();
        let relay = test_relay(1, &directory);
        let transport = LoopbackTransport::new();

        let first = wrap_for(&relay, &HopAddress::new(7).unwrap(), b"first");
        let second = wrap_for(&relay, &HopAddress::new(8).unwrap(), b"second");

        relay.handle_message(&first, &transport).unwrap();
        relay.handle_message(&second, &transport).unwrap();

        assert_eq!(relay.last_received_decrypted_message().unwrap(), b"second");
        assert_eq!(
            relay.last_message_destination(),
            Some(HopAddress::new(8).unwrap())
        );
    }
}
