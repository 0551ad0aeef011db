// Onion construction — nested layer encryption, innermost first
//
// Wrapping runs from the hop nearest the destination back to the entry, so
// peeling at each relay reveals exactly one envelope: the next hop's address
// and an opaque remainder. Only the exit layer contains the real destination
// and the application payload.

use thiserror::Error;
use tracing::debug;

use crate::config::ProtocolConfig;
use crate::crypto::{encrypt_for_hop, import_public, CipherError, KeyError};
use crate::message::{AddressError, HopAddress, PlaintextEnvelope};
use crate::registry::NodeDescriptor;

#[derive(Debug, Error)]
pub enum OnionError {
    #[error("cannot build an onion over an empty circuit")]
    EmptyCircuit,
    #[error(transparent)]
    Key(#[from] KeyError),
    #[error(transparent)]
    Cipher(#[from] CipherError),
    #[error(transparent)]
    Address(#[from] AddressError),
}

/// Build the nested onion for a message.
///
/// `circuit` is ordered entry first. Returns the entry hop's address and the
/// fully wrapped blob; all per-hop encryptions complete before the caller
/// issues any network call.
pub fn build_onion(
    message: &[u8],
    destination: HopAddress,
    circuit: &[NodeDescriptor],
    config: &ProtocolConfig,
) -> Result<(HopAddress, String), OnionError> {
    if circuit.is_empty() {
        return Err(OnionError::EmptyCircuit);
    }

    let mut next_address = destination;
    let mut payload = message.to_vec();

    // Innermost (exit) layer first, entry layer last.
    for hop in circuit.iter().rev() {
        let envelope = PlaintextEnvelope::encode(&next_address, &payload);
        let hop_key = import_public(&hop.pub_key)?;
        payload = encrypt_for_hop(&envelope, &hop_key)?.into_bytes();
        next_address = config.relay_address(hop.node_id)?;
    }

    debug!(entry = %next_address, layers = circuit.len(), "onion constructed");
    // Layers are base64 text end to end; the outermost blob is valid UTF-8.
    let blob = String::from_utf8(payload).map_err(|_| CipherError::EncryptionFailed)?;
    Ok((next_address, blob))
}
