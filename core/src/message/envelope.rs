// Plaintext envelope — address-prefixed payload, no delimiter
//
// What a hop sees after decrypting its layer: a 10-character address field
// followed immediately by the payload (the next ciphertext, or the
// application message at the exit).

use thiserror::Error;

use super::address::{AddressError, HopAddress, ADDRESS_WIDTH};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnvelopeError {
    #[error("envelope shorter than the {ADDRESS_WIDTH}-character address field")]
    Truncated,
    #[error("address field is not ASCII text")]
    BadAddressField,
}

/// A decrypted envelope split at the fixed address boundary.
///
/// The address field is kept as text: whether it parses as a routable token
/// decides forwarding vs. exit delivery, and that decision belongs to the
/// relay, not the codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaintextEnvelope<'a> {
    address_field: &'a str,
    payload: &'a [u8],
}

impl<'a> PlaintextEnvelope<'a> {
    /// Prefix a payload with the next hop's encoded address
    pub fn encode(next: &HopAddress, payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(ADDRESS_WIDTH + payload.len());
        out.extend_from_slice(next.encode().as_bytes());
        out.extend_from_slice(payload);
        out
    }

    /// Split a decrypted envelope at the fixed address boundary
    pub fn split(bytes: &'a [u8]) -> Result<Self, EnvelopeError> {
        if bytes.len() < ADDRESS_WIDTH {
            return Err(EnvelopeError::Truncated);
        }
        let (field, payload) = bytes.split_at(ADDRESS_WIDTH);
        let address_field =
            std::str::from_utf8(field).map_err(|_| EnvelopeError::BadAddressField)?;
        Ok(Self {
            address_field,
            payload,
        })
    }

    /// The raw 10-character address field
    pub fn address_field(&self) -> &'a str {
        self.address_field
    }

    /// Parse the address field as a routable token
    pub fn next_hop(&self) -> Result<HopAddress, AddressError> {
        HopAddress::decode(self.address_field)
    }

    /// Everything after the address field
    pub fn payload(&self) -> &'a [u8] {
        self.payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_split_roundtrip() {
        let next = HopAddress::new(4002).unwrap();
        let bytes = PlaintextEnvelope::encode(&next, b"inner ciphertext");

        let envelope = PlaintextEnvelope::split(&bytes).unwrap();
        assert_eq!(envelope.next_hop().unwrap(), next);
        assert_eq!(envelope.payload(), b"inner ciphertext");
    }

    #[test]
    fn test_empty_payload() {
        let next = HopAddress::new(5001).unwrap();
        let bytes = PlaintextEnvelope::encode(&next, b"");

        let envelope = PlaintextEnvelope::split(&bytes).unwrap();
        assert_eq!(bytes.len(), ADDRESS_WIDTH);
        assert!(envelope.payload().is_empty());
    }

    #[test]
    fn test_split_rejects_short_input() {
        assert_eq!(
            PlaintextEnvelope::split(b"123"),
            Err(EnvelopeError::Truncated)
        );
        assert_eq!(PlaintextEnvelope::split(b""), Err(EnvelopeError::Truncated));
    }

    #[test]
    fn test_unparsable_address_field_is_not_a_split_error() {
        // The split succeeds; only next_hop() reports the field as non-routable.
        let envelope = PlaintextEnvelope::split(b"not-a-addrpayload").unwrap();
        assert_eq!(envelope.address_field(), "not-a-addr");
        assert!(envelope.next_hop().is_err());
        assert_eq!(envelope.payload(), b"payload");
    }
}
