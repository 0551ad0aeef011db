// Protocol configuration — key size, circuit length, address bases
//
// The wrapped-key split offset in the wire format depends on the RSA modulus
// size; it is derived here (and from the key itself at decrypt time) rather
// than hardcoded at use sites.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::wrapped_key_b64_len;
use crate::message::{AddressError, HopAddress};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("RSA modulus size must be a positive multiple of 8 bits, got {0}")]
    InvalidModulusBits(usize),
    #[error("circuit length must be at least 1")]
    InvalidCircuitLength,
    #[error("relay and user address ranges overlap")]
    OverlappingAddressBases,
}

/// Protocol parameters shared by senders and relays.
///
/// Both sides of a circuit must agree on these: the modulus size fixes the
/// wrapped-key segment length, and the address bases fix how node ids map to
/// routable address tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// RSA modulus size in bits (wire format assumes 2048)
    pub rsa_modulus_bits: usize,
    /// Number of relays in a circuit
    pub circuit_hops: usize,
    /// Address token base for relay inbound addresses (token = base + node id)
    pub relay_address_base: u64,
    /// Address token base for user endpoints (token = base + user id)
    pub user_address_base: u64,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            rsa_modulus_bits: 2048,
            circuit_hops: 3,
            relay_address_base: 4000,
            user_address_base: 5000,
        }
    }
}

impl ProtocolConfig {
    /// Validate protocol configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rsa_modulus_bits == 0 || self.rsa_modulus_bits % 8 != 0 {
            return Err(ConfigError::InvalidModulusBits(self.rsa_modulus_bits));
        }
        if self.circuit_hops == 0 {
            return Err(ConfigError::InvalidCircuitLength);
        }
        if self.relay_address_base == self.user_address_base {
            return Err(ConfigError::OverlappingAddressBases);
        }
        Ok(())
    }

    /// RSA modulus size in bytes — the raw length of a wrapped key segment
    pub fn modulus_bytes(&self) -> usize {
        self.rsa_modulus_bits / 8
    }

    /// Length in base64 characters of the wrapped-key segment that prefixes
    /// every layer blob (344 for a 2048-bit modulus).
    pub fn wrapped_key_len(&self) -> usize {
        wrapped_key_b64_len(self.modulus_bytes())
    }

    /// Inbound address token for a relay node
    pub fn relay_address(&self, node_id: u32) -> Result<HopAddress, AddressError> {
        HopAddress::new(self.relay_address_base + u64::from(node_id))
    }

    /// Address token for a user endpoint
    pub fn user_address(&self, user_id: u32) -> Result<HopAddress, AddressError> {
        HopAddress::new(self.user_address_base + u64::from(user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ProtocolConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.circuit_hops, 3);
        assert_eq!(config.rsa_modulus_bits, 2048);
    }

    #[test]
    fn test_wrapped_key_len_for_2048_bits() {
        let config = ProtocolConfig::default();
        assert_eq!(config.modulus_bytes(), 256);
        assert_eq!(config.wrapped_key_len(), 344);
    }

    #[test]
    fn test_wrapped_key_len_tracks_modulus() {
        let config = ProtocolConfig {
            rsa_modulus_bits: 4096,
            ..ProtocolConfig::default()
        };
        // 512 raw bytes -> 4 * ceil(512 / 3) base64 chars
        assert_eq!(config.wrapped_key_len(), 684);
    }

    #[test]
    fn test_invalid_modulus_bits() {
        let config = ProtocolConfig {
            rsa_modulus_bits: 2047,
            ..ProtocolConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_circuit_hops_rejected() {
        let config = ProtocolConfig {
            circuit_hops: 0,
            ..ProtocolConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_address_derivation() {
        let config = ProtocolConfig::default();
        assert_eq!(config.relay_address(7).unwrap().encode(), "0000004007");
        assert_eq!(config.user_address(1).unwrap().encode(), "0000005001");
    }
}
