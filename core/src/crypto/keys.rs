// Key codecs — RSA keypairs and 256-bit symmetric keys
//
// Public keys travel as base64 SPKI DER, private keys as base64 PKCS#8 DER,
// symmetric keys as base64 of the raw 32 bytes. These encodings are part of
// the directory exchange format and must stay stable.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rand::RngCore;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use rsa::{RsaPrivateKey, RsaPublicKey};
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Symmetric key length in bytes (AES-256)
pub const SYMMETRIC_KEY_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("key generation failed: {0}")]
    GenerationFailed(String),
    #[error("key import failed")]
    ImportFailed,
    #[error("key export failed")]
    ExportFailed,
}

/// Generate an RSA keypair for OAEP/SHA-256 key wrapping.
///
/// The wire format fixes the modulus at 2048 bits; other sizes are accepted
/// so the wrapped-key offset logic can be exercised against them.
pub fn generate_keypair(modulus_bits: usize) -> Result<(RsaPublicKey, RsaPrivateKey), KeyError> {
    let mut rng = rand::rngs::OsRng;
    let private_key = RsaPrivateKey::new(&mut rng, modulus_bits)
        .map_err(|e| KeyError::GenerationFailed(e.to_string()))?;
    let public_key = RsaPublicKey::from(&private_key);
    Ok((public_key, private_key))
}

/// Export a public key as base64-encoded SPKI DER
pub fn export_public(key: &RsaPublicKey) -> Result<String, KeyError> {
    let der = key.to_public_key_der().map_err(|_| KeyError::ExportFailed)?;
    Ok(BASE64.encode(der.as_bytes()))
}

/// Export a private key as base64-encoded PKCS#8 DER.
///
/// `None` means "private key unknown" (an untrusted peer whose secret never
/// left its process) and exports as `None`, not an error.
pub fn export_private(key: Option<&RsaPrivateKey>) -> Result<Option<String>, KeyError> {
    let Some(key) = key else {
        return Ok(None);
    };
    let der = key.to_pkcs8_der().map_err(|_| KeyError::ExportFailed)?;
    Ok(Some(BASE64.encode(der.as_bytes())))
}

/// Import a public key from base64-encoded SPKI DER
pub fn import_public(encoded: &str) -> Result<RsaPublicKey, KeyError> {
    let der = BASE64.decode(encoded).map_err(|_| KeyError::ImportFailed)?;
    RsaPublicKey::from_public_key_der(&der).map_err(|_| KeyError::ImportFailed)
}

/// Import a private key from base64-encoded PKCS#8 DER
pub fn import_private(encoded: &str) -> Result<RsaPrivateKey, KeyError> {
    let der = BASE64.decode(encoded).map_err(|_| KeyError::ImportFailed)?;
    RsaPrivateKey::from_pkcs8_der(&der).map_err(|_| KeyError::ImportFailed)
}

/// A 256-bit AES key. Key material is wiped on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey([u8; SYMMETRIC_KEY_LEN]);

impl SymmetricKey {
    /// Generate a fresh random key
    pub fn generate() -> Self {
        let mut bytes = [0u8; SYMMETRIC_KEY_LEN];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Reconstruct a key from raw bytes; rejects anything but 32 bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        let raw: [u8; SYMMETRIC_KEY_LEN] = bytes.try_into().map_err(|_| KeyError::ImportFailed)?;
        Ok(Self(raw))
    }

    pub fn as_bytes(&self) -> &[u8; SYMMETRIC_KEY_LEN] {
        &self.0
    }

    /// Export the raw key material as base64
    pub fn export(&self) -> String {
        BASE64.encode(self.0)
    }

    /// Import a key from base64-encoded raw material
    pub fn import(encoded: &str) -> Result<Self, KeyError> {
        let bytes = BASE64.decode(encoded).map_err(|_| KeyError::ImportFailed)?;
        Self::from_bytes(&bytes)
    }
}
