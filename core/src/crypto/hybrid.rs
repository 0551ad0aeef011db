// Hybrid layer cipher — RSA-OAEP key wrapping around AES-256-CBC
//
// One onion layer on the wire is two base64 segments with no delimiter:
//
//   base64( RSA-OAEP-SHA256( raw 32-byte AES key ) )  — fixed width
//   base64( 16-byte IV || AES-256-CBC ciphertext )    — variable width
//
// The wrapped-key segment length depends only on the RSA modulus size
// (344 chars at 2048 bits), never on the plaintext, which is what lets a
// relay split the blob without any framing bytes.

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rand::RngCore;
use rsa::traits::PublicKeyParts;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use thiserror::Error;

use super::keys::SymmetricKey;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// AES-CBC initialization vector length in bytes
pub const IV_LEN: usize = 16;

#[derive(Debug, Error)]
pub enum CipherError {
    #[error("layer encryption failed")]
    EncryptionFailed,
    #[error("layer decryption failed")]
    DecryptionFailed,
}

/// Base64 length of an RSA ciphertext for the given modulus size in bytes.
///
/// 256 raw bytes encode to 344 characters; this is the split offset a relay
/// uses to separate the wrapped key from the body segment.
pub fn wrapped_key_b64_len(modulus_bytes: usize) -> usize {
    4 * modulus_bytes.div_ceil(3)
}

/// Encrypt one onion layer for a hop.
///
/// Generates a fresh symmetric key and IV, encrypts the plaintext under
/// AES-256-CBC, wraps the key with the hop's RSA public key, and returns the
/// two base64 segments concatenated with no separator.
pub fn encrypt_for_hop(
    plaintext: &[u8],
    hop_public_key: &RsaPublicKey,
) -> Result<String, CipherError> {
    let key = SymmetricKey::generate();
    let mut iv = [0u8; IV_LEN];
    rand::rngs::OsRng.fill_bytes(&mut iv);

    let ciphertext = Aes256CbcEnc::new_from_slices(key.as_bytes(), &iv)
        .map_err(|_| CipherError::EncryptionFailed)?
        .encrypt_padded_vec_mut::<Pkcs7>(plaintext);

    let mut body = Vec::with_capacity(IV_LEN + ciphertext.len());
    body.extend_from_slice(&iv);
    body.extend_from_slice(&ciphertext);

    let wrapped_key = hop_public_key
        .encrypt(&mut rand::rngs::OsRng, Oaep::new::<Sha256>(), key.as_bytes())
        .map_err(|_| CipherError::EncryptionFailed)?;
    debug_assert_eq!(wrapped_key.len(), hop_public_key.size());

    let mut blob = BASE64.encode(&wrapped_key);
    blob.push_str(&BASE64.encode(&body));
    Ok(blob)
}

/// Decrypt one onion layer with a hop's private key.
///
/// The split offset is derived from the private key's modulus size. Any
/// malformed input — truncated blob, corrupted segment, wrong key — is a
/// single terminal `DecryptionFailed`; there is no partial recovery and,
/// CBC carrying no authentication tag, no integrity check beyond unpadding.
pub fn decrypt_layer(blob: &str, hop_private_key: &RsaPrivateKey) -> Result<Vec<u8>, CipherError> {
    let offset = wrapped_key_b64_len(hop_private_key.size());
    let raw = blob.as_bytes();
    if raw.len() <= offset {
        return Err(CipherError::DecryptionFailed);
    }
    let (key_segment, body_segment) = raw.split_at(offset);

    let wrapped_key = BASE64
        .decode(key_segment)
        .map_err(|_| CipherError::DecryptionFailed)?;
    let key_bytes = hop_private_key
        .decrypt(Oaep::new::<Sha256>(), &wrapped_key)
        .map_err(|_| CipherError::DecryptionFailed)?;
    let key = SymmetricKey::from_bytes(&key_bytes).map_err(|_| CipherError::DecryptionFailed)?;

    let body = BASE64
        .decode(body_segment)
        .map_err(|_| CipherError::DecryptionFailed)?;
    if body.len() < IV_LEN {
        return Err(CipherError::DecryptionFailed);
    }
    let (iv, ciphertext) = body.split_at(IV_LEN);

    Aes256CbcDec::new_from_slices(key.as_bytes(), iv)
        .map_err(|_| CipherError::DecryptionFailed)?
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| CipherError::DecryptionFailed)
}
