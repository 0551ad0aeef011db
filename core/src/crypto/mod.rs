// Cryptography module — key codecs and the hybrid layer cipher

pub mod hybrid;
pub mod keys;

pub use hybrid::{decrypt_layer, encrypt_for_hop, wrapped_key_b64_len, CipherError, IV_LEN};
pub use keys::{
    export_private, export_public, generate_keypair, import_private, import_public, KeyError,
    SymmetricKey, SYMMETRIC_KEY_LEN,
};

#[cfg(test)]
pub(crate) mod test_support {
    use rsa::{RsaPrivateKey, RsaPublicKey};
    use std::sync::OnceLock;

    // 2048-bit keygen is expensive; share one pair across the crypto tests.
    pub fn test_keypair() -> &'static (RsaPublicKey, RsaPrivateKey) {
        static PAIR: OnceLock<(RsaPublicKey, RsaPrivateKey)> = OnceLock::new();
        PAIR.get_or_init(|| super::generate_keypair(2048).expect("test keypair generation"))
    }
}
