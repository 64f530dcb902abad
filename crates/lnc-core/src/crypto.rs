use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::{PublicKey, SecretKey};
use sha2::{Digest, Sha256};
use std::fmt;

/// Ephemeral secp256k1 keypair used for the local side of one mailbox
/// handshake. Never persisted; the secret scalar is zeroized on drop by
/// `k256::SecretKey`.
pub struct SessionKeypair {
    secret: SecretKey,
}

impl SessionKeypair {
    pub fn generate() -> Self {
        Self {
            secret: SecretKey::random(&mut rand::rngs::OsRng),
        }
    }

    pub fn public_key(&self) -> PublicKey {
        self.secret.public_key()
    }

    /// 33-byte SEC1 compressed public key.
    pub fn public_key_bytes(&self) -> Vec<u8> {
        self.public_key().to_encoded_point(true).as_bytes().to_vec()
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key_bytes())
    }

    /// Borrow the secret for handing to the relay library.
    pub fn secret(&self) -> &SecretKey {
        &self.secret
    }

    /// Short, log-safe identifier for this session key.
    pub fn fingerprint(&self) -> String {
        key_fingerprint(&self.public_key_bytes())
    }
}

impl fmt::Debug for SessionKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionKeypair")
            .field("fingerprint", &self.fingerprint())
            .finish_non_exhaustive()
    }
}

/// Hex of the first 8 bytes of SHA-256 over a serialized public key.
pub fn key_fingerprint(public_key: &[u8]) -> String {
    let hash = Sha256::digest(public_key);
    hex::encode(&hash[..8])
}
