use super::device_key::DeviceKey;
use crate::errors::{AppError, AppResult};
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

const NONCE_LEN: usize = 12;

const INTEGRITY_CONTEXT: &str = "rfieldclock 2026-03 record integrity";
const CREDENTIAL_CONTEXT: &str = "rfieldclock 2026-03 credential digest";

/// Output of [`RecordCipher::seal`]: nonce-prefixed ciphertext plus the hex
/// integrity tag computed over it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sealed {
    pub ciphertext: Vec<u8>,
    pub integrity_tag: String,
}

/// Encrypts and authenticates individual records under the device key.
///
/// The integrity tag uses a subkey derived from the device key, so it is
/// independent of the AEAD key.
pub struct RecordCipher {
    aead: ChaCha20Poly1305,
    mac_key: [u8; 32],
    credential_key: [u8; 32],
}

impl RecordCipher {
    pub fn new(key: &DeviceKey) -> Self {
        let bytes = key.as_bytes();
        Self {
            aead: ChaCha20Poly1305::new(Key::from_slice(bytes)),
            mac_key: blake3::derive_key(INTEGRITY_CONTEXT, bytes),
            credential_key: blake3::derive_key(CREDENTIAL_CONTEXT, bytes),
        }
    }

    pub fn seal(&self, plaintext: &[u8]) -> AppResult<Sealed> {
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);

        let body = self
            .aead
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|e| AppError::Crypto(format!("encryption failed: {e}")))?;

        let mut ciphertext = Vec::with_capacity(NONCE_LEN + body.len());
        ciphertext.extend_from_slice(&nonce);
        ciphertext.extend_from_slice(&body);

        let integrity_tag = self.tag(&ciphertext);
        Ok(Sealed {
            ciphertext,
            integrity_tag,
        })
    }

    /// Verify the tag first, then decrypt. Any failure is an integrity error
    /// for `record_id`.
    pub fn open(&self, record_id: &str, ciphertext: &[u8], integrity_tag: &str) -> AppResult<Vec<u8>> {
        let integrity = || AppError::Integrity(record_id.to_string());

        let expected = blake3::Hash::from_hex(integrity_tag).map_err(|_| integrity())?;
        // blake3::Hash equality is constant time.
        if blake3::keyed_hash(&self.mac_key, ciphertext) != expected {
            return Err(integrity());
        }

        if ciphertext.len() < NONCE_LEN {
            return Err(integrity());
        }
        let (nonce, body) = ciphertext.split_at(NONCE_LEN);

        self.aead
            .decrypt(Nonce::from_slice(nonce), body)
            .map_err(|_| integrity())
    }

    pub fn tag(&self, ciphertext: &[u8]) -> String {
        blake3::keyed_hash(&self.mac_key, ciphertext)
            .to_hex()
            .to_string()
    }

    fn credential_hash(&self, username: &str, password: &str) -> blake3::Hash {
        let mut hasher = blake3::Hasher::new_keyed(&self.credential_key);
        hasher.update(username.as_bytes());
        hasher.update(&[0]);
        hasher.update(password.as_bytes());
        hasher.finalize()
    }

    /// Keyed digest of a credential pair, stored instead of the password.
    pub fn credential_digest(&self, username: &str, password: &str) -> String {
        self.credential_hash(username, password).to_hex().to_string()
    }

    pub fn verify_credential(&self, username: &str, password: &str, digest: &str) -> bool {
        blake3::Hash::from_hex(digest)
            .map(|expected| self.credential_hash(username, password) == expected)
            .unwrap_or(false)
    }
}

/// Lowercase hex SHA-256 of a PIN, the form the remote authority hands out
/// in the user's work info.
pub fn pin_digest(pin: &str) -> String {
    hex::encode(Sha256::digest(pin.as_bytes()))
}
