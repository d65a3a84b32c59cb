//! Signing keys and HMAC-SHA256 artifact signatures

use std::fmt;
use std::sync::OnceLock;

use base64::{engine::general_purpose::STANDARD, Engine};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use tracing::warn;

use crate::error::ConfigError;

type HmacSha256 = Hmac<Sha256>;

/// Signing keys are 32 random bytes
pub const KEY_LEN: usize = 32;

/// Signatures are full-length HMAC-SHA256 digests
pub const SIGNATURE_LEN: usize = 32;

static EPHEMERAL: OnceLock<SigningKey> = OnceLock::new();

#[derive(Clone, PartialEq, Eq)]
pub struct SigningKey([u8; KEY_LEN]);

impl SigningKey {
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, ConfigError> {
        let key: [u8; KEY_LEN] = bytes
            .try_into()
            .map_err(|_| ConfigError::InvalidKeyLength(bytes.len()))?;
        Ok(Self(key))
    }

    /// Decode a key from standard base64, the form it is provisioned in
    pub fn from_base64(encoded: &str) -> Result<Self, ConfigError> {
        let bytes = STANDARD.decode(encoded.trim())?;
        Self::from_slice(&bytes)
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }

    /// Fresh key from the thread-local CSPRNG
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn sign(&self, payload: &[u8]) -> [u8; SIGNATURE_LEN] {
        let mut mac = self.mac();
        mac.update(payload);
        let mut signature = [0u8; SIGNATURE_LEN];
        signature.copy_from_slice(&mac.finalize().into_bytes());
        signature
    }

    /// Constant-time comparison of `signature` against the payload's MAC
    pub fn verify(&self, payload: &[u8], signature: &[u8]) -> bool {
        let mut mac = self.mac();
        mac.update(payload);
        mac.verify_slice(signature).is_ok()
    }

    fn mac(&self) -> HmacSha256 {
        HmacSha256::new_from_slice(&self.0).expect("HMAC accepts keys of any length")
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningKey([REDACTED])")
    }
}

/// Key shared by every unprovisioned compiler in this process.
///
/// Artifacts signed with it cannot be verified by any other process.
pub fn ephemeral_key() -> &'static SigningKey {
    EPHEMERAL.get_or_init(|| {
        warn!("No signing key configured; generated an ephemeral key for this process");
        SigningKey::generate()
    })
}
