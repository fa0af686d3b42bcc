//! Password protected profile exports.
//!
//! The key is derived with PBKDF2-HMAC-SHA256 from the password and a random
//! per-export salt, the profile JSON is sealed with AES-256-GCM, and the
//! result is written as a small JSON envelope:
//!
//! ```json
//! {
//!   "format": "texsort-profile-export",
//!   "version": 1,
//!   "algorithm": "PBKDF2-HMAC-SHA256/AES-256-GCM",
//!   "iterations": 100000,
//!   "salt": "<base64>",
//!   "nonce": "<base64>",
//!   "ciphertext": "<base64>"
//! }
//! ```
//!
//! The header fields are authenticated along with the ciphertext, so editing
//! any of them makes decryption fail.

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use ring::rand::{SecureRandom, SystemRandom};
use ring::{aead, pbkdf2};
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;

use crate::error::{ErrorKind, Result};

pub const ENVELOPE_FORMAT: &str = "texsort-profile-export";
pub const ENVELOPE_VERSION: u32 = 1;
pub const ALGORITHM: &str = "PBKDF2-HMAC-SHA256/AES-256-GCM";
pub const PBKDF2_ITERATIONS: u32 = 100_000;
const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub format: String,
    pub version: u32,
    pub algorithm: String,
    pub iterations: u32,
    pub salt: String,
    pub nonce: String,
    pub ciphertext: String,
}
impl Envelope {
    /// Recognises an envelope, as opposed to a plaintext profile.
    pub fn detect(bytes: &[u8]) -> Option<Self> {
        serde_json::from_slice::<Self>(bytes).ok().filter(|e| e.format == ENVELOPE_FORMAT)
    }

    fn aad(&self) -> aead::Aad<String> {
        aead::Aad::from(format!("{}:{}:{}:{}", self.format, self.version, self.algorithm, self.iterations))
    }
}

fn derive_key(password: &str, salt: &[u8], iterations: NonZeroU32) -> Result<aead::LessSafeKey> {
    let mut key = [0u8; KEY_LEN];
    pbkdf2::derive(pbkdf2::PBKDF2_HMAC_SHA256, iterations, salt, password.as_bytes(), &mut key);
    let unbound = aead::UnboundKey::new(&aead::AES_256_GCM, &key).map_err(|_| ErrorKind::Encryption)?;
    Ok(aead::LessSafeKey::new(unbound))
}

/// Encrypts `plaintext` under `password` with a fresh salt and nonce.
pub fn seal(plaintext: &[u8], password: &str) -> Result<Envelope> {
    let rng = SystemRandom::new();
    let mut salt = [0u8; SALT_LEN];
    rng.fill(&mut salt).map_err(|_| ErrorKind::Encryption)?;
    let mut nonce = [0u8; NONCE_LEN];
    rng.fill(&mut nonce).map_err(|_| ErrorKind::Encryption)?;
    let iterations = NonZeroU32::new(PBKDF2_ITERATIONS).ok_or(ErrorKind::Encryption)?;

    let mut envelope = Envelope {
        format: ENVELOPE_FORMAT.to_string(),
        version: ENVELOPE_VERSION,
        algorithm: ALGORITHM.to_string(),
        iterations: iterations.get(),
        salt: BASE64.encode(salt),
        nonce: BASE64.encode(nonce),
        ciphertext: String::new(),
    };
    let key = derive_key(password, &salt, iterations)?;
    let mut in_out = plaintext.to_vec();
    key.seal_in_place_append_tag(aead::Nonce::assume_unique_for_key(nonce), envelope.aad(), &mut in_out)
        .map_err(|_| ErrorKind::Encryption)?;
    envelope.ciphertext = BASE64.encode(in_out);
    Ok(envelope)
}

/// Decrypts an envelope. Any failure, from bad base64 to a wrong password,
/// is reported as [`ErrorKind::Decryption`]; nothing partially decoded is
/// ever returned.
pub fn open(envelope: &Envelope, password: &str) -> Result<Vec<u8>> {
    if envelope.version != ENVELOPE_VERSION || envelope.algorithm != ALGORITHM {
        exn::bail!(ErrorKind::ProfileCorrupt(format!(
            "unsupported export: version {} using {}",
            envelope.version, envelope.algorithm
        )));
    }
    let iterations = NonZeroU32::new(envelope.iterations).ok_or(ErrorKind::Decryption)?;
    let salt = BASE64.decode(&envelope.salt).map_err(|_| ErrorKind::Decryption)?;
    let nonce: [u8; NONCE_LEN] = BASE64
        .decode(&envelope.nonce)
        .map_err(|_| ErrorKind::Decryption)?
        .try_into()
        .map_err(|_| ErrorKind::Decryption)?;
    let mut in_out = BASE64.decode(&envelope.ciphertext).map_err(|_| ErrorKind::Decryption)?;
    let key = derive_key(password, &salt, iterations)?;
    let plaintext = key
        .open_in_place(aead::Nonce::assume_unique_for_key(nonce), envelope.aad(), &mut in_out)
        .map_err(|_| ErrorKind::Decryption)?;
    Ok(plaintext.to_vec())
}
