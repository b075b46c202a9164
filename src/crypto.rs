use anyhow::anyhow;
use argon2::{Algorithm, Argon2, Params, Version};
use base64::{Engine as _, engine::general_purpose};
use chacha20poly1305::{
    KeyInit, XChaCha20Poly1305, XNonce,
    aead::{Aead, AeadCore, OsRng},
};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::error::StoreError;

/// Random key that seals the entry list. Never written in clear.
pub type MasterKey = Zeroizing<[u8; 32]>;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct KdfParams {
    pub algo: String, // "argon2id"
    pub memory_mib: u32,
    pub iterations: u32,
    pub parallelism: u32,
    pub salt: String, // base64
}

impl KdfParams {
    /// Argon2id, 32 MiB, 3 passes, fresh salt.
    pub fn generate() -> Self {
        Self::with_cost(32, 3)
    }

    pub fn with_cost(memory_mib: u32, iterations: u32) -> Self {
        let mut salt = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut salt);
        Self {
            algo: "argon2id".to_string(),
            memory_mib,
            iterations,
            parallelism: 1,
            salt: general_purpose::STANDARD.encode(salt),
        }
    }
}

/// Nonce + ciphertext, both base64.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Sealed {
    pub nonce: String,
    pub ciphertext: String,
}

pub fn generate_master_key() -> MasterKey {
    let mut key = Zeroizing::new([0u8; 32]);
    rand::thread_rng().fill_bytes(&mut key[..]);
    key
}

/// Key-encryption key from the master password.
fn derive_kek(password: &str, kdf: &KdfParams) -> anyhow::Result<Zeroizing<[u8; 32]>> {
    if kdf.algo != "argon2id" {
        return Err(anyhow!("unsupported kdf '{}'", kdf.algo));
    }
    let salt = general_purpose::STANDARD.decode(&kdf.salt)?;
    let params = Params::new(kdf.memory_mib * 1024, kdf.iterations, kdf.parallelism, Some(32))
        .map_err(|e| anyhow!("argon2 params error: {e}"))?;

    let mut kek = Zeroizing::new([0u8; 32]);
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
        .hash_password_into(password.as_bytes(), &salt, &mut kek[..])
        .map_err(|e| anyhow!("argon2 error: {e}"))?;
    Ok(kek)
}

pub fn seal(key: &[u8; 32], plaintext: &[u8]) -> anyhow::Result<Sealed> {
    let cipher = XChaCha20Poly1305::new(chacha20poly1305::Key::from_slice(key));
    let nonce = XChaCha20Poly1305::generate_nonce(&mut OsRng);
    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|e| anyhow!("encrypt error: {e}"))?;

    Ok(Sealed {
        nonce: general_purpose::STANDARD.encode(nonce),
        ciphertext: general_purpose::STANDARD.encode(ciphertext),
    })
}

/// `None` when the key is wrong or the data was tampered with.
pub fn open(key: &[u8; 32], sealed: &Sealed) -> anyhow::Result<Option<Zeroizing<Vec<u8>>>> {
    let nonce = general_purpose::STANDARD.decode(&sealed.nonce)?;
    if nonce.len() != 24 {
        return Err(anyhow!("invalid nonce length {}", nonce.len()));
    }
    let ciphertext = general_purpose::STANDARD.decode(&sealed.ciphertext)?;

    let cipher = XChaCha20Poly1305::new(chacha20poly1305::Key::from_slice(key));
    Ok(cipher
        .decrypt(XNonce::from_slice(&nonce), ciphertext.as_ref())
        .ok()
        .map(Zeroizing::new))
}

/// Encrypt the master key under the password.
pub fn wrap_master_key(password: &str, kdf: &KdfParams, master_key: &MasterKey) -> anyhow::Result<Sealed> {
    let kek = derive_kek(password, kdf)?;
    seal(&kek, &master_key[..])
}

pub fn unwrap_master_key(password: &str, kdf: &KdfParams, wrapped: &Sealed) -> Result<MasterKey, StoreError> {
    let kek = derive_kek(password, kdf)?;
    let plain = open(&kek, wrapped)?.ok_or(StoreError::InvalidMasterPassword)?;
    if plain.len() != 32 {
        return Err(anyhow!("invalid master key length").into());
    }

    let mut key = Zeroizing::new([0u8; 32]);
    key.copy_from_slice(&plain);
    Ok(key)
}
