//! Key pairs, addresses and signature checks

use crate::error::LedgerError;
use once_cell::sync::Lazy;
use rand::rngs::OsRng;
use secp256k1::{
    constants::{COMPACT_SIGNATURE_SIZE, PUBLIC_KEY_SIZE},
    ecdsa::Signature,
    All, Message, PublicKey, Secp256k1, SecretKey,
};
use sha2::{Digest, Sha256};

/// Shared secp256k1 context, built once.
static SECP256K1_CONTEXT: Lazy<Secp256k1<All>> = Lazy::new(Secp256k1::new);

/// An account address: SHA-256 of the compressed public key.
pub type Address = [u8; 32];

/// The all-zero address. Never derivable from a key, used as "unset".
pub const ZERO_ADDRESS: Address = [0u8; 32];

pub fn address_to_hex(addr: &Address) -> String {
    hex::encode(addr)
}

pub fn address_from_hex(hex_str: &str) -> Result<Address, LedgerError> {
    let bytes = hex::decode(hex_str)
        .map_err(|e| LedgerError::CryptoError(format!("Invalid hex address: {}", e)))?;
    if bytes.len() != 32 {
        return Err(LedgerError::CryptoError(format!(
            "Address must be 32 bytes, got {}",
            bytes.len()
        )));
    }
    bytes
        .try_into()
        .map_err(|_| LedgerError::CryptoError("Failed to convert bytes into address".to_string()))
}

/// Shortened form for log lines, e.g. `3fa1c2d9…9b01`.
pub fn short_address(addr: &Address) -> String {
    short_hex(&address_to_hex(addr))
}

/// Same shortening for an already hex-encoded id. Short input is returned as is.
pub fn short_hex(full: &str) -> String {
    if full.len() <= 12 || !full.is_ascii() {
        return full.to_string();
    }
    format!("{}…{}", &full[..8], &full[full.len() - 4..])
}

/// Derives the address owned by a compressed public key.
pub fn address_from_public_key(public_key_bytes: &[u8]) -> Address {
    Sha256::digest(public_key_bytes).into()
}

#[derive(Debug, Clone)]
pub struct KeyPair {
    pub secret_key: SecretKey,
    pub public_key: PublicKey,
}

impl KeyPair {
    pub fn generate() -> Self {
        let secret_key = SecretKey::new(&mut OsRng);
        Self::from_secret_key(secret_key)
    }

    pub fn from_secret_key(secret_key: SecretKey) -> Self {
        let public_key = PublicKey::from_secret_key(&SECP256K1_CONTEXT, &secret_key);
        KeyPair {
            secret_key,
            public_key,
        }
    }

    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self, LedgerError> {
        SecretKey::from_slice(bytes)
            .map(Self::from_secret_key)
            .map_err(|e| LedgerError::CryptoError(format!("Invalid secret key ({} bytes): {}", bytes.len(), e)))
    }

    pub fn from_secret_hex(secret_hex: &str) -> Result<Self, LedgerError> {
        let bytes = hex::decode(secret_hex.trim())
            .map_err(|e| LedgerError::CryptoError(format!("Invalid secret key hex: {}", e)))?;
        Self::from_secret_bytes(&bytes)
    }

    pub fn secret_hex(&self) -> String {
        hex::encode(self.secret_key.secret_bytes())
    }

    pub fn address(&self) -> Address {
        address_from_public_key(&self.public_key_bytes())
    }

    pub fn public_key_bytes(&self) -> [u8; PUBLIC_KEY_SIZE] {
        self.public_key.serialize()
    }

    /// Signs the SHA-256 digest of `message`, returning a compact signature.
    pub fn sign(&self, message: &[u8]) -> Result<[u8; COMPACT_SIGNATURE_SIZE], LedgerError> {
        let digest = Sha256::digest(message);
        let message = Message::from_digest_slice(&digest)
            .map_err(|e| LedgerError::CryptoError(format!("Failed to create message: {}", e)))?;

        let signature = SECP256K1_CONTEXT.sign_ecdsa(&message, &self.secret_key);
        Ok(signature.serialize_compact())
    }
}

/// Checks a compact signature over the SHA-256 of `message`. Only compressed
/// keys are accepted, since addresses are derived from that encoding.
pub fn verify_signature(
    public_key_bytes: &[u8],
    message: &[u8],
    signature_bytes: &[u8],
) -> Result<(), LedgerError> {
    if public_key_bytes.len() != PUBLIC_KEY_SIZE {
        return Err(LedgerError::CryptoError(format!(
            "expected a {}-byte compressed public key, got {} bytes",
            PUBLIC_KEY_SIZE,
            public_key_bytes.len()
        )));
    }
    let public_key = PublicKey::from_slice(public_key_bytes)
        .map_err(|e| LedgerError::CryptoError(format!("Invalid public key: {}", e)))?;

    let digest = Sha256::digest(message);
    let message = Message::from_digest_slice(&digest)
        .map_err(|e| LedgerError::CryptoError(format!("Failed to create message: {}", e)))?;

    let signature = Signature::from_compact(signature_bytes)
        .map_err(|e| LedgerError::CryptoError(format!("Invalid signature: {}", e)))?;

    SECP256K1_CONTEXT
        .verify_ecdsa(&message, &signature, &public_key)
        .map_err(|_| LedgerError::CryptoError("Signature verification failed".to_string()))
}
