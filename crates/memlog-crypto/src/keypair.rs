use ed25519_dalek::{Signer as _, SigningKey, Verifier as _, VerifyingKey};
use thiserror::Error;
use zeroize::Zeroizing;

#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("invalid signature")]
    InvalidSignature,
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),
    #[error("invalid secret key: {0}")]
    InvalidSecretKey(String),
}

/// Sign `message` with a raw 32-byte Ed25519 secret key. Returns
/// `"ed25519:" + 128 hex chars`. Deterministic per RFC 8032.
pub fn sign(secret_key_bytes: &[u8], message: &[u8]) -> Result<String, SignatureError> {
    let arr: [u8; 32] = secret_key_bytes
        .try_into()
        .map_err(|_| SignatureError::InvalidSecretKey("expected 32 bytes".into()))?;
    let signing_key = SigningKey::from_bytes(&arr);
    let sig = signing_key.sign(message);
    Ok(format!("ed25519:{}", hex::encode(sig.to_bytes())))
}

/// Verify a `"ed25519:" + 128 hex`-tagged signature against a raw 32-byte
/// public key.
pub fn verify(message: &[u8], tagged_sig: &str, public_key_bytes: &[u8]) -> Result<(), SignatureError> {
    let (algo, hex_part) = tagged_sig
        .split_once(':')
        .ok_or(SignatureError::InvalidSignature)?;
    if algo != "ed25519" {
        return Err(SignatureError::InvalidSignature);
    }
    let sig_bytes = hex::decode(hex_part).map_err(|_| SignatureError::InvalidSignature)?;
    let sig_arr: [u8; 64] = sig_bytes
        .try_into()
        .map_err(|_| SignatureError::InvalidSignature)?;
    let signature = ed25519_dalek::Signature::from_bytes(&sig_arr);

    let pk_arr: [u8; 32] = public_key_bytes
        .try_into()
        .map_err(|_| SignatureError::InvalidPublicKey("expected 32 bytes".into()))?;
    let verifying_key = VerifyingKey::from_bytes(&pk_arr)
        .map_err(|e| SignatureError::InvalidPublicKey(e.to_string()))?;

    verifying_key
        .verify(message, &signature)
        .map_err(|_| SignatureError::InvalidSignature)
}

/// An Ed25519 keypair. The secret key is held in a `Zeroizing<Vec<u8>>` and
/// wiped on drop so a dropped keypair never leaves secret bytes lingering
/// in freed memory.
pub struct KeyPair {
    public_key: [u8; 32],
    secret_key: Zeroizing<Vec<u8>>,
}

impl KeyPair {
    /// Generate a fresh Ed25519 keypair using the OS RNG.
    pub fn generate() -> Self {
        let mut csprng = rand::rngs::OsRng;
        let signing_key = SigningKey::generate(&mut csprng);
        Self {
            public_key: signing_key.verifying_key().to_bytes(),
            secret_key: Zeroizing::new(signing_key.to_bytes().to_vec()),
        }
    }

    /// Reconstruct a keypair from raw 32-byte secret key material (e.g.
    /// loaded from `agent.key` or decrypted from `agent.key.enc`).
    pub fn from_secret_key_bytes(secret_key_bytes: Vec<u8>) -> Result<Self, SignatureError> {
        let arr: [u8; 32] = secret_key_bytes
            .clone()
            .try_into()
            .map_err(|_| SignatureError::InvalidSecretKey("expected 32 bytes".into()))?;
        let signing_key = SigningKey::from_bytes(&arr);
        Ok(Self {
            public_key: signing_key.verifying_key().to_bytes(),
            secret_key: Zeroizing::new(secret_key_bytes),
        })
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key)
    }

    pub fn public_key_bytes(&self) -> &[u8; 32] {
        &self.public_key
    }

    pub fn secret_key_bytes(&self) -> &[u8] {
        &self.secret_key
    }

    pub fn sign(&self, message: &[u8]) -> String {
        sign(&self.secret_key, message).expect("sign with a valid 32-byte secret key is infallible")
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KeyPair {{ public_key: {} }}", self.public_key_hex())
    }
}
