use chacha20poly1305::aead::generic_array::GenericArray;
use chacha20poly1305::aead::AeadInPlace;
use chacha20poly1305::{ChaCha20Poly1305, KeyInit};
use rand::RngCore;
use scrypt::Params as ScryptParams;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zeroize::Zeroizing;

use memlog_core::constants::{
    ENVELOPE_IV_LEN, ENVELOPE_TAG_LEN, SCRYPT_LOG_N, SCRYPT_P, SCRYPT_R, SCRYPT_SALT_LEN,
};

#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("passphrase incorrect (authentication tag mismatch)")]
    WrongPassphrase,
    #[error("key derivation failed: {0}")]
    Kdf(String),
    #[error("malformed envelope: {0}")]
    Malformed(String),
}

const ENVELOPE_VERSION: u32 = 1;
const ALGORITHM: &str = "chacha20poly1305";
const KDF: &str = "scrypt";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KdfParams {
    /// Hex-encoded random salt.
    pub salt: String,
    /// log2(N).
    pub log_n: u8,
    pub r: u32,
    pub p: u32,
}

/// The on-disk envelope for a passphrase-wrapped private key
/// (`agent.key.enc`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KeyEnvelope {
    pub version: u32,
    pub algorithm: String,
    pub kdf: String,
    pub kdf_params: KdfParams,
    /// Hex-encoded 12-byte nonce.
    pub iv: String,
    /// Hex-encoded ciphertext (same length as the plaintext secret key).
    pub ciphertext: String,
    /// Hex-encoded 16-byte authentication tag.
    pub auth_tag: String,
}

fn derive_key(passphrase: &str, params: &KdfParams) -> Result<Zeroizing<[u8; 32]>, EnvelopeError> {
    let salt = hex::decode(&params.salt).map_err(|e| EnvelopeError::Malformed(e.to_string()))?;
    let scrypt_params = ScryptParams::new(params.log_n, params.r, params.p, 32)
        .map_err(|e| EnvelopeError::Kdf(e.to_string()))?;
    let mut out = Zeroizing::new([0u8; 32]);
    scrypt::scrypt(passphrase.as_bytes(), &salt, &scrypt_params, out.as_mut())
        .map_err(|e| EnvelopeError::Kdf(e.to_string()))?;
    Ok(out)
}

/// Encrypt `secret_key` under `passphrase`, producing a self-describing
/// envelope. Uses scrypt (default N=2^14, r=8, p=1) + ChaCha20-Poly1305
/// with a random 12-byte nonce.
pub fn encrypt_key(secret_key: &[u8], passphrase: &str) -> Result<KeyEnvelope, EnvelopeError> {
    let mut salt = [0u8; SCRYPT_SALT_LEN];
    rand::rngs::OsRng.fill_bytes(&mut salt);
    let kdf_params = KdfParams {
        salt: hex::encode(salt),
        log_n: SCRYPT_LOG_N,
        r: SCRYPT_R,
        p: SCRYPT_P,
    };
    let key = derive_key(passphrase, &kdf_params)?;

    let mut iv = [0u8; ENVELOPE_IV_LEN];
    rand::rngs::OsRng.fill_bytes(&mut iv);

    let cipher = ChaCha20Poly1305::new(GenericArray::from_slice(key.as_ref()));
    let mut buffer = secret_key.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(GenericArray::from_slice(&iv), b"", &mut buffer)
        .map_err(|e| EnvelopeError::Kdf(e.to_string()))?;

    Ok(KeyEnvelope {
        version: ENVELOPE_VERSION,
        algorithm: ALGORITHM.to_string(),
        kdf: KDF.to_string(),
        kdf_params,
        iv: hex::encode(iv),
        ciphertext: hex::encode(buffer),
        auth_tag: hex::encode(tag),
    })
}

/// Decrypt a `KeyEnvelope` with `passphrase`, returning the raw secret key
/// bytes. A wrong passphrase fails distinctly with `WrongPassphrase`.
pub fn decrypt_key(envelope: &KeyEnvelope, passphrase: &str) -> Result<Zeroizing<Vec<u8>>, EnvelopeError> {
    if envelope.algorithm != ALGORITHM || envelope.kdf != KDF {
        return Err(EnvelopeError::Malformed(format!(
            "unsupported envelope algorithm/kdf: {}/{}",
            envelope.algorithm, envelope.kdf
        )));
    }
    let key = derive_key(passphrase, &envelope.kdf_params)?;

    let iv = hex::decode(&envelope.iv).map_err(|e| EnvelopeError::Malformed(e.to_string()))?;
    let mut buffer =
        hex::decode(&envelope.ciphertext).map_err(|e| EnvelopeError::Malformed(e.to_string()))?;
    let tag_bytes =
        hex::decode(&envelope.auth_tag).map_err(|e| EnvelopeError::Malformed(e.to_string()))?;
    if tag_bytes.len() != ENVELOPE_TAG_LEN {
        return Err(EnvelopeError::Malformed("auth_tag has wrong length".into()));
    }

    let cipher = ChaCha20Poly1305::new(GenericArray::from_slice(key.as_ref()));
    cipher
        .decrypt_in_place_detached(
            GenericArray::from_slice(&iv),
            b"",
            &mut buffer,
            GenericArray::from_slice(&tag_bytes),
        )
        .map_err(|_| EnvelopeError::WrongPassphrase)?;

    Ok(Zeroizing::new(buffer))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_encrypt_decrypt() {
        let secret = b"0123456789abcdef0123456789abcdef".to_vec();
        let envelope = encrypt_key(&secret, "correct horse battery staple").unwrap();
        let decrypted = decrypt_key(&envelope, "correct horse battery staple").unwrap();
        assert_eq!(&*decrypted, &secret[..]);
    }

    #[test]
    fn wrong_passphrase_fails_with_distinct_error() {
        let secret = b"secretkeybytes".to_vec();
        let envelope = encrypt_key(&secret, "right passphrase").unwrap();
        let err = decrypt_key(&envelope, "wrong passphrase").unwrap_err();
        assert!(matches!(err, EnvelopeError::WrongPassphrase));
    }

    #[test]
    fn envelope_round_trips_through_json() {
        let secret = b"another secret".to_vec();
        let envelope = encrypt_key(&secret, "pw").unwrap();
        let json = serde_json::to_string(&envelope).unwrap();
        let parsed: KeyEnvelope = serde_json::from_str(&json).unwrap();
        let decrypted = decrypt_key(&parsed, "pw").unwrap();
        assert_eq!(&*decrypted, &secret[..]);
    }
}
