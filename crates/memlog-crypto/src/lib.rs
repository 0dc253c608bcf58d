pub mod canonical;
pub mod envelope;
pub mod hash;
pub mod keypair;

pub use canonical::{canonical_encode_signed, canonical_encode_unsigned};
pub use envelope::{decrypt_key, encrypt_key, EnvelopeError, KeyEnvelope};
pub use hash::{hash, parse_hash};
pub use keypair::{sign, verify, KeyPair, SignatureError};
