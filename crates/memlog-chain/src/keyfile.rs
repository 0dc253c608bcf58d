use std::fs;
use std::path::Path;

use memlog_core::types::KeyMode;
use memlog_core::MemlogError;
use memlog_crypto::envelope::{decrypt_key, encrypt_key};
use zeroize::Zeroizing;

use crate::passphrase::PassphraseProvider;

pub const PUBLIC_KEY_FILE: &str = "agent.pub";
pub const RAW_KEY_FILE: &str = "agent.key";
pub const ENCRYPTED_KEY_FILE: &str = "agent.key.enc";

/// Write the public key (64 hex chars + newline, mode 0o644) and, for
/// `raw`/`passphrase_wrapped` modes, the private key material. For
/// `environment` mode nothing is written to disk — the caller is
/// responsible for exporting the returned secret into the named variable.
///
/// Returns the raw secret key hex when `key_mode` is `Environment`, so the
/// caller can surface it (this is the one point at which `init` hands back
/// key material instead of persisting it).
pub fn write_key_material(
    data_dir: &Path,
    key_mode: &KeyMode,
    public_key_hex: &str,
    secret_key_bytes: &[u8],
    passphrase: Option<&dyn PassphraseProvider>,
) -> Result<Option<String>, MemlogError> {
    fs::write(data_dir.join(PUBLIC_KEY_FILE), format!("{public_key_hex}\n"))?;
    set_mode(&data_dir.join(PUBLIC_KEY_FILE), 0o644)?;

    match key_mode {
        KeyMode::Raw => {
            let path = data_dir.join(RAW_KEY_FILE);
            fs::write(&path, hex::encode(secret_key_bytes))?;
            set_mode(&path, 0o600)?;
            Ok(None)
        }
        KeyMode::PassphraseWrapped => {
            let provider = passphrase.ok_or(MemlogError::PassphraseMissing)?;
            let pass = provider.provide()?;
            let envelope = encrypt_key(secret_key_bytes, &pass)
                .map_err(|e| MemlogError::Other(e.to_string()))?;
            let path = data_dir.join(ENCRYPTED_KEY_FILE);
            fs::write(&path, serde_json::to_string_pretty(&envelope)?)?;
            set_mode(&path, 0o600)?;
            Ok(None)
        }
        KeyMode::Environment { .. } => Ok(Some(hex::encode(secret_key_bytes))),
    }
}

/// Load the private key material according to `key_mode`.
pub fn load_private_key(
    data_dir: &Path,
    key_mode: &KeyMode,
    passphrase: Option<&dyn PassphraseProvider>,
) -> Result<Zeroizing<Vec<u8>>, MemlogError> {
    match key_mode {
        KeyMode::Raw => {
            let hex_str = fs::read_to_string(data_dir.join(RAW_KEY_FILE))?;
            let bytes = hex::decode(hex_str.trim())
                .map_err(|e| MemlogError::Other(format!("invalid key file: {e}")))?;
            Ok(Zeroizing::new(bytes))
        }
        KeyMode::PassphraseWrapped => {
            let json = fs::read_to_string(data_dir.join(ENCRYPTED_KEY_FILE))?;
            let envelope = serde_json::from_str(&json)?;
            let provider = passphrase.ok_or(MemlogError::PassphraseMissing)?;
            let pass = provider.provide()?;
            decrypt_key(&envelope, &pass).map_err(|e| match e {
                memlog_crypto::envelope::EnvelopeError::WrongPassphrase => {
                    MemlogError::PassphraseWrong
                }
                other => MemlogError::Other(other.to_string()),
            })
        }
        KeyMode::Environment { variable } => {
            let hex_str = std::env::var(variable).map_err(|_| MemlogError::PassphraseMissing)?;
            let bytes = hex::decode(hex_str.trim())
                .map_err(|e| MemlogError::Other(format!("invalid key in env var: {e}")))?;
            Ok(Zeroizing::new(bytes))
        }
    }
}

pub fn read_public_key(data_dir: &Path) -> Result<[u8; 32], MemlogError> {
    let hex_str = fs::read_to_string(data_dir.join(PUBLIC_KEY_FILE))?;
    let bytes = hex::decode(hex_str.trim())
        .map_err(|e| MemlogError::Other(format!("invalid public key file: {e}")))?;
    bytes
        .try_into()
        .map_err(|_| MemlogError::Other("public key must be 32 bytes".into()))
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<(), MemlogError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))?;
    Ok(())
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> Result<(), MemlogError> {
    Ok(())
}
