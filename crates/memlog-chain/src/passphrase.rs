use memlog_core::MemlogError;
use zeroize::Zeroizing;

/// Supplies the passphrase needed to decrypt a passphrase-wrapped private
/// key. Passed explicitly into every operation that needs it, replacing
/// the source's process-global passphrase singleton.
pub trait PassphraseProvider: Send + Sync {
    fn provide(&self) -> Result<Zeroizing<String>, MemlogError>;
}

/// A passphrase known ahead of time (tests, scripted use).
pub struct StaticPassphrase(pub Zeroizing<String>);

impl StaticPassphrase {
    pub fn new(passphrase: impl Into<String>) -> Self {
        Self(Zeroizing::new(passphrase.into()))
    }
}

impl PassphraseProvider for StaticPassphrase {
    fn provide(&self) -> Result<Zeroizing<String>, MemlogError> {
        Ok(self.0.clone())
    }
}

/// Reads the passphrase from a named environment variable at the moment
/// it is needed (never cached).
pub struct EnvPassphrase(pub String);

impl PassphraseProvider for EnvPassphrase {
    fn provide(&self) -> Result<Zeroizing<String>, MemlogError> {
        std::env::var(&self.0)
            .map(Zeroizing::new)
            .map_err(|_| MemlogError::PassphraseMissing)
    }
}

/// A provider that always fails — used when the chain's `key_mode` does
/// not require a passphrase but the call site still needs to pass
/// something.
pub struct NoPassphrase;

impl PassphraseProvider for NoPassphrase {
    fn provide(&self) -> Result<Zeroizing<String>, MemlogError> {
        Err(MemlogError::PassphraseMissing)
    }
}
