//! Process-wide key holder.
//!
//! Loaded once at startup and never mutated afterwards. Absence of a private
//! key is an operating mode, not an error: the provider then reports
//! decryption as unavailable and callers store envelopes unread.

use std::fs;
use std::path::{Path, PathBuf};

use crate::decryptor::HybridDecryptor;
use crate::encryptor::HybridEncryptor;
use crate::error::KeyError;
use crate::keys::{RecipientPrivateKey, RecipientPublicKey};

/// Inline PEM text, `\n` escapes allowed.
pub const ENV_PRIVATE_KEY: &str = "SIIEC_PRIVATE_KEY";
pub const ENV_PRIVATE_KEY_PATH: &str = "SIIEC_PRIVATE_KEY_PATH";
pub const ENV_PUBLIC_KEY_PATH: &str = "SIIEC_PUBLIC_KEY_PATH";

/// Where key material may come from. Inline PEM wins over the file path.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KeySources {
    pub inline_pem: Option<String>,
    pub private_key_path: Option<PathBuf>,
    pub public_key_path: Option<PathBuf>,
}

impl KeySources {
    /// Read sources through `lookup`. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        Self {
            inline_pem: get(ENV_PRIVATE_KEY),
            private_key_path: get(ENV_PRIVATE_KEY_PATH).map(PathBuf::from),
            public_key_path: get(ENV_PUBLIC_KEY_PATH).map(PathBuf::from),
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn has_private_key(&self) -> bool {
        self.inline_pem.is_some() || self.private_key_path.is_some()
    }
}

/// How the private key was obtained.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyOrigin {
    Inline,
    File,
    /// Handed over already parsed, not read from configuration.
    Supplied,
    Absent,
}

impl KeyOrigin {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Inline => "inline",
            Self::File => "file",
            Self::Supplied => "supplied",
            Self::Absent => "absent",
        }
    }
}

fn read_file(path: &Path) -> Result<String, KeyError> {
    fs::read_to_string(path).map_err(|source| KeyError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Read-only key holder shared by every request handler.
#[derive(Clone, Debug)]
pub struct KeyProvider {
    decryptor: Option<HybridDecryptor>,
    public_key: Option<RecipientPublicKey>,
    origin: KeyOrigin,
}

impl KeyProvider {
    /// Degraded provider: no decryption, no public key.
    pub fn unavailable() -> Self {
        Self {
            decryptor: None,
            public_key: None,
            origin: KeyOrigin::Absent,
        }
    }

    pub fn from_private_key(key: RecipientPrivateKey) -> Self {
        let public_key = key.public_key();
        Self {
            decryptor: Some(HybridDecryptor::from(key)),
            public_key: Some(public_key),
            origin: KeyOrigin::Supplied,
        }
    }

    /// Encrypt-only provider, e.g. for clients.
    pub fn public_only(public_key: RecipientPublicKey) -> Self {
        Self {
            decryptor: None,
            public_key: Some(public_key),
            origin: KeyOrigin::Absent,
        }
    }

    /// Strict loader: any configured source that cannot be used is an error.
    ///
    /// The distributed public key comes from `public_key_path` when set and
    /// is otherwise derived from the private key.
    pub fn from_sources(sources: &KeySources) -> Result<Self, KeyError> {
        let (private_key, origin) = match (&sources.inline_pem, &sources.private_key_path) {
            (Some(pem), _) => (Some(RecipientPrivateKey::from_escaped_pem(pem)?), KeyOrigin::Inline),
            (None, Some(path)) => (
                Some(RecipientPrivateKey::from_escaped_pem(&read_file(path)?)?),
                KeyOrigin::File,
            ),
            (None, None) => (None, KeyOrigin::Absent),
        };

        let public_key = match &sources.public_key_path {
            Some(path) => Some(RecipientPublicKey::from_public_key_pem(&read_file(path)?)?),
            None => private_key.as_ref().map(RecipientPrivateKey::public_key),
        };

        if let (Some(sk), Some(pk)) = (&private_key, &public_key) {
            if sk.public_key() != *pk {
                tracing::warn!("distributed public key does not match the private key; clients will produce undecryptable reports");
            }
        }

        Ok(Self {
            decryptor: private_key.map(HybridDecryptor::from),
            public_key,
            origin,
        })
    }

    /// Tolerant loader used at service startup.
    ///
    /// A configured but unusable key is logged and the provider falls back to
    /// degraded mode. Never logs key material, only origin and fingerprint.
    pub fn load(sources: &KeySources) -> Self {
        match Self::from_sources(sources) {
            Ok(provider) => {
                provider.log_status();
                provider
            }
            Err(error) => {
                tracing::error!(%error, "configured private key is unusable; decryption unavailable");
                // Still serve the public key if only the private side is broken.
                let public_key = sources
                    .public_key_path
                    .as_deref()
                    .and_then(|path| read_file(path).ok())
                    .and_then(|pem| RecipientPublicKey::from_public_key_pem(&pem).ok());
                match public_key {
                    Some(pk) => Self::public_only(pk),
                    None => Self::unavailable(),
                }
            }
        }
    }

    pub fn from_env() -> Self {
        Self::load(&KeySources::from_env())
    }

    fn log_status(&self) {
        let fingerprint = self
            .public_key
            .as_ref()
            .and_then(|pk| pk.fingerprint().ok())
            .unwrap_or_default();
        if self.is_decryption_available() {
            tracing::info!(origin = self.origin.as_str(), %fingerprint, "decryption key loaded");
        } else {
            tracing::warn!("no private key configured; reports will be stored encrypted");
        }
    }

    pub fn is_decryption_available(&self) -> bool {
        self.decryptor.is_some()
    }

    pub fn decryptor(&self) -> Option<&HybridDecryptor> {
        self.decryptor.as_ref()
    }

    pub fn public_key(&self) -> Option<&RecipientPublicKey> {
        self.public_key.as_ref()
    }

    pub fn encryptor(&self) -> Option<HybridEncryptor> {
        self.public_key.clone().map(HybridEncryptor::new)
    }

    pub fn origin(&self) -> KeyOrigin {
        self.origin
    }
}
