//! Per-family API credentials.
//!
//! A credential is either configured (non-empty secret present) or not; there
//! is no placeholder detection. The two sources are the process environment
//! (ad-hoc testing path) and a user's stored key map (conversation path).

use std::collections::HashMap;
use std::fmt;

use crate::llm::{ProviderError, ProviderFamily};

/// Where a set of credentials came from, used to phrase configuration errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CredentialSource {
    /// Process-wide environment variables.
    #[default]
    Environment,
    /// A user's stored key map.
    UserKeys,
}

impl CredentialSource {
    /// Tell the operator how to configure the missing credential.
    pub fn hint(&self, family: &ProviderFamily) -> String {
        match self {
            CredentialSource::Environment => format!("set {}", family.env_var()),
            CredentialSource::UserKeys => {
                format!("add a '{}' key in your settings", family.user_key())
            }
        }
    }
}

/// Secrets keyed by provider family.
#[derive(Clone, Default)]
pub struct Credentials {
    keys: HashMap<ProviderFamily, String>,
    source: CredentialSource,
}

impl Credentials {
    pub fn new(source: CredentialSource) -> Self {
        Self {
            keys: HashMap::new(),
            source,
        }
    }

    /// Read every family's key from its environment variable.
    pub fn from_env() -> Self {
        Self::from_lookup(CredentialSource::Environment, |family| {
            std::env::var(family.env_var()).ok()
        })
    }

    /// Build credentials from a user's key map (`openai`, `anthropic`, `google`, `xai`).
    pub fn from_user_keys(keys: &HashMap<String, String>) -> Self {
        Self::from_lookup(CredentialSource::UserKeys, |family| {
            keys.get(family.user_key()).cloned()
        })
    }

    fn from_lookup(
        source: CredentialSource,
        lookup: impl Fn(ProviderFamily) -> Option<String>,
    ) -> Self {
        let mut credentials = Self::new(source);
        for family in ProviderFamily::ALL {
            if let Some(key) = lookup(family) {
                credentials.set(family, key);
            }
        }
        credentials
    }

    /// Set a key, ignoring blank values.
    pub fn set(&mut self, family: ProviderFamily, key: impl Into<String>) {
        let key = key.into();
        if key.trim().is_empty() {
            return;
        }
        self.keys.insert(family, key.trim().to_string());
    }

    #[must_use]
    pub fn with_key(mut self, family: ProviderFamily, key: impl Into<String>) -> Self {
        self.set(family, key);
        self
    }

    /// Fill families missing here from `fallback`; keys already present win.
    #[must_use]
    pub fn or_fallback(mut self, fallback: &Credentials) -> Self {
        for (family, key) in &fallback.keys {
            self.keys.entry(*family).or_insert_with(|| key.clone());
        }
        self
    }

    pub fn source(&self) -> CredentialSource {
        self.source
    }

    pub fn get(&self, family: ProviderFamily) -> Option<&str> {
        self.keys.get(&family).map(String::as_str)
    }

    pub fn is_configured(&self, family: ProviderFamily) -> bool {
        self.keys.contains_key(&family)
    }

    /// Return the family's key or a configuration error naming it.
    pub fn require(&self, family: ProviderFamily) -> Result<&str, ProviderError> {
        self.get(family).ok_or(ProviderError::Configuration {
            family,
            origin: self.source,
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut configured: Vec<_> = self.keys.keys().map(|f| f.as_str()).collect();
        configured.sort_unstable();
        f.debug_struct("Credentials")
            .field("source", &self.source)
            .field("configured", &configured)
            .finish()
    }
}
