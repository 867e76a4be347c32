use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A resolved username/password pair.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Which credential form a configuration refers to: a stored credential id,
/// or an inline username/password pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CredentialsConfig {
    pub(crate) username: String,
    pub(crate) password: String,
    pub(crate) credentials_id: String,
}

impl CredentialsConfig {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        credentials_id: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            credentials_id: credentials_id.into(),
        }
    }

    pub fn has_credentials_id(&self) -> bool {
        !self.credentials_id.trim().is_empty()
    }

    pub fn has_username_password(&self) -> bool {
        !self.username.trim().is_empty()
    }

    pub fn is_credentials_provided(&self) -> bool {
        self.has_credentials_id() || self.has_username_password()
    }

    /// Both forms set at once is a configuration error.
    pub fn validate(&self) -> Result<(), CredentialsError> {
        if self.has_credentials_id() && self.has_username_password() {
            return Err(CredentialsError::Ambiguous);
        }
        Ok(())
    }

    /// Resolve to a concrete pair. A credential id takes precedence over the
    /// inline pair; `None` means nothing was provided.
    pub fn resolve(&self, store: &dyn CredentialStore) -> Result<Option<Credentials>, CredentialsError> {
        if self.has_credentials_id() {
            return store
                .lookup(self.credentials_id.trim())
                .map(Some)
                .ok_or_else(|| CredentialsError::UnknownId(self.credentials_id.clone()));
        }
        if self.has_username_password() {
            return Ok(Some(Credentials::new(&self.username, &self.password)));
        }
        Ok(None)
    }
}

/// Lookup of stored credentials by id.
pub trait CredentialStore: Send + Sync {
    fn lookup(&self, id: &str) -> Option<Credentials>;
}

/// Credentials declared in the configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct StaticCredentialStore {
    entries: HashMap<String, Credentials>,
}

impl StaticCredentialStore {
    #[allow(unused)]
    pub fn new(entries: HashMap<String, Credentials>) -> Self {
        Self { entries }
    }
}

impl CredentialStore for StaticCredentialStore {
    fn lookup(&self, id: &str) -> Option<Credentials> {
        self.entries.get(id).cloned()
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum CredentialsError {
    #[error("credentials id '{0}' is not known to the credential store")]
    UnknownId(String),
    #[error("provide either a credentials id or a username/password pair, not both")]
    Ambiguous,
}
