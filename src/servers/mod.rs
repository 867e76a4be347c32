mod credentials;

pub use credentials::{
    CredentialStore, Credentials, CredentialsConfig, CredentialsError, StaticCredentialStore,
};

use serde::Deserialize;

/// A configured repository server: its display name, base URL and the
/// resolver credentials used when a caller provides none.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ServerIdentity {
    pub(crate) name: String,
    pub(crate) url: String,
    #[serde(default)]
    pub(crate) credentials: CredentialsConfig,
}

impl ServerIdentity {
    #[allow(unused)]
    pub fn new(name: impl Into<String>, url: impl Into<String>, credentials: CredentialsConfig) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            credentials,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn credentials(&self) -> &CredentialsConfig {
        &self.credentials
    }

    /// Credentials for a request: the caller's when provided, else the
    /// server's own, else anonymous.
    pub fn effective_credentials(
        &self,
        requested: &CredentialsConfig,
        store: &dyn CredentialStore,
    ) -> Result<Option<Credentials>, CredentialsError> {
        if requested.is_credentials_provided() {
            requested.resolve(store)
        } else {
            self.credentials.resolve(store)
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("no configured server matches '{0}'")]
pub struct ServerNotFoundError(pub String);

/// First server whose name equals `name` exactly.
pub fn resolve_server<'a>(name: &str, known: &'a [ServerIdentity]) -> Option<&'a ServerIdentity> {
    known.iter().find(|s| s.name() == name)
}

/// First server whose URL matches `url`, ignoring a trailing slash.
pub fn resolve_server_by_url<'a>(
    url: &str,
    known: &'a [ServerIdentity],
) -> Result<&'a ServerIdentity, ServerNotFoundError> {
    let wanted = url.trim().trim_end_matches('/');
    known
        .iter()
        .find(|s| s.url().trim_end_matches('/') == wanted)
        .ok_or_else(|| ServerNotFoundError(url.to_string()))
}
