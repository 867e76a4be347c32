use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::descriptor::Descriptor;
use crate::repositories::VirtualRepository;
use crate::repositories::artifactory::{CatalogSource, RepositoryFetchError};
use crate::servers::{CredentialsConfig, CredentialsError, ServerNotFoundError, resolve_server_by_url};

/// Response of a refresh request. `virtual_repositories` is set iff
/// `success`, `response_message` iff not.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub virtual_repositories: Option<Vec<VirtualRepository>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_message: Option<String>,
}

impl RefreshResult {
    fn succeeded(repos: Vec<VirtualRepository>) -> Self {
        Self {
            success: true,
            virtual_repositories: Some(repos),
            response_message: None,
        }
    }

    fn failed(message: String) -> Self {
        Self {
            success: false,
            virtual_repositories: None,
            response_message: Some(message),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum RefreshError {
    #[error(transparent)]
    ServerNotFound(#[from] ServerNotFoundError),
    #[error(transparent)]
    Credentials(#[from] CredentialsError),
    #[error(transparent)]
    Fetch(#[from] RepositoryFetchError),
}

/// Bridges a refresh trigger to the catalog source and the descriptor cache.
///
/// Overlapping refreshes are not coordinated: each fetches independently and
/// the last successful one wins the cache.
pub struct RefreshOrchestrator {
    descriptor: Arc<Descriptor>,
    source: Arc<dyn CatalogSource>,
}

impl RefreshOrchestrator {
    pub fn new(descriptor: Arc<Descriptor>, source: Arc<dyn CatalogSource>) -> Self {
        Self { descriptor, source }
    }

    /// Refresh the catalog from the server at `server_url`. Never fails: every
    /// error becomes a failed `RefreshResult` and leaves the cache untouched.
    pub async fn refresh(
        &self,
        server_url: &str,
        credentials_id: &str,
        username: &str,
        password: &str,
    ) -> RefreshResult {
        let requested = CredentialsConfig::new(username, password, credentials_id);
        match self.try_refresh(server_url, &requested).await {
            Ok(repos) => {
                info!("refreshed {} virtual repositories from {server_url}", repos.len());
                RefreshResult::succeeded(repos)
            }
            Err(err) => {
                warn!("repository refresh from {server_url} failed: {err}");
                RefreshResult::failed(err.to_string())
            }
        }
    }

    async fn try_refresh(
        &self,
        server_url: &str,
        requested: &CredentialsConfig,
    ) -> Result<Vec<VirtualRepository>, RefreshError> {
        let server = resolve_server_by_url(server_url, self.descriptor.servers())?;
        let credentials = server.effective_credentials(requested, self.descriptor.credential_store())?;

        let mut repos = self
            .source
            .fetch_virtual_repositories(server.url(), credentials.as_ref())
            .await?;
        repos.sort();

        self.descriptor.cache().replace(repos.clone());
        Ok(repos)
    }
}
