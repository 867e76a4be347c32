use std::sync::Arc;

use crate::build::ProjectKind;
use crate::repositories::CatalogCache;
use crate::servers::{CredentialStore, ServerIdentity};

pub const DISPLAY_NAME: &str = "Resolve artifacts from Artifactory";

/// Process-wide state shared by every resolver configuration: the known
/// servers, the credential store and the last fetched catalog.
pub struct Descriptor {
    servers: Vec<ServerIdentity>,
    credential_store: Arc<dyn CredentialStore>,
    cache: CatalogCache,
}

impl Descriptor {
    #[allow(unused)]
    pub fn new(servers: Vec<ServerIdentity>, credential_store: Arc<dyn CredentialStore>) -> Self {
        Self::with_cache(servers, credential_store, CatalogCache::new())
    }

    /// Rebuild the descriptor around previously persisted catalog state.
    pub fn with_cache(
        servers: Vec<ServerIdentity>,
        credential_store: Arc<dyn CredentialStore>,
        cache: CatalogCache,
    ) -> Self {
        Self {
            servers,
            credential_store,
            cache,
        }
    }

    pub fn display_name(&self) -> &'static str {
        DISPLAY_NAME
    }

    pub fn is_applicable(&self, kind: ProjectKind) -> bool {
        kind == ProjectKind::Maven
    }

    /// Configured servers; may be empty.
    pub fn servers(&self) -> &[ServerIdentity] {
        &self.servers
    }

    pub fn credential_store(&self) -> &dyn CredentialStore {
        self.credential_store.as_ref()
    }

    pub fn cache(&self) -> &CatalogCache {
        &self.cache
    }
}
