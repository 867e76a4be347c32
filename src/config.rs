use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs, io};
use tracing::debug;
use url::Url;

use crate::repositories::{CatalogCache, VirtualRepository, reconcile};
use crate::servers::{
    CredentialsConfig, CredentialsError, ServerIdentity, ServerNotFoundError, StaticCredentialStore, resolve_server,
};

pub const CONFIG_ENV: &str = "MAVEN_RESOLVER_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "maven-resolver.toml";
const DEFAULT_CACHE_FILE: &str = "maven-resolver-catalog.json";

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    pub resolver: ResolverConfig,
    pub servers: Vec<ServerIdentity>,
    pub credentials: StaticCredentialStore,
    pub cache: CacheConfig,
}

/// The persisted resolver selection of one build configuration. Every field
/// may be empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ResolverConfig {
    pub(crate) server: String,
    pub(crate) release_repository: String,
    pub(crate) snapshot_repository: String,
    #[serde(skip_serializing)]
    pub(crate) credentials: CredentialsConfig,
}

/// Release and snapshot keys chosen for resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct RepositorySelection {
    pub release_repository: String,
    pub snapshot_repository: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CacheConfig {
    path: Option<PathBuf>,
    #[serde(default = "default_timeout_secs")]
    timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl CacheConfig {
    /// Where descriptor state is persisted; the temp dir unless configured.
    pub fn path(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| env::temp_dir().join(DEFAULT_CACHE_FILE))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn non_empty(s: &str) -> Option<&str> {
    let s = s.trim();
    (!s.is_empty()).then_some(s)
}

impl ResolverConfig {
    pub fn new(
        server: impl Into<String>,
        release_repository: impl Into<String>,
        snapshot_repository: impl Into<String>,
        credentials: CredentialsConfig,
    ) -> Self {
        Self {
            server: server.into(),
            release_repository: release_repository.into(),
            snapshot_repository: snapshot_repository.into(),
            credentials,
        }
    }

    pub fn server_name(&self) -> Option<&str> {
        non_empty(&self.server)
    }

    pub fn download_release_repository_key(&self) -> Option<&str> {
        non_empty(&self.release_repository)
    }

    pub fn download_snapshot_repository_key(&self) -> Option<&str> {
        non_empty(&self.snapshot_repository)
    }

    pub fn credentials(&self) -> &CredentialsConfig {
        &self.credentials
    }

    pub fn is_overriding_default_resolver(&self) -> bool {
        self.credentials.is_credentials_provided()
    }

    pub fn selection(&self) -> RepositorySelection {
        RepositorySelection {
            release_repository: self.release_repository.clone(),
            snapshot_repository: self.snapshot_repository.clone(),
        }
    }

    pub fn select(&mut self, selection: RepositorySelection) {
        self.release_repository = selection.release_repository;
        self.snapshot_repository = selection.snapshot_repository;
    }

    /// The configured server among `known`.
    pub fn server<'a>(&self, known: &'a [ServerIdentity]) -> Result<&'a ServerIdentity, ServerNotFoundError> {
        resolve_server(self.server.trim(), known).ok_or_else(|| ServerNotFoundError(self.server.clone()))
    }

    /// The cached catalog with the release key, then the snapshot key, merged in.
    /// Keys are normalised the same way as the download keys.
    pub fn virtual_repository_list(&self, cache: &CatalogCache) -> Vec<VirtualRepository> {
        let keys: Vec<&str> = [
            self.download_release_repository_key(),
            self.download_snapshot_repository_key(),
        ]
        .into_iter()
        .flatten()
        .collect();
        reconcile(&cache.snapshot(), &keys)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("TOML decode error: {0}")]
    TomlDecode(#[from] toml::de::Error),
    #[error("server entry {0} has an empty name")]
    EmptyServerName(usize),
    #[error("server '{0}' is declared more than once")]
    DuplicateServer(String),
    #[error("server '{name}' has an invalid URL '{url}'")]
    InvalidServerUrl { name: String, url: String },
    #[error("credentials of {owner}: {source}")]
    Credentials {
        owner: String,
        #[source]
        source: CredentialsError,
    },
    #[error(transparent)]
    UnknownServer(#[from] ServerNotFoundError),
}

impl Config {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!("reading config from {}", path.display());
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for (idx, server) in self.servers.iter().enumerate() {
            let name = non_empty(server.name()).ok_or(ConfigError::EmptyServerName(idx))?;
            if !seen.insert(name) {
                return Err(ConfigError::DuplicateServer(name.to_string()));
            }

            let valid_url = Url::parse(server.url())
                .map(|u| matches!(u.scheme(), "http" | "https"))
                .unwrap_or(false);
            if !valid_url {
                return Err(ConfigError::InvalidServerUrl {
                    name: name.to_string(),
                    url: server.url().to_string(),
                });
            }

            server
                .credentials()
                .validate()
                .map_err(|source| ConfigError::Credentials {
                    owner: format!("server '{name}'"),
                    source,
                })?;
        }

        self.resolver
            .credentials
            .validate()
            .map_err(|source| ConfigError::Credentials {
                owner: "resolver".to_string(),
                source,
            })?;

        if self.resolver.server_name().is_some() {
            self.resolver.server(&self.servers)?;
        }
        Ok(())
    }
}

/// Locate and read the configuration: `$MAVEN_RESOLVER_CONFIG`, else
/// `./maven-resolver.toml`, else defaults.
pub fn read_config() -> Result<Config, ConfigError> {
    let path = env::var(CONFIG_ENV)
        .map(PathBuf::from)
        .ok()
        .or_else(|| Some(PathBuf::from(DEFAULT_CONFIG_FILE)).filter(|p| p.exists()));
    match path {
        Some(path) => Config::from_file(path),
        None => {
            debug!("no config file, using defaults");
            Ok(Config::default())
        }
    }
}
