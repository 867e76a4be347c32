mod maven_version;

pub use maven_version::{MavenCommandProbe, ToolVersionProbe, check_resolution_capable};

use std::collections::HashMap;
use std::io::{self, Write};

use tracing::{debug, warn};

use crate::config::ResolverConfig;
use crate::descriptor::Descriptor;
use crate::servers::ServerNotFoundError;

/// Set by an upstream step when the build-info extractor is already wired in.
pub const EXTRACTOR_USED: &str = "JENKINS_ARTIFACTORY_EXTRACTOR_USED";

pub const UNSUPPORTED_MAVEN_ADVISORY: &str = "Artifactory resolution is not active. Maven 3.0.2 or higher is required to force resolution from Artifactory.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectKind {
    Maven,
    Other,
}

/// What the host tells us about the build being set up.
#[derive(Debug, Clone)]
pub struct BuildContext {
    kind: ProjectKind,
    env: HashMap<String, String>,
}

impl BuildContext {
    pub fn new(kind: ProjectKind, env: HashMap<String, String>) -> Self {
        Self { kind, env }
    }

    pub fn maven<I, S>(vars: I) -> Self
    where
        I: IntoIterator<Item = (S, S)>,
        S: Into<String>,
    {
        let env = vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        Self::new(ProjectKind::Maven, env)
    }

    /// Context for the current process environment.
    pub fn from_process(kind: ProjectKind) -> Self {
        Self::new(kind, std::env::vars().collect())
    }

    pub fn kind(&self) -> ProjectKind {
        self.kind
    }

    pub fn env(&self, name: &str) -> Option<&str> {
        self.env.get(name).map(String::as_str)
    }

    pub fn vars(&self) -> impl Iterator<Item = (&String, &String)> {
        self.env.iter()
    }

    /// Whether an upstream step reported the extractor as active. Anything but
    /// a case-insensitive `true` counts as not active.
    pub fn is_extractor_used(&self) -> bool {
        self.env(EXTRACTOR_USED)
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
    }
}

/// Resolution settings handed to the extractor listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverContext {
    pub server_url: String,
    pub release_repository: Option<String>,
    pub snapshot_repository: Option<String>,
    pub overriding_credentials: bool,
}

/// Handle returned by `set_up`; the host tears it down once the build ends.
#[derive(Debug, Default)]
#[must_use]
pub struct Environment {
    resolver: Option<ResolverContext>,
    extractor_used: bool,
}

impl Environment {
    fn inactive() -> Self {
        Self::default()
    }

    pub fn resolver(&self) -> Option<&ResolverContext> {
        self.resolver.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.resolver.is_some()
    }

    pub fn extractor_used(&self) -> bool {
        self.extractor_used
    }

    pub fn tear_down(self, _log: &mut dyn Write) -> io::Result<()> {
        debug!(active = self.is_active(), "tearing down resolver environment");
        Ok(())
    }
}

/// Build-environment participant that forces dependency resolution to the
/// configured server. Configuration problems never fail the build: they are
/// written to the build log and the build falls back to default repositories.
pub struct ResolverBuildWrapper<'a> {
    config: &'a ResolverConfig,
    descriptor: &'a Descriptor,
    probe: &'a dyn ToolVersionProbe,
}

impl<'a> ResolverBuildWrapper<'a> {
    pub fn new(config: &'a ResolverConfig, descriptor: &'a Descriptor, probe: &'a dyn ToolVersionProbe) -> Self {
        Self {
            config,
            descriptor,
            probe,
        }
    }

    pub fn set_up(&self, ctx: &BuildContext, log: &mut dyn Write) -> io::Result<Environment> {
        if !self.descriptor.is_applicable(ctx.kind()) {
            return Ok(Environment::inactive());
        }

        writeln!(log, "Maven resolver plugin version: {}", env!("CARGO_PKG_VERSION"))?;

        let supported = self
            .probe
            .maven_version(ctx)
            .and_then(|version| check_resolution_capable(version).map(|_| version));
        match supported {
            Ok(version) => debug!("Maven {version} supports forced resolution"),
            Err(err) => {
                warn!("skipping forced resolution: {err}");
                writeln!(log, "{UNSUPPORTED_MAVEN_ADVISORY}")?;
                return Ok(Environment::inactive());
            }
        }

        let server = match self.config.server(self.descriptor.servers()) {
            Ok(server) => server,
            Err(ServerNotFoundError(name)) => {
                warn!("resolver server '{name}' is not configured");
                writeln!(
                    log,
                    "Artifactory resolution is not active. Server '{name}' is not configured; using default repositories."
                )?;
                return Ok(Environment::inactive());
            }
        };

        Ok(Environment {
            resolver: Some(ResolverContext {
                server_url: server.url().to_string(),
                release_repository: self.config.download_release_repository_key().map(str::to_string),
                snapshot_repository: self.config.download_snapshot_repository_key().map(str::to_string),
                overriding_credentials: self.config.is_overriding_default_resolver(),
            }),
            extractor_used: ctx.is_extractor_used(),
        })
    }
}
