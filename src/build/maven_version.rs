use std::fmt;
use std::path::PathBuf;
use std::process::Command;
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use super::BuildContext;

/// Oldest Maven able to have resolution forced to a configured repository.
pub const MIN_RESOLUTION_VERSION: MavenVersion = MavenVersion::new(3, 0, 2);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MavenVersion {
    major: u32,
    minor: u32,
    patch: u32,
}

impl MavenVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self { major, minor, patch }
    }

    /// Parse `3.9.6`, `3.0` or the banner printed by `mvn --version`
    /// (`Apache Maven 3.9.6 (bc0240f3...)`). Qualifiers such as `-beta-1` are
    /// ignored.
    pub fn parse(text: &str) -> Option<Self> {
        let caps = version_regex().captures(text)?;
        let part = |name: &str| caps.name(name).map_or(Some(0), |m| m.as_str().parse::<u32>().ok());
        Some(Self::new(part("major")?, part("minor")?, part("patch")?))
    }
}

impl fmt::Display for MavenVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

fn version_regex() -> &'static Regex {
    static VERSION_RE: OnceLock<Regex> = OnceLock::new();
    VERSION_RE.get_or_init(|| {
        Regex::new(r"(?:Apache Maven\s+|^\s*)(?P<major>\d+)(?:\.(?P<minor>\d+))?(?:\.(?P<patch>\d+))?")
            .expect("invalid Maven version regex")
    })
}

#[derive(thiserror::Error, Debug)]
pub enum UnsupportedToolVersionError {
    #[error("Maven {found} is older than the required {}", MIN_RESOLUTION_VERSION)]
    TooOld { found: MavenVersion },
    #[error("could not run {command}: {source}")]
    Probe {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("could not determine the Maven version from: {0}")]
    Unrecognized(String),
}

/// Fails unless `version` can have resolution forced.
pub fn check_resolution_capable(version: MavenVersion) -> Result<(), UnsupportedToolVersionError> {
    if version >= MIN_RESOLUTION_VERSION {
        Ok(())
    } else {
        Err(UnsupportedToolVersionError::TooOld { found: version })
    }
}

/// Reports which Maven a build will run.
pub trait ToolVersionProbe: Send + Sync {
    fn maven_version(&self, ctx: &BuildContext) -> Result<MavenVersion, UnsupportedToolVersionError>;
}

/// Runs `mvn --version` from `MAVEN_HOME`/`M2_HOME` when set, else from `PATH`.
#[derive(Debug, Default)]
pub struct MavenCommandProbe;

impl MavenCommandProbe {
    fn executable(ctx: &BuildContext) -> PathBuf {
        let bin = if cfg!(windows) { "mvn.cmd" } else { "mvn" };
        ["MAVEN_HOME", "M2_HOME"]
            .iter()
            .find_map(|var| ctx.env(var).filter(|v| !v.is_empty()))
            .map(|home| PathBuf::from(home).join("bin").join(bin))
            .unwrap_or_else(|| PathBuf::from(bin))
    }
}

impl ToolVersionProbe for MavenCommandProbe {
    fn maven_version(&self, ctx: &BuildContext) -> Result<MavenVersion, UnsupportedToolVersionError> {
        let exe = Self::executable(ctx);
        debug!("probing Maven version with {}", exe.display());

        let output = Command::new(&exe)
            .arg("--version")
            .envs(ctx.vars())
            .output()
            .map_err(|source| UnsupportedToolVersionError::Probe {
                command: exe.display().to_string(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let banner = stdout
            .lines()
            .find(|l| l.contains("Apache Maven"))
            .unwrap_or_default();
        MavenVersion::parse(banner)
            .ok_or_else(|| UnsupportedToolVersionError::Unrecognized(stdout.trim().to_string()))
    }
}
