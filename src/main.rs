mod build;
mod config;
mod descriptor;
mod helpers;
mod refresh;
mod repositories;
mod servers;

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{Context, Result, bail, ensure};
use tracing_subscriber::EnvFilter;

use build::{BuildContext, MavenCommandProbe, ProjectKind, ResolverBuildWrapper};
use config::{Config, RepositorySelection, read_config};
use descriptor::Descriptor;
use helpers::{choose_repository_key, spinner};
use refresh::RefreshOrchestrator;
use repositories::CatalogCache;
use repositories::artifactory::ArtifactoryClient;

const USAGE: &str = "usage: maven-resolver <refresh|list|select|setup>";

/// Descriptor rebuilt from the configuration and the persisted catalog.
fn load_descriptor(config: &mut Config) -> Result<Arc<Descriptor>> {
    let path = config.cache.path();
    let cache = CatalogCache::load(&path)
        .with_context(|| format!("load cached repositories from {}", path.display()))?;
    let store = std::mem::take(&mut config.credentials);
    Ok(Arc::new(Descriptor::with_cache(config.servers.clone(), Arc::new(store), cache)))
}

async fn refresh_command(mut config: Config) -> Result<()> {
    let descriptor = load_descriptor(&mut config)?;
    let server = config
        .resolver
        .server(descriptor.servers())
        .context("select a configured server under [resolver] first")?;

    let client = ArtifactoryClient::with_timeout(config.cache.timeout())?;
    let orchestrator = RefreshOrchestrator::new(Arc::clone(&descriptor), Arc::new(client));

    let creds = config.resolver.credentials();
    let pb = spinner::start(format!("Refreshing repositories from {}", server.url()));
    let result = orchestrator
        .refresh(server.url(), &creds.credentials_id, &creds.username, &creds.password)
        .await;
    pb.finish_and_clear();

    println!("{}", serde_json::to_string_pretty(&result)?);
    ensure!(result.success, "repository refresh failed");

    let path = config.cache.path();
    descriptor
        .cache()
        .persist(&path)
        .with_context(|| format!("persist repositories to {}", path.display()))?;
    Ok(())
}

fn list_command(mut config: Config) -> Result<()> {
    let descriptor = load_descriptor(&mut config)?;
    let mut out = io::stdout().lock();
    for repo in config.resolver.virtual_repository_list(descriptor.cache()) {
        writeln!(out, "{}", helpers::repository_label(&repo))?;
    }
    Ok(())
}

fn select_command(mut config: Config) -> Result<()> {
    let descriptor = load_descriptor(&mut config)?;
    let repos = config.resolver.virtual_repository_list(descriptor.cache());
    ensure!(!repos.is_empty(), "No repositories cached; run `maven-resolver refresh` first");

    let current = config.resolver.selection();
    let release = choose_repository_key("Select Release Repository", &repos, &current.release_repository)?;
    let snapshot = choose_repository_key("Select Snapshot Repository", &repos, &current.snapshot_repository)?;
    config.resolver.select(RepositorySelection {
        release_repository: release,
        snapshot_repository: snapshot,
    });

    println!("[resolver]\n{}", toml::to_string(&config.resolver)?);
    Ok(())
}

fn setup_command(mut config: Config) -> Result<()> {
    let descriptor = load_descriptor(&mut config)?;
    let probe = MavenCommandProbe;
    let wrapper = ResolverBuildWrapper::new(&config.resolver, &descriptor, &probe);
    let ctx = BuildContext::from_process(ProjectKind::Maven);

    let mut log = io::stdout().lock();
    let env = wrapper.set_up(&ctx, &mut log)?;
    if let Some(resolver) = env.resolver() {
        writeln!(log, "{}: {}", descriptor.display_name(), resolver.server_url)?;
        if let Some(release) = &resolver.release_repository {
            writeln!(log, "  releases:  {release}")?;
        }
        if let Some(snapshot) = &resolver.snapshot_repository {
            writeln!(log, "  snapshots: {snapshot}")?;
        }
        if env.extractor_used() {
            writeln!(log, "  build-info extractor already active")?;
        }
    }
    env.tear_down(&mut log)?;
    Ok(())
}

async fn run(command: &str) -> Result<()> {
    let config = read_config().context("read configuration")?;
    match command {
        "refresh" => refresh_command(config).await,
        "list" => list_command(config),
        "select" => select_command(config),
        "setup" => setup_command(config),
        other => bail!("unknown command '{other}'\n{USAGE}"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let Some(command) = std::env::args().nth(1) else {
        bail!(USAGE);
    };
    run(&command).await
}
