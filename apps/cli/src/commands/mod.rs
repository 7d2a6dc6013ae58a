mod config;
mod objects;
mod repo;
mod serving;

use crate::cli::{Cli, Command};
use anyhow::Context as _;
use feast::FeatureStore;
use feast::domain::config::CliProperties;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// What every command needs besides its own arguments.
#[derive(Debug)]
pub(crate) struct Context {
    pub properties: CliProperties,
    pub properties_path: PathBuf,
    repo: Option<PathBuf>,
}

impl Context {
    pub(crate) fn new(properties: CliProperties, properties_path: PathBuf, repo: Option<PathBuf>) -> Self {
        Self { properties, properties_path, repo }
    }

    /// Repository directory: the explicit argument, then `--repo`, then the `repo_path`
    /// property, then the current directory.
    pub(crate) fn repo_path(&self, explicit: Option<&Path>) -> PathBuf {
        explicit
            .or(self.repo.as_deref())
            .or(self.properties.repo_path.as_deref())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
    }

    pub(crate) async fn open_store(&self, explicit: Option<&Path>) -> anyhow::Result<FeatureStore> {
        let path = self.repo_path(explicit);
        feast::repo::check_repo(&path)?;
        FeatureStore::open(&path)
            .await
            .with_context(|| format!("Failed to open feature repository {}", path.display()))
    }
}

/// Writes command output to stdout. Logs go to stderr.
pub(crate) fn emit(text: impl AsRef<str>) -> anyhow::Result<()> {
    let mut out = io::stdout().lock();
    out.write_all(text.as_ref().as_bytes())?;
    if !text.as_ref().ends_with('\n') {
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}

pub(crate) async fn run(cli: Cli, ctx: Context) -> anyhow::Result<()> {
    match cli.command {
        Command::Version { client_only } => config::version(&ctx, client_only).await,
        Command::Config(command) => config::run(&ctx, command),
        Command::Entities(command) => objects::entities(&ctx, command).await,
        Command::FeatureViews(command) => objects::feature_views(&ctx, command).await,
        Command::Projects(command) => objects::projects(&ctx, command).await,
        Command::Init { minimal } => repo::init(&ctx, minimal),
        Command::Apply(arg) => repo::apply(&ctx, arg.repo_path.as_deref()).await,
        Command::Teardown(arg) => repo::teardown(&ctx, arg.repo_path.as_deref()).await,
        Command::RegistryDump(arg) => repo::registry_dump(&ctx, arg.repo_path.as_deref()).await,
        Command::Materialize { start_ts, end_ts, repo, views } => {
            serving::materialize(&ctx, repo.repo_path.as_deref(), &start_ts, &end_ts, &views).await
        },
        Command::MaterializeIncremental { end_ts, repo, views } => {
            serving::materialize_incremental(&ctx, repo.repo_path.as_deref(), &end_ts, &views).await
        },
        Command::GetOnlineFeatures { repo, features, entities } => {
            serving::get_online_features(&ctx, repo.repo_path.as_deref(), &features, &entities).await
        },
        Command::GetHistoricalFeatures { repo, features, entities, output } => {
            serving::get_historical_features(
                &ctx,
                repo.repo_path.as_deref(),
                &features,
                &entities,
                output.as_deref(),
            )
            .await
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_path_precedence() {
        let mut properties = CliProperties::default();
        let ctx = Context::new(properties.clone(), PathBuf::from("config.toml"), None);
        assert_eq!(ctx.repo_path(None), PathBuf::from("."));

        properties.repo_path = Some(PathBuf::from("/from/property"));
        let ctx = Context::new(properties.clone(), PathBuf::from("config.toml"), None);
        assert_eq!(ctx.repo_path(None), PathBuf::from("/from/property"));

        let ctx = Context::new(properties, PathBuf::from("config.toml"), Some(PathBuf::from("/from/flag")));
        assert_eq!(ctx.repo_path(None), PathBuf::from("/from/flag"));
        assert_eq!(ctx.repo_path(Some(Path::new("/explicit"))), PathBuf::from("/explicit"));
    }
}
