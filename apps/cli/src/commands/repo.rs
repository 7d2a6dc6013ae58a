use super::{Context, emit};
use feast::kernel::config::load_repo_config;
use std::path::Path;
use tracing::info;

pub(super) fn init(ctx: &Context, minimal: bool) -> anyhow::Result<()> {
    let path = ctx.repo_path(None);
    let written = feast::repo::init_repo(&path, minimal)?;
    let listing: String = written.iter().map(|file| format!("Created {}\n", file.display())).collect();
    emit(listing)
}

pub(super) async fn apply(ctx: &Context, repo_path: Option<&Path>) -> anyhow::Result<()> {
    let path = ctx.repo_path(repo_path);
    feast::repo::check_repo(&path)?;
    let config = load_repo_config(&path)?;

    let summary = feast::repo::apply_total(&config, &path).await?;
    let mut report = String::new();
    for name in &summary.entities {
        report.push_str(&format!("Registered entity {name}\n"));
    }
    for name in &summary.feature_views {
        report.push_str(&format!("Registered feature view {name}\n"));
    }
    for name in &summary.deleted_feature_views {
        report.push_str(&format!("Deleted feature view {name}\n"));
    }
    if report.is_empty() {
        info!(project = %config.project, "Nothing to apply");
        return Ok(());
    }
    emit(report)
}

pub(super) async fn teardown(ctx: &Context, repo_path: Option<&Path>) -> anyhow::Result<()> {
    let path = ctx.repo_path(repo_path);
    feast::repo::check_repo(&path)?;
    let config = load_repo_config(&path)?;
    feast::repo::teardown(&config, &path).await?;
    Ok(())
}

pub(super) async fn registry_dump(ctx: &Context, repo_path: Option<&Path>) -> anyhow::Result<()> {
    let path = ctx.repo_path(repo_path);
    feast::repo::check_repo(&path)?;
    let config = load_repo_config(&path)?;
    emit(feast::repo::registry_dump(&config).await?)
}
