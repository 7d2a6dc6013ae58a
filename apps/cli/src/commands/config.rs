use super::{Context, emit};
use crate::cli::ConfigCommand;
use feast::domain::config::CLI_PROPERTIES;
use feast::domain::time::format_timestamp;
use feast::kernel::config::set_cli_property;
use serde_json::json;
use tracing::{debug, info};

pub(super) async fn version(ctx: &Context, client_only: bool) -> anyhow::Result<()> {
    let mut report = json!({ "sdk": { "version": format!("feast {}", env!("CARGO_PKG_VERSION")) } });

    let repo_path = ctx.repo_path(None);
    if !client_only && feast::repo::check_repo(&repo_path).is_ok() {
        let store = ctx.open_store(None).await?;
        let snapshot = store.registry().snapshot().await?;
        report["registry"] = json!({
            "path": store.registry().path().display().to_string(),
            "version": snapshot.version,
            "last_updated": snapshot.last_updated.as_ref().map(format_timestamp),
        });
    } else {
        debug!(repo = %repo_path.display(), client_only, "Registry version skipped");
    }

    emit(serde_json::to_string(&report)?)
}

pub(super) fn run(ctx: &Context, command: ConfigCommand) -> anyhow::Result<()> {
    match command {
        ConfigCommand::List => {
            let listing: String = CLI_PROPERTIES
                .iter()
                .map(|property| {
                    format!("{property}={}\n", ctx.properties.get(property).unwrap_or_default())
                })
                .collect();
            emit(listing)
        },
        ConfigCommand::Set { property, value } => {
            set_cli_property(&ctx.properties_path, &property, &value)?;
            info!(property = %property, value = %value, path = %ctx.properties_path.display(), "Property set");
            Ok(())
        },
    }
}
