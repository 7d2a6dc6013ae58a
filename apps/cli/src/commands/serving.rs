use super::{Context, emit};
use anyhow::{Context as _, bail};
use feast::MaterializationReport;
use feast::domain::time::{format_timestamp, parse_timestamp};
use serde_json::{Map, Value as Json};
use std::fs::File;
use std::io;
use std::path::Path;

fn views_filter(views: &[String]) -> Option<&[String]> {
    (!views.is_empty()).then_some(views)
}

fn report(reports: &[MaterializationReport]) -> String {
    reports
        .iter()
        .map(|r| {
            format!(
                "{}: {} rows read, {} rows written ({} to {})\n",
                r.view,
                r.rows_read,
                r.rows_written,
                format_timestamp(&r.start),
                format_timestamp(&r.end)
            )
        })
        .collect()
}

pub(super) async fn materialize(
    ctx: &Context,
    repo_path: Option<&Path>,
    start: &str,
    end: &str,
    views: &[String],
) -> anyhow::Result<()> {
    let start = parse_timestamp(start).context("START_TS")?;
    let end = parse_timestamp(end).context("END_TS")?;
    let store = ctx.open_store(repo_path).await?;

    let reports = store.materialize(start, end, views_filter(views)).await?;
    emit(report(&reports))
}

pub(super) async fn materialize_incremental(
    ctx: &Context,
    repo_path: Option<&Path>,
    end: &str,
    views: &[String],
) -> anyhow::Result<()> {
    let end = parse_timestamp(end).context("END_TS")?;
    let store = ctx.open_store(repo_path).await?;

    let reports = store.materialize_incremental(end, views_filter(views)).await?;
    emit(report(&reports))
}

/// Parses `driver_id=1001,customer_id=5` into an entity row. Values stay strings; the store
/// types them with the registered entity's value type.
fn entity_row(raw: &str) -> anyhow::Result<Map<String, Json>> {
    let mut row = Map::new();
    for pair in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let Some((key, value)) = pair.split_once('=') else {
            bail!("Invalid entity '{pair}', expected KEY=VALUE");
        };
        row.insert(key.trim().to_owned(), Json::String(value.trim().to_owned()));
    }
    if row.is_empty() {
        bail!("Empty entity row '{raw}'");
    }
    Ok(row)
}

pub(super) async fn get_online_features(
    ctx: &Context,
    repo_path: Option<&Path>,
    features: &[String],
    entities: &[String],
) -> anyhow::Result<()> {
    let rows = entities.iter().map(|raw| entity_row(raw)).collect::<anyhow::Result<Vec<_>>>()?;
    let store = ctx.open_store(repo_path).await?;

    let response = store.get_online_features(features, &rows).await?;
    emit(serde_json::to_string_pretty(&response.to_dict())?)
}

pub(super) async fn get_historical_features(
    ctx: &Context,
    repo_path: Option<&Path>,
    features: &[String],
    entities: &Path,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let store = ctx.open_store(repo_path).await?;
    let frame = store.get_historical_features(entities, features).await?;

    match output {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
            frame.write_csv(file)?;
        },
        None => frame.write_csv(io::stdout().lock())?,
    }
    Ok(())
}
