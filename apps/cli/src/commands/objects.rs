use super::{Context, emit};
use crate::cli::{EntityCommand, FeatureViewCommand, ProjectArg, ProjectCommand};
use crate::table::Table;
use anyhow::Context as _;
use feast::FeatureStore;
use feast::domain::labels::parse_labels;
use feast::domain::{Entity, FeatureView};
use feast::online::OnlineStore;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

/// `--project`, then the `project` property, then the repository's project.
fn project<'a>(ctx: &'a Context, store: &'a FeatureStore, arg: &'a ProjectArg) -> &'a str {
    arg.project
        .as_deref()
        .or(ctx.properties.project.as_deref().filter(|p| !p.is_empty()))
        .unwrap_or_else(|| store.project())
}

fn labels(raw: Option<&str>) -> anyhow::Result<BTreeMap<String, String>> {
    Ok(raw.map(parse_labels).transpose()?.unwrap_or_default())
}

/// Every YAML document of `path` as a `T`.
fn read_documents<T: DeserializeOwned>(path: &Path) -> anyhow::Result<Vec<T>> {
    let text = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_yaml::Deserializer::from_str(&text)
        .map(|document| {
            T::deserialize(document).with_context(|| format!("Invalid definition in {}", path.display()))
        })
        .collect()
}

pub(super) async fn entities(ctx: &Context, command: EntityCommand) -> anyhow::Result<()> {
    let store = ctx.open_store(None).await?;
    let registry = store.registry();

    match command {
        EntityCommand::Apply { file, project: arg } => {
            let project = project(ctx, &store, &arg);
            for entity in read_documents::<Entity>(&file)? {
                let entity = registry.apply_entity(entity, project).await?;
                info!(project, entity = %entity.name, "Registered entity");
            }
            Ok(())
        },
        EntityCommand::Describe { name, project: arg } => {
            match registry.get_entity(&name, project(ctx, &store, &arg)).await {
                Ok(entity) => emit(serde_yaml::to_string(&entity)?),
                Err(err) if err.is_not_found() => emit(format!("Entity with name \"{name}\" could not be found")),
                Err(err) => Err(err.into()),
            }
        },
        EntityCommand::List { project: arg, labels: filter } => {
            let entities = registry.list_entities(project(ctx, &store, &arg), &labels(filter.as_deref())?).await?;
            let mut table = Table::new(["NAME", "DESCRIPTION", "TYPE"]);
            for entity in entities {
                table.push(vec![entity.name, entity.description, entity.value_type.to_string()]);
            }
            emit(table.render())
        },
    }
}

pub(super) async fn feature_views(ctx: &Context, command: FeatureViewCommand) -> anyhow::Result<()> {
    let store = ctx.open_store(None).await?;
    let registry = store.registry();

    match command {
        FeatureViewCommand::Apply { file, project: arg } => {
            let project = project(ctx, &store, &arg);
            let mut applied = Vec::new();
            for view in read_documents::<FeatureView>(&file)? {
                applied.push(registry.apply_feature_view(view, project).await?);
            }
            store.provider().update_infra(project, &[], &applied).await?;
            info!(project, feature_views = applied.len(), "Registered feature views");
            Ok(())
        },
        FeatureViewCommand::Describe { name, project: arg } => {
            match registry.get_feature_view(&name, project(ctx, &store, &arg)).await {
                Ok(view) => emit(serde_yaml::to_string(&view)?),
                Err(err) if err.is_not_found() => {
                    emit(format!("Feature view with name \"{name}\" could not be found"))
                },
                Err(err) => Err(err.into()),
            }
        },
        FeatureViewCommand::List { project: arg, labels: filter } => {
            let views = registry.list_feature_views(project(ctx, &store, &arg), &labels(filter.as_deref())?).await?;
            let mut table = Table::new(["NAME", "ENTITIES"]);
            for view in views {
                table.push(vec![view.name, view.entities.join(", ")]);
            }
            emit(table.render())
        },
        FeatureViewCommand::Delete { name, project: arg } => {
            let project = project(ctx, &store, &arg);
            let view = registry.get_feature_view(&name, project).await?;
            store.provider().teardown_infra(project, std::slice::from_ref(&view)).await?;
            registry.delete_feature_view(&name, project).await?;
            Ok(())
        },
    }
}

pub(super) async fn projects(ctx: &Context, command: ProjectCommand) -> anyhow::Result<()> {
    let store = ctx.open_store(None).await?;
    let registry = store.registry();

    match command {
        ProjectCommand::Create { name } => Ok(registry.create_project(&name).await?),
        ProjectCommand::Archive { name } => {
            registry.archive_project(&name).await?;
            // Archived projects can no longer be served from.
            store.provider().teardown_project(&name).await?;
            Ok(())
        },
        ProjectCommand::List => {
            let mut table = Table::new(["NAME"]);
            for name in registry.list_projects().await? {
                table.push(vec![name]);
            }
            emit(table.render())
        },
    }
}
