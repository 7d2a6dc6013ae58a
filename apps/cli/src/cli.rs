use clap::{Args, Parser, Subcommand};
use feast_runtime::RuntimeConfig;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "feast", version, about = "Feast: a local feature store for machine learning")]
pub(crate) struct Cli {
    /// Log debug details to stderr.
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Log errors only.
    #[arg(short, long)]
    pub quiet: bool,

    /// Feature repository for object commands. Defaults to the `repo_path` property, then the
    /// current directory.
    #[arg(long, global = true, value_name = "PATH")]
    pub repo: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// Print version information.
    Version {
        /// Skip the registry of the current repository.
        #[arg(short, long)]
        client_only: bool,
    },

    /// View and edit CLI properties.
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Create and inspect entities.
    #[command(subcommand)]
    Entities(EntityCommand),

    /// Create and inspect feature views.
    #[command(subcommand, name = "feature-views")]
    FeatureViews(FeatureViewCommand),

    /// Create and manage projects.
    #[command(subcommand)]
    Projects(ProjectCommand),

    /// Create a new feature repository in the current directory.
    Init {
        /// Only write feature_store.yaml.
        #[arg(short, long)]
        minimal: bool,
    },

    /// Register every definition of a repository and update online infrastructure.
    Apply(RepoArg),

    /// Drop the online data of a repository.
    Teardown(RepoArg),

    /// Print the registry contents of a repository as JSON.
    #[command(name = "registry-dump")]
    RegistryDump(RepoArg),

    /// Load features from sources into the online store for a time window.
    Materialize {
        /// Window start, inclusive.
        start_ts: String,
        /// Window end, exclusive.
        end_ts: String,
        #[command(flatten)]
        repo: RepoArg,
        /// Feature views to materialize; all online views when omitted.
        #[arg(short, long = "views", value_name = "NAME")]
        views: Vec<String>,
    },

    /// Load features from the end of the last materialized window up to END_TS.
    #[command(name = "materialize-incremental")]
    MaterializeIncremental {
        end_ts: String,
        #[command(flatten)]
        repo: RepoArg,
        #[arg(short, long = "views", value_name = "NAME")]
        views: Vec<String>,
    },

    /// Look up the latest feature values of entities in the online store.
    #[command(name = "get-online-features")]
    GetOnlineFeatures {
        #[command(flatten)]
        repo: RepoArg,
        /// Feature references (`view:feature`), repeated or comma separated.
        #[arg(short, long = "features", value_name = "REF", value_delimiter = ',', required = true)]
        features: Vec<String>,
        /// One entity row per flag: `join_key=value[,join_key=value]`.
        #[arg(short, long = "entities", value_name = "KEY=VALUE", required = true)]
        entities: Vec<String>,
    },

    /// Join point-in-time correct features onto an entity CSV.
    #[command(name = "get-historical-features")]
    GetHistoricalFeatures {
        #[command(flatten)]
        repo: RepoArg,
        #[arg(short, long = "features", value_name = "REF", value_delimiter = ',', required = true)]
        features: Vec<String>,
        /// CSV with the join key columns and `event_timestamp`.
        #[arg(long, value_name = "CSV")]
        entities: PathBuf,
        /// Output file; stdout when omitted.
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

impl Command {
    /// Materialization fans out online writes and gets the wide batch pool.
    pub(crate) fn runtime(&self) -> RuntimeConfig {
        match self {
            Self::Materialize { .. } | Self::MaterializeIncremental { .. } => RuntimeConfig::batch(),
            _ => RuntimeConfig::interactive(),
        }
    }
}

#[derive(Debug, Args)]
pub(crate) struct RepoArg {
    /// Repository directory. Defaults to `--repo`, then the current directory.
    #[arg(value_name = "REPO_PATH")]
    pub repo_path: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub(crate) struct ProjectArg {
    /// Project; defaults to the `project` property, then the repository's project.
    #[arg(short, long)]
    pub project: Option<String>,
}

#[derive(Debug, Subcommand)]
pub(crate) enum ConfigCommand {
    /// Print every property with its effective value.
    List,
    /// Set a property and persist it.
    Set { property: String, value: String },
}

#[derive(Debug, Subcommand)]
pub(crate) enum EntityCommand {
    /// Register the entities of a YAML file.
    Apply {
        #[arg(short, long = "filename", value_name = "FILE")]
        file: PathBuf,
        #[command(flatten)]
        project: ProjectArg,
    },
    /// Print an entity as YAML.
    Describe {
        name: String,
        #[command(flatten)]
        project: ProjectArg,
    },
    /// List entities.
    List {
        #[command(flatten)]
        project: ProjectArg,
        /// Filter: `key,value[,key,value]`.
        #[arg(short, long)]
        labels: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub(crate) enum FeatureViewCommand {
    /// Register the feature views of a YAML file.
    Apply {
        #[arg(short, long = "filename", value_name = "FILE")]
        file: PathBuf,
        #[command(flatten)]
        project: ProjectArg,
    },
    /// Print a feature view as YAML.
    Describe {
        name: String,
        #[command(flatten)]
        project: ProjectArg,
    },
    /// List feature views.
    List {
        #[command(flatten)]
        project: ProjectArg,
        /// Filter on tags: `key,value[,key,value]`.
        #[arg(short, long)]
        labels: Option<String>,
    },
    /// Delete a feature view and its online data.
    Delete {
        name: String,
        #[command(flatten)]
        project: ProjectArg,
    },
}

#[derive(Debug, Subcommand)]
pub(crate) enum ProjectCommand {
    Create { name: String },
    Archive { name: String },
    List,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_tree_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn verbose_flag_and_views_flag_do_not_clash() {
        let cli = Cli::try_parse_from([
            "feast", "-v", "materialize", "2021-04-01", "2021-04-02", "repo", "-v", "a", "--views", "b",
        ])
        .unwrap();
        assert!(cli.verbose);
        let Command::Materialize { views, repo, .. } = cli.command else { panic!("wrong command") };
        assert_eq!(views, ["a", "b"]);
        assert_eq!(repo.repo_path, Some(PathBuf::from("repo")));
    }

    #[test]
    fn materialization_runs_on_the_batch_profile() {
        let cli = Cli::try_parse_from(["feast", "materialize-incremental", "2021-04-02"]).unwrap();
        assert_eq!(cli.command.runtime(), RuntimeConfig::batch());

        let cli = Cli::try_parse_from(["feast", "entities", "list"]).unwrap();
        assert_eq!(cli.command.runtime(), RuntimeConfig::interactive());
    }

    #[test]
    fn online_features_split_refs() {
        let cli = Cli::try_parse_from([
            "feast",
            "get-online-features",
            "-f",
            "stats:conv_rate,stats:acc_rate",
            "-e",
            "driver_id=1001",
            "-e",
            "driver_id=1002",
        ])
        .unwrap();
        let Command::GetOnlineFeatures { features, entities, repo } = cli.command else {
            panic!("wrong command")
        };
        assert_eq!(features, ["stats:conv_rate", "stats:acc_rate"]);
        assert_eq!(entities.len(), 2);
        assert!(repo.repo_path.is_none());
    }
}
