//! tml-writer - records subject activity into the timeline database
//!
//! ```bash
//! tml-writer collect --user 7 --subject-id 100 --subject-type 2 --name "Cowboy Bebop" --collection 2
//! tml-writer progress --user 7 --subject-id 100 --subject-type 2 --name "Cowboy Bebop" --eps-update 3
//! tml-writer inspect --id 1
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tml_common::config::{load_toml_config, resolve_database_path, ConfigSource};
use tml_common::db::{init_database, SqliteTimelineStore, TimelineId};
use tml_common::timeline::TimelineEntry;
use tml_writer::{
    ActivityRecorder, EpisodeSummary, MergePolicy, SubjectActivity, SubjectSummary,
};
use tracing::{error, info, warn};

/// Command-line arguments for tml-writer
#[derive(Parser, Debug)]
#[command(name = "tml-writer")]
#[command(about = "Record and inspect timeline activity")]
#[command(version)]
struct Cli {
    /// Path to config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database file (overrides TML_DATABASE and the config file)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Record a collection status change
    Collect {
        #[command(flatten)]
        subject: SubjectArgs,

        /// 1 wish, 2 done, 3 doing, 4 on hold, 5 dropped
        #[arg(long)]
        collection: u8,

        #[arg(long, default_value = "")]
        comment: String,

        #[arg(long, default_value_t = 0)]
        rate: u8,
    },
    /// Record watch/read progress
    Progress {
        #[command(flatten)]
        subject: SubjectArgs,

        #[arg(long, requires_all = ["episode_sort", "episode_name"])]
        episode_id: Option<u32>,

        #[arg(long)]
        episode_sort: Option<u32>,

        #[arg(long)]
        episode_name: Option<String>,

        #[arg(long)]
        eps_update: Option<u32>,

        #[arg(long)]
        vols_update: Option<u32>,
    },
    /// Print a stored row as JSON
    Inspect {
        #[arg(long)]
        id: i64,
    },
}

#[derive(Args, Debug)]
struct SubjectArgs {
    #[arg(long)]
    user: u32,

    #[arg(long)]
    subject_id: u32,

    /// 1 book, 2 anime, 3 music, 4 game, 6 real
    #[arg(long)]
    subject_type: u8,

    #[arg(long)]
    name: String,

    #[arg(long, default_value = "")]
    name_cn: String,

    #[arg(long)]
    series: bool,

    #[arg(long, default_value_t = 0)]
    eps_total: u32,

    #[arg(long, default_value_t = 0)]
    vols_total: u32,

    /// Cover image path
    #[arg(long, default_value = "")]
    image: String,
}

impl SubjectArgs {
    fn summary(&self) -> SubjectSummary {
        SubjectSummary {
            id: self.subject_id,
            type_id: self.subject_type,
            name: self.name.clone(),
            name_cn: self.name_cn.clone(),
            series: self.series,
            eps_total: self.eps_total,
            vols_total: self.vols_total,
            image: self.image.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, source) = load_toml_config(cli.config.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.clone().into()),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Starting tml-writer v{}", env!("CARGO_PKG_VERSION"));
    match &source {
        ConfigSource::File(path) => info!("Config file: {}", path.display()),
        ConfigSource::Defaults => warn!("No config file found, using defaults"),
    }

    let db_path = resolve_database_path(cli.database.as_deref(), &config);
    info!("Database path: {}", db_path.display());

    let pool = match init_database(&db_path).await {
        Ok(pool) => pool,
        Err(e) => {
            error!("Failed to open database: {}", e);
            return Err(e.into());
        }
    };
    let store = SqliteTimelineStore::new(pool);

    match cli.command {
        Command::Inspect { id } => {
            let record = store
                .get_by_id(TimelineId(id))
                .await?
                .with_context(|| format!("timeline row {} not found", id))?;
            let entry = TimelineEntry::decode(&record)
                .with_context(|| format!("timeline row {} is not decodable", id))?;
            println!("{}", serde_json::to_string_pretty(&entry)?);
        }
        Command::Collect {
            subject,
            collection,
            comment,
            rate,
        } => {
            let recorder = ActivityRecorder::new(Arc::new(store), MergePolicy::from(&config.merge));
            let outcome = recorder
                .record_subject_activity(
                    subject.user,
                    &subject.summary(),
                    SubjectActivity::Collect {
                        collection,
                        comment,
                        rate,
                    },
                )
                .await?;
            println!("{}", outcome.label());
        }
        Command::Progress {
            subject,
            episode_id,
            episode_sort,
            episode_name,
            eps_update,
            vols_update,
        } => {
            let event = match episode_id {
                Some(id) => SubjectActivity::EpisodeProgress {
                    episode: EpisodeSummary {
                        id,
                        sort: episode_sort.unwrap_or_default(),
                        name: episode_name.unwrap_or_default(),
                    },
                    eps_update,
                    vols_update,
                },
                None => SubjectActivity::SubjectProgress {
                    eps_update,
                    vols_update,
                },
            };
            let recorder = ActivityRecorder::new(Arc::new(store), MergePolicy::from(&config.merge));
            let outcome = recorder
                .record_subject_activity(subject.user, &subject.summary(), event)
                .await?;
            println!("{}", outcome.label());
        }
    }

    Ok(())
}
