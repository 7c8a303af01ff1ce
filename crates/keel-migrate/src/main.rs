//! keel CLI
//!
//! Command-line tool for applying, rolling back and generating changelogs.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::sqlite::SqlitePool;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use keel_core::database::{database_for, DatabaseKind};
use keel_core::sqlgen::build_default_registry;
use keel_migrate::prelude::*;

/// Changelog-driven database migrations.
#[derive(Parser)]
#[command(name = "keel")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database URL (`sqlite:` only).
    #[arg(short, long, env = "DATABASE_URL")]
    url: Option<String>,

    /// Changelog file.
    #[arg(short, long, env = "KEEL_CHANGELOG", default_value = "changelog.json")]
    changelog: PathBuf,

    /// Dialect for offline SQL rendering (sqlite, postgresql, mysql, generic).
    #[arg(short, long, default_value = "sqlite")]
    dialect: String,

    /// Only run change sets of these contexts (comma-separated).
    #[arg(long, value_delimiter = ',')]
    contexts: Vec<String>,

    /// Seconds to wait for the changelog lock.
    #[arg(long, default_value_t = DEFAULT_LOCK_WAIT.as_secs())]
    lock_wait: u64,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending change sets.
    Update,

    /// Print the SQL `update` would run. Without `--url`, renders every
    /// change set for `--dialect`.
    UpdateSql,

    /// Roll back the most recently ran change sets.
    Rollback {
        /// Number of change sets to roll back.
        #[arg(long, default_value_t = 1)]
        count: usize,
    },

    /// Print the SQL `rollback` would run.
    RollbackSql {
        /// Number of change sets to roll back.
        #[arg(long, default_value_t = 1)]
        count: usize,
    },

    /// Show which change sets ran and which are pending.
    Status,

    /// Tag the most recently ran change set.
    Tag {
        /// Tag name.
        name: String,
    },

    /// Release the changelog lock, whoever holds it.
    ReleaseLocks,

    /// Compare the database with a reference database.
    Diff {
        /// URL of the database holding the desired schema.
        #[arg(long)]
        reference_url: String,
    },

    /// Generate a changelog bringing the database in line with a reference.
    DiffChangelog {
        /// URL of the database holding the desired schema.
        #[arg(long)]
        reference_url: String,

        /// Author recorded on the generated change sets.
        #[arg(long, default_value = "keel")]
        author: String,

        /// Write the changelog here instead of printing it.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

impl Cli {
    async fn pool(&self) -> anyhow::Result<SqlitePool> {
        let url = self
            .url
            .as_deref()
            .context("--url or DATABASE_URL is required for this command")?;
        Ok(connect(url).await?)
    }

    async fn executor(&self) -> anyhow::Result<Executor> {
        Ok(Executor::new(self.pool().await?)
            .contexts(self.contexts.clone())
            .lock_wait(Duration::from_secs(self.lock_wait)))
    }

    fn load_changelog(&self) -> anyhow::Result<DatabaseChangeLog> {
        Ok(DatabaseChangeLog::load(&self.changelog)?)
    }

    fn dialect(&self) -> Result<DatabaseKind> {
        DatabaseKind::from_short_name(&self.dialect)
            .ok_or_else(|| MigrateError::UnsupportedDialect(self.dialect.clone()))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match &cli.command {
        Commands::Update => {
            let changelog = cli.load_changelog()?;
            let count = cli.executor().await?.update(&changelog).await?;
            info!(count, "Database is up to date");
        }

        Commands::UpdateSql => {
            let changelog = cli.load_changelog()?;
            let script = if cli.url.is_some() {
                cli.executor().await?.update_sql(&changelog).await?
            } else {
                let database = database_for(cli.dialect()?);
                let registry = build_default_registry();
                let change_sets: Vec<&ChangeSet> = changelog
                    .change_sets
                    .iter()
                    .filter(|change_set| change_set.matches_contexts(&cli.contexts))
                    .collect();
                ScriptRenderer::new(&registry, database.as_ref()).update_script(
                    &change_sets,
                    1,
                    true,
                )?
            };
            print!("{script}");
        }

        Commands::Rollback { count } => {
            let changelog = cli.load_changelog()?;
            let count = cli.executor().await?.rollback(&changelog, *count).await?;
            info!(count, "Rollback complete");
        }

        Commands::RollbackSql { count } => {
            let changelog = cli.load_changelog()?;
            let script = cli.executor().await?.rollback_sql(&changelog, *count).await?;
            print!("{script}");
        }

        Commands::Status => {
            let changelog = cli.load_changelog()?;
            let statuses = cli.executor().await?.status(&changelog).await?;
            let pending = statuses.iter().filter(|s| s.status.will_run()).count();

            println!("\n{} change sets, {pending} pending:", statuses.len());
            println!("{:-<60}", "");
            for status in &statuses {
                let mark = if status.status == RunStatus::NotRan { " " } else { "X" };
                println!(" [{mark}] {} ({})", status.identity, status.status);
                println!("       {}", status.description);
            }
            println!();
        }

        Commands::Tag { name } => {
            cli.executor().await?.tag(name).await?;
            info!(tag = %name, "Tagged database");
        }

        Commands::ReleaseLocks => {
            cli.executor().await?.release_locks().await?;
            info!("Released change log lock");
        }

        Commands::Diff { reference_url } => {
            let target = cli.pool().await?;
            let reference = connect(reference_url).await?;
            let diff = SchemaDiff::read(&reference, &target).await?;
            println!("{}", diff.summary().trim_end());
        }

        Commands::DiffChangelog {
            reference_url,
            author,
            output,
        } => {
            let target = cli.pool().await?;
            let reference = connect(reference_url).await?;
            let diff = SchemaDiff::read(&reference, &target).await?;

            let database = database_for(cli.dialect()?);
            let filename = output
                .as_ref()
                .and_then(|path| path.file_name())
                .map_or_else(|| "changelog.json".to_string(), |name| name.to_string_lossy().into_owned());
            let changelog =
                diff.to_changelog(database.as_ref(), &default_id_root(), author, &filename)?;
            let json = changelog.to_json()?;

            match output {
                Some(path) => {
                    std::fs::write(path, json)?;
                    info!(
                        path = %path.display(),
                        count = changelog.change_sets.len(),
                        "Wrote changelog"
                    );
                }
                None => println!("{json}"),
            }
        }
    }

    Ok(())
}
