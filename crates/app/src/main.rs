use std::fmt;
use std::time::Duration;

use clap::{Parser, Subcommand};
use coach_core::Catalog;
use coach_core::model::{AssessmentId, UserId};
use services::{AppServices, AttemptSettings, Clock};
use tracing_subscriber::EnvFilter;

mod report;
mod take;

#[derive(Parser)]
#[command(name = "coach", about = "Timed career-coaching assessments")]
#[command(version, propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// SQLite database for recorded results
    #[arg(long, env = "COACH_DB_URL", default_value = "sqlite://coach.sqlite3", global = true)]
    db: String,

    /// User the results are recorded for
    #[arg(long = "user", env = "COACH_USER_ID", default_value_t = 1, global = true)]
    user_id: u64,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// List assessments in the catalog
    List {
        /// Only assessments in this category
        #[arg(long)]
        category: Option<String>,
        /// Case-insensitive text search
        #[arg(long)]
        search: Option<String>,
    },
    /// Take an assessment in the terminal
    Take {
        /// Assessment id, as shown by `list`
        assessment: String,
        /// Countdown tick length in milliseconds
        #[arg(long, default_value_t = 1_000, hide = true)]
        tick_millis: u64,
    },
    /// Show recent results and overall progress
    History {
        /// Number of recent results to show
        #[arg(long, default_value_t = 10)]
        limit: u32,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug)]
enum ArgsError {
    InvalidDbUrl { raw: String },
    InvalidTickMillis,
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidTickMillis => write!(f, "--tick-millis must be > 0"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn normalize_sqlite_url(raw: &str) -> Result<String, ArgsError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ArgsError::InvalidDbUrl { raw: raw.to_owned() });
    }
    if trimmed == "sqlite::memory:" || trimmed.starts_with("sqlite://") {
        return Ok(trimmed.to_owned());
    }

    let path_str = trimmed.strip_prefix("sqlite:").unwrap_or(trimmed);
    let path = std::path::Path::new(path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    Ok(format!("sqlite://{}", absolute.display()))
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

async fn open_services(db: &str, settings: AttemptSettings) -> Result<AppServices, Box<dyn std::error::Error>> {
    // Open + migrate SQLite here so core/services stay free of filesystem concerns.
    let db_url = normalize_sqlite_url(db)?;
    prepare_sqlite_file(&db_url)?;
    tracing::debug!(%db_url, "opening result store");
    Ok(AppServices::new_sqlite(&db_url, Clock::system(), settings).await?)
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let user = UserId::new(cli.user_id);

    match cli.command {
        Command::List { category, search } => {
            let catalog = Catalog::builtin()?;
            report::print_catalog(&catalog, category.as_deref(), search.as_deref());
            Ok(())
        }
        Command::Take {
            assessment,
            tick_millis,
        } => {
            if tick_millis == 0 {
                return Err(ArgsError::InvalidTickMillis.into());
            }
            let id: AssessmentId = assessment.parse()?;
            let settings =
                AttemptSettings::default().with_tick_period(Duration::from_millis(tick_millis));
            let services = open_services(&cli.db, settings).await?;
            take::run(&services, &id, user).await
        }
        Command::History { limit, json } => {
            let services = open_services(&cli.db, AttemptSettings::default()).await?;
            let progress = services.progress();
            let recent = progress.recent_results(user, limit).await?;
            let overview = progress.overview(user, &services.catalog()).await?;
            if json {
                let doc = serde_json::json!({ "recent": recent, "overview": overview });
                println!("{}", serde_json::to_string_pretty(&doc)?);
            } else {
                report::print_history(&recent, &overview);
            }
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run(cli).await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
