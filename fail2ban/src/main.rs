use clap::Parser;
use fail2ban::{Fail2Ban, Fail2BanBuilder, PolicyConfig, SqliteRepositoryProvider};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command line interface for fail2ban
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database connection string
    #[arg(long, env = "FAIL2BAN_DATABASE_URL", default_value = "sqlite://fail2ban.db")]
    db_url: String,

    /// Command to execute
    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands
#[derive(clap::Subcommand)]
enum Commands {
    /// Create the attempt log table
    Migrate,
    /// Drop the attempt log table and all recorded attempts
    Uninstall,
    /// Show whether an identity is banned
    Status {
        identity: String,
    },
    /// List the most recent attempts for an identity
    History {
        identity: String,
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
    /// Print the active policy settings
    Policy,
}

/// Open the attempt log for commands that need storage.
async fn open(
    db_url: &str,
) -> Result<Fail2Ban<SqliteRepositoryProvider>, Box<dyn std::error::Error>> {
    let fail2ban = Fail2BanBuilder::new()
        .with_sqlite(db_url)
        .await?
        .with_policy_from_env()?
        .build()
        .await?;
    Ok(fail2ban)
}

/// Execute one command and return what it prints.
async fn run(cli: Cli) -> Result<Option<String>, Box<dyn std::error::Error>> {
    let output = match cli.command {
        Commands::Migrate => {
            tracing::info!(db_url = %cli.db_url, "Running migrations");
            open(&cli.db_url).await?.migrate().await?;
            None
        }
        Commands::Uninstall => {
            tracing::info!(db_url = %cli.db_url, "Removing attempt log");
            open(&cli.db_url).await?.uninstall().await?;
            None
        }
        Commands::Status { identity } => {
            let status = open(&cli.db_url).await?.status(&identity).await?;
            Some(serde_json::to_string_pretty(&status)?)
        }
        Commands::History { identity, limit } => {
            let attempts = open(&cli.db_url).await?.history(&identity, limit).await?;
            Some(serde_json::to_string_pretty(&attempts)?)
        }
        Commands::Policy => {
            let policy = PolicyConfig::from_env()?;
            Some(serde_json::to_string_pretty(&policy.describe())?)
        }
    };

    Ok(output)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Some(output) = run(Cli::parse()).await? {
        println!("{output}");
    }

    Ok(())
}
