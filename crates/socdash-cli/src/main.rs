mod lookup;
mod refresh;

use clap::{ArgGroup, Parser, Subcommand};
use socdash_core::AppConfig;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "socdash-cli")]
#[command(about = "socdash command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Re-fetch metrics for connected accounts
    #[command(group(ArgGroup::new("target").required(true).args(["user", "all"])))]
    Refresh {
        /// Refresh every account of one user (public user id)
        #[arg(long)]
        user: Option<Uuid>,

        /// Refresh every connected account of every user
        #[arg(long)]
        all: bool,
    },
    /// Print live public metrics for a profile without storing them
    Lookup {
        /// Platform name, e.g. `tiktok` or `linkedin`
        platform: String,
        /// Username on that platform
        username: String,
    },
}

async fn connect(config: &AppConfig) -> anyhow::Result<sqlx::PgPool> {
    let pool_config = socdash_db::PoolConfig::from_app_config(config);
    Ok(socdash_db::connect_pool(&config.database_url, pool_config).await?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("socdash-cli: use --help to list commands");
        return Ok(());
    };

    let config = socdash_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match command {
        Commands::Migrate => {
            let pool = connect(&config).await?;
            let applied = socdash_db::run_migrations(&pool).await?;
            tracing::info!(applied, "migrations complete");
            println!("applied {applied} migration(s)");
        }
        Commands::Refresh { user, all: _ } => {
            let pool = connect(&config).await?;
            let clients = socdash_platforms::PlatformClients::from_config(&config)?;
            let failed = match user {
                Some(user) => refresh::run_refresh_user(&pool, &clients, user).await?,
                None => refresh::run_refresh_all(&pool, &clients).await?,
            };
            if failed > 0 {
                anyhow::bail!("{failed} account(s) failed to refresh");
            }
        }
        Commands::Lookup { platform, username } => {
            let clients = socdash_platforms::PlatformClients::from_config(&config)?;
            lookup::run_lookup(&clients, &platform, &username).await?;
        }
    }

    Ok(())
}
