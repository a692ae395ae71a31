use anyhow::Context;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use parrot::config::{redis_connection_from_env, DEFAULT_DATABASE_URL};
use parrot::db;
use parrot::migrate::{self, Progress, RedisStores, SqliteStores};
use redis::IntoConnectionInfo;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "parrot-migrate", about = "Move Parrot's data between Redis and SQLite")]
struct Cli {
    /// SQLite database (created if missing)
    #[arg(long, global = true, env = "DATABASE_URL", default_value = DEFAULT_DATABASE_URL)]
    database_url: String,

    /// Defaults to REDIS_URL, or REDIS_HOST / REDIS_PORT / REDIS_PASSWORD
    #[arg(long, global = true)]
    redis_url: Option<String>,

    /// Read the source and report what would be moved, without writing anything
    #[arg(long, global = true)]
    dry_run: bool,

    /// No progress bars
    #[arg(long, short, global = true)]
    quiet: bool,

    #[command(subcommand)]
    direction: Direction,
}

#[derive(Subcommand)]
enum Direction {
    /// Copy corpora, registrations, avatars and channel permissions from Redis into SQLite
    RedisToSqlite,
    /// The reverse; message timestamps are lost
    SqliteToRedis,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let progress = Progress::new(!cli.quiet);
    let redis_info = match &cli.redis_url {
        Some(url) => url.as_str().into_connection_info().context("--redis-url")?,
        None => redis_connection_from_env()?,
    };

    info!(addr = %redis_info.addr, "connecting to redis");
    let redis = RedisStores::new(redis::Client::open(redis_info)?);

    match cli.direction {
        Direction::RedisToSqlite => {
            let snapshot = migrate::snapshot_from_redis(&redis, &progress).await?;
            println!("Redis holds {snapshot}");
            if cli.dry_run {
                return Ok(());
            }
            info!(database = %cli.database_url, "opening sqlite, creating tables if they don't exist");
            let sqlite = SqliteStores::new(db::init_pool(&cli.database_url).await?);
            let report = migrate::load_into_sqlite(&snapshot, &sqlite, &progress).await?;
            println!("✅ Wrote {report}");
        }
        Direction::SqliteToRedis => {
            info!(database = %cli.database_url, "opening sqlite");
            let sqlite = SqliteStores::new(db::init_pool(&cli.database_url).await?);
            let snapshot = migrate::snapshot_from_sqlite(&sqlite, &progress).await?;
            println!("SQLite holds {snapshot}");
            if cli.dry_run {
                return Ok(());
            }
            let report = migrate::load_into_redis(&snapshot, &redis, &progress).await?;
            println!("✅ Wrote {report}");
        }
    }
    Ok(())
}
