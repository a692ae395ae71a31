use dotenvy::dotenv;
use parrot::config::Config;
use parrot::db;
use parrot::handlers::{BotState, Handler, StateKey};
use serenity::all::{Client, GatewayIntents};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    let pool = db::init_pool(&config.database_url).await?;
    info!(database = %config.database_url, "database ready");

    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MEMBERS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let token = config.discord_token.clone();
    let state = Arc::new(BotState::new(config, pool));

    let mut client = Client::builder(&token, intents)
        .event_handler(Handler)
        .await?;
    client.data.write().await.insert::<StateKey>(state);

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("could not listen for ctrl-c: {e}");
            return;
        }
        info!("shutting down");
        shard_manager.shutdown_all().await;
    });

    client.start().await?;
    Ok(())
}
