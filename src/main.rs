use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use follower_logs::archive::ArchiveStore;
use follower_logs::config::{self, Credentials};
use follower_logs::followers;
use follower_logs::gql::GqlClient;
use follower_logs::pipeline;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Archive the moderation-log chat history of every follower, one JSON file per user"
)]
struct Args {
    /// Path to YAML config file (defaults to ./config.yaml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Followers list to process, overrides app.followers_file
    #[arg(long)]
    followers: Option<PathBuf>,

    /// Directory for per-user archives, overrides app.output_dir
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let _ = dotenvy::dotenv();

    let credentials = Credentials::from_env()?;
    let cfg = config::load(args.config.as_deref())?
        .with_overrides(args.followers.as_deref(), args.output_dir.as_deref())?;

    let users = followers::load(&cfg.followers_path())?;
    let store = ArchiveStore::new(cfg.output_dir());
    let client = GqlClient::from_config(&cfg, credentials)?;

    info!(
        users = users.len(),
        output_dir = %store.dir().display(),
        "starting archive run"
    );

    pipeline::run(&client, &store, &users).await?;
    Ok(())
}
