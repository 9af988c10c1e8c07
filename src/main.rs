mod cli;

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, StatsTarget};
use showcase::dom::lock;
use showcase::page::skeleton;
use showcase::prelude::*;
use showcase::stats::HttpStatsApi;

const WATCH_FLUSH_MS: u64 = 500;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "info,showcase=debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;

    match cli.command {
        Commands::Render { fragment, out } => {
            let mut app = portfolio(&config);
            let started = app.initialize(fragment.as_deref());
            if started.is_ok() {
                app.render_once().await;
            }
            let html = lock(&**app.document()).to_html();
            match out {
                Some(path) => write_page(&path, &html).await?,
                None => print!("{html}"),
            }
            started.context("portfolio failed to start")?;
        }
        Commands::Watch { out, fragment } => {
            let mut app = portfolio(&config);
            if let Err(err) = app.initialize(fragment.as_deref()) {
                let html = lock(&**app.document()).to_html();
                write_page(&out, &html).await?;
                return Err(err).context("portfolio failed to start");
            }
            let doc = app.document().clone();
            let running = app.spawn()?;
            tracing::info!(path = %out.display(), "watching; press ctrl-c to stop");

            let mut flush = tokio::time::interval(Duration::from_millis(WATCH_FLUSH_MS));
            let mut written = None;
            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => break,
                    _ = flush.tick() => {
                        let (revision, html) = {
                            let doc = lock(&*doc);
                            (doc.revision(), doc.to_html())
                        };
                        if written != Some(revision) {
                            write_page(&out, &html).await?;
                            written = Some(revision);
                        }
                    }
                }
            }
            running.abort();
            tracing::info!("stopped");
        }
        Commands::Stats { target } => {
            let api = HttpStatsApi::from_config(&config)?;
            let json = match target {
                StatsTarget::Games { ids } => serde_json::to_string_pretty(&api.game_stats(&ids).await?)?,
                StatsTarget::Group { id } => serde_json::to_string_pretty(&api.group_stats(&id).await?)?,
            };
            println!("{json}");
        }
    }
    Ok(())
}

fn portfolio(config: &Config) -> Portfolio<MemoryDocument> {
    let doc = shared(MemoryDocument::new(skeleton(&config.assets.rotation)));
    Portfolio::new(config.clone(), doc)
}

async fn write_page(path: &Path, html: &str) -> Result<()> {
    tokio::fs::write(path, html)
        .await
        .with_context(|| format!("failed to write {}", path.display()))
}
