use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use serde_json::json;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use live_epg::{
    config::{Config, defaults::DEFAULT_CONFIG_FILE},
    models::now_playing_index,
    repositories::TomlSourceStore,
    services::{CacheSettings, ChannelCache},
    utils::{StandardHttpClient, UrlUtils},
};

#[derive(Parser)]
#[command(name = "live-epg")]
#[command(version)]
#[command(about = "Live channel playlists with programme guides")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: String,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List configured sources
    Sources,
    /// Load a source and print its channels with the programme airing now
    Channels { key: String },
    /// Force a refresh of one source, or of every enabled source
    Refresh {
        #[arg(required_unless_present = "all")]
        key: Option<String>,
        #[arg(long, conflicts_with = "key")]
        all: bool,
    },
    /// Resolve a relative URL against a playlist URL
    Resolve { base: String, path: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_filter = format!("live_epg={}", cli.log_level);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::load_from_file(&cli.config)?;
    info!("Configuration loaded from: {}", cli.config);

    match cli.command {
        Command::Sources => print_json(&config.sources)?,
        Command::Channels { key } => {
            let cache = build_cache(&config, &cli.config)?;
            let Some(bundle) = cache.get(&key).await? else {
                bail!("No channels available for source '{key}'");
            };
            let now = chrono::Local::now().fixed_offset();
            let channels: Vec<_> = bundle
                .channels
                .iter()
                .map(|channel| {
                    let programs = bundle.programs_for(channel);
                    let now_playing = now_playing_index(programs, now).map(|i| &programs[i].title);
                    json!({
                        "id": channel.id,
                        "name": channel.name,
                        "group": channel.group_title,
                        "url": channel.stream_url,
                        "programmes": programs.len(),
                        "now_playing": now_playing,
                    })
                })
                .collect();
            print_json(&json!({
                "key": key,
                "channel_count": bundle.channel_count,
                "epg_source_url": bundle.epg_source_url,
                "identifier_space": bundle.identifier_space,
                "program_count": bundle.program_count(),
                "channels": channels,
            }))?;
        }
        Command::Refresh { key, all } => {
            let cache = build_cache(&config, &cli.config)?;
            let counts = match key {
                Some(key) if !all => {
                    let Some(source) = config.source(&key) else {
                        bail!("Unknown source '{key}'");
                    };
                    vec![(key.clone(), cache.refresh(source).await)]
                }
                _ => cache.refresh_all().await?,
            };
            let counts: serde_json::Map<String, serde_json::Value> = counts
                .into_iter()
                .map(|(key, count)| (key, count.into()))
                .collect();
            print_json(&counts)?;
        }
        Command::Resolve { base, path } => print_json(&json!({
            "resolved": UrlUtils::resolve(&base, &path),
            "base_directory": UrlUtils::base_directory(&base),
        }))?,
    }

    Ok(())
}

fn build_cache(config: &Config, config_file: &str) -> Result<ChannelCache> {
    let store = Arc::new(TomlSourceStore::new(config_file));
    let http = Arc::new(StandardHttpClient::with_connection_timeout(
        config.http.connect_timeout,
    )?);
    Ok(ChannelCache::new(store, http, CacheSettings::from(&config.http)))
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
