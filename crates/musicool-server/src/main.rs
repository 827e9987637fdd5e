//! musicool-server: streams library tracks to remote clients in fixed-size chunks.
//!
//! ## Modes
//! - `serve` (default): listen for connections, answer each with one track.
//! - `fetch`: ask a running server for a track and save it locally.

mod cli;

use std::fs::File;
use std::io::BufWriter;

use anyhow::{Context, Result};
use clap::Parser;
use musicool_server::config::{ServerConfig, default_config_path};
use musicool_server::{Server, TrackQuery, fetch_track, resolve_settings};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = cli::Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("info,musicool_server=info")
        }))
        .init();

    match args.cmd.unwrap_or(cli::Command::Serve(cli::ServeArgs::default())) {
        cli::Command::Serve(serve) => run_server(&serve),
        cli::Command::Fetch {
            addr,
            artist,
            album,
            title,
            out,
        } => {
            let query = TrackQuery::new(artist, album, title);
            let file = File::create(&out).with_context(|| format!("create {:?}", out))?;
            let summary = fetch_track(addr, &query, BufWriter::new(file))
                .with_context(|| format!("fetch {query:?} from {addr}"))?;
            tracing::info!(
                out = %out.display(),
                chunks = summary.chunks,
                bytes = summary.bytes,
                sample_rate = ?summary.sample_rate,
                channels = ?summary.channels,
                "track saved"
            );
            Ok(())
        }
    }
}

fn run_server(serve: &cli::ServeArgs) -> Result<()> {
    let cfg = match serve.config.as_ref().cloned().or_else(default_config_path) {
        Some(path) => {
            tracing::info!(config = %path.display(), "loading config");
            ServerConfig::load(&path)?
        }
        None => ServerConfig::default(),
    };
    let settings = resolve_settings(&cfg, &serve.overrides())?;

    if !settings.library_root.is_dir() {
        tracing::warn!(
            library_root = %settings.library_root.display(),
            "library root is not a directory; lookups will fail until it exists"
        );
    }

    let _ = ctrlc::set_handler(move || {
        tracing::info!("shutting down");
        std::process::exit(130);
    });

    Server::bind(settings)?.run()
}
