use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};
use musicool_server::SettingsOverrides;

const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("MUSICOOL_GIT_SHA"),
    ", ",
    env!("MUSICOOL_BUILD_DATE"),
    ")"
);

#[derive(Parser, Debug)]
#[command(name = "musicool-server", version = VERSION)]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve tracks from the library (default)
    Serve(ServeArgs),

    /// Fetch one track from a running server into a local file
    Fetch {
        /// Server address
        #[arg(long, default_value = "127.0.0.1:50051")]
        addr: SocketAddr,

        #[arg(long)]
        artist: String,

        #[arg(long)]
        album: String,

        #[arg(long)]
        title: String,

        /// Output file
        #[arg(long)]
        out: PathBuf,
    },
}

#[derive(ClapArgs, Debug, Default)]
pub struct ServeArgs {
    /// Optional server config file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Listener address, e.g. 0.0.0.0:50051
    #[arg(long)]
    pub bind: Option<SocketAddr>,

    /// Library root holding <artist>/<album>/<title>.<ext>
    #[arg(long)]
    pub library_root: Option<PathBuf>,

    /// Chunk payload size in bytes
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Track file extension (without the dot)
    #[arg(long)]
    pub extension: Option<String>,
}

impl ServeArgs {
    pub fn overrides(&self) -> SettingsOverrides {
        SettingsOverrides {
            bind: self.bind,
            library_root: self.library_root.clone(),
            chunk_size: self.chunk_size,
            extension: self.extension.clone(),
        }
    }
}
