//! musicool track streaming server.
//!
//! A client asks for a track by artist, album and title. The server looks the file up in its
//! library tree ([`library`]) and sends the raw bytes back as fixed-size chunks ([`stream`])
//! over the framed protocol of `musicool-proto`.

pub mod client;
pub mod config;
pub mod error;
pub mod library;
pub mod probe;
pub mod server;
pub mod stream;

mod session;

pub use client::{FetchSummary, fetch_track};
pub use config::{ServerConfig, SettingsOverrides, StreamerSettings, resolve_settings};
pub use error::{FetchError, ResolveError, StreamError};
pub use library::{TrackQuery, resolve_track};
pub use server::Server;
pub use stream::{ChunkSink, StreamSummary, stream_file, stream_reader};
