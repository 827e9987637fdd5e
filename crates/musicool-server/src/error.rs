//! Error types for resolving, streaming and fetching tracks.

use std::io;
use std::path::PathBuf;

use musicool_proto::StatusCode;
use thiserror::Error;

use crate::library::TrackQuery;

/// Failure to map a track request onto a file in the library.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("invalid {field}: {value:?}")]
    InvalidRequest { field: &'static str, value: String },

    #[error("no file named {file_name:?} under {dir:?}")]
    NotFound { dir: PathBuf, file_name: String },

    #[error("cannot read library directory {dir:?}: {source}")]
    Unreadable {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ResolveError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ResolveError::InvalidRequest { .. } => StatusCode::InvalidRequest,
            ResolveError::NotFound { .. } => StatusCode::NotFound,
            ResolveError::Unreadable { .. } => StatusCode::ResolutionFailed,
        }
    }

    /// Status text for the client; names the request, never server paths.
    pub fn client_message(&self, query: &TrackQuery) -> String {
        match self {
            ResolveError::InvalidRequest { field, value } => format!("invalid {field}: {value:?}"),
            ResolveError::NotFound { .. } => format!(
                "no track {:?} in {:?} / {:?}",
                query.title, query.artist, query.album
            ),
            ResolveError::Unreadable { .. } => {
                format!("album {:?} / {:?} is not available", query.artist, query.album)
            }
        }
    }
}

/// Failure while turning a resolved file into chunks.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("cannot open {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("read failed after {chunks_sent} chunks of {path:?}, file may be fragmented: {source}")]
    FragmentedRead {
        path: PathBuf,
        chunks_sent: u64,
        #[source]
        source: io::Error,
    },

    #[error("send failed after {chunks_sent} chunks: {source}")]
    Transport {
        chunks_sent: u64,
        #[source]
        source: io::Error,
    },
}

impl StreamError {
    /// Wire status for the client. `None` for [`StreamError::Transport`]: the connection that
    /// would carry the status is the one that failed.
    pub fn status_code(&self) -> Option<StatusCode> {
        match self {
            StreamError::Open { .. } => Some(StatusCode::OpenFailed),
            StreamError::FragmentedRead { .. } => Some(StatusCode::FragmentedRead),
            StreamError::Transport { .. } => None,
        }
    }

    /// Status text for the client; names the request, never server paths.
    pub fn client_message(&self, query: &TrackQuery) -> String {
        match self {
            StreamError::Open { .. } => format!("track {:?} could not be opened", query.title),
            StreamError::FragmentedRead { chunks_sent, .. } => format!(
                "reading track {:?} failed after {chunks_sent} chunks",
                query.title
            ),
            StreamError::Transport { chunks_sent, .. } => {
                format!("transport failed after {chunks_sent} chunks")
            }
        }
    }

    /// Chunks that reached the sink before the stream stopped.
    pub fn chunks_sent(&self) -> u64 {
        match self {
            StreamError::Open { .. } => 0,
            StreamError::FragmentedRead { chunks_sent, .. }
            | StreamError::Transport { chunks_sent, .. } => *chunks_sent,
        }
    }
}

/// Client-side failure of a track fetch.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("connection error: {0}")]
    Io(#[from] io::Error),

    #[error("server rejected stream ({code:?}): {message}")]
    Remote { code: StatusCode, message: String },

    #[error("protocol violation: {0}")]
    Protocol(String),
}
