//! Track lookup inside the library tree.
//!
//! The library follows the `<root>/<artist>/<album>/.../<title>.<ext>` convention. A lookup
//! walks the album directory depth-first, in file-name order, and stops at the first regular
//! file with the wanted name. When several files share that name the lexicographically first
//! path wins.

use std::io;
use std::path::{Component, Path, PathBuf};

use musicool_proto::TrackRequest;
use walkdir::WalkDir;

use crate::error::ResolveError;

pub const DEFAULT_EXTENSION: &str = "mp3";

/// Identity of a requested track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackQuery {
    pub artist: String,
    pub album: String,
    pub title: String,
}

impl From<TrackRequest> for TrackQuery {
    fn from(req: TrackRequest) -> Self {
        Self {
            artist: req.artist_name,
            album: req.album,
            title: req.song_title,
        }
    }
}

impl TrackQuery {
    pub fn new(artist: impl Into<String>, album: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            artist: artist.into(),
            album: album.into(),
            title: title.into(),
        }
    }

    pub fn to_request(&self) -> TrackRequest {
        TrackRequest {
            song_title: self.title.clone(),
            artist_name: self.artist.clone(),
            album: self.album.clone(),
        }
    }
}

/// Directory searched for `query`: `<root>/<artist>/<album>`.
pub fn album_dir(root: &Path, query: &TrackQuery) -> Result<PathBuf, ResolveError> {
    check_component("artist", &query.artist)?;
    check_component("album", &query.album)?;
    Ok(root.join(&query.artist).join(&query.album))
}

/// Find the file for `query` under `root`.
///
/// Returns [`ResolveError::NotFound`] when the album directory was walked without a match and
/// [`ResolveError::Unreadable`] when it is missing or any part of the walk failed.
pub fn resolve_track(root: &Path, query: &TrackQuery, extension: &str) -> Result<PathBuf, ResolveError> {
    check_component("title", &query.title)?;
    let dir = album_dir(root, query)?;
    let file_name = format!("{}.{}", query.title, extension);

    for entry in WalkDir::new(&dir).follow_links(true).sort_by_file_name() {
        let entry = entry.map_err(|e| ResolveError::Unreadable {
            dir: dir.clone(),
            source: io::Error::from(e),
        })?;
        if entry.depth() == 0 {
            if !entry.file_type().is_dir() {
                return Err(ResolveError::Unreadable {
                    dir: dir.clone(),
                    source: io::Error::other("not a directory"),
                });
            }
            continue;
        }
        if entry.file_type().is_file() && entry.file_name() == file_name.as_str() {
            tracing::debug!(path = %entry.path().display(), "track resolved");
            return Ok(entry.into_path());
        }
    }

    Err(ResolveError::NotFound { dir, file_name })
}

/// A request field must name exactly one normal path component.
fn check_component(field: &'static str, value: &str) -> Result<(), ResolveError> {
    let invalid = || ResolveError::InvalidRequest {
        field,
        value: value.to_string(),
    };
    if value.trim().is_empty() || value.contains(['/', '\\', '\0']) {
        return Err(invalid());
    }
    let mut components = Path::new(value).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(invalid()),
    }
}
