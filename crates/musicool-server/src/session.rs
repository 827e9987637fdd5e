//! Handling of one client connection.
//!
//! Sequence: exchange preludes, read the single `Request` frame, resolve it, stream `Data`
//! frames, then finish with `End` or `Error`. Every failure ends only this session.

use std::io::{self, Read, Write};
use std::path::Path;

use musicool_proto::{
    DataChunk, FrameKind, StatusCode, StreamEnd, StreamStatus, TrackRequest, decode_message,
    read_frame_limited, read_prelude, write_message, write_prelude,
};

use crate::config::StreamerSettings;
use crate::error::StreamError;
use crate::library::{TrackQuery, resolve_track};
use crate::stream::{ChunkSink, StreamSummary, stream_file};

/// Largest request payload accepted; a request is three short strings.
const MAX_REQUEST_LEN: u32 = 64 * 1024;

/// How a session ended, for the connection log.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum SessionOutcome {
    Completed(StreamSummary),
    Rejected(StatusCode),
    /// The peer went away before a status could be delivered.
    Disconnected,
}

/// Writes each chunk as one `Data` frame.
struct FrameSink<'a, W: Write> {
    writer: &'a mut W,
}

impl<W: Write> ChunkSink for FrameSink<'_, W> {
    fn send(&mut self, chunk: DataChunk) -> io::Result<()> {
        write_message(&mut *self.writer, FrameKind::Data, &chunk)
    }
}

pub(crate) fn serve_session<S: Read + Write>(stream: &mut S, settings: &StreamerSettings) -> SessionOutcome {
    serve_session_with(stream, settings, |path, chunk_size, sink| {
        stream_file(path, chunk_size, sink)
    })
}

/// Session body with the chunk producer supplied by the caller.
fn serve_session_with<S, P>(stream: &mut S, settings: &StreamerSettings, produce: P) -> SessionOutcome
where
    S: Read + Write,
    P: FnOnce(&Path, usize, &mut dyn ChunkSink) -> Result<StreamSummary, StreamError>,
{
    if let Err(err) = write_prelude(&mut *stream).and_then(|()| read_prelude(&mut *stream)) {
        tracing::warn!(error = %err, "handshake failed");
        if err.kind() == io::ErrorKind::InvalidData {
            return reject(stream, StatusCode::Protocol, format!("handshake failed: {err}"));
        }
        return SessionOutcome::Disconnected;
    }

    let request = match read_request(stream) {
        Ok(request) => request,
        Err((code, message)) => {
            tracing::warn!(%message, "bad request");
            return reject(stream, code, message);
        }
    };

    let query = TrackQuery::from(request);
    tracing::info!(
        artist = %query.artist,
        album = %query.album,
        title = %query.title,
        "track requested"
    );

    let path = match resolve_track(&settings.library_root, &query, &settings.extension) {
        Ok(path) => path,
        Err(err) => {
            tracing::warn!(
                artist = %query.artist,
                album = %query.album,
                title = %query.title,
                error = %err,
                "track lookup failed"
            );
            return reject(stream, err.status_code(), err.client_message(&query));
        }
    };

    let mut sink = FrameSink {
        writer: &mut *stream,
    };
    let result = produce(&path, settings.chunk_size, &mut sink);
    let err = match result {
        Ok(summary) => {
            tracing::info!(
                path = %path.display(),
                chunks = summary.chunks,
                bytes = summary.bytes,
                "stream complete"
            );
            let end = StreamEnd {
                chunks: summary.chunks,
                bytes: summary.bytes,
            };
            return match write_message(&mut *stream, FrameKind::End, &end) {
                Ok(()) => SessionOutcome::Completed(summary),
                Err(err) => {
                    tracing::warn!(error = %err, "failed to send end of stream");
                    SessionOutcome::Disconnected
                }
            };
        }
        Err(err) => err,
    };

    match err.status_code() {
        None => {
            tracing::warn!(
                path = %path.display(),
                chunks = err.chunks_sent(),
                error = %err,
                "client stopped receiving"
            );
            SessionOutcome::Disconnected
        }
        Some(code) => {
            tracing::error!(
                artist = %query.artist,
                album = %query.album,
                title = %query.title,
                path = %path.display(),
                chunks = err.chunks_sent(),
                error = %err,
                "stream aborted"
            );
            reject(stream, code, err.client_message(&query))
        }
    }
}

/// Read the one request frame. A peer that closes or stalls mid-frame, or never sends a
/// request at all, gets a `Protocol` status.
fn read_request<R: Read>(stream: &mut R) -> Result<TrackRequest, (StatusCode, String)> {
    let (kind, payload) = match read_frame_limited(&mut *stream, MAX_REQUEST_LEN) {
        Ok(Some(frame)) => frame,
        Ok(None) => {
            return Err((
                StatusCode::Protocol,
                "connection closed before a request was sent".to_string(),
            ));
        }
        Err(err) => return Err((StatusCode::Protocol, format!("unreadable request frame: {err}"))),
    };
    if kind != FrameKind::Request {
        return Err((StatusCode::Protocol, format!("expected request frame, got {kind:?}")));
    }
    decode_message::<TrackRequest>(&payload)
        .map_err(|err| (StatusCode::InvalidRequest, format!("malformed request: {err}")))
}

fn reject<W: Write>(stream: &mut W, code: StatusCode, message: String) -> SessionOutcome {
    let status = StreamStatus::new(code, message);
    match write_message(&mut *stream, FrameKind::Error, &status) {
        Ok(()) => SessionOutcome::Rejected(code),
        Err(err) => {
            tracing::debug!(error = %err, "could not deliver error status");
            SessionOutcome::Disconnected
        }
    }
}
