//! Minimal client: request one track and write its bytes to a sink.

use std::io::Write;
use std::net::{SocketAddr, TcpStream};

use musicool_proto::{
    DataChunk, FrameKind, StreamEnd, StreamStatus, decode_message, read_frame, read_prelude,
    write_message, write_prelude,
};

use crate::error::FetchError;
use crate::library::TrackQuery;

/// What a completed fetch received.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchSummary {
    pub chunks: u64,
    pub bytes: u64,
    pub filename: String,
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
}

/// Request `query` from the server at `addr`, writing every payload to `out` in order.
pub fn fetch_track(
    addr: SocketAddr,
    query: &TrackQuery,
    mut out: impl Write,
) -> Result<FetchSummary, FetchError> {
    let mut stream = TcpStream::connect(addr)?;
    stream.set_nodelay(true).ok();

    write_prelude(&mut stream)?;
    read_prelude(&mut stream)?;
    write_message(&mut stream, FrameKind::Request, &query.to_request())?;

    let mut summary = FetchSummary::default();
    loop {
        let Some((kind, payload)) = read_frame(&mut stream)? else {
            return Err(FetchError::Protocol(
                "connection closed before end of stream".to_string(),
            ));
        };
        match kind {
            FrameKind::Data => {
                let chunk: DataChunk = decode_message(&payload)?;
                if chunk.sequence != summary.chunks as i64 {
                    return Err(FetchError::Protocol(format!(
                        "expected chunk {}, got {}",
                        summary.chunks, chunk.sequence
                    )));
                }
                if summary.chunks == 0 {
                    summary.filename = chunk.filename.clone();
                    summary.sample_rate = u32::try_from(chunk.rate).ok().filter(|r| *r > 0);
                    summary.channels = u16::try_from(chunk.channels).ok().filter(|c| *c > 0);
                }
                out.write_all(&chunk.data)?;
                summary.chunks += 1;
                summary.bytes += chunk.data.len() as u64;
            }
            FrameKind::End => {
                let end: StreamEnd = decode_message(&payload)?;
                if end.chunks != summary.chunks || end.bytes != summary.bytes {
                    return Err(FetchError::Protocol(format!(
                        "server reported {} chunks / {} bytes, received {} / {}",
                        end.chunks, end.bytes, summary.chunks, summary.bytes
                    )));
                }
                out.flush()?;
                return Ok(summary);
            }
            FrameKind::Error => {
                let status: StreamStatus = decode_message(&payload)?;
                return Err(FetchError::Remote {
                    code: status.code(),
                    message: status.message,
                });
            }
            FrameKind::Request => {
                return Err(FetchError::Protocol("unexpected request frame from server".to_string()));
            }
        }
    }
}
