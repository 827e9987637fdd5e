//! Shared protocol primitives for the musicool server and its clients.
//!
//! Framed stream over a single TCP connection. One connection carries exactly one
//! track request and the stream of chunks answering it.
//!
//! Frame format:
//! - magic: 4 bytes "MSCL" (once per direction, at connection start)
//! - version: u16 LE (once per direction, at connection start)
//! - then repeated frames:
//!   - kind: u8
//!   - len: u32 LE
//!   - payload: [u8; len] (a protobuf message, see [`messages`])

use std::io::{self, Read, Write};

use prost::Message;

pub mod messages;

pub use messages::{DataChunk, StatusCode, StreamEnd, StreamStatus, TrackRequest};

pub const MAGIC: [u8; 4] = *b"MSCL";
pub const VERSION: u16 = 1;

/// Largest chunk payload a server may be configured with.
pub const MAX_CHUNK_SIZE: usize = 64 * 1024 * 1024;

/// Upper bound accepted by [`read_frame`]: a full chunk plus room for the envelope fields.
pub const MAX_FRAME_LEN: u32 = (MAX_CHUNK_SIZE + 64 * 1024) as u32;

/// Initial payload buffer reserved by [`read_frame_limited`].
const READ_STEP: usize = 64 * 1024;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// Client → server: the single [`TrackRequest`] of this connection.
    Request = 0x10,
    /// Server → client: one [`DataChunk`].
    Data = 0x11,
    /// Server → client: normal end of stream, carries a [`StreamEnd`].
    End = 0x12,

    /// Server → client: stream aborted, carries a [`StreamStatus`].
    Error = 0x7F,
}

impl FrameKind {
    pub fn from_u8(b: u8) -> io::Result<Self> {
        let k = match b {
            0x10 => FrameKind::Request,
            0x11 => FrameKind::Data,
            0x12 => FrameKind::End,
            0x7F => FrameKind::Error,
            _ => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("unknown frame kind {b:#x}"),
                ))
            }
        };
        Ok(k)
    }
}

/// Connection prelude: magic + version.
pub fn write_prelude(mut w: impl Write) -> io::Result<()> {
    w.write_all(&MAGIC)?;
    w.write_all(&VERSION.to_le_bytes())?;
    w.flush()?;
    Ok(())
}

/// Read and validate the connection prelude.
pub fn read_prelude(mut r: impl Read) -> io::Result<()> {
    let mut magic = [0u8; 4];
    r.read_exact(&mut magic)?;
    if magic != MAGIC {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "bad magic"));
    }

    let mut ver = [0u8; 2];
    r.read_exact(&mut ver)?;
    let version = u16::from_le_bytes(ver);
    if version != VERSION {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("unsupported version {version}"),
        ));
    }

    Ok(())
}

/// Write a frame header + payload.
pub fn write_frame(mut w: impl Write, kind: FrameKind, payload: &[u8]) -> io::Result<()> {
    let frame = encode_frame(kind, payload)?;
    w.write_all(&frame)?;
    w.flush()?;
    Ok(())
}

/// Encode a frame into a single buffer (header + payload).
pub fn encode_frame(kind: FrameKind, payload: &[u8]) -> io::Result<Vec<u8>> {
    let len: u32 = payload
        .len()
        .try_into()
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "payload too large"))?;

    let mut out = Vec::with_capacity(1 + 4 + payload.len());
    out.push(kind as u8);
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(payload);
    Ok(out)
}

/// Read a frame header and return `(kind, len)`.
///
/// The caller should then read exactly `len` bytes of payload.
pub fn read_frame_header(mut r: impl Read) -> io::Result<(FrameKind, u32)> {
    let mut kindb = [0u8; 1];
    r.read_exact(&mut kindb)?;
    let kind = FrameKind::from_u8(kindb[0])?;

    let mut lenb = [0u8; 4];
    r.read_exact(&mut lenb)?;
    let len = u32::from_le_bytes(lenb);
    Ok((kind, len))
}

/// Read one whole frame, accepting payloads up to [`MAX_FRAME_LEN`].
///
/// Returns `Ok(None)` when the peer closed the connection before the first header byte.
pub fn read_frame(r: impl Read) -> io::Result<Option<(FrameKind, Vec<u8>)>> {
    read_frame_limited(r, MAX_FRAME_LEN)
}

/// Read one whole frame whose payload may be at most `max_len` bytes.
///
/// End of stream before the first header byte is a clean close (`Ok(None)`); anywhere later it
/// is an `UnexpectedEof` error. An over-limit length is rejected before any payload is read, and
/// the payload buffer grows with the bytes that actually arrive.
pub fn read_frame_limited(mut r: impl Read, max_len: u32) -> io::Result<Option<(FrameKind, Vec<u8>)>> {
    let mut kindb = [0u8; 1];
    loop {
        match r.read(&mut kindb) {
            Ok(0) => return Ok(None),
            Ok(_) => break,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    let kind = FrameKind::from_u8(kindb[0])?;

    let mut lenb = [0u8; 4];
    r.read_exact(&mut lenb)?;
    let len = u32::from_le_bytes(lenb);
    if len > max_len {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("{kind:?} frame of {len} bytes exceeds limit of {max_len}"),
        ));
    }

    let mut payload = Vec::with_capacity((len as usize).min(READ_STEP));
    let n = r.take(u64::from(len)).read_to_end(&mut payload)?;
    if n != len as usize {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("{kind:?} frame truncated at {n} of {len} bytes"),
        ));
    }
    Ok(Some((kind, payload)))
}

/// Encode `msg` as protobuf and write it as a frame of `kind`.
pub fn write_message<M: Message>(w: impl Write, kind: FrameKind, msg: &M) -> io::Result<()> {
    let payload = msg.encode_to_vec();
    write_frame(w, kind, &payload)
}

/// Decode a frame payload as protobuf message `M`.
pub fn decode_message<M: Message + Default>(payload: &[u8]) -> io::Result<M> {
    M::decode(payload).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}
