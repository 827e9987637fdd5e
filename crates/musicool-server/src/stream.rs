//! Chunked streaming of a resolved file.
//!
//! A stream opens the file, then alternates between filling one block of `chunk_size` bytes
//! and handing it to a [`ChunkSink`]. Every block except the last is exactly `chunk_size`
//! bytes long. The stream ends on end of file, on the first read error (the partially filled
//! block is discarded) or on the first sink error. Only one block is in memory at a time and
//! the file handle is dropped on every exit path.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use crossbeam_channel::Sender;
use musicool_proto::DataChunk;

use crate::error::StreamError;
use crate::probe::{AudioFormat, probe_audio_format};

pub const DEFAULT_CHUNK_SIZE: usize = 8 * 1024 * 1024;

/// Destination for produced chunks.
///
/// An error from [`ChunkSink::send`] stops the stream; it is never retried.
pub trait ChunkSink {
    fn send(&mut self, chunk: DataChunk) -> io::Result<()>;
}

impl<S: ChunkSink + ?Sized> ChunkSink for &mut S {
    fn send(&mut self, chunk: DataChunk) -> io::Result<()> {
        (**self).send(chunk)
    }
}

/// In-process consumers; a dropped receiver surfaces as `BrokenPipe`.
impl ChunkSink for Sender<DataChunk> {
    fn send(&mut self, chunk: DataChunk) -> io::Result<()> {
        Sender::send(self, chunk)
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "chunk receiver dropped"))
    }
}

/// Totals of a stream that reached end of file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StreamSummary {
    pub chunks: u64,
    pub bytes: u64,
}

/// Stream the file at `path` into `sink`.
pub fn stream_file(
    path: &Path,
    chunk_size: usize,
    sink: impl ChunkSink,
) -> Result<StreamSummary, StreamError> {
    let file = open_regular(path).map_err(|source| StreamError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let format = probe_audio_format(path);
    tracing::debug!(
        path = %path.display(),
        sample_rate = ?format.sample_rate,
        channels = ?format.channels,
        "streaming file"
    );
    stream_reader(file, path, format, chunk_size, sink)
}

/// Stream everything `reader` yields into `sink`, labelling chunks with `path` and `format`.
pub fn stream_reader<R: Read>(
    mut reader: R,
    path: &Path,
    format: AudioFormat,
    chunk_size: usize,
    mut sink: impl ChunkSink,
) -> Result<StreamSummary, StreamError> {
    let chunk_size = chunk_size.max(1);
    let filename = path.to_string_lossy().into_owned();
    let mut summary = StreamSummary::default();

    loop {
        let mut payload = Vec::with_capacity(chunk_size);
        let n = (&mut reader)
            .take(chunk_size as u64)
            .read_to_end(&mut payload)
            .map_err(|source| StreamError::FragmentedRead {
                path: path.to_path_buf(),
                chunks_sent: summary.chunks,
                source,
            })?;
        if n == 0 {
            break;
        }

        let chunk = DataChunk {
            sequence: summary.chunks as i64,
            filename: filename.clone(),
            rate: format.wire_rate(),
            channels: format.wire_channels(),
            data: payload,
        };
        sink.send(chunk).map_err(|source| StreamError::Transport {
            chunks_sent: summary.chunks,
            source,
        })?;
        summary.chunks += 1;
        summary.bytes += n as u64;
        tracing::debug!(sequence = summary.chunks - 1, len = n, "chunk sent");

        // A short block means the reader hit end of file while filling it.
        if n < chunk_size {
            break;
        }
    }

    Ok(summary)
}

fn open_regular(path: &Path) -> io::Result<File> {
    let file = File::open(path)?;
    if !file.metadata()?.is_file() {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "not a regular file"));
    }
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[derive(Default)]
    struct Collect {
        chunks: Vec<DataChunk>,
    }

    impl ChunkSink for Collect {
        fn send(&mut self, chunk: DataChunk) -> io::Result<()> {
            self.chunks.push(chunk);
            Ok(())
        }
    }

    /// Accepts `limit` chunks, then fails like a disconnected peer.
    struct Disconnecting {
        accepted: usize,
        limit: usize,
    }

    impl ChunkSink for Disconnecting {
        fn send(&mut self, _chunk: DataChunk) -> io::Result<()> {
            if self.accepted == self.limit {
                return Err(io::Error::new(io::ErrorKind::ConnectionReset, "peer gone"));
            }
            self.accepted += 1;
            Ok(())
        }
    }

    /// Yields `good` bytes, then fails every read.
    struct FailingReader {
        good: usize,
        pos: usize,
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.pos >= self.good {
                return Err(io::Error::other("device went away"));
            }
            let n = buf.len().min(self.good - self.pos);
            for (i, b) in buf[..n].iter_mut().enumerate() {
                *b = ((self.pos + i) % 251) as u8;
            }
            self.pos += n;
            Ok(n)
        }
    }

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    fn write_file(len: usize) -> (tempfile::TempDir, PathBuf, Vec<u8>) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Song.mp3");
        let bytes = pattern(len);
        std::fs::write(&path, &bytes).unwrap();
        (dir, path, bytes)
    }

    #[test]
    fn chunks_reassemble_file_for_any_chunk_size() {
        let (_dir, path, bytes) = write_file(1000);
        for chunk_size in [1, 7, 64, 999, 1000, 1001, 4096] {
            let mut sink = Collect::default();
            let summary = stream_file(&path, chunk_size, &mut sink).unwrap();

            let joined: Vec<u8> = sink.chunks.iter().flat_map(|c| c.data.iter().copied()).collect();
            assert_eq!(joined, bytes, "chunk size {chunk_size}");
            assert_eq!(summary.chunks as usize, bytes.len().div_ceil(chunk_size));
            assert_eq!(summary.bytes, bytes.len() as u64);

            let (last, rest) = sink.chunks.split_last().unwrap();
            assert!(rest.iter().all(|c| c.data.len() == chunk_size));
            assert!(!last.data.is_empty() && last.data.len() <= chunk_size);
        }
    }

    #[test]
    fn chunks_are_sequenced_and_labelled() {
        let (_dir, path, _) = write_file(50);
        let mut sink = Collect::default();
        stream_file(&path, 16, &mut sink).unwrap();

        let sequences: Vec<i64> = sink.chunks.iter().map(|c| c.sequence).collect();
        assert_eq!(sequences, vec![0, 1, 2, 3]);
        let name = path.to_string_lossy();
        assert!(sink.chunks.iter().all(|c| c.filename == name));
    }

    #[test]
    fn restreaming_yields_identical_chunks() {
        let (_dir, path, _) = write_file(300);
        let mut first = Collect::default();
        let mut second = Collect::default();
        stream_file(&path, 128, &mut first).unwrap();
        stream_file(&path, 128, &mut second).unwrap();
        assert_eq!(first.chunks, second.chunks);
    }

    #[test]
    fn empty_file_yields_no_chunks() {
        let (_dir, path, _) = write_file(0);
        let mut sink = Collect::default();
        let summary = stream_file(&path, DEFAULT_CHUNK_SIZE, &mut sink).unwrap();
        assert_eq!(summary, StreamSummary::default());
        assert!(sink.chunks.is_empty());
    }

    #[test]
    fn twenty_mib_file_splits_into_three_chunks() {
        const MIB: usize = 1024 * 1024;
        let (_dir, path, bytes) = write_file(20 * MIB);
        let mut sink = Collect::default();
        let summary = stream_file(&path, DEFAULT_CHUNK_SIZE, &mut sink).unwrap();

        let sizes: Vec<usize> = sink.chunks.iter().map(|c| c.data.len()).collect();
        assert_eq!(sizes, vec![8 * MIB, 8 * MIB, 4 * MIB]);
        assert_eq!(summary.chunks, 3);
        let joined: Vec<u8> = sink.chunks.into_iter().flat_map(|c| c.data).collect();
        assert!(joined == bytes);
    }

    #[test]
    fn missing_file_is_open_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = Collect::default();
        let err = stream_file(&dir.path().join("gone.mp3"), 16, &mut sink).unwrap_err();
        assert!(matches!(err, StreamError::Open { .. }));
        assert!(sink.chunks.is_empty());
    }

    #[test]
    fn directory_is_open_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = Collect::default();
        let err = stream_file(dir.path(), 16, &mut sink).unwrap_err();
        assert!(matches!(err, StreamError::Open { .. }));
    }

    #[test]
    fn read_failure_after_n_chunks_sends_exactly_n() {
        // 3 full chunks, then 5 bytes of a 4th before the failure.
        let reader = FailingReader { good: 3 * 10 + 5, pos: 0 };
        let mut sink = Collect::default();
        let err = stream_reader(reader, Path::new("Song.mp3"), AudioFormat::default(), 10, &mut sink)
            .unwrap_err();

        match err {
            StreamError::FragmentedRead { chunks_sent, .. } => assert_eq!(chunks_sent, 3),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(sink.chunks.len(), 3);
        assert!(sink.chunks.iter().all(|c| c.data.len() == 10));
    }

    #[test]
    fn send_failure_stops_the_stream() {
        let (_dir, path, _) = write_file(100);
        let mut sink = Disconnecting { accepted: 0, limit: 2 };
        let err = stream_file(&path, 10, &mut sink).unwrap_err();
        match err {
            StreamError::Transport { chunks_sent, .. } => assert_eq!(chunks_sent, 2),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(sink.accepted, 2);
    }

    #[test]
    fn channel_sink_delivers_and_detects_drop() {
        let (_dir, path, bytes) = write_file(40);
        let (tx, rx) = crossbeam_channel::unbounded();
        let summary = stream_file(&path, 16, tx).unwrap();
        let received: Vec<DataChunk> = rx.iter().collect();
        assert_eq!(received.len() as u64, summary.chunks);
        let joined: Vec<u8> = received.into_iter().flat_map(|c| c.data).collect();
        assert_eq!(joined, bytes);

        let (tx, rx) = crossbeam_channel::unbounded::<DataChunk>();
        drop(rx);
        let err = stream_file(&path, 16, tx).unwrap_err();
        assert!(matches!(err, StreamError::Transport { chunks_sent: 0, .. }));
    }

    #[test]
    fn stream_carries_probed_format() {
        let format = AudioFormat {
            sample_rate: Some(48_000),
            channels: Some(2),
        };
        let mut sink = Collect::default();
        stream_reader(&b"abcdef"[..], Path::new("x.flac"), format, 4, &mut sink).unwrap();
        assert!(sink.chunks.iter().all(|c| c.rate == 48_000 && c.channels == 2));
    }
}
