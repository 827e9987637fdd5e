//! Protobuf payloads carried inside frames.
//!
//! Field numbers match `proto/musicool.proto`; keep both in sync.

/// Client request for one track.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TrackRequest {
    #[prost(string, tag = "1")]
    pub song_title: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub artist_name: ::prost::alloc::string::String,
    #[prost(string, tag = "3")]
    pub album: ::prost::alloc::string::String,
}

/// One framed unit of file payload.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DataChunk {
    /// Zero-based, increments by one per chunk of a stream.
    #[prost(int64, tag = "1")]
    pub sequence: i64,
    #[prost(string, tag = "2")]
    pub filename: ::prost::alloc::string::String,
    /// Sample rate of the default audio track, 0 if unknown.
    #[prost(int32, tag = "3")]
    pub rate: i32,
    /// Channel count of the default audio track, 0 if unknown.
    #[prost(int32, tag = "4")]
    pub channels: i32,
    #[prost(bytes = "vec", tag = "5")]
    pub data: ::prost::alloc::vec::Vec<u8>,
}

/// Trailer of a stream that reached end of file.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StreamEnd {
    #[prost(uint64, tag = "1")]
    pub chunks: u64,
    #[prost(uint64, tag = "2")]
    pub bytes: u64,
}

/// Reason a stream was aborted.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StreamStatus {
    #[prost(enumeration = "StatusCode", tag = "1")]
    pub code: i32,
    #[prost(string, tag = "2")]
    pub message: ::prost::alloc::string::String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum StatusCode {
    Unspecified = 0,
    /// Request fields were empty or tried to leave the library root.
    InvalidRequest = 1,
    /// The album directory was readable but held no matching file.
    NotFound = 2,
    /// The album directory is missing or could not be walked.
    ResolutionFailed = 3,
    /// The resolved file could not be opened.
    OpenFailed = 4,
    /// Reading failed part way through the file.
    FragmentedRead = 5,
    /// The peer violated the framing protocol.
    Protocol = 6,
    Internal = 7,
}

impl StreamStatus {
    pub fn new(code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code: code as i32,
            message: message.into(),
        }
    }
}
