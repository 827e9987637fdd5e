//! Audio format probing for chunk metadata.

use std::fs::File;
use std::path::Path;

use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Sample rate and channel layout of a track's default audio stream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AudioFormat {
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
}

impl AudioFormat {
    /// Wire value for `DataChunk.rate` (0 = unknown).
    pub fn wire_rate(&self) -> i32 {
        self.sample_rate
            .and_then(|rate| i32::try_from(rate).ok())
            .unwrap_or(0)
    }

    /// Wire value for `DataChunk.channels` (0 = unknown).
    pub fn wire_channels(&self) -> i32 {
        self.channels.map(i32::from).unwrap_or(0)
    }
}

/// Best-effort probe; any failure yields an all-unknown [`AudioFormat`].
pub fn probe_audio_format(path: &Path) -> AudioFormat {
    let mut format = AudioFormat::default();

    let file = match File::open(path) {
        Ok(file) => file,
        Err(_) => return format,
    };
    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|ext| ext.to_str()) {
        hint.with_extension(ext);
    }

    let mss = MediaSourceStream::new(Box::new(file), Default::default());
    let probed = match symphonia::default::get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    ) {
        Ok(probed) => probed,
        Err(err) => {
            tracing::debug!(path = %path.display(), error = %err, "audio probe failed");
            return format;
        }
    };

    if let Some(track) = probed.format.default_track() {
        let params = &track.codec_params;
        format.sample_rate = params.sample_rate;
        format.channels = params
            .channels
            .and_then(|channels| u16::try_from(channels.count()).ok());
    }

    format
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pcm_wav(sample_rate: u32, channels: u16, frames: u32) -> Vec<u8> {
        let block_align = channels * 2;
        let data_len = frames * u32::from(block_align);
        let mut out = Vec::new();
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(36 + data_len).to_le_bytes());
        out.extend_from_slice(b"WAVE");
        out.extend_from_slice(b"fmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&channels.to_le_bytes());
        out.extend_from_slice(&sample_rate.to_le_bytes());
        out.extend_from_slice(&(sample_rate * u32::from(block_align)).to_le_bytes());
        out.extend_from_slice(&block_align.to_le_bytes());
        out.extend_from_slice(&16u16.to_le_bytes());
        out.extend_from_slice(b"data");
        out.extend_from_slice(&data_len.to_le_bytes());
        out.resize(out.len() + data_len as usize, 0);
        out
    }

    #[test]
    fn probes_wav_rate_and_channels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        std::fs::write(&path, pcm_wav(44_100, 2, 1024)).unwrap();

        let format = probe_audio_format(&path);
        assert_eq!(format.sample_rate, Some(44_100));
        assert_eq!(format.channels, Some(2));
        assert_eq!(format.wire_rate(), 44_100);
        assert_eq!(format.wire_channels(), 2);
    }

    #[test]
    fn unknown_format_is_all_zero_on_the_wire() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"plain text, not audio").unwrap();

        let format = probe_audio_format(&path);
        assert_eq!(format, AudioFormat::default());
        assert_eq!(format.wire_rate(), 0);
        assert_eq!(format.wire_channels(), 0);
    }

    #[test]
    fn missing_file_is_unknown() {
        let format = probe_audio_format(Path::new("/definitely/not/here.mp3"));
        assert_eq!(format, AudioFormat::default());
    }
}
