use std::io::Cursor;

use hound::{SampleFormat, WavSpec, WavWriter};

use crate::errors::{LabError, Result};

pub const DEFAULT_SAMPLE_RATE: u32 = 24_000;

/// Wraps raw little-endian 16-bit PCM in a WAV container.
pub fn pcm16_to_wav(pcm: &[u8], sample_rate: u32, channels: u16) -> Result<Vec<u8>> {
    if pcm.len() % 2 != 0 {
        return Err(LabError::other("PCM payload has an odd number of bytes"));
    }

    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::with_capacity(pcm.len() + 44));
    {
        let mut writer = WavWriter::new(&mut cursor, spec)?;
        for frame in pcm.chunks_exact(2) {
            writer.write_sample(i16::from_le_bytes([frame[0], frame[1]]))?;
        }
        writer.finalize()?;
    }

    Ok(cursor.into_inner())
}

/// Reads `rate=` out of MIME types such as `audio/L16;codec=pcm;rate=24000`.
pub fn sample_rate_from_mime(mime_type: &str) -> Option<u32> {
    mime_type
        .split(';')
        .filter_map(|param| param.trim().split_once('='))
        .find(|(key, _)| key.eq_ignore_ascii_case("rate"))
        .and_then(|(_, value)| value.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wav_header_matches_pcm() {
        let pcm: Vec<u8> = [0i16, 1000, -1000, i16::MAX]
            .iter()
            .flat_map(|sample| sample.to_le_bytes())
            .collect();

        let wav = pcm16_to_wav(&pcm, DEFAULT_SAMPLE_RATE, 1).unwrap();

        assert_eq!(&wav[..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        let reader = hound::WavReader::new(Cursor::new(wav)).unwrap();
        assert_eq!(reader.spec().sample_rate, 24_000);
        let samples: Vec<i16> = reader.into_samples().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![0, 1000, -1000, i16::MAX]);
    }

    #[test]
    fn odd_payload_is_rejected() {
        assert!(pcm16_to_wav(&[1, 2, 3], DEFAULT_SAMPLE_RATE, 1).is_err());
    }

    #[test]
    fn rate_is_parsed_from_mime() {
        assert_eq!(sample_rate_from_mime("audio/L16;codec=pcm;rate=24000"), Some(24_000));
        assert_eq!(sample_rate_from_mime("audio/pcm"), None);
    }
}
