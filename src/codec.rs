//! # Codec Module
//!
//! Encoder locali e seam verso i codec esterni.
//!
//! ## Responsabilità:
//! - `AudioDecoder`: collaboratore esterno che estrae PCM da container audio
//!   impacchettati (es. `.acb` dentro un TextAsset)
//! - `PcmAudio::to_wav_bytes`: normalizza il PCM in WAV 16 bit con `hound`
//! - `encode_webp_lossless`: ricodifica lossless di un'immagine in WebP
//!
//! Tutto lavora in memoria: gli exporter scrivono su disco solo output completi.

use crate::error::ExtractError;
use image::codecs::webp::WebPEncoder;
use image::DynamicImage;
use std::io::Cursor;

/// Interleaved 16-bit PCM
#[derive(Debug, Clone, PartialEq)]
pub struct PcmAudio {
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<i16>,
}

impl PcmAudio {
    /// Encode as a 16-bit PCM WAV file
    pub fn to_wav_bytes(&self) -> Result<Vec<u8>, ExtractError> {
        if self.channels == 0 {
            return Err(ExtractError::Validation("audio has zero channels".to_string()));
        }
        if self.samples.len() % self.channels as usize != 0 {
            return Err(ExtractError::Validation(format!(
                "{} samples do not split into {} channels",
                self.samples.len(),
                self.channels
            )));
        }

        let spec = hound::WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut bytes = Vec::new();
        {
            let mut writer = hound::WavWriter::new(Cursor::new(&mut bytes), spec)?;
            for &sample in &self.samples {
                writer.write_sample(sample)?;
            }
            writer.finalize()?;
        }
        Ok(bytes)
    }
}

/// Decoder for packed audio containers.
///
/// Returns `Ok(None)` when the container holds no decodable waveform.
pub trait AudioDecoder: Send + Sync {
    fn decode(&self, container: &[u8]) -> Result<Option<PcmAudio>, ExtractError>;
}

/// Default decoder when no packed-audio codec is installed: every
/// packed container becomes an export error for its record.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableAudioDecoder;

impl AudioDecoder for UnavailableAudioDecoder {
    fn decode(&self, _container: &[u8]) -> Result<Option<PcmAudio>, ExtractError> {
        Err(ExtractError::Codec("no packed-audio codec available".to_string()))
    }
}

/// Re-encode an image as lossless WebP
pub fn encode_webp_lossless(image: &DynamicImage) -> Result<Vec<u8>, ExtractError> {
    // l'encoder WebP accetta solo canali a 8 bit
    let rgba = DynamicImage::ImageRgba8(image.to_rgba8());
    let mut bytes = Vec::new();
    rgba.write_with_encoder(WebPEncoder::new_lossless(&mut bytes))?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};

    #[test]
    fn test_wav_roundtrip_spec() {
        let audio = PcmAudio {
            sample_rate: 44_100,
            channels: 2,
            samples: vec![0, 100, -100, i16::MAX, i16::MIN, 7],
        };

        let bytes = audio.to_wav_bytes().unwrap();
        let mut reader = hound::WavReader::new(Cursor::new(bytes)).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.sample_rate, 44_100);
        assert_eq!(spec.bits_per_sample, 16);

        let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, audio.samples);
    }

    #[test]
    fn test_wav_rejects_bad_layout() {
        let mono_zero = PcmAudio { sample_rate: 8_000, channels: 0, samples: vec![] };
        assert!(mono_zero.to_wav_bytes().is_err());

        let ragged = PcmAudio { sample_rate: 8_000, channels: 2, samples: vec![1, 2, 3] };
        assert!(ragged.to_wav_bytes().is_err());
    }

    #[test]
    fn test_webp_is_lossless() {
        let mut source = RgbaImage::new(4, 3);
        for (x, y, pixel) in source.enumerate_pixels_mut() {
            *pixel = Rgba([x as u8 * 60, y as u8 * 80, 200, if x == 0 { 128 } else { 255 }]);
        }
        let image = DynamicImage::ImageRgba8(source.clone());

        let bytes = encode_webp_lossless(&image).unwrap();
        let decoded = image::load_from_memory_with_format(&bytes, ImageFormat::WebP).unwrap();
        assert_eq!(decoded.to_rgba8(), source);
    }

    #[test]
    fn test_unavailable_decoder_errors() {
        assert!(UnavailableAudioDecoder.decode(b"@UTF").is_err());
    }
}
