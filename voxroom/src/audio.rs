//! Audio format descriptors and PCM sample-rate conversion.
//!
//! All realtime transports in this crate exchange audio as base64-encoded
//! 16-bit little-endian PCM. Vendors disagree on sample rates (16 kHz vs
//! 24 kHz), so agents resample outbound audio to their transport's input
//! rate with [`resample_base64_pcm16`].

use base64::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{RealtimeError, Result};

/// MIME type for raw PCM audio.
pub const PCM_MIME_TYPE: &str = "audio/pcm";

/// Describes the encoding and sample rate of an audio payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioFormat {
    /// Audio encoding, e.g. `"audio/pcm"`.
    pub encoding: String,
    /// Sample rate in Hz, e.g. `16000`.
    pub sample_rate: u32,
}

impl AudioFormat {
    /// PCM16 format at the given sample rate.
    pub fn pcm(sample_rate: u32) -> Self {
        Self { encoding: PCM_MIME_TYPE.to_string(), sample_rate }
    }

    /// PCM16 at 16 kHz.
    pub fn pcm16_16khz() -> Self {
        Self::pcm(16_000)
    }

    /// PCM16 at 24 kHz.
    pub fn pcm16_24khz() -> Self {
        Self::pcm(24_000)
    }
}

/// Resample a PCM16 sample buffer from one rate to another using linear
/// interpolation. Returns the input unchanged when the rates match.
pub fn resample_pcm16(samples: &[i16], from_rate: u32, to_rate: u32) -> Vec<i16> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let out_len = (samples.len() as u64 * to_rate as u64 / from_rate as u64) as usize;
    let step = from_rate as f64 / to_rate as f64;

    let mut out = Vec::with_capacity(out_len);
    for i in 0..out_len {
        let pos = i as f64 * step;
        let idx = pos as usize;
        let frac = pos - idx as f64;
        let s0 = samples[idx.min(samples.len() - 1)] as f64;
        let s1 = samples[(idx + 1).min(samples.len() - 1)] as f64;
        out.push((s0 + (s1 - s0) * frac).round() as i16);
    }
    out
}

/// Resample a base64-encoded PCM16 chunk between sample rates, returning a
/// base64-encoded chunk at the target rate.
pub fn resample_base64_pcm16(delta: &str, from_rate: u32, to_rate: u32) -> Result<String> {
    if from_rate == to_rate {
        return Ok(delta.to_string());
    }

    let bytes = BASE64_STANDARD
        .decode(delta)
        .map_err(|e| RealtimeError::audio(format!("invalid base64 audio payload: {}", e)))?;
    if bytes.len() % 2 != 0 {
        return Err(RealtimeError::audio("PCM16 payload has odd byte length"));
    }

    let samples: Vec<i16> =
        bytes.chunks_exact(2).map(|c| i16::from_le_bytes([c[0], c[1]])).collect();
    let resampled = resample_pcm16(&samples, from_rate, to_rate);

    let mut out = Vec::with_capacity(resampled.len() * 2);
    for sample in resampled {
        out.extend_from_slice(&sample.to_le_bytes());
    }
    Ok(BASE64_STANDARD.encode(&out))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pcm_constructors() {
        let fmt = AudioFormat::pcm16_24khz();
        assert_eq!(fmt.encoding, PCM_MIME_TYPE);
        assert_eq!(fmt.sample_rate, 24_000);
        assert_eq!(AudioFormat::pcm16_16khz().sample_rate, 16_000);
    }

    #[test]
    fn test_resample_same_rate_is_identity() {
        let samples = vec![1i16, 2, 3, 4];
        assert_eq!(resample_pcm16(&samples, 16_000, 16_000), samples);
    }

    #[test]
    fn test_resample_halves_sample_count() {
        let samples: Vec<i16> = (0..100).collect();
        let out = resample_pcm16(&samples, 24_000, 12_000);
        assert_eq!(out.len(), 50);
    }

    #[test]
    fn test_resample_upsamples_linearly() {
        let samples = vec![0i16, 100];
        let out = resample_pcm16(&samples, 8_000, 16_000);
        assert_eq!(out.len(), 4);
        // Interpolated midpoint must land between the two source samples.
        assert_eq!(out[0], 0);
        assert_eq!(out[1], 50);
    }

    #[test]
    fn test_resample_base64_roundtrip() {
        let samples = vec![10i16, 20, 30, 40];
        let mut bytes = Vec::new();
        for s in &samples {
            bytes.extend_from_slice(&s.to_le_bytes());
        }
        let encoded = BASE64_STANDARD.encode(&bytes);

        let out = resample_base64_pcm16(&encoded, 16_000, 8_000).unwrap();
        let decoded = BASE64_STANDARD.decode(&out).unwrap();
        assert_eq!(decoded.len(), 4); // 2 samples at half the rate
    }

    #[test]
    fn test_resample_base64_rejects_bad_payload() {
        assert!(resample_base64_pcm16("not base64!!!", 16_000, 24_000).is_err());
    }
}
