//! Audio format conversion between the two call legs.
//!
//! The telephony leg carries 8-bit mu-law companded audio at 8 kHz; the
//! conversational-AI leg carries 16-bit signed linear PCM at 16 kHz. All
//! conversions here are stateless and deterministic: table-driven mu-law
//! expansion, bias-and-clip mu-law compression, and linear-interpolation
//! resampling between the two rates.

use std::sync::LazyLock;

/// Sample rate of the telephony media stream (mu-law).
pub const TELEPHONY_SAMPLE_RATE: u32 = 8_000;

/// Sample rate of the AI conversation stream (PCM16).
pub const AI_SAMPLE_RATE: u32 = 16_000;

const MULAW_MAX: i32 = 0x1FFF;
const MULAW_BIAS: i32 = 33;

/// Expansion table for all 256 mu-law byte values, built once.
static MULAW_DECODE_TABLE: LazyLock<[i16; 256]> = LazyLock::new(|| {
    let mut table = [0i16; 256];
    for (i, entry) in table.iter_mut().enumerate() {
        let mu = !(i as u8);
        let sign = mu & 0x80;
        let exponent = (mu >> 4) & 0x07;
        let mantissa = mu & 0x0F;
        let magnitude = ((((mantissa as i32) << 3) + 0x84) << exponent) - 0x84;
        *entry = if sign != 0 {
            -magnitude as i16
        } else {
            magnitude as i16
        };
    }
    table
});

/// Decode one mu-law byte to a linear 16-bit sample.
#[inline]
pub fn mulaw_decode(byte: u8) -> i16 {
    MULAW_DECODE_TABLE[byte as usize]
}

/// Encode one linear 16-bit sample as a mu-law byte.
pub fn mulaw_encode(sample: i16) -> u8 {
    let mut value = sample as i32;
    let sign = (value >> 8) & 0x80;
    if sign != 0 {
        value = -value;
    }
    value += MULAW_BIAS;
    if value > MULAW_MAX {
        value = MULAW_MAX;
    }

    // Most-significant set bit picks the exponent segment.
    let mut exponent = 7;
    let mut exp_mask = 0x4000;
    while exponent > 0 {
        if value & exp_mask != 0 {
            break;
        }
        exponent -= 1;
        exp_mask >>= 1;
    }

    let mantissa = (value >> (exponent + 3)) & 0x0F;
    (!(sign | (exponent << 4) | mantissa) & 0xFF) as u8
}

/// Decode a mu-law buffer to linear PCM16 samples.
pub fn mulaw_to_pcm16(mulaw: &[u8]) -> Vec<i16> {
    mulaw.iter().map(|&b| mulaw_decode(b)).collect()
}

/// Encode linear PCM16 samples as a mu-law buffer.
pub fn pcm16_to_mulaw(samples: &[i16]) -> Vec<u8> {
    samples.iter().map(|&s| mulaw_encode(s)).collect()
}

/// Resample PCM16 audio with linear interpolation.
///
/// Output length is `floor(input.len() * to_hz / from_hz)`. Good enough for
/// voice-band speech; not a hi-fi resampler.
pub fn resample(input: &[i16], from_hz: u32, to_hz: u32) -> Vec<i16> {
    if from_hz == to_hz || input.is_empty() {
        return input.to_vec();
    }

    let ratio = from_hz as f64 / to_hz as f64;
    let output_len = (input.len() as f64 / ratio).floor() as usize;
    let mut output = Vec::with_capacity(output_len);

    for i in 0..output_len {
        let src_index = i as f64 * ratio;
        let floor = src_index.floor() as usize;
        let ceil = (floor + 1).min(input.len() - 1);
        let fraction = src_index - floor as f64;

        let a = input[floor] as f64;
        let b = input[ceil] as f64;
        output.push((a + (b - a) * fraction).round() as i16);
    }

    output
}

/// Convert a telephony frame (mu-law 8 kHz) to an AI frame (PCM16 16 kHz).
pub fn telephony_to_wideband(mulaw: &[u8]) -> Vec<i16> {
    let pcm_8k = mulaw_to_pcm16(mulaw);
    resample(&pcm_8k, TELEPHONY_SAMPLE_RATE, AI_SAMPLE_RATE)
}

/// Convert an AI frame (PCM16 16 kHz) to a telephony frame (mu-law 8 kHz).
pub fn wideband_to_telephony(samples: &[i16]) -> Vec<u8> {
    let pcm_8k = resample(samples, AI_SAMPLE_RATE, TELEPHONY_SAMPLE_RATE);
    pcm16_to_mulaw(&pcm_8k)
}

/// Reinterpret little-endian PCM16 bytes as samples.
///
/// Callers must pass frame-aligned buffers; an odd byte count is a contract
/// violation, not a runtime condition.
pub fn pcm_bytes_to_samples(bytes: &[u8]) -> Vec<i16> {
    debug_assert!(bytes.len() % 2 == 0, "PCM16 buffer must be frame-aligned");
    bytes
        .chunks_exact(2)
        .map(|c| i16::from_le_bytes([c[0], c[1]]))
        .collect()
}

/// Serialize PCM16 samples as little-endian bytes.
pub fn samples_to_pcm_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}
