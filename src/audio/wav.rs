use anyhow::{bail, Result};
use tracing::warn;

/// Length of the canonical RIFF/WAVE/fmt/data header this module emits.
pub const WAV_HEADER_LEN: usize = 44;

/// PCM format parameters carried in a WAV `fmt ` sub-chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavFormat {
    pub channels: u16,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
}

impl Default for WavFormat {
    fn default() -> Self {
        // Interview client capture settings: 16kHz mono s16le.
        Self {
            channels: 1,
            sample_rate: 16_000,
            bits_per_sample: 16,
        }
    }
}

/// Merge N audio buffers into a single WAV artifact.
///
/// Each buffer is optionally a well-formed RIFF/WAV container: RIFF-prefixed
/// buffers contribute their `data` payload, anything else contributes its raw
/// bytes. Format parameters come from the first RIFF buffer (the capture
/// format is uniform across a recording). One fresh canonical header covers
/// the concatenated payload.
///
/// Never fails: if container parsing errors, the fallback is raw byte
/// concatenation of all inputs without header repair.
pub fn merge_wav_buffers(buffers: &[Vec<u8>]) -> Vec<u8> {
    match buffers {
        [] => Vec::new(),
        [single] => single.clone(),
        _ => match try_merge(buffers) {
            Ok(merged) => merged,
            Err(e) => {
                warn!("WAV merge failed ({e}), falling back to raw concatenation");
                buffers.concat()
            }
        },
    }
}

fn try_merge(buffers: &[Vec<u8>]) -> Result<Vec<u8>> {
    let mut format: Option<WavFormat> = None;
    let mut payload: Vec<u8> = Vec::new();

    for buffer in buffers {
        if is_riff(buffer) {
            if format.is_none() {
                format = Some(parse_format(buffer)?);
            }
            payload.extend_from_slice(extract_data_payload(buffer));
        } else {
            payload.extend_from_slice(buffer);
        }
    }

    let format = format.unwrap_or_default();
    let mut merged = build_header(format, payload.len() as u32);
    merged.extend_from_slice(&payload);
    Ok(merged)
}

fn is_riff(buffer: &[u8]) -> bool {
    buffer.len() >= 4 && &buffer[..4] == b"RIFF"
}

/// Read channel count, sample rate and bit depth from the fixed offsets of
/// the `fmt ` sub-chunk.
pub fn parse_format(buffer: &[u8]) -> Result<WavFormat> {
    if buffer.len() < WAV_HEADER_LEN {
        bail!(
            "RIFF buffer shorter than canonical header ({} bytes)",
            buffer.len()
        );
    }
    let channels = u16::from_le_bytes([buffer[22], buffer[23]]);
    let sample_rate = u32::from_le_bytes([buffer[24], buffer[25], buffer[26], buffer[27]]);
    let bits_per_sample = u16::from_le_bytes([buffer[34], buffer[35]]);
    if channels == 0 || sample_rate == 0 || bits_per_sample == 0 {
        bail!("fmt sub-chunk carries zeroed format parameters");
    }
    Ok(WavFormat {
        channels,
        sample_rate,
        bits_per_sample,
    })
}

/// Extract the `data` sub-chunk payload from a RIFF buffer.
///
/// Scans forward from byte 44 reading 4-byte id + 4-byte little-endian
/// length pairs, skipping non-`data` sub-chunks by their declared length.
/// When no `data` sub-chunk is found (the canonical layout, where byte 44
/// already is the payload), everything after byte 44 is the payload.
fn extract_data_payload(buffer: &[u8]) -> &[u8] {
    let mut pos = WAV_HEADER_LEN;
    while pos + 8 <= buffer.len() {
        let id = &buffer[pos..pos + 4];
        let declared =
            u32::from_le_bytes([buffer[pos + 4], buffer[pos + 5], buffer[pos + 6], buffer[pos + 7]])
                as usize;
        let body_start = pos + 8;
        if id == b"data" && body_start + declared <= buffer.len() {
            return &buffer[body_start..body_start + declared];
        }
        match body_start.checked_add(declared) {
            Some(next) if next > pos && next <= buffer.len() => pos = next,
            _ => break,
        }
    }
    if buffer.len() > WAV_HEADER_LEN {
        &buffer[WAV_HEADER_LEN..]
    } else {
        &[]
    }
}

/// Build a canonical 44-byte RIFF/WAVE/fmt/data header over `data_len`
/// payload bytes.
pub fn build_header(format: WavFormat, data_len: u32) -> Vec<u8> {
    let bytes_per_sample = u32::from(format.bits_per_sample) / 8;
    let block_align = u16::from(format.channels) as u32 * bytes_per_sample;
    let byte_rate = format.sample_rate * block_align;

    let mut header = Vec::with_capacity(WAV_HEADER_LEN);
    header.extend_from_slice(b"RIFF");
    header.extend_from_slice(&(36 + data_len).to_le_bytes());
    header.extend_from_slice(b"WAVE");

    header.extend_from_slice(b"fmt ");
    header.extend_from_slice(&16u32.to_le_bytes());
    header.extend_from_slice(&1u16.to_le_bytes()); // PCM
    header.extend_from_slice(&format.channels.to_le_bytes());
    header.extend_from_slice(&format.sample_rate.to_le_bytes());
    header.extend_from_slice(&byte_rate.to_le_bytes());
    header.extend_from_slice(&(block_align as u16).to_le_bytes());
    header.extend_from_slice(&format.bits_per_sample.to_le_bytes());

    header.extend_from_slice(b"data");
    header.extend_from_slice(&data_len.to_le_bytes());
    header
}
