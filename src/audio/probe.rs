use crate::transcript::segment::{round1, SpeakerSegment};
use std::io::Cursor;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::debug;

/// Estimated byte rates per codec family, used when container metadata
/// cannot be read. Values assume the capture settings the interview client
/// records with (16kHz mono speech).
const WAV_BYTES_PER_SEC: f64 = 32_000.0; // s16le, 16kHz mono
const OPUS_BYTES_PER_SEC: f64 = 6_000.0;
const OGG_BYTES_PER_SEC: f64 = 8_000.0;
const MP3_BYTES_PER_SEC: f64 = 16_000.0;
const AAC_BYTES_PER_SEC: f64 = 16_000.0;
const DEFAULT_BYTES_PER_SEC: f64 = 16_000.0;

/// Return the most accurate playback duration for a chunk, in seconds.
///
/// Exact container-metadata extraction first (hound for WAV, symphonia for
/// the other codec families), then a bitrate-based estimate keyed by mime
/// type. Total: always finite and non-negative, never errors.
pub fn probe_duration(bytes: &[u8], mime_type: &str) -> f64 {
    if bytes.is_empty() {
        return 0.0;
    }

    if let Some(duration) = exact_duration(bytes, mime_type) {
        if duration.is_finite() && duration >= 0.0 {
            return duration;
        }
    }

    let estimate = estimate_duration(bytes, mime_type);
    debug!(
        mime_type,
        bytes = bytes.len(),
        estimate,
        "container metadata unreadable, using bitrate estimate"
    );
    estimate
}

fn exact_duration(bytes: &[u8], mime_type: &str) -> Option<f64> {
    if is_wav(bytes, mime_type) {
        if let Some(duration) = wav_duration(bytes) {
            return Some(duration);
        }
    }
    symphonia_duration(bytes, mime_type)
}

fn is_wav(bytes: &[u8], mime_type: &str) -> bool {
    mime_type.starts_with("audio/wav")
        || mime_type.starts_with("audio/x-wav")
        || (bytes.len() >= 4 && &bytes[..4] == b"RIFF")
}

fn wav_duration(bytes: &[u8]) -> Option<f64> {
    let reader = hound::WavReader::new(Cursor::new(bytes)).ok()?;
    let spec = reader.spec();
    if spec.sample_rate == 0 {
        return None;
    }
    // WavReader::duration() is the per-channel sample count.
    Some(reader.duration() as f64 / spec.sample_rate as f64)
}

fn symphonia_duration(bytes: &[u8], mime_type: &str) -> Option<f64> {
    let source = MediaSourceStream::new(Box::new(Cursor::new(bytes.to_vec())), Default::default());

    let mut hint = Hint::new();
    hint.mime_type(mime_type);
    if let Some(extension) = extension_for_mime(mime_type) {
        hint.with_extension(extension);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            source,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .ok()?;

    let track = probed.format.default_track()?;
    let params = &track.codec_params;

    if let (Some(n_frames), Some(time_base)) = (params.n_frames, params.time_base) {
        let time = time_base.calc_time(n_frames);
        return Some(time.seconds as f64 + time.frac);
    }
    if let (Some(n_frames), Some(sample_rate)) = (params.n_frames, params.sample_rate) {
        if sample_rate > 0 {
            return Some(n_frames as f64 / sample_rate as f64);
        }
    }
    None
}

/// File extension hint for the codec families the interview client records.
pub fn extension_for_mime(mime_type: &str) -> Option<&'static str> {
    let base = mime_type.split(';').next().unwrap_or(mime_type).trim();
    match base {
        "audio/wav" | "audio/x-wav" | "audio/wave" => Some("wav"),
        "audio/webm" | "video/webm" => Some("webm"),
        "audio/ogg" | "application/ogg" => Some("ogg"),
        "audio/mpeg" | "audio/mp3" => Some("mp3"),
        "audio/mp4" | "audio/m4a" | "audio/x-m4a" | "audio/aac" => Some("m4a"),
        _ => None,
    }
}

fn estimate_duration(bytes: &[u8], mime_type: &str) -> f64 {
    let base = mime_type.split(';').next().unwrap_or(mime_type).trim();
    let bytes_per_sec = match base {
        "audio/wav" | "audio/x-wav" | "audio/wave" => WAV_BYTES_PER_SEC,
        "audio/webm" | "video/webm" => OPUS_BYTES_PER_SEC,
        "audio/ogg" | "application/ogg" => OGG_BYTES_PER_SEC,
        "audio/mpeg" | "audio/mp3" => MP3_BYTES_PER_SEC,
        "audio/mp4" | "audio/m4a" | "audio/x-m4a" | "audio/aac" => AAC_BYTES_PER_SEC,
        _ => DEFAULT_BYTES_PER_SEC,
    };
    bytes.len() as f64 / bytes_per_sec
}

/// Remap recognizer-relative segment timestamps onto the real chunk duration
/// and the session timeline.
///
/// Two-stage rescale: `stt_scale` corrects recognizer-internal clock drift
/// against its own reported total; `full_scale` corrects the difference
/// between what the recognizer saw and the actual container duration. Both
/// endpoints land on the session timeline via `session_offset` and are
/// rounded to one decimal place.
///
/// Degenerate inputs (non-positive durations, empty segment list) return the
/// input unchanged.
pub fn map_timings_to_full_duration(
    segments: Vec<SpeakerSegment>,
    stt_duration: f64,
    full_duration: f64,
    session_offset: f64,
) -> Vec<SpeakerSegment> {
    if segments.is_empty() || stt_duration <= 0.0 || full_duration <= 0.0 {
        return segments;
    }

    let max_reported = segments
        .iter()
        .map(|s| s.end_time)
        .fold(f64::NEG_INFINITY, f64::max);
    if max_reported <= 0.0 {
        return segments;
    }

    let stt_scale = stt_duration / max_reported;
    let full_scale = full_duration / stt_duration;

    segments
        .into_iter()
        .map(|mut segment| {
            let normalized_start = segment.start_time * stt_scale;
            let normalized_end = segment.end_time * stt_scale;
            segment.start_time = round1(normalized_start * full_scale + session_offset);
            segment.end_time = round1(normalized_end * full_scale + session_offset);
            if segment.end_time <= segment.start_time {
                segment.end_time = segment.start_time + 0.1;
            }
            segment
        })
        .collect()
}
