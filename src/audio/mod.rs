pub mod probe;
pub mod wav;

pub use probe::{map_timings_to_full_duration, probe_duration};
pub use wav::{build_header, merge_wav_buffers, parse_format, WavFormat, WAV_HEADER_LEN};
