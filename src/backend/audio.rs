//! Sanity checks on audio returned by model servers.

use std::io::Cursor;

use tracing::debug;

use super::BackendError;

/// Basic facts about a WAV payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WavInfo {
    pub sample_rate: u32,
    pub channels: u16,
    pub duration_secs: f32,
}

/// Check that `data` is a readable WAV stream.
///
/// Model servers occasionally answer 200 with an HTML error page or a
/// truncated body; such responses are reported as `InvalidResponse` so the
/// item is marked failed instead of writing garbage to disk.
pub fn validate_wav(data: &[u8]) -> Result<WavInfo, BackendError> {
    let reader = hound::WavReader::new(Cursor::new(data))
        .map_err(|e| BackendError::InvalidResponse(format!("not a WAV stream: {e}")))?;

    let spec = reader.spec();
    if spec.sample_rate == 0 {
        return Err(BackendError::InvalidResponse(
            "WAV header reports zero sample rate".to_string(),
        ));
    }

    let info = WavInfo {
        sample_rate: spec.sample_rate,
        channels: spec.channels,
        duration_secs: reader.duration() as f32 / spec.sample_rate as f32,
    };
    debug!(
        sample_rate = info.sample_rate,
        channels = info.channels,
        duration = info.duration_secs,
        "received WAV audio"
    );

    Ok(info)
}
