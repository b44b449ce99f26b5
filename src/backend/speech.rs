//! Text-to-speech over a model server's JSON synthesis endpoint.

use std::time::Duration;

use tracing::{debug, info};

use crate::cli::{AudioFormat, BackendKind};
use crate::pipeline::WorkItem;

use super::client::{HttpClient, check_status, read_body};
use super::types::{BackendError, HealthResponse, SynthesizeRequest};
use super::{Backend, audio};

/// Per-run synthesis settings shared by every item.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechOptions {
    pub model: Option<String>,
    pub voice: Option<String>,
    pub language: Option<String>,
    pub speed: f32,
    pub format: AudioFormat,
}

impl Default for SpeechOptions {
    fn default() -> Self {
        Self {
            model: None,
            voice: None,
            language: None,
            speed: 1.0,
            format: AudioFormat::Wav,
        }
    }
}

/// Backend for Coqui and Bark model servers.
pub struct SpeechBackend {
    kind: BackendKind,
    base_url: String,
    timeout: Duration,
    options: SpeechOptions,
}

/// Handle returned by [`SpeechBackend::prepare`].
#[derive(Debug)]
pub struct SpeechSession {
    client: HttpClient,
    pub health: HealthResponse,
}

impl SpeechBackend {
    /// Create a speech backend; unset model/voice fall back to the kind's defaults.
    pub fn new(
        kind: BackendKind,
        base_url: &str,
        timeout: Duration,
        options: SpeechOptions,
    ) -> Self {
        let mut options = options;
        if options.model.is_none() {
            options.model = kind.default_model().map(str::to_string);
        }
        if options.voice.is_none() {
            options.voice = kind.default_voice().map(str::to_string);
        }

        Self {
            kind,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            options,
        }
    }

    /// Get the base URL for this backend.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn options(&self) -> &SpeechOptions {
        &self.options
    }

    /// Build the request body sent for one item.
    pub fn request_for(&self, item: &WorkItem) -> SynthesizeRequest {
        SynthesizeRequest::new(item.payload.clone())
            .with_model(self.options.model.clone())
            .with_voice(self.options.voice.clone())
            .with_language(self.options.language.clone())
            .with_speed(self.options.speed)
            .with_format(self.options.format.extension())
    }
}

impl Backend for SpeechBackend {
    type Handle = SpeechSession;

    fn prepare(&self) -> Result<SpeechSession, BackendError> {
        let client = HttpClient::new(&self.base_url, self.timeout)?;
        let health = client.health()?;

        info!(
            backend = self.kind.name(),
            url = client.base_url(),
            model = health.model.as_deref().unwrap_or("unknown"),
            "model server ready"
        );

        Ok(SpeechSession { client, health })
    }

    fn process(&self, session: &SpeechSession, item: &WorkItem) -> Result<Vec<u8>, BackendError> {
        let request = self.request_for(item);
        let url = session.client.endpoint("synthesize");
        debug!(index = item.index, %url, "synthesizing");

        let response = session
            .client
            .inner()
            .post(&url)
            .json(&request)
            .send()
            .map_err(|e| BackendError::ConnectionFailed(e.to_string()))?;

        let audio_data = read_body(check_status(response)?)?;

        if self.options.format == AudioFormat::Wav {
            audio::validate_wav(&audio_data)?;
        }

        Ok(audio_data)
    }
}
