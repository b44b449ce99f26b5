//! Voice cloning over a multipart endpoint (XTTS v2 style servers).

use std::path::Path;
use std::time::Duration;

use reqwest::blocking::multipart::{Form, Part};
use tracing::{debug, info};

use crate::cli::{AudioFormat, Reference};
use crate::pipeline::WorkItem;

use super::client::{HttpClient, check_status, read_body};
use super::types::BackendError;
use super::{Backend, audio};

/// Backend that speaks each item in the voice of a reference sample.
pub struct CloneBackend {
    base_url: String,
    timeout: Duration,
    reference: Reference,
    language: String,
    speed: f32,
    format: AudioFormat,
}

/// Handle returned by [`CloneBackend::prepare`]: a live client plus the
/// sample audio, read once per run.
#[derive(Debug)]
pub struct CloneSession {
    client: HttpClient,
    sample: Vec<u8>,
    sample_name: String,
}

impl CloneBackend {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        reference: Reference,
        language: impl Into<String>,
        speed: f32,
        format: AudioFormat,
    ) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            reference,
            language: language.into(),
            speed,
            format,
        }
    }

    fn read_sample(path: &Path) -> Result<(Vec<u8>, String), BackendError> {
        let data = std::fs::read(path)
            .map_err(|_| BackendError::FileNotFound(path.display().to_string()))?;

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("sample.wav")
            .to_string();

        Ok((data, file_name))
    }

    fn build_form(&self, session: &CloneSession, item: &WorkItem) -> Result<Form, BackendError> {
        let sample_part = Part::bytes(session.sample.clone())
            .file_name(session.sample_name.clone())
            .mime_str("audio/wav")
            .map_err(|e| BackendError::RequestFailed(e.to_string()))?;

        let mut form = Form::new()
            .part("speaker_wav", sample_part)
            .text("text", item.payload.clone())
            .text("language", self.language.clone())
            .text("speed", self.speed.to_string())
            .text("format", self.format.extension());

        if let Some(transcript) = &self.reference.transcript {
            form = form.text("transcript", transcript.clone());
        }

        Ok(form)
    }
}

impl Backend for CloneBackend {
    type Handle = CloneSession;

    fn prepare(&self) -> Result<CloneSession, BackendError> {
        let (sample, sample_name) = Self::read_sample(&self.reference.audio_path)?;
        let client = HttpClient::new(&self.base_url, self.timeout)?;
        let health = client.health()?;

        info!(
            url = client.base_url(),
            model = health.model.as_deref().unwrap_or("unknown"),
            sample = %self.reference.audio_path.display(),
            sample_bytes = sample.len(),
            "cloning server ready"
        );

        Ok(CloneSession {
            client,
            sample,
            sample_name,
        })
    }

    fn process(&self, session: &CloneSession, item: &WorkItem) -> Result<Vec<u8>, BackendError> {
        let form = self.build_form(session, item)?;
        let url = session.client.endpoint("clone");
        debug!(index = item.index, %url, language = %self.language, "cloning");

        let response = session
            .client
            .inner()
            .post(&url)
            .multipart(form)
            .send()
            .map_err(|e| BackendError::ConnectionFailed(e.to_string()))?;

        let audio_data = read_body(check_status(response)?)?;

        if self.format == AudioFormat::Wav {
            audio::validate_wav(&audio_data)?;
        }

        Ok(audio_data)
    }
}
