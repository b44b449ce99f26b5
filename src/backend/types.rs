//! Backend request/response types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when communicating with a backend.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Unsupported input: {0}")]
    Unsupported(String),

    #[error("Backend rejected request: {0}")]
    Rejected(String),

    #[error("Backend used before prepare")]
    NotPrepared,
}

/// Health check response from a model server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub device: Option<String>,
}

/// Request for speech synthesis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SynthesizeRequest {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(rename = "name", skip_serializing_if = "Option::is_none")]
    pub voice_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default = "default_speed")]
    pub speed: f32,
    #[serde(default = "default_format")]
    pub format: String,
}

fn default_speed() -> f32 {
    1.0
}

fn default_format() -> String {
    "wav".to_string()
}

impl SynthesizeRequest {
    /// Create a new synthesis request.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            model: None,
            voice_name: None,
            language: None,
            speed: default_speed(),
            format: default_format(),
        }
    }

    /// Set the model identifier.
    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }

    /// Set the voice name.
    pub fn with_voice(mut self, name: Option<String>) -> Self {
        self.voice_name = name;
        self
    }

    /// Set the target language.
    pub fn with_language(mut self, language: Option<String>) -> Self {
        self.language = language;
        self
    }

    /// Set the speech speed.
    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    /// Set the output container format.
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthesize_request_builder() {
        let request = SynthesizeRequest::new("Hello world")
            .with_voice(Some("v2/en_speaker_6".to_string()))
            .with_language(Some("de".to_string()))
            .with_speed(1.5)
            .with_format("mp3");

        assert_eq!(request.text, "Hello world");
        assert_eq!(request.voice_name, Some("v2/en_speaker_6".to_string()));
        assert_eq!(request.language.as_deref(), Some("de"));
        assert_eq!(request.speed, 1.5);
        assert_eq!(request.format, "mp3");
    }

    #[test]
    fn test_synthesize_request_defaults() {
        let request = SynthesizeRequest::new("Hello");

        assert_eq!(request.text, "Hello");
        assert_eq!(request.voice_name, None);
        assert_eq!(request.speed, 1.0);
        assert_eq!(request.format, "wav");
    }

    #[test]
    fn test_synthesize_request_omits_unset_fields() {
        let request = SynthesizeRequest::new("Hi").with_voice(Some("p225".to_string()));
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["name"], "p225");
        assert!(json.get("model").is_none());
        assert!(json.get("language").is_none());
    }

    #[test]
    fn test_health_response_deserialize_minimal() {
        let json = r#"{"status": "healthy"}"#;

        let response: HealthResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.status, "healthy");
        assert_eq!(response.model, None);
    }

    #[test]
    fn test_health_response_deserialize() {
        let json = r#"{
            "status": "healthy",
            "model": "tts_models/multilingual/multi-dataset/xtts_v2",
            "device": "cuda:0"
        }"#;

        let response: HealthResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.device.as_deref(), Some("cuda:0"));
    }
}
