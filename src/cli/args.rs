//! CLI argument definitions and parsing.

use clap::{ArgGroup, Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Batch text-to-speech, voice cloning and page fetching.
#[derive(Parser, Debug)]
#[command(name = "batch-synth")]
#[command(about = "Run a text-to-speech, voice cloning or fetch backend over a list of items")]
#[command(version)]
#[command(group(ArgGroup::new("source").required(true).args(["input", "generate"])))]
pub struct Args {
    /// Backend to use: "coqui", "bark", "xtts" (voice cloning) or "fetch"
    #[arg(short, long, value_enum, default_value = "coqui")]
    pub backend: BackendKind,

    /// Input file with one item per line (blank lines are ignored)
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Single item: text to speak, or URL to fetch
    #[arg(short, long)]
    pub generate: Option<String>,

    /// Output directory (created if missing)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Audio format for speech backends
    #[arg(short, long, value_enum, default_value = "wav")]
    pub format: AudioFormat,

    /// Model identifier passed to the model server
    #[arg(short, long)]
    pub model: Option<String>,

    /// Speaker name or voice preset
    #[arg(long)]
    pub voice: Option<String>,

    /// Target language code
    #[arg(short, long)]
    pub language: Option<String>,

    /// Speech speed multiplier (0.5 to 2.0)
    #[arg(short, long, default_value = "1.0")]
    pub speed: f32,

    /// Voice sample for cloning: "sample.wav" or "sample.wav;transcript"
    #[arg(short, long)]
    pub reference: Option<String>,

    /// Model server host
    #[arg(long)]
    pub host: Option<String>,

    /// Full backend base URL, overriding host and port
    #[arg(long)]
    pub url: Option<String>,

    /// Rotate browser user agents when fetching
    #[arg(long)]
    pub stealth: bool,

    /// Milliseconds to wait after page load when fetching
    #[arg(long, default_value = "0")]
    pub wait: u64,

    /// CSS selector to extract when fetching
    #[arg(long)]
    pub selector: Option<String>,

    /// Content extraction mode when fetching
    #[arg(short, long, value_enum, default_value = "markdown")]
    pub extract: ExtractMode,

    /// Milliseconds to pause between items
    #[arg(long)]
    pub delay: Option<u64>,

    /// What to do when an output file already exists
    #[arg(long, value_enum)]
    pub on_existing: Option<ExistingPolicy>,

    /// Write a JSON manifest of all outcomes to <output-dir>/_summary.json
    #[arg(long)]
    pub manifest: bool,

    /// Settings file (TOML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

/// Backend selection.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BackendKind {
    /// Coqui TTS model server
    #[default]
    #[value(name = "coqui")]
    Coqui,

    /// Bark model server (voice presets)
    #[value(name = "bark")]
    Bark,

    /// XTTS v2 voice cloning server
    #[value(name = "xtts")]
    Xtts,

    /// Reader proxy page fetch
    #[value(name = "fetch")]
    Fetch,
}

impl BackendKind {
    /// Returns the CLI argument string for this backend.
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Coqui => "coqui",
            BackendKind::Bark => "bark",
            BackendKind::Xtts => "xtts",
            BackendKind::Fetch => "fetch",
        }
    }

    /// Returns the default server port, if the backend runs locally.
    pub fn port(&self) -> Option<u16> {
        match self {
            BackendKind::Coqui => Some(5002),
            BackendKind::Bark => Some(5003),
            BackendKind::Xtts => Some(8020),
            BackendKind::Fetch => None,
        }
    }

    /// Returns the human-readable name of the backend.
    pub fn name(&self) -> &'static str {
        match self {
            BackendKind::Coqui => "Coqui TTS",
            BackendKind::Bark => "Bark",
            BackendKind::Xtts => "XTTS v2",
            BackendKind::Fetch => "Reader fetch",
        }
    }

    pub fn default_model(&self) -> Option<&'static str> {
        match self {
            BackendKind::Coqui => Some("tts_models/en/ljspeech/tacotron2-DDC"),
            _ => None,
        }
    }

    pub fn default_voice(&self) -> Option<&'static str> {
        match self {
            BackendKind::Bark => Some("v2/en_speaker_6"),
            _ => None,
        }
    }

    /// Whether the backend produces audio.
    pub fn is_speech(&self) -> bool {
        !matches!(self, BackendKind::Fetch)
    }
}

/// Audio container for synthesized speech.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AudioFormat {
    #[default]
    #[value(name = "wav")]
    Wav,

    #[value(name = "mp3")]
    Mp3,
}

impl AudioFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Wav => "wav",
            AudioFormat::Mp3 => "mp3",
        }
    }
}

/// What a fetch returns: structured markup, plain text or rendered HTML.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExtractMode {
    #[default]
    #[value(name = "markdown")]
    Markdown,

    #[value(name = "text")]
    Text,

    #[value(name = "html")]
    Html,
}

impl ExtractMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractMode::Markdown => "markdown",
            ExtractMode::Text => "text",
            ExtractMode::Html => "html",
        }
    }

    /// File extension for content fetched in this mode.
    pub fn extension(&self) -> &'static str {
        match self {
            ExtractMode::Markdown => "md",
            ExtractMode::Text => "txt",
            ExtractMode::Html => "html",
        }
    }
}

/// Behaviour when an item's output path already exists.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExistingPolicy {
    /// Replace the existing file
    #[default]
    Overwrite,

    /// Leave the file alone and mark the item failed
    Error,
}

/// Parsed voice cloning reference.
#[derive(Debug, Clone, PartialEq)]
pub struct Reference {
    /// Path to the sample audio file.
    pub audio_path: PathBuf,
    /// Optional transcript of the sample.
    pub transcript: Option<String>,
}

/// Errors that can occur when parsing a reference string.
#[derive(Error, Debug)]
pub enum ReferenceParseError {
    #[error("Invalid format: {0}. Expected 'sample.wav' or 'sample.wav;transcript text'")]
    InvalidFormat(String),

    #[error("Sample file not found: {0}")]
    FileNotFound(PathBuf),
}

impl Reference {
    /// Parse a reference from "sample.wav" or "sample.wav;transcript" format.
    ///
    /// # Arguments
    /// * `input` - String in format "path/to/sample.wav[;transcript text]"
    ///
    /// # Returns
    /// * `Ok(Reference)` if parsing succeeds
    /// * `Err(ReferenceParseError)` if parsing fails
    ///
    /// # Examples
    /// ```no_run
    /// use batch_synth::cli::Reference;
    /// let reference = Reference::parse("sample.wav;Hello world");
    /// ```
    pub fn parse(input: &str) -> Result<Self, ReferenceParseError> {
        // Split on first semicolon only (transcript may contain semicolons)
        let (path_part, transcript_part) = match input.split_once(';') {
            Some((path, transcript)) => (path, Some(transcript)),
            None => (input, None),
        };

        let path_part = path_part.trim();
        if path_part.is_empty() {
            return Err(ReferenceParseError::InvalidFormat(
                "Missing sample path".to_string(),
            ));
        }

        let audio_path = PathBuf::from(path_part);
        if !audio_path.is_file() {
            return Err(ReferenceParseError::FileNotFound(audio_path));
        }

        let transcript = transcript_part
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string);

        Ok(Self {
            audio_path,
            transcript,
        })
    }
}
