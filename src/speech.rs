//! Speech rendering for synthesized answers.
//!
//! Invoked on demand after an answer exists, never as a pipeline stage.
//! Rendering is a pure function of the answer text: failure withholds the
//! audio artifact but never touches the answer itself.

use crate::error::{Result, SvarError};
use crate::openai::create_client;
use async_openai::types::{CreateSpeechRequestArgs, SpeechModel, Voice};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::{debug, instrument};

/// A rendered audio artifact.
#[derive(Debug, Clone)]
pub struct AudioArtifact {
    /// Encoded audio bytes (MP3).
    pub bytes: Vec<u8>,
    /// Container format.
    pub format: String,
    /// Voice used for rendering.
    pub voice: String,
    /// When the artifact was produced.
    pub created_at: DateTime<Utc>,
}

/// Capability trait for speech synthesis.
#[async_trait]
pub trait SpeechRenderer: Send + Sync {
    /// Render answer text to audio.
    async fn render(&self, text: &str, language: Option<&str>) -> Result<AudioArtifact>;
}

/// Production renderer backed by the OpenAI speech endpoint.
pub struct OpenAiSpeech {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    voice: String,
    timeout: Duration,
}

impl OpenAiSpeech {
    /// Create a renderer with the given model and voice.
    pub fn new(model: &str, voice: &str, timeout: Duration) -> Self {
        Self {
            client: create_client(),
            model: model.to_string(),
            voice: voice.to_string(),
            timeout,
        }
    }

    fn voice(&self) -> Voice {
        match self.voice.to_lowercase().as_str() {
            "echo" => Voice::Echo,
            "fable" => Voice::Fable,
            "onyx" => Voice::Onyx,
            "nova" => Voice::Nova,
            "shimmer" => Voice::Shimmer,
            _ => Voice::Alloy,
        }
    }

    fn model(&self) -> SpeechModel {
        match self.model.as_str() {
            "tts-1" => SpeechModel::Tts1,
            "tts-1-hd" => SpeechModel::Tts1Hd,
            other => SpeechModel::Other(other.to_string()),
        }
    }
}

#[async_trait]
impl SpeechRenderer for OpenAiSpeech {
    #[instrument(skip(self, text), fields(chars = text.len()))]
    async fn render(&self, text: &str, _language: Option<&str>) -> Result<AudioArtifact> {
        // The OpenAI speech endpoint infers language from the input text,
        // so the target language rides along implicitly.
        let request = CreateSpeechRequestArgs::default()
            .input(text)
            .voice(self.voice())
            .model(self.model())
            .build()
            .map_err(|e| SvarError::Speech(e.to_string()))?;

        let response = tokio::time::timeout(self.timeout, self.client.audio().speech(request))
            .await
            .map_err(|_| {
                SvarError::Speech(format!("Speech synthesis timed out after {:?}", self.timeout))
            })?
            .map_err(|e| SvarError::Speech(format!("Speech synthesis failed: {}", e)))?;

        debug!("Rendered {} bytes of audio", response.bytes.len());

        Ok(AudioArtifact {
            bytes: response.bytes.to_vec(),
            format: "mp3".to_string(),
            voice: self.voice.clone(),
            created_at: Utc::now(),
        })
    }
}

impl AudioArtifact {
    /// Write the artifact to a file.
    pub fn save(&self, path: &std::path::Path) -> Result<()> {
        std::fs::write(path, &self.bytes)?;
        Ok(())
    }
}
