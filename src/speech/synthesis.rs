//! Synthesis Client
//!
//! Sends text + voice id to the speech endpoint and returns decoded audio.
//! The rate is applied natively by the service or locally via
//! [`super::transform`], depending on [`RateStrategy`].

use super::SpeechSynthesizer;
use super::error::SpeechError;
use super::transform;
use super::types::{AudioFormat, Emotion, RateDescriptor, RatePercent, RateStrategy};
use crate::config::{Config, SecretString};
use crate::utils::truncate_str;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const SPEECH_PATH: &str = "/v1/audio/speech";
const MAX_LOGGED_BODY: usize = 500;

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    input: &'a str,
    voice_id: &'a str,
    audio_format: AudioFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    emotion: Option<Emotion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    speech_rate: Option<RateDescriptor>,
}

#[derive(Debug, Deserialize)]
struct SpeechResponse {
    #[serde(default)]
    audio_data: Option<String>,
}

/// Audio returned by a successful synthesis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizedAudio {
    pub bytes: Vec<u8>,
    pub format: AudioFormat,
}

/// Client for the speech synthesis endpoint.
#[derive(Clone)]
pub struct SynthesisClient {
    client: Client,
    api_key: SecretString,
    url: String,
    strategy: RateStrategy,
    format: AudioFormat,
}

impl SynthesisClient {
    pub fn from_config(config: &Config) -> Result<Self, SpeechError> {
        let mut builder = Client::builder();
        if let Some(secs) = config.synthesis.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().map_err(SpeechError::from_transport)?;

        Ok(Self {
            client,
            api_key: config.api.api_key.clone(),
            url: format!("{}{}", config.api.base_url.trim_end_matches('/'), SPEECH_PATH),
            strategy: config.synthesis.rate_strategy,
            format: config.synthesis.effective_format(),
        })
    }

    pub fn strategy(&self) -> RateStrategy {
        self.strategy
    }

    /// Synthesize `text` in `voice_id`.
    ///
    /// Empty text, empty voice id and rates outside `[-50, 50]` are rejected
    /// before any request is made.
    pub async fn synthesize(
        &self,
        text: &str,
        voice_id: &str,
        emotion: Option<Emotion>,
        rate_percent: i32,
    ) -> Result<SynthesizedAudio, SpeechError> {
        if text.trim().is_empty() {
            return Err(SpeechError::EmptyText);
        }
        if voice_id.trim().is_empty() {
            return Err(SpeechError::EmptyVoiceId);
        }
        let rate = RatePercent::new(rate_percent)?;
        if self.api_key.is_empty() {
            return Err(SpeechError::MissingApiKey);
        }

        let speech_rate = match self.strategy {
            RateStrategy::Native => Some(rate.descriptor()),
            RateStrategy::Local => None,
        };
        let request = SpeechRequest {
            input: text,
            voice_id,
            audio_format: self.format,
            emotion,
            speech_rate,
        };

        tracing::debug!(
            "Synthesis request: voice={}, emotion={}, rate={}, strategy={:?}",
            voice_id,
            Emotion::tag(emotion),
            rate,
            self.strategy
        );

        let response = self
            .client
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", self.api_key.expose()))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(SpeechError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(
                "Synthesis failed: HTTP {} - {}",
                status.as_u16(),
                truncate_str(&body, MAX_LOGGED_BODY)
            );
            return Err(SpeechError::Api {
                status: status.as_u16(),
                body: truncate_str(&body, MAX_LOGGED_BODY).to_string(),
            });
        }

        let parsed: SpeechResponse = response
            .json()
            .await
            .map_err(|e| SpeechError::InvalidResponse(e.to_string()))?;

        let encoded = parsed
            .audio_data
            .filter(|data| !data.is_empty())
            .ok_or(SpeechError::MissingField("audio_data"))?;

        let audio = BASE64
            .decode(encoded.as_bytes())
            .map_err(|e| SpeechError::Decode(format!("audio_data is not base64: {}", e)))?;
        if audio.is_empty() {
            return Err(SpeechError::Decode("audio payload is empty".to_string()));
        }

        let bytes = match self.strategy {
            RateStrategy::Native => audio,
            RateStrategy::Local => transform::change_speed(&audio, rate)?,
        };

        tracing::info!(
            "Synthesized {} bytes of {} audio (voice={})",
            bytes.len(),
            self.format,
            voice_id
        );

        Ok(SynthesizedAudio {
            bytes,
            format: self.format,
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for SynthesisClient {
    fn format(&self) -> AudioFormat {
        self.format
    }

    async fn synthesize(
        &self,
        text: &str,
        voice_id: &str,
        emotion: Option<Emotion>,
        rate_percent: i32,
    ) -> Result<SynthesizedAudio, SpeechError> {
        SynthesisClient::synthesize(self, text, voice_id, emotion, rate_percent).await
    }
}
