//! Speech Module
//!
//! Clients for the hosted TTS service (voice cloning and synthesis), the
//! local speed transform, and the request parameter types.

mod enrollment;
mod error;
mod synthesis;
pub mod transform;
mod types;

pub use enrollment::VoiceEnrollmentClient;
pub use error::SpeechError;
pub use synthesis::{SynthesisClient, SynthesizedAudio};
pub use types::{
    AudioFormat, Emotion, MAX_RATE_PERCENT, MIN_RATE_PERCENT, RateDescriptor, RatePercent,
    RateStrategy,
};

use async_trait::async_trait;
use std::path::Path;

/// Registers a voice sample and returns the service's voice id.
#[async_trait]
pub trait VoiceEnroller: Send + Sync {
    async fn enroll(&self, name: &str, audio_path: &Path) -> Result<String, SpeechError>;
}

/// Turns text into audio in a previously enrolled voice.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Container of the audio this synthesizer returns
    fn format(&self) -> AudioFormat;

    async fn synthesize(
        &self,
        text: &str,
        voice_id: &str,
        emotion: Option<Emotion>,
        rate_percent: i32,
    ) -> Result<SynthesizedAudio, SpeechError>;
}
