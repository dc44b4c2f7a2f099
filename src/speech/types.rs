//! Request parameters shared by the speech clients and the orchestrator.

use super::error::SpeechError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lowest accepted rate change, in percent.
pub const MIN_RATE_PERCENT: i32 = -50;
/// Highest accepted rate change, in percent.
pub const MAX_RATE_PERCENT: i32 = 50;

/// Emotion tag understood by the synthesis endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Angry,
    Cheerful,
    Sad,
    Terrified,
    Relaxed,
    Fearful,
    Surprised,
    Calm,
    Assertive,
    Energetic,
    Warm,
    Direct,
    Bright,
}

impl Emotion {
    pub const ALL: [Emotion; 13] = [
        Emotion::Angry,
        Emotion::Cheerful,
        Emotion::Sad,
        Emotion::Terrified,
        Emotion::Relaxed,
        Emotion::Fearful,
        Emotion::Surprised,
        Emotion::Calm,
        Emotion::Assertive,
        Emotion::Energetic,
        Emotion::Warm,
        Emotion::Direct,
        Emotion::Bright,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Angry => "angry",
            Emotion::Cheerful => "cheerful",
            Emotion::Sad => "sad",
            Emotion::Terrified => "terrified",
            Emotion::Relaxed => "relaxed",
            Emotion::Fearful => "fearful",
            Emotion::Surprised => "surprised",
            Emotion::Calm => "calm",
            Emotion::Assertive => "assertive",
            Emotion::Energetic => "energetic",
            Emotion::Warm => "warm",
            Emotion::Direct => "direct",
            Emotion::Bright => "bright",
        }
    }

    /// Parse a user-supplied emotion. Empty, `none` and `neutral` mean no emotion.
    pub fn parse_optional(value: &str) -> Result<Option<Emotion>, SpeechError> {
        let value = value.trim();
        if value.is_empty()
            || value.eq_ignore_ascii_case("none")
            || value.eq_ignore_ascii_case("neutral")
        {
            return Ok(None);
        }
        value.parse().map(Some)
    }

    /// File-name tag: the lowercased emotion, or `neutral` when unset.
    pub fn tag(emotion: Option<Emotion>) -> &'static str {
        emotion.map_or("neutral", |e| e.as_str())
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Emotion {
    type Err = SpeechError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Emotion::ALL
            .iter()
            .copied()
            .find(|e| e.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| SpeechError::UnknownEmotion(s.to_string()))
    }
}

/// How a requested rate reaches the generated audio.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateStrategy {
    /// Send a rate descriptor and let the service render at that rate
    #[default]
    Native,
    /// Request neutral-rate audio and resample it locally
    Local,
}

impl RateStrategy {
    pub fn default_format(&self) -> AudioFormat {
        match self {
            RateStrategy::Native => AudioFormat::Mp3,
            RateStrategy::Local => AudioFormat::Wav,
        }
    }
}

impl FromStr for RateStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "native" => Ok(RateStrategy::Native),
            "local" => Ok(RateStrategy::Local),
            other => Err(format!("unknown rate strategy '{}' (expected native or local)", other)),
        }
    }
}

/// Audio container requested from the synthesis endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    Mp3,
    Wav,
    Ogg,
    Aac,
}

impl AudioFormat {
    /// Value of the `audio_format` request field, also the file extension.
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Wav => "wav",
            AudioFormat::Ogg => "ogg",
            AudioFormat::Aac => "aac",
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rate change in percent, guaranteed to lie in `[-50, 50]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RatePercent(i32);

impl RatePercent {
    pub const NORMAL: RatePercent = RatePercent(0);

    /// Reject values outside `[-50, 50]`.
    pub fn new(percent: i32) -> Result<Self, SpeechError> {
        if (MIN_RATE_PERCENT..=MAX_RATE_PERCENT).contains(&percent) {
            Ok(Self(percent))
        } else {
            Err(SpeechError::InvalidRate(percent))
        }
    }

    /// Force any value into `[-50, 50]`.
    pub fn clamped(percent: i32) -> Self {
        Self(percent.clamp(MIN_RATE_PERCENT, MAX_RATE_PERCENT))
    }

    pub fn value(&self) -> i32 {
        self.0
    }

    pub fn is_normal(&self) -> bool {
        self.0 == 0
    }

    /// Playback speed factor: `1 + rate / 100`.
    pub fn speed_multiplier(&self) -> f64 {
        1.0 + f64::from(self.0) / 100.0
    }

    /// Native rate bucket for this percentage.
    pub fn descriptor(&self) -> RateDescriptor {
        match self.0 {
            i32::MIN..=-35 => RateDescriptor::ExtraSlow,
            -34..=-10 => RateDescriptor::Slow,
            -9..=9 => RateDescriptor::Medium,
            10..=34 => RateDescriptor::Fast,
            _ => RateDescriptor::ExtraFast,
        }
    }

    /// File-name tag: `normal`, `plus<N>` or `minus<N>`.
    pub fn tag(&self) -> String {
        match self.0 {
            0 => "normal".to_string(),
            n if n > 0 => format!("plus{}", n),
            n => format!("minus{}", n.unsigned_abs()),
        }
    }
}

impl fmt::Display for RatePercent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:+}%", self.0)
    }
}

/// Discrete speaking rate sent as `speech_rate` under the native strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RateDescriptor {
    #[serde(rename = "x-slow")]
    ExtraSlow,
    #[serde(rename = "slow")]
    Slow,
    #[serde(rename = "medium")]
    Medium,
    #[serde(rename = "fast")]
    Fast,
    #[serde(rename = "x-fast")]
    ExtraFast,
}

impl RateDescriptor {
    pub fn as_str(&self) -> &'static str {
        match self {
            RateDescriptor::ExtraSlow => "x-slow",
            RateDescriptor::Slow => "slow",
            RateDescriptor::Medium => "medium",
            RateDescriptor::Fast => "fast",
            RateDescriptor::ExtraFast => "x-fast",
        }
    }
}
