//! Speed Transform
//!
//! Changes playback speed by reinterpreting the sample stream at
//! `sample_rate * multiplier` and resampling back to the native rate.
//! Tempo and pitch move together; this is not a time-stretch.
//!
//! Input and output are WAV containers. Decoded samples live only inside
//! [`change_speed`] and are dropped on every return path.

use super::error::SpeechError;
use super::types::RatePercent;
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::io::Cursor;

/// Apply `rate` to WAV bytes. A zero rate returns the input unchanged.
pub fn change_speed(wav_bytes: &[u8], rate: RatePercent) -> Result<Vec<u8>, SpeechError> {
    if rate.is_normal() {
        return Ok(wav_bytes.to_vec());
    }

    let decoded = DecodedAudio::decode(wav_bytes)?;
    let native_rate = decoded.spec.sample_rate;
    let reinterpreted_rate = (f64::from(native_rate) * rate.speed_multiplier()).round() as u32;
    if reinterpreted_rate == 0 {
        return Err(SpeechError::Decode(format!(
            "speed {} yields a zero sample rate",
            rate
        )));
    }

    tracing::debug!(
        "Speed transform {}: {} Hz reinterpreted as {} Hz, {} frames",
        rate,
        native_rate,
        reinterpreted_rate,
        decoded.frames()
    );

    let channels = decoded
        .channels
        .iter()
        .map(|ch| resample_linear(ch, reinterpreted_rate, native_rate))
        .collect();

    DecodedAudio {
        spec: decoded.spec,
        channels,
    }
    .encode()
}

/// De-interleaved samples normalised to `[-1.0, 1.0]`.
struct DecodedAudio {
    spec: WavSpec,
    channels: Vec<Vec<f32>>,
}

impl DecodedAudio {
    fn decode(bytes: &[u8]) -> Result<Self, SpeechError> {
        let mut reader =
            WavReader::new(Cursor::new(bytes)).map_err(|e| SpeechError::Decode(e.to_string()))?;
        let spec = reader.spec();
        let channel_count = usize::from(spec.channels.max(1));
        let mut channels = vec![Vec::new(); channel_count];

        match spec.sample_format {
            SampleFormat::Float => {
                for (idx, sample) in reader.samples::<f32>().enumerate() {
                    let value = sample.map_err(|e| SpeechError::Decode(e.to_string()))?;
                    channels[idx % channel_count].push(value);
                }
            }
            SampleFormat::Int => {
                let scale = int_scale(spec.bits_per_sample);
                for (idx, sample) in reader.samples::<i32>().enumerate() {
                    let value = sample.map_err(|e| SpeechError::Decode(e.to_string()))?;
                    channels[idx % channel_count].push(value as f32 / scale);
                }
            }
        }

        Ok(Self { spec, channels })
    }

    fn frames(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    fn encode(&self) -> Result<Vec<u8>, SpeechError> {
        let mut buf = Cursor::new(Vec::<u8>::new());
        {
            let mut writer = WavWriter::new(&mut buf, self.spec)
                .map_err(|e| SpeechError::Decode(e.to_string()))?;
            let scale = int_scale(self.spec.bits_per_sample);

            for frame in 0..self.frames() {
                for channel in &self.channels {
                    let value = channel.get(frame).copied().unwrap_or(0.0).clamp(-1.0, 1.0);
                    let written = match self.spec.sample_format {
                        SampleFormat::Float => writer.write_sample(value),
                        SampleFormat::Int => {
                            let max = scale - 1.0;
                            writer.write_sample((value * scale).round().clamp(-scale, max) as i32)
                        }
                    };
                    written.map_err(|e| SpeechError::Decode(e.to_string()))?;
                }
            }
            writer
                .finalize()
                .map_err(|e| SpeechError::Decode(e.to_string()))?;
        }
        Ok(buf.into_inner())
    }
}

fn int_scale(bits_per_sample: u16) -> f32 {
    (1_i64 << (bits_per_sample.clamp(1, 32) - 1)) as f32
}

/// Linear-interpolation resample of one channel.
fn resample_linear(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = f64::from(to_rate) / f64::from(from_rate);
    let output_len = (samples.len() as f64 * ratio).ceil() as usize;
    let mut output = Vec::with_capacity(output_len);

    for i in 0..output_len {
        let src_pos = i as f64 / ratio;
        let src_idx = src_pos.floor() as usize;
        let frac = (src_pos - src_idx as f64) as f32;

        if src_idx + 1 < samples.len() {
            output.push(samples[src_idx] * (1.0 - frac) + samples[src_idx + 1] * frac);
        } else if src_idx < samples.len() {
            output.push(samples[src_idx]);
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine_wav(sample_rate: u32, frames: usize, channels: u16) -> Vec<u8> {
        let spec = WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut buf = Cursor::new(Vec::new());
        {
            let mut writer = WavWriter::new(&mut buf, spec).unwrap();
            for i in 0..frames {
                let t = i as f32 / sample_rate as f32;
                let s = ((t * 440.0 * std::f32::consts::TAU).sin() * 12000.0) as i16;
                for _ in 0..channels {
                    writer.write_sample(s).unwrap();
                }
            }
            writer.finalize().unwrap();
        }
        buf.into_inner()
    }

    fn frame_count(bytes: &[u8]) -> (u32, u32) {
        let reader = WavReader::new(Cursor::new(bytes)).unwrap();
        (reader.spec().sample_rate, reader.duration())
    }

    #[test]
    fn test_zero_rate_is_passthrough() {
        let input = sine_wav(22050, 2205, 1);
        let output = change_speed(&input, RatePercent::NORMAL).unwrap();
        assert_eq!(output, input);
    }

    #[test]
    fn test_speed_up_shortens_audio() {
        let input = sine_wav(24000, 24000, 1);
        let output = change_speed(&input, RatePercent::new(50).unwrap()).unwrap();

        let (rate, frames) = frame_count(&output);
        assert_eq!(rate, 24000);
        // 1.5x faster -> two thirds of the frames
        assert!((15999..=16001).contains(&frames), "frames = {}", frames);
    }

    #[test]
    fn test_slow_down_lengthens_audio() {
        let input = sine_wav(16000, 16000, 2);
        let output = change_speed(&input, RatePercent::new(-20).unwrap()).unwrap();

        let reader = WavReader::new(Cursor::new(&output)).unwrap();
        assert_eq!(reader.spec().channels, 2);
        assert_eq!(reader.spec().sample_rate, 16000);
        // 0.8x speed -> 1.25x the frames
        let frames = reader.duration();
        assert!((19999..=20001).contains(&frames), "frames = {}", frames);
    }

    #[test]
    fn test_invalid_payload_is_decode_error() {
        let err = change_speed(b"ID3 definitely not a wav", RatePercent::new(10).unwrap())
            .unwrap_err();
        assert!(matches!(err, SpeechError::Decode(_)));
    }

    #[test]
    fn test_resample_linear_interpolates() {
        let out = resample_linear(&[0.0, 1.0], 1, 2);
        assert_eq!(out.len(), 4);
        assert_eq!(out[0], 0.0);
        assert!((out[1] - 0.5).abs() < 1e-6);
        assert_eq!(out[2], 1.0);
    }
}
