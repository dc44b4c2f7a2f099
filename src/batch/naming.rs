//! File naming for uploaded samples and generated clips.

use crate::speech::{AudioFormat, Emotion, RatePercent};

/// Final path component of a client-supplied file name.
///
/// Returns `None` for names that are empty or refer to a directory
/// (`.`/`..`) once any directory part is stripped.
pub fn sanitize_file_name(raw: &str) -> Option<String> {
    let base = raw
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    match base {
        "" | "." | ".." => None,
        name => Some(name.to_string()),
    }
}

/// Owner id: the file name with only its final extension removed.
///
/// `john.v2.wav` becomes `john.v2`. A name with no usable stem is kept whole.
pub fn owner_id_from_file_name(file_name: &str) -> String {
    match file_name.rsplit_once('.') {
        Some((stem, _)) if !matches!(stem, "" | "." | "..") => stem.to_string(),
        _ => file_name.to_string(),
    }
}

/// `<output_name>_<emotion>_<rate>.<ext>`, e.g. `T001_cheerful_minus20.mp3`.
pub fn clip_file_name(
    output_name: &str,
    emotion: Option<Emotion>,
    rate: RatePercent,
    format: AudioFormat,
) -> String {
    let stem = sanitize_file_name(output_name).unwrap_or_else(|| "clip".to_string());
    format!(
        "{}_{}_{}.{}",
        stem,
        Emotion::tag(emotion),
        rate.tag(),
        format.as_str()
    )
}
