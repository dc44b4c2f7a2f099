//! Orchestrator
//!
//! Runs the per-session cycle `Idle -> FilesUploaded -> Enrolling ->
//! Generating -> Done`. Every failure is scoped to one file, one owner or
//! one clip; the batch always finishes with a consolidated report.

use super::naming::{clip_file_name, sanitize_file_name};
use super::pending::{PendingFiles, UploadedSample};
use super::report::StatusReport;
use crate::config::Config;
use crate::error::VoiceBatchError;
use crate::speech::{
    Emotion, RatePercent, SpeechSynthesizer, SynthesisClient, VoiceEnroller,
    VoiceEnrollmentClient,
};
use crate::store::{InputStore, ResultLog, VoiceIdentity};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const NO_FILES_SELECTED: &str = "No files selected. Please choose at least one audio file.";
pub const UPLOAD_OK: &str = "Audio files uploaded successfully!";
pub const NOTHING_PENDING: &str = "No files uploaded in this session. Please upload files first.";
pub const NO_VOICES: &str = "No voice IDs generated. Cannot generate audio.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Idle,
    FilesUploaded,
    Enrolling,
    Generating,
    Done,
}

impl fmt::Display for BatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BatchState::Idle => "idle",
            BatchState::FilesUploaded => "files-uploaded",
            BatchState::Enrolling => "enrolling",
            BatchState::Generating => "generating",
            BatchState::Done => "done",
        };
        f.write_str(name)
    }
}

fn advance(state: &mut BatchState, next: BatchState) {
    tracing::info!("Batch state: {} -> {}", state, next);
    *state = next;
}

/// A file as submitted by the client, before it is saved.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Parameters chosen for one generate action.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenerateOptions {
    pub emotion: Option<Emotion>,
    pub rate_percent: i32,
}

/// Shared by all sessions; the mutable part lives in each [`PendingFiles`].
pub struct Orchestrator {
    enroller: Arc<dyn VoiceEnroller>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    inputs: InputStore,
    log: ResultLog,
    records_dir: PathBuf,
    generated_dir: PathBuf,
}

impl Orchestrator {
    pub fn new(
        config: &Config,
        enroller: Arc<dyn VoiceEnroller>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
    ) -> Self {
        Self {
            enroller,
            synthesizer,
            inputs: InputStore::new(&config.paths.text_input),
            log: ResultLog::new(&config.paths.result_log),
            records_dir: config.paths.records_dir.clone(),
            generated_dir: config.paths.generated_dir.clone(),
        }
    }

    /// Wire the HTTP clients built from `config`.
    pub fn from_config(config: &Config) -> Result<Self, VoiceBatchError> {
        let enroller = VoiceEnrollmentClient::from_config(config)?;
        let synthesizer = SynthesisClient::from_config(config)?;
        tracing::info!(
            "Synthesis strategy: {:?}, format: {}",
            synthesizer.strategy(),
            config.synthesis.effective_format()
        );
        Ok(Self::new(config, Arc::new(enroller), Arc::new(synthesizer)))
    }

    /// Create the working directories and tables that are missing.
    pub fn bootstrap(&self) -> Result<(), VoiceBatchError> {
        for dir in [&self.records_dir, &self.generated_dir] {
            std::fs::create_dir_all(dir)?;
        }
        self.inputs.ensure_exists()?;
        self.log.ensure_exists()?;
        tracing::debug!(
            "Workspace ready: records={:?}, generated={:?}",
            self.records_dir,
            self.generated_dir
        );
        Ok(())
    }

    pub fn inputs(&self) -> &InputStore {
        &self.inputs
    }

    pub fn result_log(&self) -> &ResultLog {
        &self.log
    }

    /// Save each file under the records directory and queue it.
    ///
    /// A failed save adds a line to the report; the remaining files are
    /// still processed.
    pub async fn upload(&self, pending: &mut PendingFiles, files: Vec<IncomingFile>) -> StatusReport {
        let files: Vec<(String, Vec<u8>)> = files
            .into_iter()
            .filter_map(|f| sanitize_file_name(&f.file_name).map(|name| (name, f.bytes)))
            .collect();
        if files.is_empty() {
            tracing::info!("{}", NO_FILES_SELECTED);
            return StatusReport::single(NO_FILES_SELECTED);
        }

        let mut state = if pending.is_empty() {
            BatchState::Idle
        } else {
            BatchState::FilesUploaded
        };
        let mut report = StatusReport::new();
        if let Err(e) = tokio::fs::create_dir_all(&self.records_dir).await {
            tracing::error!("Cannot create records folder {:?}: {}", self.records_dir, e);
        }

        for (name, bytes) in files {
            let path = self.records_dir.join(&name);
            match tokio::fs::write(&path, &bytes).await {
                Ok(()) => {
                    tracing::info!("Saved audio file: {:?} ({} bytes)", path, bytes.len());
                    pending.push(UploadedSample::new(path));
                }
                Err(e) => {
                    let err = VoiceBatchError::from(e);
                    tracing::error!("[{}] Error saving file {}: {}", err.code(), name, err);
                    report.push(format!("Failed to save {}: {}", name, err));
                }
            }
        }

        if state == BatchState::Idle && !pending.is_empty() {
            advance(&mut state, BatchState::FilesUploaded);
        }
        if report.is_empty() {
            report.push(UPLOAD_OK);
        }
        report
    }

    /// Enroll every pending sample, then synthesize each text for each voice.
    ///
    /// An out-of-range rate is rejected up front and leaves the queue as it
    /// was; otherwise the pending queue is always empty afterwards.
    pub async fn generate(&self, pending: &mut PendingFiles, options: GenerateOptions) -> StatusReport {
        let rate = match RatePercent::new(options.rate_percent) {
            Ok(rate) => rate,
            Err(e) => {
                let err = VoiceBatchError::from(e);
                tracing::warn!("[{}] Rejected generate request: {}", err.code(), err);
                return StatusReport::single(format!("Cannot generate: {}", err));
            }
        };
        if pending.is_empty() {
            tracing::info!("{}", NOTHING_PENDING);
            return StatusReport::single(NOTHING_PENDING);
        }

        let mut state = BatchState::FilesUploaded;
        let samples = pending.take();
        let mut report = StatusReport::new();

        tracing::info!(
            "Generating for {} file(s): emotion={}, rate={}",
            samples.len(),
            Emotion::tag(options.emotion),
            options.rate_percent
        );

        advance(&mut state, BatchState::Enrolling);
        let voices = self.enroll_all(&samples, &mut report).await;

        let texts = self.inputs.load();
        if texts.is_empty() {
            let message = format!(
                "No text inputs found in {}. Please add text data.",
                self.inputs.path().display()
            );
            tracing::warn!("{}", message);
            report.push(message);
            advance(&mut state, BatchState::Done);
            return report;
        }
        if voices.is_empty() {
            tracing::warn!("{}", NO_VOICES);
            report.push(NO_VOICES);
            advance(&mut state, BatchState::Done);
            return report;
        }

        advance(&mut state, BatchState::Generating);
        let format = self.synthesizer.format();

        for (owner_id, voice_id) in &voices {
            let owner_dir = self.generated_dir.join(owner_id);
            if let Err(e) = tokio::fs::create_dir_all(&owner_dir).await {
                let err = VoiceBatchError::from(e);
                tracing::error!("[{}] Cannot create {:?}: {}", err.code(), owner_dir, err);
                report.push(format!("Failed to create output folder for {}: {}", owner_id, err));
                continue;
            }

            for record in &texts {
                let clip_name = clip_file_name(&record.output_name, options.emotion, rate, format);
                tracing::info!(
                    "Generating {} ({}) for {}: {:?}",
                    clip_name,
                    record.label(),
                    owner_id,
                    record.text
                );
                match self
                    .write_clip(&owner_dir.join(&clip_name), &record.text, voice_id, options.emotion, rate)
                    .await
                {
                    Ok(()) => report.push(format!("Generated {} for {}", clip_name, owner_id)),
                    Err(err) => {
                        tracing::warn!(
                            "[{}] Failed to generate {} for {}: {}",
                            err.code(),
                            record.output_name,
                            owner_id,
                            err
                        );
                        report.push(format!(
                            "Failed to generate {} for {}: {}",
                            record.output_name, owner_id, err
                        ));
                    }
                }
            }
        }

        advance(&mut state, BatchState::Done);
        report
    }

    /// Enroll each sample; successful owners are logged and returned in order.
    ///
    /// An owner whose log row cannot be written is dropped from the batch.
    async fn enroll_all(
        &self,
        samples: &[UploadedSample],
        report: &mut StatusReport,
    ) -> Vec<(String, String)> {
        let mut voices: Vec<(String, String)> = Vec::new();

        for sample in samples {
            tracing::info!(
                "Processing file: {:?}, owner: {}",
                sample.file_path,
                sample.owner_id
            );
            let voice_id = match self.enroller.enroll(&sample.owner_id, sample.path()).await {
                Ok(id) => id,
                Err(e) => {
                    if let Some(hint) = e.hint() {
                        tracing::error!("Enrollment for {} unreachable: {}", sample.owner_id, hint);
                    }
                    let err = VoiceBatchError::from(e);
                    tracing::warn!(
                        "[{}] Failed to get voice ID for {}: {}",
                        err.code(),
                        sample.owner_id,
                        err
                    );
                    report.push(format!(
                        "Failed to get voice ID for {}: {}",
                        sample.owner_id, err
                    ));
                    continue;
                }
            };

            let identity = VoiceIdentity::now(&sample.owner_id, &voice_id);
            if let Err(e) = self.log.append(&identity) {
                let err = VoiceBatchError::from(e);
                tracing::error!(
                    "[{}] Error saving user data for {}: {}",
                    err.code(),
                    sample.owner_id,
                    err
                );
                report.push(format!(
                    "Failed to record voice ID for {}: {}",
                    sample.owner_id, err
                ));
                continue;
            }

            // A later upload of the same owner replaces the earlier voice.
            match voices.iter_mut().find(|(owner, _)| *owner == sample.owner_id) {
                Some(entry) => entry.1 = voice_id,
                None => voices.push((sample.owner_id.clone(), voice_id)),
            }
        }

        voices
    }

    async fn write_clip(
        &self,
        path: &Path,
        text: &str,
        voice_id: &str,
        emotion: Option<Emotion>,
        rate: RatePercent,
    ) -> Result<(), VoiceBatchError> {
        let audio = self
            .synthesizer
            .synthesize(text, voice_id, emotion, rate.value())
            .await?;
        tokio::fs::write(path, &audio.bytes).await?;
        tracing::debug!("Wrote {} bytes to {:?}", audio.bytes.len(), path);
        Ok(())
    }
}
