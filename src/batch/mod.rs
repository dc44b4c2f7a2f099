//! Batch Module
//!
//! Drives one upload/generate cycle: the per-session pending queue, the
//! orchestrator that enrolls and synthesizes, clip naming, and the
//! accumulated status report shown to the user.

mod naming;
mod orchestrator;
mod pending;
mod report;

pub use naming::{clip_file_name, owner_id_from_file_name, sanitize_file_name};
pub use orchestrator::{BatchState, GenerateOptions, IncomingFile, Orchestrator};
pub use pending::{PendingFiles, UploadedSample};
pub use report::StatusReport;
