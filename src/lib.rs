//! voicebatch - batch voice cloning and narration
//!
//! Upload voice samples, clone each one through a hosted text-to-speech
//! service, then narrate every row of a text table in every cloned voice.
//!
//! ## Features
//!
//! - **Voice enrollment:** multipart upload with a local size cap and retry/backoff
//! - **Synthesis:** emotion tags plus a speaking rate applied natively or by local resampling
//! - **Tables:** CSV input table and an append-only enrollment log
//! - **Web page:** per-session upload queue with upload/generate actions
//!
//! ## Quick Start
//!
//! ```bash
//! # Serve the page on http://127.0.0.1:5000
//! voicebatch
//!
//! # One-shot batch without the page
//! voicebatch run alice.wav john.v2.wav --emotion cheerful --rate -20
//!
//! # List enrolled voices
//! voicebatch voices
//! ```

pub mod batch;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod speech;
pub mod store;
pub mod utils;
pub mod web;

// Re-export commonly used types
pub use error::{ErrorCode, VoiceBatchError};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const AUTHORS: &str = env!("CARGO_PKG_AUTHORS");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
