//! CLI subcommands: serve, run, init, config, voices, keyring, logs, and config loading.

use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::batch::{GenerateOptions, IncomingFile, Orchestrator, PendingFiles, StatusReport};
use crate::config::{Config, KeyringStore};
use crate::logging;
use crate::speech::Emotion;
use crate::store::{ResultLog, TIMESTAMP_FORMAT};

use super::{KeyringCommands, LogCommands};

/// Load configuration from file or defaults
pub fn load_config(config_path: Option<&str>) -> Result<Config> {
    let config = if let Some(path) = config_path {
        tracing::info!("Loading configuration from custom path: {}", path);
        Config::load_from_path(path)?
    } else {
        tracing::debug!("Loading default configuration");
        Config::load()?
    };

    config.validate()?;

    Ok(config)
}

pub(crate) async fn cmd_serve(
    mut config: Config,
    bind: Option<String>,
    port: Option<u16>,
) -> Result<()> {
    if let Some(bind) = bind {
        config.server.bind = bind;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    println!(
        "voicebatch serving on http://{}:{}",
        config.server.bind, config.server.port
    );
    println!("Press Ctrl-C to stop.");
    crate::web::serve(&config).await
}

/// Upload the given files and generate once, printing the status report.
pub(crate) async fn cmd_run(
    config: &Config,
    files: Vec<PathBuf>,
    emotion: &str,
    rate: i32,
) -> Result<()> {
    let emotion = Emotion::parse_optional(emotion)?;
    let orchestrator = Orchestrator::from_config(config)?;
    orchestrator
        .bootstrap()
        .context("Failed to prepare working directories")?;

    let (incoming, unreadable) = read_samples(&files);
    if !unreadable.is_empty() {
        println!("{}", unreadable);
    }

    let mut pending = PendingFiles::new();
    let uploaded = orchestrator.upload(&mut pending, incoming).await;
    println!("{}", uploaded);

    let report = orchestrator
        .generate(
            &mut pending,
            GenerateOptions {
                emotion,
                rate_percent: rate,
            },
        )
        .await;
    println!("{}", report);

    Ok(())
}

/// Read each sample from disk; unreadable ones become report lines.
fn read_samples(files: &[PathBuf]) -> (Vec<IncomingFile>, StatusReport) {
    let mut incoming = Vec::with_capacity(files.len());
    let mut report = StatusReport::new();
    for path in files {
        match std::fs::read(path) {
            Ok(bytes) => {
                let file_name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                incoming.push(IncomingFile { file_name, bytes });
            }
            Err(e) => {
                tracing::warn!("Failed to read sample {}: {}", path.display(), e);
                report.push(format!("Failed to read {}: {}", path.display(), e));
            }
        }
    }
    (incoming, report)
}

/// Initialize configuration file
pub(crate) fn cmd_init(force: bool) -> Result<()> {
    println!("voicebatch configuration initialization\n");

    let config_path =
        Config::system_config_path().context("Could not determine config directory")?;

    if config_path.exists() && !force {
        anyhow::bail!(
            "Configuration file already exists at: {}\nUse --force to overwrite",
            config_path.display()
        );
    }

    Config::default().save(&config_path)?;

    println!("Configuration initialized at: {}", config_path.display());
    println!("\nNext steps:");
    println!("   1. Set SPEECHIFY_API_KEY or run 'voicebatch keyring set <key>'");
    println!("   2. Add rows to {}", Config::default().paths.text_input.display());
    println!("   3. Run 'voicebatch' and open the page in a browser");

    Ok(())
}

/// Show configuration
pub(crate) fn cmd_config(config: &Config, show_secrets: bool) -> Result<()> {
    println!("voicebatch configuration\n");

    if show_secrets {
        println!("{:#?}", config);
        println!("API key: {}", config.api.api_key.expose());
        return Ok(());
    }

    println!("API base URL: {}", config.api.base_url);
    println!(
        "API key: {}",
        if config.has_api_key() { "[SET]" } else { "[NOT SET]" }
    );
    println!("\nPaths:");
    println!("  records:   {}", config.paths.records_dir.display());
    println!("  generated: {}", config.paths.generated_dir.display());
    println!("  texts:     {}", config.paths.text_input.display());
    println!("  log:       {}", config.paths.result_log.display());
    println!("\nSynthesis:");
    println!("  rate strategy: {:?}", config.synthesis.rate_strategy);
    println!("  audio format:  {}", config.synthesis.effective_format());
    println!("\nEnrollment:");
    println!("  max sample:    {} bytes", config.enrollment.max_sample_bytes);
    println!("  timeout:       {}s", config.enrollment.timeout_secs);
    println!("  retries:       {}", config.enrollment.retry.max_retries);
    println!("\nServer: {}:{}", config.server.bind, config.server.port);
    println!("Log level: {}", config.logging.level);
    println!("\nUse --show-secrets to display the API key");

    Ok(())
}

/// Print every enrolled voice, oldest first.
pub(crate) fn cmd_voices(config: &Config) -> Result<()> {
    let log = ResultLog::new(&config.paths.result_log);
    let rows = log
        .read_all()
        .with_context(|| format!("Failed to read {}", log.path().display()))?;

    if rows.is_empty() {
        println!("No voices enrolled yet ({}).", log.path().display());
        return Ok(());
    }

    println!("{:<24} {:<40} Enrolled", "Owner", "Voice ID");
    for row in &rows {
        println!(
            "{:<24} {:<40} {}",
            row.owner_id,
            row.voice_id,
            row.enrolled_at.format(TIMESTAMP_FORMAT)
        );
    }
    println!("\n{} voice(s)", rows.len());
    Ok(())
}

pub(crate) fn cmd_keyring(operation: KeyringCommands) -> Result<()> {
    match operation {
        KeyringCommands::Set { api_key } => {
            KeyringStore::store(&api_key).context("Failed to save API key to keyring")?;
            println!("Saved API key to OS keyring");
            Ok(())
        }

        KeyringCommands::Get => {
            match KeyringStore::load() {
                Some(secret) => println!("API key in OS keyring: {}", mask(secret.expose())),
                None => {
                    println!("No API key found in OS keyring");
                    println!("\nTo store one, use:");
                    println!("   voicebatch keyring set YOUR_API_KEY");
                }
            }
            Ok(())
        }

        KeyringCommands::Delete => {
            KeyringStore::delete().context("Failed to delete API key from keyring")?;
            println!("Deleted API key from OS keyring");
            Ok(())
        }
    }
}

/// Log management commands
pub(crate) fn cmd_logs(operation: LogCommands) -> Result<()> {
    let log_dir = std::env::var("DEBUG_LOGS_LOCATION")
        .map(PathBuf::from)
        .unwrap_or_else(|_| logging::default_log_dir());

    match operation {
        LogCommands::Status => {
            println!("Log directory: {}", log_dir.display());
            let files = logging::list_log_files(&log_dir)?;

            if files.is_empty() {
                println!("Status: no logs found");
            } else {
                let total_size: u64 = files
                    .iter()
                    .filter_map(|p| std::fs::metadata(p).ok())
                    .map(|m| m.len())
                    .sum();
                println!("Log files: {}", files.len());
                println!("Total size: {:.2} MB", total_size as f64 / (1024.0 * 1024.0));
                println!("Latest log: {}", files[0].display());
            }

            println!("\nTo enable file logging, run with -d:");
            println!("   voicebatch -d");
            Ok(())
        }

        LogCommands::Clean { days } => {
            println!("Cleaning up log files older than {} days...", days);
            let removed = logging::cleanup_logs_in(&log_dir, days)?;
            if removed > 0 {
                println!("Removed {} old log file(s)", removed);
            } else {
                println!("No old log files to remove");
            }
            Ok(())
        }
    }
}

/// `abcd...wxyz` for long keys, `****` otherwise.
fn mask(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}
