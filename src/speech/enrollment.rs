//! Voice Enrollment Client
//!
//! Uploads a voice sample to the cloning endpoint and returns the voice id
//! issued by the service. This is the only remote call that retries.

use super::VoiceEnroller;
use super::error::SpeechError;
use crate::config::{Config, SecretString};
use crate::utils::{RetryConfig, retry, truncate_str};
use async_trait::async_trait;
use reqwest::Client;
use std::path::Path;
use std::time::Duration;

const VOICES_PATH: &str = "/v1/voices";
const MAX_LOGGED_BODY: usize = 500;

/// Client for the voice cloning endpoint.
#[derive(Clone)]
pub struct VoiceEnrollmentClient {
    client: Client,
    api_key: SecretString,
    url: String,
    max_sample_bytes: u64,
    consent: String,
    retry: RetryConfig,
}

impl VoiceEnrollmentClient {
    pub fn from_config(config: &Config) -> Result<Self, SpeechError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.enrollment.timeout_secs))
            .build()
            .map_err(SpeechError::from_transport)?;

        let consent = serde_json::json!({
            "fullName": config.enrollment.consent_name,
            "email": config.enrollment.consent_email,
        })
        .to_string();

        Ok(Self {
            client,
            api_key: config.api.api_key.clone(),
            url: format!("{}{}", config.api.base_url.trim_end_matches('/'), VOICES_PATH),
            max_sample_bytes: config.enrollment.max_sample_bytes,
            consent,
            retry: config.enrollment.retry.clone(),
        })
    }

    /// Validate the sample locally, then upload it.
    pub async fn enroll(&self, name: &str, audio_path: &Path) -> Result<String, SpeechError> {
        let display = audio_path.display().to_string();

        let metadata = match tokio::fs::metadata(audio_path).await {
            Ok(m) if m.is_file() => m,
            Ok(_) => return Err(SpeechError::SampleMissing(display)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SpeechError::SampleMissing(display));
            }
            Err(e) => return Err(e.into()),
        };
        if metadata.len() > self.max_sample_bytes {
            return Err(SpeechError::SampleTooLarge {
                path: display,
                size: metadata.len(),
                limit: self.max_sample_bytes,
            });
        }
        if self.api_key.is_empty() {
            return Err(SpeechError::MissingApiKey);
        }

        let sample = tokio::fs::read(audio_path).await?;
        let file_name = audio_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "sample".to_string());
        let mime = mime_for(audio_path);

        tracing::info!("Sending voice cloning request for {} to {}", name, self.url);

        let body = retry(&self.retry, "voice enrollment", || {
            self.send_once(name, &sample, &file_name, mime)
        })
        .await?;

        let voice_id = body
            .get("id")
            .and_then(|v| v.as_str())
            .filter(|id| !id.is_empty())
            .ok_or(SpeechError::MissingField("id"))?
            .to_string();

        tracing::info!("Received voice id for {}: {}", name, voice_id);
        Ok(voice_id)
    }

    async fn send_once(
        &self,
        name: &str,
        sample: &[u8],
        file_name: &str,
        mime: &str,
    ) -> Result<serde_json::Value, SpeechError> {
        let part = reqwest::multipart::Part::bytes(sample.to_vec())
            .file_name(file_name.to_string())
            .mime_str(mime)
            .map_err(SpeechError::from_transport)?;

        let form = reqwest::multipart::Form::new()
            .part("sample", part)
            .text("name", name.to_string())
            .text("consent", self.consent.clone());

        let response = self
            .client
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", self.api_key.expose()))
            .header("Accept", "application/json")
            .multipart(form)
            .send()
            .await
            .map_err(SpeechError::from_transport)?;

        let status = response.status();
        let text = response.text().await.map_err(SpeechError::from_transport)?;

        if !status.is_success() {
            tracing::warn!(
                "Voice cloning for {} failed: HTTP {} - {}",
                name,
                status.as_u16(),
                truncate_str(&text, MAX_LOGGED_BODY)
            );
            return Err(SpeechError::Api {
                status: status.as_u16(),
                body: truncate_str(&text, MAX_LOGGED_BODY).to_string(),
            });
        }

        serde_json::from_str(&text).map_err(|e| SpeechError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl VoiceEnroller for VoiceEnrollmentClient {
    async fn enroll(&self, name: &str, audio_path: &Path) -> Result<String, SpeechError> {
        VoiceEnrollmentClient::enroll(self, name, audio_path).await
    }
}

fn mime_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("wav") => "audio/wav",
        Some("mp3") => "audio/mpeg",
        Some("m4a") | Some("mp4") => "audio/mp4",
        Some("ogg") | Some("oga") => "audio/ogg",
        Some("webm") => "audio/webm",
        Some("flac") => "audio/flac",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn test_config(base_url: &str) -> Config {
        let mut config = Config::default();
        config.api.api_key = SecretString::new("test-key");
        config.api.base_url = base_url.to_string();
        config.enrollment.retry.initial_backoff_ms = 1;
        config
    }

    fn write_sample(dir: &TempDir, name: &str, size: usize) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, vec![7u8; size]).unwrap();
        path
    }

    #[tokio::test]
    async fn test_enroll_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/voices")
            .match_header("Authorization", "Bearer test-key")
            .match_header("Accept", "application/json")
            .match_body(mockito::Matcher::AllOf(vec![
                mockito::Matcher::Regex(r#"name="sample"; filename="alice.wav""#.to_string()),
                mockito::Matcher::Regex(r#"name="name""#.to_string()),
                mockito::Matcher::Regex(r#"\{"email":"user@example.com","fullName":"User"\}"#.to_string()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id": "V123", "display_name": "alice"}"#)
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let path = write_sample(&dir, "alice.wav", 1024);
        let client = VoiceEnrollmentClient::from_config(&test_config(&server.url())).unwrap();

        let voice_id = client.enroll("alice", &path).await.unwrap();

        mock.assert_async().await;
        assert_eq!(voice_id, "V123");
    }

    #[tokio::test]
    async fn test_oversized_sample_never_hits_network() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/voices")
            .expect(0)
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let mut config = test_config(&server.url());
        config.enrollment.max_sample_bytes = 100;
        let path = write_sample(&dir, "big.wav", 101);
        let client = VoiceEnrollmentClient::from_config(&config).unwrap();

        let err = client.enroll("big", &path).await.unwrap_err();

        mock.assert_async().await;
        assert!(matches!(err, SpeechError::SampleTooLarge { size: 101, limit: 100, .. }));
    }

    #[tokio::test]
    async fn test_missing_sample() {
        let client = VoiceEnrollmentClient::from_config(&test_config("http://127.0.0.1:9")).unwrap();
        let err = client
            .enroll("ghost", Path::new("/no/such/ghost.wav"))
            .await
            .unwrap_err();
        assert!(matches!(err, SpeechError::SampleMissing(_)));
    }

    #[tokio::test]
    async fn test_server_error_retries_until_budget_exhausted() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/voices")
            .with_status(500)
            .with_body("Internal Server Error")
            .expect(4)
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let path = write_sample(&dir, "bob.wav", 64);
        let client = VoiceEnrollmentClient::from_config(&test_config(&server.url())).unwrap();

        let err = client.enroll("bob", &path).await.unwrap_err();

        mock.assert_async().await;
        assert!(matches!(err, SpeechError::Api { status: 500, .. }), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/voices")
            .with_status(401)
            .with_body(r#"{"error": "invalid key"}"#)
            .expect(1)
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let path = write_sample(&dir, "carol.mp3", 64);
        let client = VoiceEnrollmentClient::from_config(&test_config(&server.url())).unwrap();

        let err = client.enroll("carol", &path).await.unwrap_err();

        mock.assert_async().await;
        assert!(err.to_string().contains("401"));
    }

    #[tokio::test]
    async fn test_success_without_id_is_failure() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/voices")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"status": "ok"}"#)
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let path = write_sample(&dir, "dave.wav", 64);
        let client = VoiceEnrollmentClient::from_config(&test_config(&server.url())).unwrap();

        let err = client.enroll("dave", &path).await.unwrap_err();

        mock.assert_async().await;
        assert!(matches!(err, SpeechError::MissingField("id")));
    }

    #[tokio::test]
    async fn test_missing_api_key_rejected_locally() {
        let dir = TempDir::new().unwrap();
        let path = write_sample(&dir, "erin.wav", 64);
        let mut config = test_config("http://127.0.0.1:9");
        config.api.api_key = SecretString::default();
        let client = VoiceEnrollmentClient::from_config(&config).unwrap();

        let err = client.enroll("erin", &path).await.unwrap_err();
        assert!(matches!(err, SpeechError::MissingApiKey));
    }

    #[tokio::test]
    async fn test_timeout_is_classified_and_not_retried() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let accepted = Arc::new(AtomicUsize::new(0));
        let counter = accepted.clone();
        tokio::spawn(async move {
            // Hold every connection open without answering.
            let mut held = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                held.push(stream);
            }
        });

        let dir = TempDir::new().unwrap();
        let path = write_sample(&dir, "frank.wav", 64);
        let mut config = test_config(&format!("http://{}", addr));
        config.enrollment.timeout_secs = 1;
        let client = VoiceEnrollmentClient::from_config(&config).unwrap();

        let err = client.enroll("frank", &path).await.unwrap_err();

        assert!(matches!(err, SpeechError::Timeout(_)), "got {:?}", err);
        assert_eq!(accepted.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_refused_connection_is_classified_as_connect() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let dir = TempDir::new().unwrap();
        let path = write_sample(&dir, "gina.wav", 64);
        let client =
            VoiceEnrollmentClient::from_config(&test_config(&format!("http://{}", addr))).unwrap();

        let err = client.enroll("gina", &path).await.unwrap_err();

        assert!(matches!(err, SpeechError::Connect(_)), "got {:?}", err);
        assert!(err.hint().is_some());
    }

    #[test]
    fn test_mime_for() {
        assert_eq!(mime_for(Path::new("a.WAV")), "audio/wav");
        assert_eq!(mime_for(Path::new("john.v2.mp3")), "audio/mpeg");
        assert_eq!(mime_for(Path::new("noext")), "application/octet-stream");
    }
}
