use super::output::{AudioOutput, Track};
use crate::{Error, Result};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// Fetches generated audio and keeps it looping until something else
/// replaces it.
pub struct AudioPlayer {
    client: reqwest::Client,
    download_timeout: Duration,
    output: Box<dyn AudioOutput>,
    now_playing: Mutex<Option<String>>,
}

impl AudioPlayer {
    pub fn new(output: Box<dyn AudioOutput>) -> Self {
        Self::with_client(reqwest::Client::new(), output)
    }

    pub fn with_client(client: reqwest::Client, output: Box<dyn AudioOutput>) -> Self {
        Self {
            client,
            download_timeout: DEFAULT_DOWNLOAD_TIMEOUT,
            output,
            now_playing: Mutex::new(None),
        }
    }

    pub fn with_download_timeout(mut self, timeout: Duration) -> Self {
        self.download_timeout = timeout;
        self
    }

    pub async fn play_url(&self, url: &Url) -> Result<()> {
        debug!("Fetching audio from {}", url);

        let response = self
            .client
            .get(url.clone())
            .timeout(self.download_timeout)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                body,
            });
        }
        let bytes = response.bytes().await?;

        info!("Starting looped playback of {} ({} bytes)", url, bytes.len());
        self.output.play_looped(Track {
            url: url.to_string(),
            bytes: bytes.to_vec(),
        })?;

        *self.lock_now_playing()? = Some(url.to_string());
        Ok(())
    }

    pub fn stop(&self) -> Result<()> {
        self.output.stop()?;
        *self.lock_now_playing()? = None;
        Ok(())
    }

    pub fn now_playing(&self) -> Option<String> {
        self.lock_now_playing().ok().and_then(|current| current.clone())
    }

    fn lock_now_playing(&self) -> Result<std::sync::MutexGuard<'_, Option<String>>> {
        self.now_playing
            .lock()
            .map_err(|e| Error::internal(format!("Mutex lock failed: {e}")))
    }
}
