use crate::{Error, Result, config::ArtConfig};
use image::ImageFormat;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Decorative image fetched once at startup.
#[derive(Debug, Clone)]
pub struct AlbumArt {
    pub source_url: String,
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
    pub bytes: Vec<u8>,
    pub saved_to: Option<PathBuf>,
}

pub struct ArtLoader {
    client: reqwest::Client,
    config: ArtConfig,
}

impl ArtLoader {
    pub fn new(config: ArtConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Fetches the art, yielding `None` on any failure. Never retries.
    pub async fn load(&self) -> Option<AlbumArt> {
        if !self.config.enabled {
            debug!("Album art disabled");
            return None;
        }

        match self.fetch().await {
            Ok(art) => {
                info!(
                    "Loaded album art {}x{} ({:?}) from {}",
                    art.width, art.height, art.format, art.source_url
                );
                Some(art)
            }
            Err(e) => {
                warn!("Failed to load album art from {}: {}", self.config.url, e);
                None
            }
        }
    }

    pub async fn fetch(&self) -> Result<AlbumArt> {
        let response = self.client.get(&self.config.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Api {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        // Redirecting endpoints report the final image location.
        let source_url = response.url().to_string();
        let bytes = response.bytes().await?.to_vec();

        let format = image::guess_format(&bytes)?;
        let decoded = image::load_from_memory_with_format(&bytes, format)?;

        let saved_to = match &self.config.save_path {
            Some(path) => {
                let path = PathBuf::from(path);
                tokio::fs::write(&path, &bytes).await?;
                Some(path)
            }
            None => None,
        };

        Ok(AlbumArt {
            source_url,
            width: decoded.width(),
            height: decoded.height(),
            format,
            bytes,
            saved_to,
        })
    }
}
