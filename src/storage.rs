use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use sha2::{Digest, Sha256};

use crate::configuration::StorageSettings;

pub const MAX_AVATAR_BYTES: usize = 2 * 1024 * 1024;

#[async_trait]
pub trait AssetStorage: Send + Sync {
    /// Stores `bytes` under `key` and returns the public URL.
    async fn put(&self, key: &str, content_type: &str, bytes: Vec<u8>) -> anyhow::Result<String>;
}

/// Uploads with `PUT {base_url}/{key}`; the same URL serves the asset.
pub struct HttpAssetStorage {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpAssetStorage {
    pub fn new(base_url: String, token: Option<String>) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("failed to build storage http client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }
}

#[async_trait]
impl AssetStorage for HttpAssetStorage {
    async fn put(&self, key: &str, content_type: &str, bytes: Vec<u8>) -> anyhow::Result<String> {
        let url = format!("{}/{}", self.base_url, key);

        let mut request = self
            .client
            .put(&url)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        request
            .send()
            .await
            .context("asset storage request failed")?
            .error_for_status()
            .context("asset storage rejected the upload")?;

        Ok(url)
    }
}

pub struct DisabledStorage;

#[async_trait]
impl AssetStorage for DisabledStorage {
    async fn put(&self, _key: &str, _content_type: &str, _bytes: Vec<u8>) -> anyhow::Result<String> {
        Err(anyhow!("asset storage is not configured"))
    }
}

pub fn build_storage(settings: &StorageSettings) -> anyhow::Result<Arc<dyn AssetStorage>> {
    match &settings.base_url {
        Some(url) => Ok(Arc::new(HttpAssetStorage::new(url.clone(), settings.token.clone())?)),
        None => Ok(Arc::new(DisabledStorage)),
    }
}

/// Content-addressed key, so re-uploading the same image reuses one object.
pub fn avatar_key(bytes: &[u8], content_type: &str) -> String {
    let digest = hex::encode(Sha256::digest(bytes));
    let extension = match content_type {
        "image/png" => "png",
        "image/jpeg" | "image/jpg" => "jpg",
        "image/gif" => "gif",
        "image/webp" => "webp",
        _ => "img",
    };
    format!("avatars/{digest}.{extension}")
}
