use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, header};
use tokio::io::AsyncWriteExt;
use url::Url;

use crate::application::services::media::{MediaFetcher, MediaProbe};

const USER_AGENT: &str = "whatsapi-media/0.1";

pub struct HttpMediaFetcher {
    http: Client,
}

impl HttpMediaFetcher {
    pub fn new(timeout: Duration) -> anyhow::Result<Arc<dyn MediaFetcher>> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .context("failed to build media http client")?;
        Ok(Arc::new(Self { http }) as Arc<dyn MediaFetcher>)
    }
}

#[async_trait]
impl MediaFetcher for HttpMediaFetcher {
    async fn probe(&self, url: &Url) -> anyhow::Result<MediaProbe> {
        let response = self
            .http
            .head(url.clone())
            .send()
            .await?
            .error_for_status()?;

        let headers = response.headers();
        let content_length = headers
            .get(header::CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<u64>().ok());
        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        Ok(MediaProbe {
            content_length,
            content_type,
        })
    }

    async fn download(&self, url: &Url, dest: &Path, budget: u64) -> anyhow::Result<u64> {
        let mut response = self
            .http
            .get(url.clone())
            .send()
            .await?
            .error_for_status()?;

        let mut file = tokio::fs::File::create(dest)
            .await
            .with_context(|| format!("failed to create {}", dest.display()))?;
        let mut received: u64 = 0;
        while let Some(chunk) = response.chunk().await? {
            received += chunk.len() as u64;
            if received >= budget {
                break;
            }
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        Ok(received)
    }

    async fn fetch(&self, url: &Url) -> anyhow::Result<Vec<u8>> {
        let response = self
            .http
            .get(url.clone())
            .send()
            .await?
            .error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }
}
