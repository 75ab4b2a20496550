use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use sha2::{Digest, Sha256};
use tokio::io::AsyncReadExt;

use crate::application::services::media::ContentHasher;

const READ_CHUNK: usize = 64 * 1024;

#[derive(Debug, Default)]
pub struct Sha256Hasher;

impl Sha256Hasher {
    pub fn new() -> Arc<dyn ContentHasher> {
        Arc::new(Self) as Arc<dyn ContentHasher>
    }
}

#[async_trait]
impl ContentHasher for Sha256Hasher {
    async fn hash_file(&self, path: &Path) -> anyhow::Result<String> {
        let mut file = tokio::fs::File::open(path)
            .await
            .with_context(|| format!("failed to open {} for hashing", path.display()))?;
        let mut hasher = Sha256::new();
        let mut buffer = vec![0u8; READ_CHUNK];
        loop {
            let read = file.read(&mut buffer).await?;
            if read == 0 {
                break;
            }
            hasher.update(&buffer[..read]);
        }
        Ok(STANDARD.encode(hasher.finalize()))
    }
}
