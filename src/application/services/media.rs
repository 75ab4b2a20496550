use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info};
use url::Url;
use uuid::Uuid;

use crate::domain::{
    errors::{DispatchError, DispatchResult},
    models::{
        InboundMediaType, LinkedMedia, MediaDescriptor, MediaKind, MediaMessage, PendingMessage,
        ProtocolNode,
    },
};

const SCRATCH_DIR: &str = "tmp";

/// Headers learned from a body-less probe of a remote source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaProbe {
    pub content_length: Option<u64>,
    pub content_type: Option<String>,
}

#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Learns size and type without transferring the body.
    async fn probe(&self, url: &Url) -> anyhow::Result<MediaProbe>;
    /// Streams the body into `dest`, stopping once `budget` bytes are reached.
    /// Returns the number of bytes received.
    async fn download(&self, url: &Url, dest: &Path, budget: u64) -> anyhow::Result<u64>;
    async fn fetch(&self, url: &Url) -> anyhow::Result<Vec<u8>>;
}

#[async_trait]
pub trait ContentHasher: Send + Sync {
    /// Base64 digest of the whole file.
    async fn hash_file(&self, path: &Path) -> anyhow::Result<String>;
}

/// Turns file references into validated media descriptors and links inbound
/// media into local storage.
pub struct MediaResolver {
    storage_path: PathBuf,
    fetcher: Arc<dyn MediaFetcher>,
    hasher: Arc<dyn ContentHasher>,
}

impl MediaResolver {
    pub fn new(
        storage_path: impl Into<PathBuf>,
        fetcher: Arc<dyn MediaFetcher>,
        hasher: Arc<dyn ContentHasher>,
    ) -> Self {
        Self {
            storage_path: storage_path.into(),
            fetcher,
            hasher,
        }
    }

    pub fn storage_path(&self) -> &Path {
        &self.storage_path
    }

    /// Resolves `reference` and wraps it as an unsent media message.
    pub async fn compile(
        &self,
        reference: &str,
        kind: MediaKind,
        caption: Option<String>,
    ) -> DispatchResult<PendingMessage> {
        let descriptor = self.resolve(reference, kind).await?;
        let media = MediaMessage {
            source_ref: reference.to_string(),
            descriptor,
            caption,
            hash: None,
        };
        Ok(match kind {
            MediaKind::Image => PendingMessage::Image(media),
            MediaKind::Audio => PendingMessage::Audio(media),
            MediaKind::Video => PendingMessage::Video(media),
        })
    }

    /// Like [`MediaResolver::resolve`] for a kind given by name.
    pub async fn resolve_named(&self, reference: &str, kind: &str) -> DispatchResult<MediaDescriptor> {
        let kind = kind.parse::<MediaKind>()?;
        self.resolve(reference, kind).await
    }

    pub async fn resolve(&self, reference: &str, kind: MediaKind) -> DispatchResult<MediaDescriptor> {
        self.ensure_storage()?;

        if let Some(url) = remote_url(reference) {
            return self.resolve_remote(reference, url, kind).await;
        }

        let path = Path::new(reference);
        match tokio::fs::metadata(path).await {
            Ok(metadata) if metadata.is_file() => {
                let limit = kind.size_limit();
                if metadata.len() >= limit {
                    return Err(DispatchError::MediaTooLarge {
                        source_ref: reference.to_string(),
                        size: metadata.len(),
                        limit,
                    });
                }
                Ok(MediaDescriptor {
                    file: path.to_path_buf(),
                    filesize: metadata.len(),
                    mime_type: sniff_mime(path),
                    file_extension: extension_of(reference),
                    source_url: None,
                })
            }
            _ => Err(DispatchError::SourceNotFound(reference.to_string())),
        }
    }

    async fn resolve_remote(
        &self,
        reference: &str,
        url: Url,
        kind: MediaKind,
    ) -> DispatchResult<MediaDescriptor> {
        let unreachable = |err: anyhow::Error| {
            debug!(source = reference, error = %err, "media source unreachable");
            DispatchError::UnreachableSource(reference.to_string())
        };

        let probe = self.fetcher.probe(&url).await.map_err(unreachable)?;
        let limit = kind.size_limit();
        if let Some(size) = probe.content_length
            && size >= limit
        {
            return Err(DispatchError::MediaTooLarge {
                source_ref: reference.to_string(),
                size,
                limit,
            });
        }

        let extension = extension_of(url.path());
        let file = self.scratch_file(&extension).await?;
        let received = match self.fetcher.download(&url, &file, limit).await {
            Ok(received) => received,
            Err(err) => {
                let _ = tokio::fs::remove_file(&file).await;
                return Err(unreachable(err));
            }
        };

        if received >= limit {
            let _ = tokio::fs::remove_file(&file).await;
            return Err(DispatchError::MediaTooLarge {
                source_ref: reference.to_string(),
                size: received,
                limit,
            });
        }

        info!(source = reference, file = %file.display(), bytes = received, "downloaded remote media");
        Ok(MediaDescriptor {
            file,
            filesize: received,
            mime_type: probe.content_type,
            file_extension: extension,
            source_url: Some(reference.to_string()),
        })
    }

    /// Base64 SHA-256 of the descriptor's file content.
    pub async fn hash(&self, descriptor: &MediaDescriptor) -> DispatchResult<String> {
        self.hasher
            .hash_file(&descriptor.file)
            .await
            .map_err(|err| DispatchError::Io(io::Error::other(err)))
    }

    /// Materializes inbound media under the storage path and returns an
    /// inline-renderable reference to it.
    pub async fn linkify(&self, media: &ProtocolNode) -> DispatchResult<LinkedMedia> {
        let media_type = media
            .attribute("type")
            .unwrap_or_default()
            .parse::<InboundMediaType>()?;
        let mime = media.attribute("mimetype").unwrap_or_default();

        match media_type {
            InboundMediaType::Audio => {
                let file = self.store_remote(media, media_type).await?;
                let html = format!(
                    r#"<audio controls><source src="{}" type="{mime}"></audio>"#,
                    file.display()
                );
                Ok(LinkedMedia {
                    file,
                    html,
                    thumbnail: None,
                })
            }
            InboundMediaType::Image => {
                let file = self.store_remote(media, media_type).await?;
                let thumbnail = self.store_thumbnail(media).await?;
                let html = thumbnail_anchor(&file, &thumbnail);
                Ok(LinkedMedia {
                    file,
                    html,
                    thumbnail: Some(thumbnail),
                })
            }
            InboundMediaType::Video => {
                let file = self.store_remote(media, media_type).await?;
                let thumbnail = self.store_thumbnail(media).await?;
                let html = format!(
                    r#"<video width="220" height="140" controls><source src="{}" type="{mime}">{}</video>"#,
                    file.display(),
                    thumbnail_anchor(&file, &thumbnail)
                );
                Ok(LinkedMedia {
                    file,
                    html,
                    thumbnail: Some(thumbnail),
                })
            }
            InboundMediaType::Location => {
                let longitude = media.attribute("longitude").unwrap_or_default();
                let latitude = media.attribute("latitude").unwrap_or_default();
                let name: String = format!("{longitude}{latitude}")
                    .chars()
                    .filter(char::is_ascii_digit)
                    .collect();
                let file = self.media_path(media_type.folder(), &format!("{name}.jpg"));
                write_if_absent(&file, &media.data).await?;
                let html = format!(
                    r#"<a href="http://www.google.com/maps?q={latitude},{longitude}" target="_blank"><img src="{}"></a>"#,
                    file.display()
                );
                Ok(LinkedMedia {
                    file,
                    html,
                    thumbnail: None,
                })
            }
        }
    }

    async fn store_remote(
        &self,
        media: &ProtocolNode,
        media_type: InboundMediaType,
    ) -> DispatchResult<PathBuf> {
        let name = media
            .attribute("file")
            .and_then(safe_file_name)
            .ok_or_else(|| DispatchError::SourceNotFound("<inbound media without file>".to_string()))?;
        let file = self.media_path(media_type.folder(), &name);
        if tokio::fs::try_exists(&file).await? {
            return Ok(file);
        }

        let reference = media.attribute("url").unwrap_or_default();
        let url = remote_url(reference)
            .ok_or_else(|| DispatchError::SourceNotFound(reference.to_string()))?;
        let bytes = self
            .fetcher
            .fetch(&url)
            .await
            .map_err(|_| DispatchError::UnreachableSource(reference.to_string()))?;
        write_if_absent(&file, &bytes).await?;
        Ok(file)
    }

    async fn store_thumbnail(&self, media: &ProtocolNode) -> DispatchResult<PathBuf> {
        let name = media
            .attribute("file")
            .and_then(safe_file_name)
            .unwrap_or_default();
        let stem = Path::new(&name)
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file = self.media_path(
            InboundMediaType::Image.folder(),
            &format!("thumb_{stem}.jpg"),
        );
        write_if_absent(&file, &media.data).await?;
        Ok(file)
    }

    fn media_path(&self, folder: &str, name: &str) -> PathBuf {
        self.storage_path.join(folder).join(name)
    }

    fn ensure_storage(&self) -> DispatchResult<()> {
        if self.storage_path.is_dir() {
            Ok(())
        } else {
            Err(DispatchError::MediaPathUnavailable(
                self.storage_path.display().to_string(),
            ))
        }
    }

    async fn scratch_file(&self, extension: &str) -> DispatchResult<PathBuf> {
        let dir = self.storage_path.join(SCRATCH_DIR);
        tokio::fs::create_dir_all(&dir).await?;

        let token = Uuid::new_v4().simple().to_string();
        let mut name = format!("WHA-{}-{}", Utc::now().timestamp_micros(), &token[..6]);
        if !extension.is_empty() {
            name.push('.');
            name.push_str(extension);
        }
        Ok(dir.join(name))
    }
}

fn remote_url(reference: &str) -> Option<Url> {
    Url::parse(reference)
        .ok()
        .filter(|url| matches!(url.scheme(), "http" | "https") && url.host().is_some())
}

fn extension_of(path: &str) -> String {
    Path::new(path)
        .extension()
        .map(|ext| ext.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn sniff_mime(path: &Path) -> Option<String> {
    infer::get_from_path(path)
        .ok()
        .flatten()
        .map(|kind| kind.mime_type().to_string())
}

fn safe_file_name(name: &str) -> Option<String> {
    Path::new(name)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
}

fn thumbnail_anchor(file: &Path, thumbnail: &Path) -> String {
    format!(
        r#"<a href="{}" target="_blank"><img src="{}"></a>"#,
        file.display(),
        thumbnail.display()
    )
}

async fn write_if_absent(file: &Path, data: &[u8]) -> DispatchResult<()> {
    if tokio::fs::try_exists(file).await? {
        return Ok(());
    }
    if let Some(parent) = file.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(file, data).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::infrastructure::media::hasher::Sha256Hasher;

    #[derive(Default)]
    struct StubFetcher {
        fail_probe: bool,
        fail_download: bool,
        content_length: Option<u64>,
        body: Vec<u8>,
        probes: AtomicUsize,
        downloads: AtomicUsize,
        fetches: AtomicUsize,
    }

    #[async_trait]
    impl MediaFetcher for StubFetcher {
        async fn probe(&self, _url: &Url) -> anyhow::Result<MediaProbe> {
            self.probes.fetch_add(1, Ordering::SeqCst);
            if self.fail_probe {
                anyhow::bail!("connection refused");
            }
            Ok(MediaProbe {
                content_length: self.content_length,
                content_type: Some("image/jpeg".to_string()),
            })
        }

        async fn download(&self, _url: &Url, dest: &Path, budget: u64) -> anyhow::Result<u64> {
            self.downloads.fetch_add(1, Ordering::SeqCst);
            let take = self.body.len().min(budget as usize);
            tokio::fs::write(dest, &self.body[..take]).await?;
            if self.fail_download {
                anyhow::bail!("connection reset mid-body");
            }
            Ok(self.body.len() as u64)
        }

        async fn fetch(&self, _url: &Url) -> anyhow::Result<Vec<u8>> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(self.body.clone())
        }
    }

    fn resolver(storage: &Path, fetcher: Arc<StubFetcher>) -> MediaResolver {
        MediaResolver::new(storage, fetcher, Sha256Hasher::new())
    }

    fn sized_file(dir: &Path, name: &str, size: u64) -> String {
        let path = dir.join(name);
        std::fs::File::create(&path).unwrap().set_len(size).unwrap();
        path.display().to_string()
    }

    #[tokio::test]
    async fn local_file_limit_is_exclusive() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = resolver(dir.path(), Arc::new(StubFetcher::default()));
        let limit = MediaKind::Image.size_limit();

        let under = sized_file(dir.path(), "under.jpg", limit - 1);
        let descriptor = resolver.resolve(&under, MediaKind::Image).await.unwrap();
        assert_eq!(descriptor.filesize, limit - 1);
        assert_eq!(descriptor.file_extension, "jpg");
        assert_eq!(descriptor.file, PathBuf::from(&under));
        assert!(descriptor.source_url.is_none());

        let at = sized_file(dir.path(), "at.jpg", limit);
        assert!(matches!(
            resolver.resolve(&at, MediaKind::Image).await,
            Err(DispatchError::MediaTooLarge { size, .. }) if size == limit
        ));

        // same file is fine for a kind with a larger ceiling
        assert!(resolver.resolve(&at, MediaKind::Video).await.is_ok());
    }

    #[tokio::test]
    async fn missing_local_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = resolver(dir.path(), Arc::new(StubFetcher::default()));
        let missing = dir.path().join("nope.mp3").display().to_string();

        assert!(matches!(
            resolver.resolve(&missing, MediaKind::Audio).await,
            Err(DispatchError::SourceNotFound(_))
        ));
    }

    #[tokio::test]
    async fn unsupported_kind_name_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = resolver(dir.path(), Arc::new(StubFetcher::default()));

        assert!(matches!(
            resolver.resolve_named("/tmp/file.pdf", "document").await,
            Err(DispatchError::UnsupportedMediaKind(kind)) if kind == "document"
        ));
    }

    #[tokio::test]
    async fn missing_storage_path_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = resolver(&dir.path().join("media"), Arc::new(StubFetcher::default()));

        assert!(matches!(
            resolver.resolve("http://example.com/a.jpg", MediaKind::Image).await,
            Err(DispatchError::MediaPathUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn oversized_remote_media_is_never_downloaded() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(StubFetcher {
            content_length: Some(MediaKind::Image.size_limit() + 1),
            ..StubFetcher::default()
        });
        let resolver = resolver(dir.path(), fetcher.clone());

        let result = resolver
            .resolve("http://example.com/huge.jpg", MediaKind::Image)
            .await;

        assert!(matches!(result, Err(DispatchError::MediaTooLarge { .. })));
        assert_eq!(fetcher.probes.load(Ordering::SeqCst), 1);
        assert_eq!(fetcher.downloads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn remote_media_is_downloaded_to_scratch_file() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(StubFetcher {
            content_length: Some(4),
            body: b"jpeg".to_vec(),
            ..StubFetcher::default()
        });
        let resolver = resolver(dir.path(), fetcher.clone());

        let descriptor = resolver
            .resolve("https://example.com/pics/cat.jpg?size=small", MediaKind::Image)
            .await
            .unwrap();

        assert_eq!(descriptor.filesize, 4);
        assert_eq!(descriptor.file_extension, "jpg");
        assert_eq!(descriptor.mime_type.as_deref(), Some("image/jpeg"));
        assert_eq!(
            descriptor.source_url.as_deref(),
            Some("https://example.com/pics/cat.jpg?size=small")
        );
        assert_eq!(descriptor.file.parent(), Some(dir.path().join("tmp").as_path()));
        let name = descriptor.file.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("WHA-"));
        assert!(name.ends_with(".jpg"));
        assert_eq!(std::fs::read(&descriptor.file).unwrap(), b"jpeg");
        assert_eq!(fetcher.downloads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn undeclared_oversized_body_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(StubFetcher {
            content_length: None,
            body: vec![0u8; MediaKind::Image.size_limit() as usize],
            ..StubFetcher::default()
        });
        let resolver = resolver(dir.path(), fetcher);

        let result = resolver
            .resolve("http://example.com/liar.jpg", MediaKind::Image)
            .await;

        assert!(matches!(result, Err(DispatchError::MediaTooLarge { .. })));
        let leftovers = std::fs::read_dir(dir.path().join("tmp")).unwrap().count();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn interrupted_download_leaves_no_scratch_file() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(StubFetcher {
            fail_download: true,
            content_length: Some(1024),
            body: vec![0u8; 512],
            ..StubFetcher::default()
        });
        let resolver = resolver(dir.path(), fetcher.clone());

        let result = resolver
            .resolve("http://example.com/partial.jpg", MediaKind::Image)
            .await;

        assert!(matches!(result, Err(DispatchError::UnreachableSource(_))));
        assert_eq!(fetcher.downloads.load(Ordering::SeqCst), 1);
        let leftovers = std::fs::read_dir(dir.path().join("tmp")).unwrap().count();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn failed_probe_is_unreachable() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(StubFetcher {
            fail_probe: true,
            ..StubFetcher::default()
        });
        let resolver = resolver(dir.path(), fetcher);

        assert!(matches!(
            resolver.resolve("http://example.com/a.mp4", MediaKind::Video).await,
            Err(DispatchError::UnreachableSource(_))
        ));
    }

    #[tokio::test]
    async fn compile_builds_unhashed_media_message() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = resolver(dir.path(), Arc::new(StubFetcher::default()));
        let file = sized_file(dir.path(), "song.mp3", 10);

        let message = resolver
            .compile(&file, MediaKind::Audio, Some("listen".to_string()))
            .await
            .unwrap();

        match message {
            PendingMessage::Audio(media) => {
                assert_eq!(media.source_ref, file);
                assert_eq!(media.caption.as_deref(), Some("listen"));
                assert!(media.hash.is_none());
            }
            other => panic!("unexpected message {other:?}"),
        }
    }

    #[tokio::test]
    async fn linkify_image_writes_file_and_thumbnail_once() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(StubFetcher {
            body: b"full-image".to_vec(),
            ..StubFetcher::default()
        });
        let resolver = resolver(dir.path(), fetcher.clone());
        let node = ProtocolNode::new("media")
            .with_attribute("type", "image")
            .with_attribute("file", "abc.jpg")
            .with_attribute("url", "https://mmg.example.com/abc.jpg")
            .with_attribute("mimetype", "image/jpeg")
            .with_data(b"thumb".to_vec());

        let linked = resolver.linkify(&node).await.unwrap();

        assert_eq!(linked.file, dir.path().join("pictures").join("abc.jpg"));
        let thumbnail = linked.thumbnail.clone().unwrap();
        assert_eq!(thumbnail, dir.path().join("pictures").join("thumb_abc.jpg"));
        assert_eq!(std::fs::read(&linked.file).unwrap(), b"full-image");
        assert_eq!(std::fs::read(&thumbnail).unwrap(), b"thumb");
        assert!(linked.html.contains(r#"target="_blank""#));

        let again = resolver.linkify(&node).await.unwrap();
        assert_eq!(again, linked);
        assert_eq!(fetcher.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn linkify_location_uses_coordinate_digits() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = resolver(dir.path(), Arc::new(StubFetcher::default()));
        let node = ProtocolNode::new("media")
            .with_attribute("type", "location")
            .with_attribute("longitude", "-89.16")
            .with_attribute("latitude", "19.41")
            .with_data(b"map".to_vec());

        let linked = resolver.linkify(&node).await.unwrap();

        assert_eq!(linked.file, dir.path().join("pictures").join("89161941.jpg"));
        assert!(linked.html.contains("maps?q=19.41,-89.16"));
        assert!(linked.thumbnail.is_none());
    }

    #[tokio::test]
    async fn linkify_rejects_unsupported_types() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = resolver(dir.path(), Arc::new(StubFetcher::default()));
        let node = ProtocolNode::new("media").with_attribute("type", "vcard");

        assert!(matches!(
            resolver.linkify(&node).await,
            Err(DispatchError::UnsupportedMediaKind(kind)) if kind == "vcard"
        ));
    }
}
