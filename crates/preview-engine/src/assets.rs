//! Asset resolution and caching.
//!
//! [`AssetCache::resolve`] memoizes by reference string. A reference seen
//! before answers synchronously with its cached handle; a new one starts an
//! asynchronous load on the tokio runtime and reports [`AssetHandle::Pending`]
//! until [`AssetCache::pump`] applies the result. Failures (including
//! timeouts and zero-sized decodes) are final for that reference until
//! [`AssetCache::retry`] is called.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use image::RgbaImage;
use storyreel_common::StoryreelError;
use storyreel_project_model::MediaKind;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Why an asset could not be shown.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LoadError {
    #[error("asset not found: {reference}")]
    NotFound { reference: String },

    #[error("failed to read {reference}: {message}")]
    Io { reference: String, message: String },

    #[error("failed to decode {reference}: {message}")]
    Decode { reference: String, message: String },

    #[error("{reference} decoded to an empty image")]
    Corrupt { reference: String },

    #[error("loading {reference} timed out after {timeout:?}")]
    TimedOut { reference: String, timeout: Duration },

    #[error("unsupported asset reference: {reference}")]
    Unsupported { reference: String },
}

impl From<LoadError> for StoryreelError {
    fn from(err: LoadError) -> Self {
        StoryreelError::load(err.to_string())
    }
}

/// A decoded frame ready to draw. Video clips are represented by a poster
/// frame.
#[derive(Debug, Clone)]
pub struct DecodedAsset {
    pub kind: MediaKind,
    pub image: RgbaImage,
}

impl DecodedAsset {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Loads the bytes behind an asset reference.
#[async_trait]
pub trait AssetLoader: Send + Sync {
    async fn load(&self, reference: &str) -> Result<DecodedAsset, LoadError>;
}

/// Loader for files under a project's input directory.
#[derive(Debug, Clone)]
pub struct FsAssetLoader {
    root: PathBuf,
}

impl FsAssetLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve_path(&self, reference: &str) -> Result<PathBuf, LoadError> {
        let relative = Path::new(reference);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if reference.is_empty() || escapes {
            return Err(LoadError::Unsupported {
                reference: reference.to_string(),
            });
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl AssetLoader for FsAssetLoader {
    async fn load(&self, reference: &str) -> Result<DecodedAsset, LoadError> {
        let kind = MediaKind::from_reference(reference).ok_or_else(|| LoadError::Unsupported {
            reference: reference.to_string(),
        })?;
        let path = self.resolve_path(reference)?;
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(LoadError::NotFound {
                reference: reference.to_string(),
            });
        }

        let bytes = match kind {
            MediaKind::Image => tokio::fs::read(&path).await.map_err(|e| LoadError::Io {
                reference: reference.to_string(),
                message: e.to_string(),
            })?,
            MediaKind::Video => extract_poster_frame(&path, reference).await?,
        };

        let owned = reference.to_string();
        let image = tokio::task::spawn_blocking(move || image::load_from_memory(&bytes))
            .await
            .map_err(|e| LoadError::Decode {
                reference: owned.clone(),
                message: e.to_string(),
            })?
            .map_err(|e| LoadError::Decode {
                reference: owned,
                message: e.to_string(),
            })?;

        Ok(DecodedAsset {
            kind,
            image: image.to_rgba8(),
        })
    }
}

/// First frame of a clip, as PNG bytes, via `ffmpeg`.
async fn extract_poster_frame(path: &Path, reference: &str) -> Result<Vec<u8>, LoadError> {
    let output = tokio::process::Command::new("ffmpeg")
        .args(["-v", "error", "-i"])
        .arg(path)
        .args(["-frames:v", "1", "-f", "image2pipe", "-vcodec", "png", "-"])
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| LoadError::Io {
            reference: reference.to_string(),
            message: format!("ffmpeg unavailable: {e}"),
        })?;

    if !output.status.success() || output.stdout.is_empty() {
        return Err(LoadError::Decode {
            reference: reference.to_string(),
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(output.stdout)
}

/// Current resolution state of a reference.
#[derive(Debug, Clone)]
pub enum AssetHandle {
    Pending,
    Ready(Arc<DecodedAsset>),
    Failed(LoadError),
}

impl AssetHandle {
    pub fn is_ready(&self) -> bool {
        matches!(self, AssetHandle::Ready(_))
    }
}

enum Entry {
    Pending { task: JoinHandle<()>, generation: u64 },
    Ready(Arc<DecodedAsset>),
    Failed(LoadError),
}

struct Completion {
    reference: String,
    generation: u64,
    result: Result<DecodedAsset, LoadError>,
}

/// Memoizing asset resolver.
pub struct AssetCache {
    loader: Arc<dyn AssetLoader>,
    timeout: Duration,
    entries: HashMap<String, Entry>,
    tx: mpsc::UnboundedSender<Completion>,
    rx: mpsc::UnboundedReceiver<Completion>,
    generation: u64,
}

impl AssetCache {
    pub fn new(loader: Arc<dyn AssetLoader>, timeout: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            loader,
            timeout,
            entries: HashMap::new(),
            tx,
            rx,
            generation: 0,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Cached handle for `reference`, starting a load on first sight.
    pub fn resolve(&mut self, reference: &str) -> AssetHandle {
        if let Some(handle) = self.peek(reference) {
            return handle;
        }

        let entry = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => Entry::Pending {
                task: runtime.spawn(self.load_task(reference)),
                generation: self.generation,
            },
            Err(e) => Entry::Failed(LoadError::Io {
                reference: reference.to_string(),
                message: format!("no async runtime: {e}"),
            }),
        };
        tracing::debug!(reference, "Resolving asset");
        self.entries.insert(reference.to_string(), entry);
        self.peek(reference).unwrap_or(AssetHandle::Pending)
    }

    /// Cached handle without starting a load.
    pub fn peek(&self, reference: &str) -> Option<AssetHandle> {
        self.entries.get(reference).map(|entry| match entry {
            Entry::Pending { .. } => AssetHandle::Pending,
            Entry::Ready(asset) => AssetHandle::Ready(asset.clone()),
            Entry::Failed(e) => AssetHandle::Failed(e.clone()),
        })
    }

    /// Apply finished loads. Returns how many entries changed.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(done) = self.rx.try_recv() {
            let current = matches!(
                self.entries.get(&done.reference),
                Some(Entry::Pending { generation, .. }) if *generation == done.generation
            );
            if !current {
                tracing::trace!(reference = %done.reference, "Dropping stale asset load");
                continue;
            }

            let entry = match done.result {
                Ok(asset) if asset.width() == 0 || asset.height() == 0 => {
                    Entry::Failed(LoadError::Corrupt {
                        reference: done.reference.clone(),
                    })
                }
                Ok(asset) => {
                    tracing::debug!(
                        reference = %done.reference,
                        width = asset.width(),
                        height = asset.height(),
                        "Asset ready"
                    );
                    Entry::Ready(Arc::new(asset))
                }
                Err(e) => Entry::Failed(e),
            };
            if let Entry::Failed(e) = &entry {
                tracing::warn!(reference = %done.reference, error = %e, "Asset failed to load");
            }
            self.entries.insert(done.reference, entry);
            applied += 1;
        }
        applied
    }

    /// Abort every in-flight load. Results that still arrive are discarded,
    /// and the references will load afresh on their next resolve.
    pub fn cancel_pending(&mut self) -> usize {
        self.generation += 1;
        let pending: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| matches!(entry, Entry::Pending { .. }))
            .map(|(reference, _)| reference.clone())
            .collect();

        for reference in &pending {
            if let Some(Entry::Pending { task, .. }) = self.entries.remove(reference) {
                task.abort();
            }
        }
        if !pending.is_empty() {
            tracing::debug!(cancelled = pending.len(), "Cancelled pending asset loads");
        }
        pending.len()
    }

    /// Drop settled entries whose reference `keep` rejects. Pending loads are
    /// left to `cancel_pending`. Returns how many entries were evicted.
    pub fn retain_settled<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&str) -> bool,
    {
        let before = self.entries.len();
        self.entries.retain(|reference, entry| {
            matches!(entry, Entry::Pending { .. }) || keep(reference)
        });
        let evicted = before - self.entries.len();
        if evicted > 0 {
            tracing::debug!(evicted, "Evicted unreferenced assets");
        }
        evicted
    }

    /// Forget a failure and load again.
    pub fn retry(&mut self, reference: &str) -> AssetHandle {
        if matches!(self.entries.get(reference), Some(Entry::Failed(_))) {
            self.entries.remove(reference);
        }
        self.resolve(reference)
    }

    /// References still loading.
    pub fn pending(&self) -> usize {
        self.entries
            .values()
            .filter(|entry| matches!(entry, Entry::Pending { .. }))
            .count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn load_task(&self, reference: &str) -> impl Future<Output = ()> + Send + 'static {
        let loader = self.loader.clone();
        let tx = self.tx.clone();
        let timeout = self.timeout;
        let generation = self.generation;
        let reference = reference.to_string();

        async move {
            let result = match tokio::time::timeout(timeout, loader.load(&reference)).await {
                Ok(result) => result,
                Err(_) => Err(LoadError::TimedOut {
                    reference: reference.clone(),
                    timeout,
                }),
            };
            // The receiver is gone only when the cache was dropped.
            let _ = tx.send(Completion {
                reference,
                generation,
                result,
            });
        }
    }
}

impl Drop for AssetCache {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}
