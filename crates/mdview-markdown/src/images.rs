//! Deduplicated background image loading.
//!
//! [`ImageCache::request`] never blocks: it hands out an [`ImageHandle`] in the pending state and
//! starts a worker thread that reads and decodes the file. Results travel back over a channel and
//! are published by [`ImageCache::poll`] on the caller's thread, so a handle's state changes
//! exactly once, between two polls, and is never observed half-written.
//!
//! Entries are never evicted. A handle that reached the failed state is replaced by a fresh
//! request the next time the same path is requested.

use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::OnceLock;
use std::sync::mpsc;
use std::sync::mpsc::Receiver;
use std::sync::mpsc::TryRecvError;
use std::thread;

use image::DynamicImage;
use image::RgbaImage;
use mdview_core::surface::RasterImage;

use crate::assets;
use crate::assets::AssetSource;
use crate::error::ImageError;

/// Decoded pixels are downscaled so neither edge exceeds this many pixels.
pub const MAX_DECODED_EDGE: u32 = 512;

/// A decoded image: the original pixel size plus an RGBA thumbnail for drawing.
#[derive(Debug)]
pub struct ImageData {
    width: u32,
    height: u32,
    pixels: RgbaImage,
}

impl ImageData {
    pub fn from_image(image: DynamicImage) -> Self {
        let (width, height) = (image.width(), image.height());
        let thumb = if width > MAX_DECODED_EDGE || height > MAX_DECODED_EDGE {
            image.thumbnail(MAX_DECODED_EDGE, MAX_DECODED_EDGE)
        } else {
            image
        };
        Self {
            width,
            height,
            pixels: thumb.to_rgba8(),
        }
    }

    /// Pixel size of the source image, used for layout sizing.
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }
}

impl RasterImage for ImageData {
    fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.pixels.get_pixel(x, y).0
    }
}

#[derive(Debug)]
pub enum ImageState<'a> {
    Pending,
    Loaded(&'a ImageData),
    Failed(&'a ImageError),
}

#[derive(Debug)]
struct ImageEntry {
    path: PathBuf,
    state: OnceLock<Result<ImageData, ImageError>>,
}

/// A shared reference to one cache entry. Cloning is cheap.
#[derive(Clone, Debug)]
pub struct ImageHandle(Arc<ImageEntry>);

impl ImageHandle {
    fn new(path: PathBuf) -> Self {
        Self(Arc::new(ImageEntry {
            path,
            state: OnceLock::new(),
        }))
    }

    fn failed(path: PathBuf, error: ImageError) -> Self {
        let handle = Self::new(path);
        handle.publish(Err(error));
        handle
    }

    fn publish(&self, result: Result<ImageData, ImageError>) {
        // A second result for the same entry is dropped; the first one wins.
        let _ = self.0.state.set(result);
    }

    pub fn path(&self) -> &Path {
        &self.0.path
    }

    pub fn state(&self) -> ImageState<'_> {
        match self.0.state.get() {
            None => ImageState::Pending,
            Some(Ok(data)) => ImageState::Loaded(data),
            Some(Err(err)) => ImageState::Failed(err),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.0.state.get().is_none()
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.0.state.get(), Some(Err(_)))
    }

    /// `true` if both handles refer to the same cache entry.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

pub struct ImageCache {
    assets: Arc<dyn AssetSource>,
    entries: HashMap<PathBuf, ImageHandle>,
    pending: HashMap<PathBuf, Receiver<Result<ImageData, ImageError>>>,
    generation: u64,
}

impl ImageCache {
    pub fn new(assets: Arc<dyn AssetSource>) -> Self {
        Self {
            assets,
            entries: HashMap::new(),
            pending: HashMap::new(),
            generation: 0,
        }
    }

    /// Returns the entry for `path`, starting a background load if there is none yet.
    pub fn request(&mut self, path: &Path) -> ImageHandle {
        let key = assets::normalize(path);
        if let Some(existing) = self.entries.get(&key) {
            if !existing.is_failed() {
                return existing.clone();
            }
        }

        let handle = ImageHandle::new(key.clone());
        let (tx, rx) = mpsc::channel();
        let source = Arc::clone(&self.assets);
        let job = key.clone();
        let spawned = thread::Builder::new()
            .name("mdview-image".to_string())
            .spawn(move || {
                let _ = tx.send(load(source.as_ref(), &job));
            });

        match spawned {
            Ok(_) => {
                tracing::debug!(path = %key.display(), "image requested");
                self.pending.insert(key.clone(), rx);
            }
            Err(err) => {
                tracing::warn!(path = %key.display(), error = %err, "failed to spawn image worker");
                handle.publish(Err(ImageError::Worker { path: key.clone() }));
                self.generation += 1;
            }
        }
        self.entries.insert(key, handle.clone());
        handle
    }

    /// Resolves `src` against `document` and requests it.
    ///
    /// Unresolvable sources yield a handle that is already failed and is not cached.
    pub fn request_source(&mut self, document: &Path, src: &str) -> ImageHandle {
        match self.assets.resolve(document, src) {
            Some(path) => self.request(&path),
            None => {
                tracing::warn!(src, "unresolvable image source");
                ImageHandle::failed(PathBuf::from(src), ImageError::Unresolvable(src.to_string()))
            }
        }
    }

    /// Publishes finished loads. Returns `true` while at least one load is still pending.
    pub fn poll(&mut self) -> bool {
        let mut finished = Vec::new();
        for (key, rx) in &self.pending {
            match rx.try_recv() {
                Ok(result) => finished.push((key.clone(), result)),
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => {
                    finished.push((key.clone(), Err(ImageError::Worker { path: key.clone() })))
                }
            }
        }

        for (key, result) in finished {
            self.pending.remove(&key);
            match &result {
                Ok(data) => {
                    let (w, h) = data.size();
                    tracing::debug!(path = %key.display(), w, h, "image loaded");
                }
                Err(err) => tracing::warn!(path = %key.display(), error = %err, "image failed"),
            }
            if let Some(handle) = self.entries.get(&key) {
                handle.publish(result);
            }
            self.generation += 1;
        }

        !self.pending.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Incremented every time an entry leaves the pending state.
    ///
    /// Layouts sized against an older generation may be stale.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn load(assets: &dyn AssetSource, path: &Path) -> Result<ImageData, ImageError> {
    let bytes = assets.read(path).map_err(|source| ImageError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let image = image::load_from_memory(&bytes).map_err(|source| ImageError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(ImageData::from_image(image))
}
