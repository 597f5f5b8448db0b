/// Uploaded media storage
///
/// Recipe images are written below a media root on the local filesystem and
/// served back under a public URL prefix. Stored names are a random UUID
/// plus an extension of the decoded image format. The client filename only
/// picks between spellings of that format (`.jpg` / `.jpeg`), so the served
/// content type always matches the bytes.
///
/// Payloads are decoded before anything touches the disk: a file that is not
/// a readable image is rejected and no file is created.
///
/// # Example
///
/// ```no_run
/// use recipe_shared::media::MediaStore;
///
/// # async fn example(data: bytes::Bytes) -> Result<(), recipe_shared::media::MediaError> {
/// let store = MediaStore::new("media", "/media");
/// let path = store.save_recipe_image(Some("photo.jpg"), data).await?;
///
/// assert!(path.starts_with("uploads/recipe/"));
/// println!("served at {}", store.url_for(&path));
/// # Ok(())
/// # }
/// ```

use bytes::Bytes;
use image::ImageFormat;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Directory, relative to the media root, holding recipe images
pub const RECIPE_UPLOAD_DIR: &str = "uploads/recipe";

/// Error type for media operations
#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    /// Upload contained no data
    #[error("The submitted file is empty.")]
    Empty,

    /// Upload could not be decoded as an image
    #[error("Upload a valid image. The file you uploaded was either not an image or a corrupted image.")]
    NotAnImage(String),

    /// Filesystem failure while storing the file
    #[error("Failed to store file: {0}")]
    Io(#[from] std::io::Error),

    /// Decoder task failed
    #[error("Image decoding task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Filesystem-backed media store
#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
    base_url: String,
}

impl MediaStore {
    /// Creates a store writing below `root` and serving under `base_url`
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Self {
            root: root.into(),
            base_url,
        }
    }

    /// Directory files are written below
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// URL prefix files are served under, without a trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Public URL of a stored file
    pub fn url_for(&self, relative: &str) -> String {
        format!("{}/{}", self.base_url, relative.trim_start_matches('/'))
    }

    /// Absolute location of a stored file
    pub fn path_for(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    /// Validates and stores a recipe image
    ///
    /// Returns the stored path relative to the media root,
    /// `uploads/recipe/<uuid>.<ext>`.
    ///
    /// # Errors
    ///
    /// - `MediaError::Empty` / `MediaError::NotAnImage` for bad payloads (nothing is written)
    /// - `MediaError::Io` if the file cannot be written
    pub async fn save_recipe_image(
        &self,
        filename: Option<&str>,
        data: Bytes,
    ) -> Result<String, MediaError> {
        let format = validate_image(data.clone()).await?;
        let relative = recipe_image_path(filename, format);
        let path = self.path_for(&relative);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &data).await?;

        info!(path = %relative, bytes = data.len(), ?format, "Stored recipe image");
        Ok(relative)
    }

    /// Deletes a stored file; a file that is already gone is not an error
    pub async fn remove(&self, relative: &str) -> Result<(), MediaError> {
        match tokio::fs::remove_file(self.path_for(relative)).await {
            Ok(()) => {
                info!(path = %relative, "Removed stored file");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Decodes a payload to prove it is an image
///
/// Decoding runs on the blocking pool. Returns the detected format.
pub async fn validate_image(data: Bytes) -> Result<ImageFormat, MediaError> {
    if data.is_empty() {
        return Err(MediaError::Empty);
    }

    tokio::task::spawn_blocking(move || {
        let format = image::guess_format(&data).map_err(|e| {
            warn!(error = %e, "Rejected upload with unknown format");
            MediaError::NotAnImage(e.to_string())
        })?;

        image::load_from_memory_with_format(&data, format).map_err(|e| {
            warn!(error = %e, ?format, "Rejected upload that failed to decode");
            MediaError::NotAnImage(e.to_string())
        })?;

        debug!(?format, "Validated image upload");
        Ok(format)
    })
    .await?
}

/// Generates a fresh storage path for a recipe image
///
/// The extension is one of `format`'s own extensions: the client's, if it
/// names this format, otherwise the format's canonical one.
pub fn recipe_image_path(filename: Option<&str>, format: ImageFormat) -> String {
    let known = format.extensions_str();

    let extension = filename
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .and_then(|ext| known.iter().find(|candidate| **candidate == ext))
        .or_else(|| known.first())
        .copied()
        .unwrap_or("img");

    format!("{}/{}.{}", RECIPE_UPLOAD_DIR, Uuid::new_v4(), extension)
}
