use std::path::Path;

use anyhow::{Context, Result};

/// Category of a loaded media blob.
///
/// # Example
/// ```
/// use lg_core::media::MediaKind;
/// assert_eq!(MediaKind::from_mime("video/mp4"), MediaKind::Video);
/// assert_eq!(MediaKind::from_mime("image/png"), MediaKind::Image);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// `video/*` ⇒ video, anything else (unknown included) ⇒ image.
    #[must_use]
    pub fn from_mime(mime: &str) -> Self {
        if mime.trim().to_ascii_lowercase().starts_with("video") {
            Self::Video
        } else {
            Self::Image
        }
    }
}

/// Guess a MIME type from a file extension.
///
/// # Example
/// ```
/// use lg_core::media::mime_from_extension;
/// use std::path::Path;
/// assert_eq!(mime_from_extension(Path::new("clip.MKV")), Some("video/x-matroska"));
/// assert_eq!(mime_from_extension(Path::new("notes.txt")), None);
/// ```
#[must_use]
pub fn mime_from_extension(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "bmp" => "image/bmp",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "mp4" | "m4v" => "video/mp4",
        "mkv" => "video/x-matroska",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "flv" => "video/x-flv",
        "wmv" => "video/x-ms-wmv",
        "ts" => "video/mp2t",
        "mpg" | "mpeg" => "video/mpeg",
        _ => return None,
    };
    Some(mime)
}

/// Fichier entièrement lu en mémoire avant décodage.
#[derive(Clone, Debug)]
pub struct MediaBlob {
    /// Raw file content.
    pub bytes: Vec<u8>,
    /// Declared MIME type, if any.
    pub mime: Option<String>,
    /// Original file name, for logs and status lines.
    pub name: Option<String>,
}

impl MediaBlob {
    /// Blob from in-memory bytes with an optional MIME type.
    ///
    /// # Example
    /// ```
    /// use lg_core::media::{MediaBlob, MediaKind};
    /// let blob = MediaBlob::new(vec![1, 2, 3], Some("video/webm"));
    /// assert_eq!(blob.kind(), MediaKind::Video);
    /// ```
    #[must_use]
    pub fn new(bytes: Vec<u8>, mime: Option<&str>) -> Self {
        Self {
            bytes,
            mime: mime.map(str::to_string),
            name: None,
        }
    }

    /// Read a file fully; the MIME type is guessed from its extension.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read.
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Impossible de lire {}", path.display()))?;
        let mime = mime_from_extension(path).map(str::to_string);
        if mime.is_none() {
            log::debug!(
                "Extension non reconnue pour {}, traité comme image",
                path.display()
            );
        }
        Ok(Self {
            bytes,
            mime,
            name: path.file_name().and_then(|n| n.to_str()).map(String::from),
        })
    }

    /// Image or video, from the MIME type.
    #[must_use]
    pub fn kind(&self) -> MediaKind {
        self.mime
            .as_deref()
            .map_or(MediaKind::Image, MediaKind::from_mime)
    }

    /// File name or a placeholder.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<blob>")
    }
}
