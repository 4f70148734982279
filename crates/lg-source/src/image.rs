use std::sync::Arc;

use anyhow::{Context, Result};
use lg_core::frame::FrameBuffer;
use lg_core::traits::Source;

/// Source d'image statique. Retourne toujours la même frame.
///
/// # Example
/// ```no_run
/// use lg_source::image::ImageSource;
/// let bytes = std::fs::read("photo.png").unwrap();
/// let source = ImageSource::from_bytes(&bytes).unwrap();
/// ```
pub struct ImageSource {
    frame: Arc<FrameBuffer>,
}

impl ImageSource {
    /// Decode an in-memory image (PNG, JPEG, BMP, GIF, WebP).
    ///
    /// Animated formats yield their first frame.
    ///
    /// # Errors
    /// Returns an error if the format is unknown or the data is corrupt.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let img = image::load_from_memory(bytes).context("Image illisible")?;
        Self::from_frame(to_frame(&img))
    }

    fn from_frame(frame: FrameBuffer) -> Result<Self> {
        if frame.is_empty() {
            anyhow::bail!("Image vide ({}×{})", frame.width, frame.height);
        }
        log::debug!("Image décodée : {}×{}", frame.width, frame.height);
        Ok(Self {
            frame: Arc::new(frame),
        })
    }
}

fn to_frame(img: &image::DynamicImage) -> FrameBuffer {
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    FrameBuffer {
        data: rgba.into_raw(),
        width,
        height,
    }
}

impl Source for ImageSource {
    fn next_frame(&mut self) -> Option<Arc<FrameBuffer>> {
        Some(Arc::clone(&self.frame))
    }

    fn native_size(&self) -> (u32, u32) {
        (self.frame.width, self.frame.height)
    }

    fn is_live(&self) -> bool {
        false
    }
}
