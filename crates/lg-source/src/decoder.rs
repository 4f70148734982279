use lg_core::error::CoreError;
use lg_core::media::{MediaBlob, MediaKind};
use lg_core::traits::{MediaDecoder, Source};

use crate::image::ImageSource;

/// Default [`MediaDecoder`]: `image` crate for stills, ffmpeg for video.
///
/// # Example
/// ```
/// use lg_core::media::MediaBlob;
/// use lg_core::traits::MediaDecoder;
/// use lg_source::FileDecoder;
///
/// let decoder = FileDecoder::new();
/// let err = decoder.decode(MediaBlob::new(b"junk".to_vec(), Some("image/png")));
/// assert!(err.is_err());
/// ```
#[derive(Clone, Copy, Debug)]
pub struct FileDecoder {
    loop_video: bool,
}

impl FileDecoder {
    /// Decoder with looping video playback.
    #[must_use]
    pub fn new() -> Self {
        Self { loop_video: true }
    }

    /// Enable or disable restarting videos at EOF.
    #[must_use]
    pub fn with_video_loop(mut self, looping: bool) -> Self {
        self.loop_video = looping;
        self
    }
}

impl Default for FileDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaDecoder for FileDecoder {
    fn decode(&self, blob: MediaBlob) -> Result<Box<dyn Source>, CoreError> {
        log::info!(
            "Décodage de {} ({} octets, {:?})",
            blob.display_name(),
            blob.bytes.len(),
            blob.kind()
        );
        match blob.kind() {
            MediaKind::Image => ImageSource::from_bytes(&blob.bytes)
                .map(|s| Box::new(s) as Box<dyn Source>)
                .map_err(|e| CoreError::decode(format!("{e:#}"))),
            MediaKind::Video => self.decode_video(&blob),
        }
    }
}

impl FileDecoder {
    #[cfg(feature = "video")]
    #[allow(clippy::unused_self)]
    fn decode_video(&self, blob: &MediaBlob) -> Result<Box<dyn Source>, CoreError> {
        crate::video::VideoSource::from_bytes(&blob.bytes, self.loop_video)
            .map(|s| Box::new(s) as Box<dyn Source>)
            .map_err(|e| CoreError::decode(format!("{e:#}")))
    }

    #[cfg(not(feature = "video"))]
    #[allow(clippy::unused_self)]
    fn decode_video(&self, blob: &MediaBlob) -> Result<Box<dyn Source>, CoreError> {
        let _ = self.loop_video;
        log::warn!("Feature 'video' non compilée: {}", blob.display_name());
        Err(CoreError::decode("support vidéo non compilé (feature `video`)"))
    }
}
