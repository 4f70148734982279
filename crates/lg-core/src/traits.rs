use std::sync::Arc;

use crate::clock::FrameRequestId;
use crate::error::CoreError;
use crate::frame::FrameBuffer;
use crate::media::MediaBlob;

/// Fournit des frames visuelles au rasterizer.
///
/// Implémenté par : `ImageSource`, `VideoSource`.
///
/// # Example
/// ```
/// use lg_core::traits::Source;
/// use lg_core::frame::FrameBuffer;
/// use std::sync::Arc;
///
/// struct DummySource;
/// impl Source for DummySource {
///     fn next_frame(&mut self) -> Option<Arc<FrameBuffer>> { None }
///     fn native_size(&self) -> (u32, u32) { (0, 0) }
///     fn is_live(&self) -> bool { false }
/// }
/// ```
pub trait Source: Send + 'static {
    /// Retourne la frame la plus récente.
    ///
    /// Ne bloque JAMAIS : retourne la dernière frame connue si pas de nouvelle,
    /// `None` si aucune frame n'a encore été décodée.
    fn next_frame(&mut self) -> Option<Arc<FrameBuffer>>;

    /// Dimensions natives de la source (avant resize).
    fn native_size(&self) -> (u32, u32);

    /// `true` for time-based sources (video), `false` for still images.
    fn is_live(&self) -> bool;

    /// Resume or pause playback. No-op for still sources.
    fn set_playing(&mut self, _playing: bool) {}

    /// `true` once a finite stream has delivered its last frame.
    fn is_ended(&self) -> bool {
        false
    }
}

/// Decodes a fully-read media blob into a [`Source`].
///
/// Called from a worker thread, hence `Send + Sync`.
pub trait MediaDecoder: Send + Sync + 'static {
    /// Decode `blob`.
    ///
    /// # Errors
    /// [`CoreError::DecodeFailure`] for corrupt or unsupported media.
    fn decode(&self, blob: MediaBlob) -> Result<Box<dyn Source>, CoreError>;
}

/// Host animation timer: one-shot frame callbacks that can be cancelled.
///
/// The host calls back into the session with the id once the frame is due.
pub trait FrameScheduler {
    /// Request one callback for the next frame.
    fn request_frame(&mut self) -> FrameRequestId;

    /// Cancel a pending request. Unknown or already-fired ids are ignored.
    fn cancel_frame(&mut self, id: FrameRequestId);
}
