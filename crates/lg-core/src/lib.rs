/// Shared types for lumaglyph.
///
/// Gradients, render configuration, errors, pixel buffers, media blobs and the
/// traits that connect sources, the rasterizer and the session.

pub mod charset;
pub mod clock;
pub mod config;
pub mod error;
pub mod frame;
pub mod media;
pub mod traits;

pub use charset::{Gradient, GradientPreset};
pub use clock::{FrameClock, FrameRequestId};
pub use config::RenderConfig;
pub use error::CoreError;
pub use frame::{FrameBuffer, RenderedText};
pub use media::{MediaBlob, MediaKind};
