/// ASCII conversion engine for lumaglyph.
///
/// Resamples pixel frames to the output grid and maps luminance to glyphs.
pub mod rasterizer;
pub mod resize;

pub use rasterizer::{Rasterizer, render_frame, target_rows};
