/// Visual sources for lumaglyph (still images, video).

pub mod decoder;
pub mod image;

#[cfg(feature = "video")]
pub mod video;

pub use decoder::FileDecoder;
