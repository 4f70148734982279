use lg_core::charset::Gradient;
use lg_core::config::{MAX_ROWS, MAX_WIDTH, RenderConfig};
use lg_core::error::CoreError;
use lg_core::frame::{FrameBuffer, RenderedText};
use rayon::prelude::*;

use crate::resize::Resizer;

/// Nombre de lignes de sortie pour une source et une largeur données.
///
/// `floor(width × native_h / (native_w × char_aspect_ratio))`.
///
/// # Errors
/// - [`CoreError::InvalidWidth`] when `width` is outside `1..=MAX_WIDTH`
/// - [`CoreError::InvalidDimensions`] for a zero-sized source, or when the
///   output would exceed `MAX_ROWS` rows
/// - [`CoreError::Config`] for a non-positive or non-finite aspect ratio
///
/// # Example
/// ```
/// use lg_ascii::target_rows;
/// assert_eq!(target_rows(4, (2, 2), 3.0).unwrap(), 1);
/// assert_eq!(target_rows(100, (640, 480), 3.0).unwrap(), 25);
/// ```
pub fn target_rows(
    width: u32,
    native_size: (u32, u32),
    char_aspect_ratio: f32,
) -> Result<u32, CoreError> {
    let (nw, nh) = native_size;
    if width == 0 || width > MAX_WIDTH {
        return Err(CoreError::InvalidWidth(width));
    }
    if nw == 0 || nh == 0 {
        return Err(CoreError::InvalidDimensions {
            width: nw,
            height: nh,
        });
    }
    if !char_aspect_ratio.is_finite() || char_aspect_ratio <= 0.0 {
        return Err(CoreError::Config(format!(
            "char_aspect_ratio doit être > 0 (reçu {char_aspect_ratio})"
        )));
    }
    let rows = (f64::from(width) * f64::from(nh)) / (f64::from(nw) * f64::from(char_aspect_ratio));
    let rows = rows.floor().min(f64::from(u32::MAX)) as u32;
    if rows > MAX_ROWS {
        return Err(CoreError::InvalidDimensions {
            width,
            height: rows,
        });
    }
    Ok(rows)
}

/// Convertit des frames en texte ASCII.
///
/// Le resizer et le canvas intermédiaire sont réutilisés d'une frame à
/// l'autre ; seul le texte publié est alloué à chaque rendu.
///
/// # Example
/// ```
/// use lg_ascii::Rasterizer;
/// use lg_core::charset::Gradient;
/// use lg_core::frame::FrameBuffer;
///
/// let mut r = Rasterizer::new();
/// let frame = FrameBuffer::solid(6, 2, (0, 0, 0));
/// let out = r.render(&frame, (6, 2), 6, 1.0, &Gradient::default()).unwrap();
/// assert_eq!(out.text, "@@@@@@\n@@@@@@\n");
/// ```
pub struct Rasterizer {
    resizer: Resizer,
    canvas: FrameBuffer,
    cells: Vec<char>,
}

impl Rasterizer {
    /// Create a rasterizer with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            resizer: Resizer::new(),
            canvas: FrameBuffer::new(0, 0),
            cells: Vec::new(),
        }
    }

    /// Render `frame` using the width, aspect ratio and gradient of `config`.
    ///
    /// # Errors
    /// See [`Self::render`].
    pub fn render_with(
        &mut self,
        frame: &FrameBuffer,
        native_size: (u32, u32),
        config: &RenderConfig,
    ) -> Result<RenderedText, CoreError> {
        self.render(
            frame,
            native_size,
            config.width,
            config.char_aspect_ratio,
            &config.gradient,
        )
    }

    /// Render one frame.
    ///
    /// `native_size` drives the row count; `frame` may be a downscaled copy
    /// of the source (video decoding) and is resampled to `width × rows`.
    ///
    /// # Errors
    /// Same as [`target_rows`], plus [`CoreError::InvalidDimensions`] when
    /// `frame` is empty or its buffer does not match its dimensions.
    pub fn render(
        &mut self,
        frame: &FrameBuffer,
        native_size: (u32, u32),
        width: u32,
        char_aspect_ratio: f32,
        gradient: &Gradient,
    ) -> Result<RenderedText, CoreError> {
        let rows = target_rows(width, native_size, char_aspect_ratio)?;
        if frame.is_empty() {
            return Err(CoreError::InvalidDimensions {
                width: frame.width,
                height: frame.height,
            });
        }
        if rows == 0 {
            return Ok(RenderedText {
                text: String::new(),
                columns: width,
                rows: 0,
            });
        }

        if self.canvas.width != width || self.canvas.height != rows {
            self.canvas = FrameBuffer::new(width, rows);
        }
        self.resizer
            .resize_into(frame, &mut self.canvas)
            .map_err(|e| {
                log::warn!("Resize {}×{} → {width}×{rows} : {e:#}", frame.width, frame.height);
                CoreError::InvalidDimensions {
                    width: frame.width,
                    height: frame.height,
                }
            })?;

        let text = self.sample(gradient);
        Ok(RenderedText {
            text,
            columns: width,
            rows,
        })
    }

    /// Map every canvas pixel to a glyph and join rows with `\n`.
    fn sample(&mut self, gradient: &Gradient) -> String {
        let w = self.canvas.width as usize;
        let h = self.canvas.height as usize;
        self.cells.clear();
        self.cells.resize(w * h, ' ');

        self.cells
            .par_chunks_mut(w)
            .zip(self.canvas.data.par_chunks(w * 4))
            .for_each(|(row, pixels)| {
                for (cell, px) in row.iter_mut().zip(pixels.chunks_exact(4)) {
                    // Pixel transparent = noir, comme un canvas vidé.
                    *cell = if px[3] == 0 {
                        gradient.glyph(0)
                    } else {
                        gradient.glyph_for_rgb(px[0], px[1], px[2])
                    };
                }
            });

        let mut text = String::with_capacity(w * h + h);
        for row in self.cells.chunks(w) {
            text.extend(row);
            text.push('\n');
        }
        text
    }
}

impl Default for Rasterizer {
    fn default() -> Self {
        Self::new()
    }
}

/// One-shot render using the frame's own size as native size.
///
/// # Errors
/// See [`Rasterizer::render`].
///
/// # Example
/// ```
/// use lg_ascii::render_frame;
/// use lg_core::charset::Gradient;
/// use lg_core::frame::FrameBuffer;
///
/// let white = FrameBuffer::solid(2, 2, (255, 255, 255));
/// let out = render_frame(&white, 4, 3.0, &Gradient::default()).unwrap();
/// assert_eq!(out.text, "    \n");
/// ```
pub fn render_frame(
    frame: &FrameBuffer,
    width: u32,
    char_aspect_ratio: f32,
    gradient: &Gradient,
) -> Result<RenderedText, CoreError> {
    Rasterizer::new().render(
        frame,
        (frame.width, frame.height),
        width,
        char_aspect_ratio,
        gradient,
    )
}
