/// Buffer de pixels réutilisable.
///
/// Stocke les pixels en RGBA row-major, 4 bytes par pixel.
///
/// # Example
/// ```
/// use lg_core::frame::FrameBuffer;
/// let fb = FrameBuffer::new(10, 10);
/// assert_eq!(fb.data.len(), 400);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameBuffer {
    /// Pixels RGBA, row-major, 4 bytes par pixel.
    pub data: Vec<u8>,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl FrameBuffer {
    /// Crée un buffer noir transparent aux dimensions données.
    ///
    /// # Example
    /// ```
    /// use lg_core::frame::FrameBuffer;
    /// let fb = FrameBuffer::new(100, 50);
    /// assert_eq!(fb.data.len(), 100 * 50 * 4);
    /// ```
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            data: vec![0u8; width as usize * height as usize * 4],
            width,
            height,
        }
    }

    /// Buffer uniformément rempli d'une couleur opaque.
    ///
    /// # Example
    /// ```
    /// use lg_core::frame::FrameBuffer;
    /// let fb = FrameBuffer::solid(2, 2, (255, 255, 255));
    /// assert_eq!(fb.pixel(1, 1), (255, 255, 255, 255));
    /// ```
    #[must_use]
    pub fn solid(width: u32, height: u32, rgb: (u8, u8, u8)) -> Self {
        let mut fb = Self::new(width, height);
        for px in fb.data.chunks_exact_mut(4) {
            px.copy_from_slice(&[rgb.0, rgb.1, rgb.2, 255]);
        }
        fb
    }

    /// `true` when either dimension is zero.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Accès au pixel (x, y) → (r, g, b, a).
    #[inline(always)]
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> (u8, u8, u8, u8) {
        debug_assert!(x < self.width && y < self.height, "pixel out of bounds");
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        if idx + 3 >= self.data.len() {
            return (0, 0, 0, 0);
        }
        (
            self.data[idx],
            self.data[idx + 1],
            self.data[idx + 2],
            self.data[idx + 3],
        )
    }

    /// Écrit un pixel RGBA.
    #[inline]
    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: (u8, u8, u8, u8)) {
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        if let Some(px) = self.data.get_mut(idx..idx + 4) {
            px.copy_from_slice(&[rgba.0, rgba.1, rgba.2, rgba.3]);
        }
    }
}

/// Texte ASCII publié après chaque rendu. Remplacé en bloc, jamais patché.
///
/// # Example
/// ```
/// use lg_core::frame::RenderedText;
/// let t = RenderedText::default();
/// assert!(t.is_empty());
/// assert_eq!(t.rows, 0);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RenderedText {
    /// Rows joined by `\n`, each row terminated.
    pub text: String,
    /// Characters per row.
    pub columns: u32,
    /// Number of rows (= number of `\n`).
    pub rows: u32,
}

impl RenderedText {
    /// `true` when nothing has been rendered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Iterate over rows without their terminator.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.lines()
    }
}
