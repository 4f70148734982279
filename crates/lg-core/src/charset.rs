use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// 10 caractères : dense→clair, bon contraste.
pub const GRADIENT_SIMPLE: &str = "@%#*+=-:. ";

/// 28 caractères : chiffres et lettres pour les tons moyens.
pub const GRADIENT_DETAILED: &str = "@#W$9876543210?!abc;:+=-,._ ";

/// 67 caractères : Paul Bourke, ordre clair→dense.
pub const GRADIENT_SUPER_DETAILED: &str =
    " .`^\",:;Il!i~+_-?][}{1)(|\\/tfjrxnuvczXYUJCLQ0OZmwqpdbkhao*#MW&8%B@$";

/// Minimal : six niveaux, clair→dense.
pub const GRADIENT_MINIMAL: &str = " .oO0@";

/// Sum of the BT.709 luma weights scaled to integers (0.2126, 0.7152, 0.0722).
pub const LUMA_WEIGHT_SUM: u32 = 10_000;

/// Largest value returned by [`weighted_luma`] (pure white).
pub const LUMA_WEIGHTED_MAX: u32 = 255 * LUMA_WEIGHT_SUM;

/// Luminance scaled by 10 000, exact for every 8-bit RGB triple.
///
/// # Example
/// ```
/// use lg_core::charset::{weighted_luma, LUMA_WEIGHTED_MAX};
/// assert_eq!(weighted_luma(255, 255, 255), LUMA_WEIGHTED_MAX);
/// assert_eq!(weighted_luma(0, 0, 0), 0);
/// ```
#[inline(always)]
#[must_use]
pub fn weighted_luma(r: u8, g: u8, b: u8) -> u32 {
    u32::from(r) * 2126 + u32::from(g) * 7152 + u32::from(b) * 722
}

/// Built-in gradients.
///
/// # Example
/// ```
/// use lg_core::charset::GradientPreset;
/// let p: GradientPreset = "super-detailed".parse().unwrap();
/// assert_eq!(p, GradientPreset::SuperDetailed);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(try_from = "String")]
pub enum GradientPreset {
    #[default]
    Simple,
    Detailed,
    SuperDetailed,
    Minimal,
}

impl GradientPreset {
    /// Every preset, in display order.
    pub const ALL: [Self; 4] = [
        Self::Simple,
        Self::Detailed,
        Self::SuperDetailed,
        Self::Minimal,
    ];

    /// The preset's character sequence.
    #[must_use]
    pub fn chars(self) -> &'static str {
        match self {
            Self::Simple => GRADIENT_SIMPLE,
            Self::Detailed => GRADIENT_DETAILED,
            Self::SuperDetailed => GRADIENT_SUPER_DETAILED,
            Self::Minimal => GRADIENT_MINIMAL,
        }
    }

    /// Display name, as written in config files.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Simple => "Simple",
            Self::Detailed => "Detailed",
            Self::SuperDetailed => "SuperDetailed",
            Self::Minimal => "Minimal",
        }
    }
}

impl fmt::Display for GradientPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for GradientPreset {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match key.as_str() {
            "simple" => Ok(Self::Simple),
            "detailed" => Ok(Self::Detailed),
            "superdetailed" => Ok(Self::SuperDetailed),
            "minimal" => Ok(Self::Minimal),
            _ => Err(CoreError::UnknownGradient(s.to_string())),
        }
    }
}

impl TryFrom<String> for GradientPreset {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Active gradient: ordered glyphs, index 0 for the darkest luminance.
///
/// The length sets the quantization granularity.
///
/// # Example
/// ```
/// use lg_core::charset::Gradient;
/// let g = Gradient::default();
/// assert_eq!(g.glyph_for_rgb(0, 0, 0), '@');
/// assert_eq!(g.glyph_for_rgb(255, 255, 255), ' ');
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Gradient {
    glyphs: Vec<char>,
    preset: Option<GradientPreset>,
}

impl Gradient {
    /// Gradient of a built-in preset.
    #[must_use]
    pub fn from_preset(preset: GradientPreset) -> Self {
        Self {
            glyphs: preset.chars().chars().collect(),
            preset: Some(preset),
        }
    }

    /// Custom gradient from any non-empty character sequence.
    ///
    /// # Errors
    /// Returns [`CoreError::EmptyGradient`] for an empty string.
    ///
    /// # Example
    /// ```
    /// use lg_core::charset::Gradient;
    /// let g = Gradient::custom(" ░▒▓█").unwrap();
    /// assert_eq!(g.len(), 5);
    /// assert!(Gradient::custom("").is_err());
    /// ```
    pub fn custom(chars: &str) -> Result<Self, CoreError> {
        let glyphs: Vec<char> = chars.chars().collect();
        if glyphs.is_empty() {
            return Err(CoreError::EmptyGradient);
        }
        Ok(Self {
            glyphs,
            preset: None,
        })
    }

    /// Number of glyphs (always ≥ 1).
    #[must_use]
    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    /// Always false; kept for clippy's `len_without_is_empty`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    /// Preset this gradient came from, `None` for a custom one.
    #[must_use]
    pub fn preset(&self) -> Option<GradientPreset> {
        self.preset
    }

    /// Glyphs, darkest first.
    #[must_use]
    pub fn glyphs(&self) -> &[char] {
        &self.glyphs
    }

    /// Glyph at `index`, clamped to the last one.
    #[inline(always)]
    #[must_use]
    pub fn glyph(&self, index: usize) -> char {
        self.glyphs[index.min(self.glyphs.len() - 1)]
    }

    /// `floor(luminance / 255 × (len − 1))` with BT.709 luminance, computed
    /// exactly from 8-bit RGB so pure white lands on the last glyph.
    ///
    /// # Example
    /// ```
    /// use lg_core::charset::Gradient;
    /// let g = Gradient::default();
    /// assert_eq!(g.index_for_rgb(0, 0, 0), 0);
    /// assert_eq!(g.index_for_rgb(255, 255, 255), 9);
    /// assert_eq!(g.index_for_rgb(128, 128, 128), 4);
    /// ```
    #[inline(always)]
    #[must_use]
    pub fn index_for_rgb(&self, r: u8, g: u8, b: u8) -> usize {
        let steps = (self.glyphs.len() - 1) as u64;
        let idx = u64::from(weighted_luma(r, g, b)) * steps / u64::from(LUMA_WEIGHTED_MAX);
        idx as usize
    }

    /// Glyph for an 8-bit RGB pixel.
    #[inline(always)]
    #[must_use]
    pub fn glyph_for_rgb(&self, r: u8, g: u8, b: u8) -> char {
        self.glyphs[self.index_for_rgb(r, g, b)]
    }

    /// Short label for status lines: the preset name or `custom(n)`.
    #[must_use]
    pub fn label(&self) -> String {
        match self.preset {
            Some(p) => p.name().to_string(),
            None => format!("custom({})", self.glyphs.len()),
        }
    }
}

impl Default for Gradient {
    fn default() -> Self {
        Self::from_preset(GradientPreset::default())
    }
}

impl fmt::Display for Gradient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in &self.glyphs {
            write!(f, "{c}")?;
        }
        Ok(())
    }
}
