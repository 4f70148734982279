use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::charset::{Gradient, GradientPreset};
use crate::error::CoreError;

/// Largeur par défaut, en colonnes.
pub const DEFAULT_WIDTH: u32 = 100;

/// Largeur maximale acceptée ; au-delà le rendu est refusé.
pub const MAX_WIDTH: u32 = 4096;

/// Nombre maximal de lignes produites par un rendu.
pub const MAX_ROWS: u32 = 4096;

/// Compensation hauteur/largeur d'une cellule de caractère.
pub const DEFAULT_CHAR_ASPECT_RATIO: f32 = 3.0;

/// Configuration du rendu, hot-rechargeable.
///
/// # Example
/// ```
/// use lg_core::config::RenderConfig;
/// let config = RenderConfig::default();
/// assert_eq!(config.width, 100);
/// assert_eq!(config.char_aspect_ratio, 3.0);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct RenderConfig {
    /// Output columns (≥ 1).
    pub width: u32,
    /// Active gradient, darkest glyph first.
    pub gradient: Gradient,
    /// Width:height compensation of a character cell.
    pub char_aspect_ratio: f32,
    /// Video tick rate.
    pub target_fps: u32,
    /// Restart videos at EOF.
    pub loop_video: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            gradient: Gradient::default(),
            char_aspect_ratio: DEFAULT_CHAR_ASPECT_RATIO,
            target_fps: 30,
            loop_video: true,
        }
    }
}

impl RenderConfig {
    /// Clamp numeric fields to their valid ranges.
    ///
    /// Width is not clamped: a zero width is rejected by [`Self::validate`].
    pub fn clamp_all(&mut self) {
        self.target_fps = self.target_fps.clamp(1, 120);
        if !self.char_aspect_ratio.is_finite() {
            self.char_aspect_ratio = DEFAULT_CHAR_ASPECT_RATIO;
        }
        self.char_aspect_ratio = self.char_aspect_ratio.clamp(0.1, 10.0);
    }

    /// Check the invariants the renderer relies on.
    ///
    /// # Errors
    /// - [`CoreError::InvalidWidth`] when `width` is outside `1..=MAX_WIDTH`
    /// - [`CoreError::Config`] for a non-positive or non-finite aspect ratio
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.width == 0 || self.width > MAX_WIDTH {
            return Err(CoreError::InvalidWidth(self.width));
        }
        if !self.char_aspect_ratio.is_finite() || self.char_aspect_ratio <= 0.0 {
            return Err(CoreError::Config(format!(
                "char_aspect_ratio doit être > 0 (reçu {})",
                self.char_aspect_ratio
            )));
        }
        Ok(())
    }
}

/// Structure TOML intermédiaire, toutes les valeurs optionnelles.
#[derive(Deserialize)]
struct ConfigFile {
    render: Option<RenderSection>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RenderSection {
    width: Option<i64>,
    gradient: Option<GradientPreset>,
    /// Custom gradient; overrides `gradient` when both are set.
    charset: Option<String>,
    char_aspect_ratio: Option<f32>,
    target_fps: Option<u32>,
    loop_video: Option<bool>,
}

/// Parse TOML text and merge it over the defaults.
///
/// # Errors
/// Returns an error on invalid TOML, a non-positive width or an empty charset.
///
/// # Example
/// ```
/// use lg_core::config::parse_config;
/// let config = parse_config("[render]\nwidth = 80\ngradient = \"Minimal\"\n").unwrap();
/// assert_eq!(config.width, 80);
/// assert_eq!(config.gradient.len(), 6);
/// ```
pub fn parse_config(content: &str) -> Result<RenderConfig> {
    let file: ConfigFile = toml::from_str(content).context("Erreur de parsing TOML")?;
    let mut config = RenderConfig::default();

    if let Some(r) = file.render {
        if let Some(v) = r.width {
            let width = u32::try_from(v)
                .ok()
                .filter(|&w| w > 0)
                .ok_or(CoreError::InvalidWidth(v.clamp(0, i64::from(u32::MAX)) as u32))?;
            config.width = width;
        }
        if let Some(v) = r.gradient {
            config.gradient = Gradient::from_preset(v);
        }
        if let Some(v) = r.charset {
            config.gradient = Gradient::custom(&v)?;
        }
        if let Some(v) = r.char_aspect_ratio {
            config.char_aspect_ratio = v;
        }
        if let Some(v) = r.target_fps {
            config.target_fps = v;
        }
        if let Some(v) = r.loop_video {
            config.loop_video = v;
        }
    }

    config.clamp_all();
    config.validate()?;
    Ok(config)
}

/// Charge un fichier TOML et fusionne avec les valeurs par défaut.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed.
///
/// # Example
/// ```no_run
/// use lg_core::config::load_config;
/// use std::path::Path;
/// let config = load_config(Path::new("config/default.toml")).unwrap();
/// ```
pub fn load_config(path: &Path) -> Result<RenderConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Impossible de lire {}", path.display()))?;
    parse_config(&content).with_context(|| format!("Config invalide : {}", path.display()))
}
