use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use lg_core::charset::{Gradient, GradientPreset};
use lg_core::config::RenderConfig;

/// lumaglyph: image and video to ASCII art.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Image (PNG, JPEG, BMP, GIF, WebP) ou vidéo à convertir.
    pub file: PathBuf,

    /// Largeur de sortie en colonnes.
    #[arg(short, long)]
    pub width: Option<u32>,

    /// Gradient prédéfini : simple, detailed, super-detailed, minimal.
    #[arg(short, long)]
    pub gradient: Option<GradientPreset>,

    /// Gradient personnalisé, du plus sombre au plus clair. Prioritaire sur --gradient.
    #[arg(long)]
    pub charset: Option<String>,

    /// Ratio largeur/hauteur d'une cellule de caractère.
    #[arg(long)]
    pub aspect: Option<f32>,

    /// Cadence de rendu vidéo.
    #[arg(long)]
    pub fps: Option<u32>,

    /// Fichier de configuration TOML.
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: PathBuf,

    /// Affiche une seule frame sur stdout puis quitte.
    #[arg(long, default_value_t = false)]
    pub once: bool,

    /// Niveau de log : error, warn, info, debug, trace.
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

impl Cli {
    /// Apply the CLI flags over `config` (defaults < TOML < CLI).
    ///
    /// # Errors
    /// Returns an error for a zero width, an empty `--charset` or a
    /// non-positive aspect ratio.
    pub fn apply_overrides(&self, mut config: RenderConfig) -> Result<RenderConfig> {
        if let Some(width) = self.width {
            config.width = width;
        }
        if let Some(preset) = self.gradient {
            config.gradient = Gradient::from_preset(preset);
        }
        if let Some(ref chars) = self.charset {
            config.gradient = Gradient::custom(chars)?;
        }
        if let Some(aspect) = self.aspect {
            config.char_aspect_ratio = aspect;
        }
        if let Some(fps) = self.fps {
            config.target_fps = fps;
        }
        config.validate()?;
        config.clamp_all();
        Ok(config)
    }
}
