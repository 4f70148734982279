use thiserror::Error;

/// Errors shared by every lumaglyph crate.
///
/// All of them are recoverable: the session keeps its previous state when one
/// is returned.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    /// The media could not be decoded (corrupt or unsupported file).
    #[error("Décodage impossible : {reason}")]
    DecodeFailure {
        /// Human-readable cause reported by the decoder.
        reason: String,
    },

    /// A render was requested while no source is loaded.
    #[error("Aucune source chargée")]
    EmptySource,

    /// Output width outside `1..=MAX_WIDTH` columns.
    #[error("Largeur invalide : {0} (1 à {max})", max = crate::config::MAX_WIDTH)]
    InvalidWidth(u32),

    /// A gradient needs at least one character.
    #[error("Gradient vide")]
    EmptyGradient,

    /// Preset name not recognised.
    #[error("Gradient inconnu : {0}")]
    UnknownGradient(String),

    /// Invalid width/height dimensions.
    #[error("Dimensions invalides : {width}×{height}")]
    InvalidDimensions {
        /// Width value.
        width: u32,
        /// Height value.
        height: u32,
    },

    /// Play/pause requested on something that is not a loaded video.
    #[error("Lecture impossible : aucune vidéo chargée")]
    NotPlayable,

    /// Invalid configuration value or structure.
    #[error("Configuration invalide : {0}")]
    Config(String),
}

impl CoreError {
    /// Shorthand for a [`CoreError::DecodeFailure`].
    ///
    /// # Example
    /// ```
    /// use lg_core::error::CoreError;
    /// let e = CoreError::decode("truncated PNG");
    /// assert_eq!(e.to_string(), "Décodage impossible : truncated PNG");
    /// ```
    #[must_use]
    pub fn decode(reason: impl Into<String>) -> Self {
        Self::DecodeFailure {
            reason: reason.into(),
        }
    }
}
