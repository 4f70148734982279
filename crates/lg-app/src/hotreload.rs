use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use arc_swap::ArcSwap;
use lg_core::config::{RenderConfig, load_config};
use notify::{Event, EventKind, RecursiveMode, Watcher};

use crate::cli::Cli;

/// Lance un watcher qui recharge le fichier config et met à jour l'ArcSwap.
///
/// `overrides` est réappliqué à chaque rechargement pour que les flags CLI
/// gardent la priorité. Un fichier invalide laisse la config précédente en
/// place.
///
/// Retourne le Watcher (doit rester vivant tant que l'app tourne).
///
/// # Errors
/// Returns an error if the watcher cannot be created or the path cannot be watched.
pub fn spawn_config_watcher(
    config_path: &Path,
    overrides: Arc<Cli>,
    config: &Arc<ArcSwap<RenderConfig>>,
) -> Result<impl Watcher + use<>> {
    let config = Arc::clone(config);
    let path = config_path.to_path_buf();

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
        if let Ok(event) = res
            && matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_))
        {
            reload(&path, &overrides, &config);
        }
    })?;

    watcher.watch(config_path, RecursiveMode::NonRecursive)?;
    Ok(watcher)
}

/// Recharge `path` dans `config`. Retourne `true` si la config a été remplacée.
pub fn reload(path: &Path, overrides: &Cli, config: &ArcSwap<RenderConfig>) -> bool {
    match load_config(path).and_then(|c| overrides.apply_overrides(c)) {
        Ok(new_config) => {
            if **config.load() == new_config {
                return false;
            }
            config.store(Arc::new(new_config));
            log::info!("Config rechargée depuis {}", path.display());
            true
        }
        Err(e) => {
            // On garde l'ancienne config. Pas de panic.
            log::warn!("Erreur de rechargement config : {e:#}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use lg_core::charset::GradientPreset;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("lumaglyph").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn reload_replaces_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lumaglyph.toml");
        std::fs::write(&path, "[render]\nwidth = 42\ngradient = \"Detailed\"\n").unwrap();

        let shared = ArcSwap::from_pointee(RenderConfig::default());
        assert!(reload(&path, &cli(&["a.png"]), &shared));
        assert_eq!(shared.load().width, 42);
        assert_eq!(shared.load().gradient.preset(), Some(GradientPreset::Detailed));

        // unchanged content is not a new config
        assert!(!reload(&path, &cli(&["a.png"]), &shared));
    }

    #[test]
    fn cli_flags_survive_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lumaglyph.toml");
        std::fs::write(&path, "[render]\nwidth = 42\n").unwrap();

        let shared = ArcSwap::from_pointee(RenderConfig::default());
        reload(&path, &cli(&["a.png", "--width", "7"]), &shared);
        assert_eq!(shared.load().width, 7);
    }

    #[test]
    fn broken_file_keeps_previous() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lumaglyph.toml");
        std::fs::write(&path, "[render]\nwidth = 0\n").unwrap();

        let previous = RenderConfig {
            width: 55,
            ..RenderConfig::default()
        };
        let shared = ArcSwap::from_pointee(previous.clone());
        assert!(!reload(&path, &cli(&["a.png"]), &shared));
        assert_eq!(**shared.load(), previous);

        std::fs::write(&path, "not = [toml").unwrap();
        assert!(!reload(&path, &cli(&["a.png"]), &shared));
        assert_eq!(**shared.load(), previous);
    }
}
