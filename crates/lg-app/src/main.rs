use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use arc_swap::ArcSwap;
use clap::Parser;
use lg_core::clock::FrameClock;
use lg_core::config::RenderConfig;
use lg_core::media::MediaBlob;
use lg_session::{Session, SessionState};
use lg_source::FileDecoder;

pub mod cli;
pub mod fps;
pub mod hotreload;
pub mod viewer;

/// Délai max pour décoder la source et obtenir une première frame en mode `--once`.
const ONCE_TIMEOUT: Duration = Duration::from_secs(30);

fn main() -> Result<()> {
    // 1. Parser CLI
    let cli = Arc::new(cli::Cli::parse());

    // 2. Initialiser le logging
    env_logger::Builder::new()
        .filter_level(cli.log_level.parse().unwrap_or(log::LevelFilter::Warn))
        .init();

    // 3. Charger la config (défauts < TOML < CLI)
    let config = resolve_config(&cli)?;

    // 4. Mode one-shot : une frame sur stdout
    if cli.once {
        return print_once(&cli, config);
    }

    let config = Arc::new(ArcSwap::from_pointee(config));

    // 5. Hot-reload config (thread interne notify)
    let _watcher = if cli.config.exists() {
        Some(hotreload::spawn_config_watcher(
            &cli.config,
            Arc::clone(&cli),
            &config,
        )?)
    } else {
        None
    };

    // 6. Viewer
    let mut viewer = viewer::Viewer::new(config, cli.file.clone());
    viewer.load_file();

    let terminal = ratatui::init();
    let result = viewer.run(terminal);

    // 7. Restaurer le terminal (TOUJOURS, même en cas d'erreur)
    ratatui::restore();

    result
}

/// Resolve config: TOML file (if present) then CLI overrides.
fn resolve_config(cli: &cli::Cli) -> Result<RenderConfig> {
    let base = if cli.config.exists() {
        lg_core::config::load_config(&cli.config)?
    } else {
        log::warn!(
            "Config introuvable : {}. Utilisation des défauts.",
            cli.config.display()
        );
        RenderConfig::default()
    };
    cli.apply_overrides(base)
}

/// Décode la source, rend une frame et l'écrit sur stdout.
fn print_once(cli: &cli::Cli, config: RenderConfig) -> Result<()> {
    let blob = MediaBlob::from_path(&cli.file)?;
    let decoder = Arc::new(FileDecoder::new().with_video_loop(false));
    let mut session = Session::new(config, decoder, FrameClock::new(1));

    session.load_source(blob)?;
    let state = session
        .wait_for_load(ONCE_TIMEOUT)
        .context("Décodage trop long")??;

    // Une vidéo peut ne pas avoir encore livré sa première frame.
    if matches!(state, SessionState::Video(_)) {
        let deadline = Instant::now() + ONCE_TIMEOUT;
        while session.text().is_empty() {
            if session.render_now()? {
                break;
            }
            if session.is_ended() || Instant::now() >= deadline {
                anyhow::bail!("Aucune frame décodée depuis {}", cli.file.display());
            }
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    let text = session.text();
    let mut out = std::io::stdout().lock();
    out.write_all(text.text.as_bytes())?;
    out.flush()?;
    Ok(())
}
