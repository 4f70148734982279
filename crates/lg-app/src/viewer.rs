use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use arc_swap::ArcSwap;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use lg_core::clock::FrameClock;
use lg_core::config::RenderConfig;
use lg_core::media::MediaBlob;
use lg_session::{Playback, Session, SessionState};
use lg_source::FileDecoder;
use ratatui::layout::{Constraint, Layout};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::{DefaultTerminal, Frame};

use crate::fps::FpsCounter;

/// Attente max sans événement : décodage et rechargement config sont interrogés à ce rythme.
const IDLE_POLL: Duration = Duration::from_millis(100);

/// Terminal viewer around one [`Session`].
pub struct Viewer {
    session: Session<FrameClock>,
    config: Arc<ArcSwap<RenderConfig>>,
    /// Dernière config appliquée à la session (comparée par pointeur).
    applied: Arc<RenderConfig>,
    path: PathBuf,
    last_error: Option<String>,
    fps: FpsCounter,
    quitting: bool,
}

impl Viewer {
    /// Build the viewer and its session from the shared config.
    #[must_use]
    pub fn new(config: Arc<ArcSwap<RenderConfig>>, path: PathBuf) -> Self {
        let applied = config.load_full();
        let decoder = Arc::new(FileDecoder::new().with_video_loop(applied.loop_video));
        let session = Session::new(
            (*applied).clone(),
            decoder,
            FrameClock::new(applied.target_fps),
        );
        Self {
            session,
            config,
            applied,
            path,
            last_error: None,
            fps: FpsCounter::new(30),
            quitting: false,
        }
    }

    /// (Re)lit le fichier et lance son décodage.
    pub fn load_file(&mut self) {
        self.fps.clear();
        let result = MediaBlob::from_path(&self.path)
            .and_then(|blob| self.session.load_source(blob).map_err(anyhow::Error::from));
        match result {
            Ok(()) => self.last_error = None,
            Err(e) => {
                log::warn!("Chargement impossible : {e:#}");
                self.last_error = Some(format!("{e:#}"));
            }
        }
    }

    /// Main loop: decode results, config changes, due frames, input.
    ///
    /// # Errors
    /// Returns an error if terminal operations fail.
    pub fn run(&mut self, mut terminal: DefaultTerminal) -> Result<()> {
        while !self.quitting {
            self.poll_load();
            self.apply_config();
            self.fire_due_frames();

            terminal.draw(|frame| self.draw(frame))?;

            let timeout = self
                .session
                .scheduler()
                .next_deadline()
                .map_or(IDLE_POLL, |at| at.saturating_duration_since(Instant::now()))
                .min(IDLE_POLL);
            if event::poll(timeout)? {
                self.handle_event(&event::read()?);
            }
        }
        Ok(())
    }

    fn poll_load(&mut self) {
        match self.session.poll() {
            Some(Ok(state)) => {
                log::info!("Source prête : {state:?}");
                self.last_error = None;
            }
            Some(Err(e)) => self.last_error = Some(e.to_string()),
            None => {}
        }
    }

    /// Applique une config rechargée (hot-reload) à la session.
    fn apply_config(&mut self) {
        let current = self.config.load_full();
        if Arc::ptr_eq(&current, &self.applied) {
            return;
        }
        if current.target_fps != self.applied.target_fps {
            self.session.scheduler_mut().set_fps(current.target_fps);
        }
        if current.loop_video != self.applied.loop_video {
            // Effectif au prochain chargement.
            self.session
                .set_decoder(Arc::new(FileDecoder::new().with_video_loop(current.loop_video)));
        }
        if let Err(e) = self.session.set_config((*current).clone()) {
            log::warn!("Config refusée : {e}");
            self.last_error = Some(e.to_string());
        }
        self.applied = current;
    }

    fn fire_due_frames(&mut self) {
        let now = Instant::now();
        while let Some(id) = self.session.scheduler_mut().take_due(now) {
            if self.session.on_animation_frame(id) {
                self.fps.tick();
            }
        }
    }

    fn handle_event(&mut self, event: &Event) {
        if let Event::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            ..
        }) = event
        {
            match code {
                KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                    self.quitting = true;
                }
                KeyCode::Char('q') | KeyCode::Esc => self.quitting = true,
                KeyCode::Char(' ') => match self.session.toggle_play() {
                    Ok(Playback::Paused) => self.fps.clear(),
                    Ok(Playback::Playing) => {}
                    Err(e) => self.last_error = Some(e.to_string()),
                },
                KeyCode::Char('r') => {
                    self.session.reset();
                    self.fps.clear();
                    self.last_error = None;
                }
                KeyCode::Char('l') => self.load_file(),
                _ => {}
            }
        }
    }

    fn draw(&self, frame: &mut Frame) {
        let [canvas, status] =
            Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).areas(frame.area());

        let text = self.session.text();
        frame.render_widget(Paragraph::new(text.text.as_str()), canvas);
        frame.render_widget(Paragraph::new(self.status_line()), status);
    }

    fn status_line(&self) -> Line<'static> {
        let state = if self.session.is_loading() {
            "Chargement…".to_string()
        } else {
            match self.session.state() {
                SessionState::Empty => "Vide".to_string(),
                SessionState::Image => "Image".to_string(),
                SessionState::Video(Playback::Playing) if self.session.is_ended() => {
                    "Vidéo (fin)".to_string()
                }
                SessionState::Video(Playback::Playing) => {
                    format!("▶ {:.0} fps", self.fps.fps())
                }
                SessionState::Video(Playback::Paused) => "⏸ Pause".to_string(),
            }
        };
        let config = self.session.config();
        let name = self.session.source_name().unwrap_or("-").to_string();

        let mut spans = vec![
            Span::styled(format!(" {state} "), Style::default().fg(Color::Green)),
            Span::raw(format!("│ {name} │ W:{} │ G:{} ", config.width, config.gradient.label())),
            Span::styled(
                "│ Espace play/pause · r reset · l recharger · q quitter ",
                Style::default().fg(Color::DarkGray),
            ),
        ];
        if let Some(ref err) = self.last_error {
            spans.push(Span::styled(format!("│ {err}"), Style::default().fg(Color::Red)));
        }
        Line::from(spans)
    }
}
