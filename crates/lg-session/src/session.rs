use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use flume::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use lg_ascii::Rasterizer;
use lg_core::charset::Gradient;
use lg_core::clock::FrameRequestId;
use lg_core::config::{MAX_WIDTH, RenderConfig};
use lg_core::error::CoreError;
use lg_core::frame::{FrameBuffer, RenderedText};
use lg_core::media::MediaBlob;
use lg_core::traits::{FrameScheduler, MediaDecoder, Source};

/// Play state of a loaded video.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Playback {
    Playing,
    Paused,
}

/// Session state machine.
///
/// `Empty → Image | Video(Playing|Paused)`; `reset()` returns to `Empty`
/// from anywhere.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing loaded (also while a decode is in flight).
    Empty,
    /// Still image, rendered once per config change.
    Image,
    /// Video stream, re-rendered on every frame tick while playing.
    Video(Playback),
}

/// Résultat d'un décodage, étiqueté par génération de chargement.
struct DecodeMessage {
    generation: u64,
    result: Result<Box<dyn Source>, CoreError>,
}

/// Holds the current source, drives its render loop and publishes the text.
///
/// All methods run on the host thread. Decoding happens on a worker thread;
/// the host collects the outcome with [`Session::poll`] or
/// [`Session::wait_for_load`]. Video frames are driven by the scheduler `S`:
/// the host calls [`Session::on_animation_frame`] when a request is due.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use lg_core::clock::FrameClock;
/// use lg_core::config::RenderConfig;
/// use lg_session::{Session, SessionState};
/// use lg_source::FileDecoder;
///
/// let session = Session::new(RenderConfig::default(), Arc::new(FileDecoder::new()), FrameClock::new(30));
/// assert_eq!(session.state(), SessionState::Empty);
/// assert!(session.text().is_empty());
/// ```
pub struct Session<S: FrameScheduler> {
    config: RenderConfig,
    state: SessionState,
    source: Option<Box<dyn Source>>,
    source_name: Option<String>,
    /// Seule requête de frame en attente (au plus une).
    pending_frame: Option<FrameRequestId>,
    scheduler: S,
    rasterizer: Rasterizer,
    output: Arc<ArcSwap<RenderedText>>,
    decoder: Arc<dyn MediaDecoder>,
    decode_tx: Sender<DecodeMessage>,
    decode_rx: Receiver<DecodeMessage>,
    /// Incrémentée à chaque load/reset ; invalide les décodages en vol.
    generation: u64,
    loading: bool,
    frames_rendered: u64,
    /// Dernière frame rendue ; re-rendue telle quelle tant que la vidéo est en pause.
    shown_frame: Option<Arc<FrameBuffer>>,
}

impl<S: FrameScheduler> Session<S> {
    /// Create an empty session.
    #[must_use]
    pub fn new(config: RenderConfig, decoder: Arc<dyn MediaDecoder>, scheduler: S) -> Self {
        let (decode_tx, decode_rx) = flume::unbounded();
        Self {
            config,
            state: SessionState::Empty,
            source: None,
            source_name: None,
            pending_frame: None,
            scheduler,
            rasterizer: Rasterizer::new(),
            output: Arc::new(ArcSwap::from_pointee(RenderedText::default())),
            decoder,
            decode_tx,
            decode_rx,
            generation: 0,
            loading: false,
            frames_rendered: 0,
            shown_frame: None,
        }
    }

    // === Accès ===

    /// Current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Shared handle on the published text; readers never block the session.
    #[must_use]
    pub fn output(&self) -> Arc<ArcSwap<RenderedText>> {
        Arc::clone(&self.output)
    }

    /// Latest published text.
    #[must_use]
    pub fn text(&self) -> Arc<RenderedText> {
        self.output.load_full()
    }

    /// `true` while a decode started by [`Self::load_source`] is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Name of the loaded (or loading) blob.
    #[must_use]
    pub fn source_name(&self) -> Option<&str> {
        self.source_name.as_deref()
    }

    /// `true` once a non-looping video has delivered its last frame.
    #[must_use]
    pub fn is_ended(&self) -> bool {
        self.source.as_ref().is_some_and(|s| s.is_ended())
    }

    /// The outstanding frame request, if any.
    #[must_use]
    pub fn pending_frame(&self) -> Option<FrameRequestId> {
        self.pending_frame
    }

    /// Number of successful renders since creation.
    #[must_use]
    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    /// The frame scheduler.
    #[must_use]
    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    /// Mutable access to the scheduler, for hosts that poll it.
    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    /// Swap the decoder used by later loads; the current source is kept.
    pub fn set_decoder(&mut self, decoder: Arc<dyn MediaDecoder>) {
        self.decoder = decoder;
    }

    // === Chargement ===

    /// Reset, then decode `blob` on a worker thread.
    ///
    /// The outcome is delivered by [`Self::poll`] / [`Self::wait_for_load`].
    ///
    /// # Errors
    /// [`CoreError::DecodeFailure`] if the worker thread cannot be spawned.
    pub fn load_source(&mut self, blob: MediaBlob) -> Result<(), CoreError> {
        self.reset();
        let generation = self.generation;
        let decoder = Arc::clone(&self.decoder);
        let tx = self.decode_tx.clone();
        self.source_name = blob.name.clone();

        log::info!("Chargement de {} ({:?})", blob.display_name(), blob.kind());
        std::thread::Builder::new()
            .name("lg-decode".to_string())
            .spawn(move || {
                let result = decoder.decode(blob);
                // Session détruite entre-temps : rien à faire.
                let _ = tx.send(DecodeMessage { generation, result });
            })
            .map_err(|e| CoreError::decode(format!("thread de décodage : {e}")))?;

        self.loading = true;
        Ok(())
    }

    /// Collect a finished decode without blocking.
    ///
    /// Returns `None` when nothing relevant finished, `Some(Ok(state))` once
    /// the source is loaded, `Some(Err(_))` for a decode failure (the session
    /// stays `Empty`). Results of superseded loads are dropped silently.
    pub fn poll(&mut self) -> Option<Result<SessionState, CoreError>> {
        loop {
            match self.decode_rx.try_recv() {
                Ok(msg) => {
                    if let Some(outcome) = self.apply_decode(msg) {
                        return Some(outcome);
                    }
                }
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => return None,
            }
        }
    }

    /// Block until the current load finishes or `timeout` elapses.
    ///
    /// Returns `None` when no load is in flight or on timeout.
    pub fn wait_for_load(&mut self, timeout: Duration) -> Option<Result<SessionState, CoreError>> {
        let deadline = Instant::now() + timeout;
        while self.loading {
            let remaining = deadline.checked_duration_since(Instant::now())?;
            match self.decode_rx.recv_timeout(remaining) {
                Ok(msg) => {
                    if let Some(outcome) = self.apply_decode(msg) {
                        return Some(outcome);
                    }
                }
                Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => return None,
            }
        }
        None
    }

    fn apply_decode(&mut self, msg: DecodeMessage) -> Option<Result<SessionState, CoreError>> {
        if msg.generation != self.generation || !self.loading {
            log::debug!(
                "Décodage obsolète ignoré (génération {} ≠ {})",
                msg.generation,
                self.generation
            );
            return None;
        }
        self.loading = false;

        let mut source = match msg.result {
            Ok(source) => source,
            Err(e) => {
                log::warn!("Échec du chargement : {e}");
                self.source_name = None;
                return Some(Err(e));
            }
        };

        if source.is_live() {
            source.set_playing(true);
            self.source = Some(source);
            self.state = SessionState::Video(Playback::Playing);
            log::info!("Vidéo chargée, lecture démarrée");
            self.render_logged();
            self.schedule_next();
        } else {
            self.source = Some(source);
            self.state = SessionState::Image;
            log::info!("Image chargée");
            self.render_logged();
        }
        Some(Ok(self.state))
    }

    // === Transitions ===

    /// Flip Playing/Paused on a loaded video.
    ///
    /// Pausing cancels the pending frame request; resuming renders at once and
    /// schedules the next frame.
    ///
    /// # Errors
    /// [`CoreError::NotPlayable`] unless a video is loaded.
    pub fn toggle_play(&mut self) -> Result<Playback, CoreError> {
        let SessionState::Video(playback) = self.state else {
            return Err(CoreError::NotPlayable);
        };
        let next = match playback {
            Playback::Playing => Playback::Paused,
            Playback::Paused => Playback::Playing,
        };
        if let Some(source) = self.source.as_mut() {
            source.set_playing(next == Playback::Playing);
        }
        self.state = SessionState::Video(next);

        match next {
            Playback::Paused => {
                self.cancel_pending();
                log::debug!("Lecture en pause");
            }
            Playback::Playing => {
                self.render_logged();
                self.schedule_next();
                log::debug!("Lecture reprise");
            }
        }
        Ok(next)
    }

    /// Back to `Empty`: clears the text, drops the source, cancels the frame
    /// request and invalidates any in-flight decode.
    pub fn reset(&mut self) {
        self.cancel_pending();
        self.shown_frame = None;
        if self.source.take().is_some() {
            log::debug!("Source libérée");
        }
        self.generation += 1;
        self.loading = false;
        self.source_name = None;
        self.state = SessionState::Empty;
        self.output.store(Arc::new(RenderedText::default()));
    }

    // === Configuration ===

    /// Change the output width; re-renders once if a source is loaded.
    ///
    /// # Errors
    /// [`CoreError::InvalidWidth`] outside `1..=MAX_WIDTH`; the previous
    /// width is kept.
    pub fn set_width(&mut self, width: u32) -> Result<(), CoreError> {
        if width == 0 || width > MAX_WIDTH {
            return Err(CoreError::InvalidWidth(width));
        }
        if self.config.width != width {
            self.config.width = width;
            self.rerender_if_loaded();
        }
        Ok(())
    }

    /// Replace the active gradient; re-renders once if a source is loaded.
    pub fn set_gradient(&mut self, gradient: Gradient) {
        if self.config.gradient != gradient {
            self.config.gradient = gradient;
            self.rerender_if_loaded();
        }
    }

    /// Replace the whole configuration.
    ///
    /// # Errors
    /// Validation errors from [`RenderConfig::validate`]; the previous
    /// configuration is kept.
    pub fn set_config(&mut self, config: RenderConfig) -> Result<(), CoreError> {
        config.validate()?;
        if self.config != config {
            self.config = config;
            self.rerender_if_loaded();
        }
        Ok(())
    }

    // === Rendu ===

    /// Render the current source now.
    ///
    /// Returns `Ok(false)` when the source has no frame yet (video still
    /// buffering). A paused video re-renders the frame already on screen.
    ///
    /// # Errors
    /// [`CoreError::EmptySource`] when nothing is loaded, rasterizer errors
    /// otherwise.
    pub fn render_now(&mut self) -> Result<bool, CoreError> {
        let source = self.source.as_mut().ok_or(CoreError::EmptySource)?;
        let frame = match (self.state, &self.shown_frame) {
            (SessionState::Video(Playback::Paused), Some(shown)) => Some(Arc::clone(shown)),
            _ => source.next_frame(),
        };
        let Some(frame) = frame else {
            return Ok(false);
        };
        let native = source.native_size();
        let text = self.rasterizer.render_with(&frame, native, &self.config)?;
        self.output.store(Arc::new(text));
        self.shown_frame = Some(frame);
        self.frames_rendered += 1;
        Ok(true)
    }

    /// Host callback for a due frame request.
    ///
    /// Ignored unless `id` is the outstanding request. Renders the latest
    /// video frame and requests the next one while the video plays and has
    /// not ended. Returns `true` if a frame was rendered.
    pub fn on_animation_frame(&mut self, id: FrameRequestId) -> bool {
        if self.pending_frame != Some(id) {
            log::trace!("Requête de frame périmée : {id:?}");
            return false;
        }
        self.pending_frame = None;

        if self.state != SessionState::Video(Playback::Playing) {
            return false;
        }
        let rendered = self.render_logged();
        if self.is_ended() {
            log::info!("Fin de la vidéo, boucle de rendu arrêtée");
            return rendered;
        }
        self.schedule_next();
        rendered
    }

    fn rerender_if_loaded(&mut self) {
        if self.state != SessionState::Empty {
            self.render_logged();
        }
    }

    /// Render, logging instead of propagating. An empty session is a no-op.
    fn render_logged(&mut self) -> bool {
        match self.render_now() {
            Ok(rendered) => rendered,
            Err(CoreError::EmptySource) => false,
            Err(e) => {
                log::warn!("Rendu impossible : {e}");
                false
            }
        }
    }

    fn schedule_next(&mut self) {
        self.cancel_pending();
        self.pending_frame = Some(self.scheduler.request_frame());
    }

    fn cancel_pending(&mut self) {
        if let Some(id) = self.pending_frame.take() {
            self.scheduler.cancel_frame(id);
        }
    }
}

impl<S: FrameScheduler> Drop for Session<S> {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    use lg_core::charset::GradientPreset;

    const WAIT: Duration = Duration::from_secs(5);

    /// Minuteur manuel : compte les requêtes actives.
    #[derive(Default)]
    struct ManualScheduler {
        next: u64,
        active: Vec<FrameRequestId>,
        total_requested: usize,
    }

    impl FrameScheduler for ManualScheduler {
        fn request_frame(&mut self) -> FrameRequestId {
            self.next += 1;
            self.total_requested += 1;
            let id = FrameRequestId(self.next);
            self.active.push(id);
            id
        }

        fn cancel_frame(&mut self, id: FrameRequestId) {
            self.active.retain(|&a| a != id);
        }
    }

    impl ManualScheduler {
        /// Fire the oldest request, as the host timer would.
        fn fire(&mut self) -> Option<FrameRequestId> {
            (!self.active.is_empty()).then(|| self.active.remove(0))
        }
    }

    struct Still(Arc<FrameBuffer>);

    impl Source for Still {
        fn next_frame(&mut self) -> Option<Arc<FrameBuffer>> {
            Some(Arc::clone(&self.0))
        }
        fn native_size(&self) -> (u32, u32) {
            (self.0.width, self.0.height)
        }
        fn is_live(&self) -> bool {
            false
        }
    }

    #[derive(Clone, Default)]
    struct VideoFlags {
        playing: Arc<AtomicBool>,
        ended: Arc<AtomicBool>,
        dropped: Arc<AtomicBool>,
        /// Frame décodée en retard, livrée au prochain `next_frame`.
        queued: Arc<Mutex<Option<Arc<FrameBuffer>>>>,
    }

    struct FakeVideo {
        frame: Option<Arc<FrameBuffer>>,
        flags: VideoFlags,
    }

    impl Source for FakeVideo {
        fn next_frame(&mut self) -> Option<Arc<FrameBuffer>> {
            if let Some(newer) = self.flags.queued.lock().unwrap().take() {
                self.frame = Some(newer);
            }
            self.frame.clone()
        }
        fn native_size(&self) -> (u32, u32) {
            (8, 6)
        }
        fn is_live(&self) -> bool {
            true
        }
        fn set_playing(&mut self, playing: bool) {
            self.flags.playing.store(playing, Ordering::SeqCst);
        }
        fn is_ended(&self) -> bool {
            self.flags.ended.load(Ordering::SeqCst)
        }
    }

    impl Drop for FakeVideo {
        fn drop(&mut self) {
            self.flags.dropped.store(true, Ordering::SeqCst);
        }
    }

    /// Décodeur de test : le MIME choisit le résultat.
    #[derive(Default)]
    struct FakeDecoder {
        video: VideoFlags,
        gate: Option<Receiver<()>>,
    }

    impl MediaDecoder for FakeDecoder {
        fn decode(&self, blob: MediaBlob) -> Result<Box<dyn Source>, CoreError> {
            if let Some(gate) = &self.gate {
                let _ = gate.recv();
            }
            match blob.mime.as_deref() {
                Some("image/white") => Ok(Box::new(Still(Arc::new(FrameBuffer::solid(
                    2,
                    2,
                    (255, 255, 255),
                ))))),
                Some("image/black") => Ok(Box::new(Still(Arc::new(FrameBuffer::solid(
                    8,
                    6,
                    (0, 0, 0),
                ))))),
                Some("video/black") => Ok(Box::new(FakeVideo {
                    frame: Some(Arc::new(FrameBuffer::solid(8, 6, (0, 0, 0)))),
                    flags: self.video.clone(),
                })),
                Some("video/buffering") => Ok(Box::new(FakeVideo {
                    frame: None,
                    flags: self.video.clone(),
                })),
                _ => Err(CoreError::decode("format inconnu")),
            }
        }
    }

    fn blob(mime: &str) -> MediaBlob {
        MediaBlob::new(vec![0], Some(mime))
    }

    fn config(width: u32) -> RenderConfig {
        RenderConfig {
            width,
            ..RenderConfig::default()
        }
    }

    fn session_with(decoder: FakeDecoder, width: u32) -> Session<ManualScheduler> {
        Session::new(config(width), Arc::new(decoder), ManualScheduler::default())
    }

    fn loaded(decoder: FakeDecoder, mime: &str, width: u32) -> Session<ManualScheduler> {
        let mut s = session_with(decoder, width);
        s.load_source(blob(mime)).unwrap();
        assert!(s.is_loading());
        s.wait_for_load(WAIT).unwrap().unwrap();
        s
    }

    #[test]
    fn image_load_renders_once() {
        let s = loaded(FakeDecoder::default(), "image/white", 4);
        assert_eq!(s.state(), SessionState::Image);
        assert!(!s.is_loading());
        assert_eq!(s.text().text, "    \n");
        assert_eq!(s.frames_rendered(), 1);
        assert_eq!(s.scheduler().total_requested, 0);
    }

    #[test]
    fn render_on_empty_session_is_empty_source() {
        let mut s = session_with(FakeDecoder::default(), 4);
        assert_eq!(s.render_now(), Err(CoreError::EmptySource));
        // implicit renders stay silent
        s.set_width(10).unwrap();
        s.set_gradient(Gradient::from_preset(GradientPreset::Minimal));
        assert!(s.text().is_empty());
        assert_eq!(s.state(), SessionState::Empty);
    }

    #[test]
    fn zero_width_is_rejected_and_previous_kept() {
        let mut s = loaded(FakeDecoder::default(), "image/white", 4);
        assert_eq!(s.set_width(0), Err(CoreError::InvalidWidth(0)));
        assert_eq!(s.config().width, 4);
        assert_eq!(s.text().text, "    \n");
    }

    #[test]
    fn config_changes_rerender_loaded_image() {
        let mut s = loaded(FakeDecoder::default(), "image/black", 6);
        assert!(s.text().lines().all(|l| l == "@@@@@@"));

        s.set_gradient(Gradient::custom("x").unwrap());
        assert!(s.text().lines().all(|l| l == "xxxxxx"));

        s.set_width(12).unwrap();
        let t = s.text();
        assert_eq!(t.columns, 12);
        assert_eq!(t.rows, 3);
        assert_eq!(s.frames_rendered(), 3);
    }

    #[test]
    fn set_config_validates() {
        let mut s = loaded(FakeDecoder::default(), "image/white", 4);
        let bad = RenderConfig {
            char_aspect_ratio: 0.0,
            ..config(4)
        };
        assert!(matches!(s.set_config(bad), Err(CoreError::Config(_))));
        assert_eq!(s.config(), &config(4));

        let good = RenderConfig {
            char_aspect_ratio: 1.0,
            ..config(2)
        };
        s.set_config(good).unwrap();
        assert_eq!(s.text().text, "  \n  \n");
    }

    #[test]
    fn video_load_starts_single_loop() {
        let decoder = FakeDecoder::default();
        let flags = decoder.video.clone();
        let mut s = loaded(decoder, "video/black", 6);

        assert_eq!(s.state(), SessionState::Video(Playback::Playing));
        assert!(flags.playing.load(Ordering::SeqCst));
        assert_eq!(s.scheduler().active.len(), 1);
        assert_eq!(s.frames_rendered(), 1);

        for _ in 0..5 {
            let id = s.scheduler_mut().fire().unwrap();
            assert!(s.on_animation_frame(id));
            assert_eq!(s.scheduler().active.len(), 1);
        }
        assert_eq!(s.frames_rendered(), 6);
        assert!(s.text().lines().all(|l| l == "@@@@@@"));
    }

    #[test]
    fn double_toggle_restores_play_state_without_leaking() {
        let decoder = FakeDecoder::default();
        let flags = decoder.video.clone();
        let mut s = loaded(decoder, "video/black", 6);

        assert_eq!(s.toggle_play(), Ok(Playback::Paused));
        assert_eq!(s.scheduler().active.len(), 0);
        assert!(s.pending_frame().is_none());
        assert!(!flags.playing.load(Ordering::SeqCst));

        assert_eq!(s.toggle_play(), Ok(Playback::Playing));
        assert_eq!(s.state(), SessionState::Video(Playback::Playing));
        assert_eq!(s.scheduler().active.len(), 1);
        assert!(flags.playing.load(Ordering::SeqCst));

        // many toggles never leave more than one request behind
        for _ in 0..10 {
            s.toggle_play().unwrap();
        }
        assert_eq!(s.scheduler().active.len(), 1);
    }

    #[test]
    fn stale_frame_callbacks_are_ignored() {
        let mut s = loaded(FakeDecoder::default(), "video/black", 6);
        let first = s.pending_frame().unwrap();
        s.toggle_play().unwrap();
        s.toggle_play().unwrap();
        let rendered = s.frames_rendered();

        assert!(!s.on_animation_frame(first));
        assert_eq!(s.frames_rendered(), rendered);
        assert_eq!(s.scheduler().active.len(), 1);
    }

    #[test]
    fn paused_video_does_not_tick() {
        let mut s = loaded(FakeDecoder::default(), "video/black", 6);
        let id = s.pending_frame().unwrap();
        s.toggle_play().unwrap();
        assert!(!s.on_animation_frame(id));
        assert_eq!(s.scheduler().active.len(), 0);
    }

    #[test]
    fn config_change_while_playing_keeps_one_loop() {
        let mut s = loaded(FakeDecoder::default(), "video/black", 6);
        s.set_width(12).unwrap();
        s.set_gradient(Gradient::custom("#").unwrap());
        assert_eq!(s.scheduler().active.len(), 1);
        assert_eq!(s.state(), SessionState::Video(Playback::Playing));
        assert!(s.text().lines().all(|l| l == "############"));
    }

    #[test]
    fn config_change_while_paused_rerenders_last_frame() {
        let mut s = loaded(FakeDecoder::default(), "video/black", 6);
        s.toggle_play().unwrap();
        s.set_gradient(Gradient::custom("%").unwrap());
        assert_eq!(s.state(), SessionState::Video(Playback::Paused));
        assert_eq!(s.scheduler().active.len(), 0);
        assert!(s.text().lines().all(|l| l == "%%%%%%"));
    }

    #[test]
    fn paused_video_rerenders_the_frame_on_screen() {
        let decoder = FakeDecoder::default();
        let flags = decoder.video.clone();
        let mut s = loaded(decoder, "video/black", 6);
        s.set_gradient(Gradient::custom("@ ").unwrap());
        assert!(s.text().lines().all(|l| l == "@@@@@@"));

        s.toggle_play().unwrap();
        // a frame decoded before the pause reached the decoder
        let white = Arc::new(FrameBuffer::solid(8, 6, (255, 255, 255)));
        *flags.queued.lock().unwrap() = Some(white);

        s.set_gradient(Gradient::custom("# ").unwrap());
        assert!(s.text().lines().all(|l| l == "######"));
        s.set_width(12).unwrap();
        assert!(s.text().lines().all(|l| l == "############"));

        // resuming picks up the newer frame
        s.toggle_play().unwrap();
        assert!(s.text().lines().all(|l| l == " ".repeat(12)));
    }

    #[test]
    fn width_above_maximum_is_rejected() {
        let mut s = loaded(FakeDecoder::default(), "image/white", 4);
        assert_eq!(
            s.set_width(MAX_WIDTH + 1),
            Err(CoreError::InvalidWidth(MAX_WIDTH + 1))
        );
        assert_eq!(s.config().width, 4);
        assert_eq!(s.text().text, "    \n");
    }

    #[test]
    fn ended_video_stops_rescheduling() {
        let decoder = FakeDecoder::default();
        let flags = decoder.video.clone();
        let mut s = loaded(decoder, "video/black", 6);
        flags.ended.store(true, Ordering::SeqCst);

        let id = s.scheduler_mut().fire().unwrap();
        assert!(s.on_animation_frame(id));
        assert!(s.is_ended());
        assert_eq!(s.scheduler().active.len(), 0);
    }

    #[test]
    fn buffering_video_keeps_ticking_without_text() {
        let mut s = loaded(FakeDecoder::default(), "video/buffering", 6);
        assert!(s.text().is_empty());
        let id = s.scheduler_mut().fire().unwrap();
        assert!(!s.on_animation_frame(id));
        assert_eq!(s.scheduler().active.len(), 1);
        assert_eq!(s.render_now(), Ok(false));
    }

    #[test]
    fn reset_clears_everything() {
        let decoder = FakeDecoder::default();
        let flags = decoder.video.clone();
        let mut s = loaded(decoder, "video/black", 6);
        s.reset();

        assert_eq!(s.state(), SessionState::Empty);
        assert!(s.text().is_empty());
        assert_eq!(s.scheduler().active.len(), 0);
        assert!(flags.dropped.load(Ordering::SeqCst));
        assert_eq!(s.toggle_play(), Err(CoreError::NotPlayable));
        // reset is valid from Empty too
        s.reset();
        assert_eq!(s.state(), SessionState::Empty);
    }

    #[test]
    fn decode_failure_leaves_session_empty() {
        let mut s = session_with(FakeDecoder::default(), 4);
        s.load_source(blob("application/x-corrupt")).unwrap();
        let outcome = s.wait_for_load(WAIT).unwrap();
        assert!(matches!(outcome, Err(CoreError::DecodeFailure { .. })));
        assert_eq!(s.state(), SessionState::Empty);
        assert!(!s.is_loading());
        // no automatic retry
        assert!(s.wait_for_load(Duration::from_millis(50)).is_none());
        assert!(s.poll().is_none());
    }

    #[test]
    fn toggle_on_image_is_not_playable() {
        let mut s = loaded(FakeDecoder::default(), "image/white", 4);
        assert_eq!(s.toggle_play(), Err(CoreError::NotPlayable));
        assert_eq!(s.state(), SessionState::Image);
    }

    #[test]
    fn loading_replaces_previous_source() {
        let decoder = FakeDecoder::default();
        let flags = decoder.video.clone();
        let mut s = loaded(decoder, "video/black", 6);

        s.load_source(blob("image/white")).unwrap();
        // reset happens before decoding starts
        assert_eq!(s.state(), SessionState::Empty);
        assert!(s.text().is_empty());
        assert!(flags.dropped.load(Ordering::SeqCst));
        assert_eq!(s.scheduler().active.len(), 0);

        assert_eq!(s.wait_for_load(WAIT), Some(Ok(SessionState::Image)));
        assert_eq!(s.scheduler().active.len(), 0);
    }

    #[test]
    fn superseded_decode_is_discarded() {
        let (gate_tx, gate_rx) = flume::unbounded();
        let decoder = FakeDecoder {
            gate: Some(gate_rx),
            ..FakeDecoder::default()
        };
        let mut s = session_with(decoder, 4);

        s.load_source(blob("video/black")).unwrap();
        s.load_source(blob("image/white")).unwrap();
        gate_tx.send(()).unwrap();
        gate_tx.send(()).unwrap();

        assert_eq!(s.wait_for_load(WAIT), Some(Ok(SessionState::Image)));
        // the first decode finishes eventually and must not take over
        std::thread::sleep(Duration::from_millis(50));
        assert!(s.poll().is_none());
        assert_eq!(s.state(), SessionState::Image);
        assert_eq!(s.scheduler().active.len(), 0);
    }

    #[test]
    fn reset_during_decode_discards_result() {
        let (gate_tx, gate_rx) = flume::unbounded();
        let decoder = FakeDecoder {
            gate: Some(gate_rx),
            ..FakeDecoder::default()
        };
        let mut s = session_with(decoder, 4);
        s.load_source(blob("image/white")).unwrap();
        s.reset();
        gate_tx.send(()).unwrap();

        assert!(s.wait_for_load(Duration::from_millis(100)).is_none());
        std::thread::sleep(Duration::from_millis(50));
        assert!(s.poll().is_none());
        assert_eq!(s.state(), SessionState::Empty);
    }

    #[test]
    fn output_handle_sees_updates() {
        let mut s = loaded(FakeDecoder::default(), "image/white", 4);
        let handle = s.output();
        assert_eq!(handle.load().text, "    \n");
        s.set_gradient(Gradient::custom("W").unwrap());
        assert_eq!(handle.load().text, "WWWW\n");
        s.reset();
        assert!(handle.load().is_empty());
    }

    #[test]
    fn drop_cancels_pending_request() {
        let (tx, rx) = flume::unbounded();
        struct Reporting(Sender<FrameRequestId>, u64);
        impl FrameScheduler for Reporting {
            fn request_frame(&mut self) -> FrameRequestId {
                self.1 += 1;
                FrameRequestId(self.1)
            }
            fn cancel_frame(&mut self, id: FrameRequestId) {
                let _ = self.0.send(id);
            }
        }
        let mut s = Session::new(config(6), Arc::new(FakeDecoder::default()), Reporting(tx, 0));
        s.load_source(blob("video/black")).unwrap();
        s.wait_for_load(WAIT).unwrap().unwrap();
        let pending = s.pending_frame().unwrap();
        drop(s);
        assert_eq!(rx.try_recv(), Ok(pending));
    }

    #[test]
    fn real_png_through_file_decoder() {
        let img = image::RgbImage::from_pixel(2, 2, image::Rgb([255, 255, 255]));
        let mut png = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut png, image::ImageFormat::Png)
            .unwrap();

        let mut s = Session::new(
            config(4),
            Arc::new(lg_source::FileDecoder::new()),
            ManualScheduler::default(),
        );
        s.load_source(MediaBlob::new(png.into_inner(), Some("image/png")))
            .unwrap();
        assert_eq!(s.wait_for_load(WAIT), Some(Ok(SessionState::Image)));
        assert_eq!(s.text().text, "    \n");

        s.set_gradient(Gradient::from_preset(GradientPreset::Simple));
        s.load_source(MediaBlob::new(b"garbage".to_vec(), Some("image/png")))
            .unwrap();
        assert!(matches!(
            s.wait_for_load(WAIT),
            Some(Err(CoreError::DecodeFailure { .. }))
        ));
        assert_eq!(s.state(), SessionState::Empty);
    }
}
