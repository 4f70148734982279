// Décodage vidéo via ffmpeg en subprocess (std::process::Command).
// Prérequis : `ffmpeg` et `ffprobe` accessibles dans PATH.
//
// Architecture :
//   - `probe_video`       : interroge ffprobe pour obtenir width/height/fps
//   - `spawn_ffmpeg_pipe` : lance ffmpeg → flux raw RGBA sur stdout
//   - `VideoSource`       : possède le fichier temporaire et les canaux
//   - `video_loop`        : thread dédié, lit les frames, gère les commandes

use std::io::{Read, Write};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use flume::{Receiver, Sender, TryRecvError, TrySendError};
use lg_core::frame::FrameBuffer;
use lg_core::traits::Source;
use tempfile::NamedTempFile;

/// Taille du pool de frames pré-allouées.
/// Doit être > capacité du canal pour garantir un slot libre sans allocation.
const POOL_SIZE: usize = 6;

/// Capacité du canal de frames.
const FRAME_CHANNEL_CAP: usize = 3;

/// Largeur maximale décodée ; le rasterizer rééchantillonne ensuite.
pub const MAX_DECODE_WIDTH: u32 = 640;

/// Commandes pour le thread vidéo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoCommand {
    /// Reprendre la lecture.
    Play,
    /// Mettre en pause.
    Pause,
    /// Arrêter le thread proprement.
    Quit,
}

/// Métadonnées extraites via ffprobe.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    /// Images par seconde (ex: 23.976, 24.0, 30.0).
    pub fps: f64,
}

/// Dimensions of the decoded RGBA stream for a native size.
///
/// # Example
/// ```
/// use lg_source::video::decode_size;
/// assert_eq!(decode_size(1920, 1080), (640, 360));
/// assert_eq!(decode_size(320, 240), (320, 240));
/// ```
#[must_use]
pub fn decode_size(width: u32, height: u32) -> (u32, u32) {
    if width <= MAX_DECODE_WIDTH {
        return (width.max(1), height.max(1));
    }
    let h = (u64::from(height) * u64::from(MAX_DECODE_WIDTH) / u64::from(width)) as u32;
    (MAX_DECODE_WIDTH, h.max(1))
}

/// Parse `ffprobe -of default=noprint_wrappers=1` output.
///
/// Returns `None` when no usable width/height is present.
#[must_use]
pub fn parse_probe_output(text: &str) -> Option<VideoInfo> {
    let mut width: Option<u32> = None;
    let mut height: Option<u32> = None;
    let mut fps: f64 = 30.0;

    for line in text.lines() {
        if let Some(val) = line.strip_prefix("width=") {
            width = val.trim().parse().ok();
        } else if let Some(val) = line.strip_prefix("height=") {
            height = val.trim().parse().ok();
        } else if let Some(val) = line.strip_prefix("r_frame_rate=") {
            // Format: "24/1" ou "30000/1001"
            let mut parts = val.trim().splitn(2, '/');
            let num: f64 = parts.next().and_then(|s| s.parse().ok()).unwrap_or(30.0);
            let den: f64 = parts.next().and_then(|s| s.parse().ok()).unwrap_or(1.0);
            if den > 0.0 && num > 0.0 {
                fps = num / den;
            }
        }
    }

    match (width, height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => Some(VideoInfo {
            width: w,
            height: h,
            fps,
        }),
        _ => None,
    }
}

/// Interroge `ffprobe` pour obtenir les métadonnées du flux vidéo principal.
///
/// # Errors
/// Retourne une erreur si `ffprobe` est introuvable ou si le fichier
/// ne contient aucun flux vidéo décodable.
pub fn probe_video(path: &Path) -> Result<VideoInfo> {
    let path_str = path.to_str().context("Chemin vidéo invalide (non-UTF8)")?;

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height,r_frame_rate",
            "-of",
            "default=noprint_wrappers=1",
            "-i",
            path_str,
        ])
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .output()
        .context(
            "Impossible de lancer ffprobe. Vérifiez que ffprobe est installé et dans le PATH.",
        )?;

    let text = String::from_utf8_lossy(&output.stdout);
    let info = parse_probe_output(&text)
        .with_context(|| format!("ffprobe n'a trouvé aucun flux vidéo dans {}", path.display()))?;

    log::info!(
        "probe_video: {}x{} @ {:.3}fps ({})",
        info.width,
        info.height,
        info.fps,
        path.display()
    );
    Ok(info)
}

/// Lance un processus `ffmpeg` qui écrit des frames RGBA brutes sur stdout.
///
/// Chaque frame = `w × h × 4` bytes. `-stream_loop -1` relance le flux
/// indéfiniment quand `looping` est vrai. `-an` supprime l'audio.
///
/// Retourne `None` si le spawn échoue (log::warn émis).
#[must_use]
pub fn spawn_ffmpeg_pipe(path: &Path, w: u32, h: u32, fps: u32, looping: bool) -> Option<Child> {
    let Some(path_str) = path.to_str() else {
        log::warn!("spawn_ffmpeg_pipe: chemin non-UTF8");
        return None;
    };

    let scale_filter = format!("scale={w}:{h}:flags=bilinear");
    let fps_str = fps.to_string();

    let mut cmd = Command::new("ffmpeg");
    if looping {
        cmd.args(["-stream_loop", "-1"]);
    }
    cmd.args([
        "-i",
        path_str,
        "-vf",
        &scale_filter,
        "-f",
        "rawvideo",
        "-pix_fmt",
        "rgba",
        "-r",
        &fps_str,
        "-an",
        "-hide_banner",
        "-loglevel",
        "error",
        "pipe:1",
    ]);

    match cmd
        .stdout(Stdio::piped())
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
    {
        Ok(child) => {
            log::debug!("ffmpeg spawné: {w}x{h} @ {fps}fps (loop={looping})");
            Some(child)
        }
        Err(e) => {
            log::warn!("spawn_ffmpeg_pipe: impossible de lancer ffmpeg: {e}");
            None
        }
    }
}

/// Lit exactement `buf.len()` bytes depuis `reader`.
///
/// # Errors
/// Retourne `Ok(true)` si lu avec succès, `Ok(false)` sur EOF avant complétion,
/// `Err` sur erreur I/O fatale.
pub fn read_exact_or_eof<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<bool> {
    let mut total = 0usize;
    while total < buf.len() {
        match reader.read(&mut buf[total..]) {
            Ok(0) => return Ok(false),
            Ok(n) => total += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(true)
}

/// Trouve ou crée un slot libre dans le pool.
///
/// Invariant : retourne un index `i` tel que `Arc::strong_count(&pool[i]) == 1`.
fn find_or_create_slot(pool: &mut Vec<Arc<FrameBuffer>>, w: u32, h: u32) -> usize {
    if let Some(i) = pool.iter().position(|a| Arc::strong_count(a) == 1) {
        return i;
    }
    // Pool saturé : allouer plutôt que bloquer.
    pool.push(Arc::new(FrameBuffer::new(w, h)));
    pool.len() - 1
}

/// Video stream decoded by an `ffmpeg` child process on a dedicated thread.
///
/// Dropping the source stops the thread, kills ffmpeg and deletes the
/// temporary copy of the blob.
pub struct VideoSource {
    info: VideoInfo,
    frame_rx: Receiver<Arc<FrameBuffer>>,
    cmd_tx: Sender<VideoCommand>,
    last: Option<Arc<FrameBuffer>>,
    /// En pause, les frames déjà en file restent dans le canal.
    playing: bool,
    ended: bool,
    // Lu par ffmpeg tant que le thread tourne.
    _file: NamedTempFile,
}

impl VideoSource {
    /// Copy `bytes` to a temp file, probe it and start decoding.
    ///
    /// # Errors
    /// Returns an error if the temp file cannot be written, ffprobe fails
    /// or the decoder thread cannot be spawned.
    pub fn from_bytes(bytes: &[u8], looping: bool) -> Result<Self> {
        let mut file = tempfile::Builder::new()
            .prefix("lumaglyph-")
            .tempfile()
            .context("Impossible de créer le fichier temporaire vidéo")?;
        file.write_all(bytes)
            .and_then(|()| file.flush())
            .context("Impossible d'écrire le fichier temporaire vidéo")?;

        let info = probe_video(file.path())?;
        let (frame_tx, frame_rx) = flume::bounded(FRAME_CHANNEL_CAP);
        let (cmd_tx, cmd_rx) = flume::bounded(16);

        let path = file.path().to_path_buf();
        thread::Builder::new()
            .name("lg-video".to_string())
            .spawn(move || video_loop(&path, &frame_tx, &cmd_rx, info, looping))
            .context("Impossible de spawner le thread vidéo")?;

        Ok(Self {
            info,
            frame_rx,
            cmd_tx,
            last: None,
            playing: true,
            ended: false,
            _file: file,
        })
    }
}

impl Source for VideoSource {
    fn next_frame(&mut self) -> Option<Arc<FrameBuffer>> {
        if !self.playing {
            return self.last.clone();
        }
        loop {
            match self.frame_rx.try_recv() {
                Ok(frame) => self.last = Some(frame),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if !self.ended {
                        log::info!("Flux vidéo terminé");
                    }
                    self.ended = true;
                    break;
                }
            }
        }
        self.last.clone()
    }

    fn native_size(&self) -> (u32, u32) {
        (self.info.width, self.info.height)
    }

    fn is_live(&self) -> bool {
        true
    }

    fn set_playing(&mut self, playing: bool) {
        self.playing = playing;
        let cmd = if playing {
            VideoCommand::Play
        } else {
            VideoCommand::Pause
        };
        let _ = self.cmd_tx.send(cmd);
    }

    fn is_ended(&self) -> bool {
        self.ended
    }
}

impl Drop for VideoSource {
    fn drop(&mut self) {
        let _ = self.cmd_tx.send(VideoCommand::Quit);
    }
}

/// Retourne `true` si le thread doit quitter (Quit reçu ou canal déconnecté).
fn process_commands(cmd_rx: &Receiver<VideoCommand>, paused: &mut bool) -> bool {
    loop {
        match cmd_rx.try_recv() {
            Ok(VideoCommand::Quit) | Err(TryRecvError::Disconnected) => {
                log::debug!("Thread vidéo: arrêt demandé");
                return true;
            }
            Ok(VideoCommand::Pause) => *paused = true,
            Ok(VideoCommand::Play) => *paused = false,
            Err(TryRecvError::Empty) => return false,
        }
    }
}

/// Boucle principale du thread vidéo.
fn video_loop(
    path: &Path,
    frame_tx: &Sender<Arc<FrameBuffer>>,
    cmd_rx: &Receiver<VideoCommand>,
    info: VideoInfo,
    looping: bool,
) {
    let (w, h) = decode_size(info.width, info.height);
    let fps = info.fps.clamp(1.0, 120.0);
    let frame_period = Duration::from_secs_f64(1.0 / fps);
    let frame_bytes = w as usize * h as usize * 4;

    let mut pool: Vec<Arc<FrameBuffer>> = (0..POOL_SIZE)
        .map(|_| Arc::new(FrameBuffer::new(w, h)))
        .collect();
    let mut child = spawn_ffmpeg_pipe(path, w, h, fps.round() as u32, looping);
    let mut paused = false;
    let mut last_frame = Instant::now();

    loop {
        if process_commands(cmd_rx, &mut paused) {
            break;
        }

        if paused {
            thread::sleep(Duration::from_millis(10));
            continue;
        }

        if let Some(remaining) = frame_period.checked_sub(last_frame.elapsed()) {
            thread::sleep(remaining.min(Duration::from_millis(10)));
            continue;
        }
        last_frame = Instant::now();

        let idx = find_or_create_slot(&mut pool, w, h);
        let Some(fb) = Arc::get_mut(&mut pool[idx]) else {
            continue;
        };

        let read_result = child
            .as_mut()
            .and_then(|c| c.stdout.as_mut())
            .map_or(Ok(false), |stdout| {
                read_exact_or_eof(stdout, &mut fb.data[..frame_bytes])
            });

        match read_result {
            Ok(true) => match frame_tx.try_send(Arc::clone(&pool[idx])) {
                // Consommateur en retard : la frame est abandonnée, le slot revient au pool.
                Ok(()) | Err(TrySendError::Full(_)) => {}
                Err(TrySendError::Disconnected(_)) => break,
            },
            Ok(false) => {
                log::info!("Thread vidéo: EOF");
                break;
            }
            Err(e) => {
                log::warn!("Thread vidéo: erreur lecture pipe: {e}");
                break;
            }
        }
    }

    if let Some(mut c) = child.take() {
        let _ = c.kill();
        let _ = c.wait();
    }
    log::debug!("Thread vidéo terminé proprement.");
}
