/// Session state for lumaglyph: one loaded source, its playback loop and the
/// published ASCII text.
pub mod session;

pub use session::{Playback, Session, SessionState};
