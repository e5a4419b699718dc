use std::fmt;
use std::io::{self, ErrorKind};
use std::process::{Child, Command, Stdio};

use crossterm::execute;

use crate::config::SpeechConfig;
use crate::error::HostError;

/// Identifies one narration request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UtteranceId(pub u64);

/// Text handed to the speech capability
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance<'a> {
    pub id: UtteranceId,
    pub text: &'a str,
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
}

/// Text-to-speech provided by the host.
///
/// Speaking is fire-and-forget: completion is reported later through
/// [`SpeechSynth::poll_finished`], at most once per utterance.
pub trait SpeechSynth {
    fn speak(&mut self, utterance: &Utterance<'_>) -> Result<(), HostError>;
    /// Stops any speech in progress without reporting it as finished
    fn cancel(&mut self);
    /// Returns an utterance that finished since the last call
    fn poll_finished(&mut self) -> Option<UtteranceId>;
}

/// Fullscreen presentation provided by the host
pub trait Fullscreen {
    fn enter(&mut self) -> Result<(), HostError>;
    fn exit(&mut self) -> Result<(), HostError>;
}

/// Speaks through an external program such as `espeak`
pub struct CommandSpeech {
    program: String,
    current: Option<(UtteranceId, Child)>,
}

impl CommandSpeech {
    pub fn new(config: &SpeechConfig) -> Self {
        CommandSpeech {
            program: config.program.clone(),
            current: None,
        }
    }

    /// espeak-style arguments: words per minute, pitch 0-99, amplitude 0-200
    fn arguments(utterance: &Utterance<'_>) -> Vec<String> {
        let words_per_minute = (175.0 * utterance.rate).round().max(80.0);
        let pitch = (50.0 * utterance.pitch).round().clamp(0.0, 99.0);
        let amplitude = (100.0 * utterance.volume).round().clamp(0.0, 200.0);
        vec![
            "-s".into(),
            words_per_minute.to_string(),
            "-p".into(),
            pitch.to_string(),
            "-a".into(),
            amplitude.to_string(),
            utterance.text.to_string(),
        ]
    }
}

impl SpeechSynth for CommandSpeech {
    fn speak(&mut self, utterance: &Utterance<'_>) -> Result<(), HostError> {
        self.cancel();
        let child = Command::new(&self.program)
            .args(Self::arguments(utterance))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|err| match err.kind() {
                ErrorKind::NotFound => HostError::Unavailable("speech synthesis"),
                _ => HostError::Io(err),
            })?;
        self.current = Some((utterance.id, child));
        Ok(())
    }

    fn cancel(&mut self) {
        if let Some((_, mut child)) = self.current.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }

    fn poll_finished(&mut self) -> Option<UtteranceId> {
        let (id, child) = self.current.as_mut()?;
        match child.try_wait() {
            Ok(Some(_)) | Err(_) => {
                let id = *id;
                self.current = None;
                Some(id)
            }
            Ok(None) => None,
        }
    }
}

impl Drop for CommandSpeech {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// xterm window manipulation: toggle the full-screen window mode
struct FullScreenMode(bool);

impl crossterm::Command for FullScreenMode {
    fn write_ansi(&self, f: &mut impl fmt::Write) -> fmt::Result {
        write!(f, "\x1b[10;{}t", u8::from(self.0))
    }

    #[cfg(windows)]
    fn execute_winapi(&self) -> io::Result<()> {
        Err(io::Error::new(
            ErrorKind::Unsupported,
            "window manipulation needs an ANSI terminal",
        ))
    }
}

/// Asks the terminal emulator to take over the whole screen
#[derive(Debug, Default)]
pub struct TerminalFullscreen;

impl TerminalFullscreen {
    fn request(&self, enabled: bool) -> Result<(), HostError> {
        if termsize::get().is_none() {
            return Err(HostError::Unavailable("fullscreen"));
        }
        execute!(io::stdout(), FullScreenMode(enabled))?;
        Ok(())
    }
}

impl Fullscreen for TerminalFullscreen {
    fn enter(&mut self) -> Result<(), HostError> {
        self.request(true)
    }

    fn exit(&mut self) -> Result<(), HostError> {
        self.request(false)
    }
}
