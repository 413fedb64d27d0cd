//! User-facing output sink.
//!
//! Steps report progress and failures through a [`Ui`]; tracing remains the
//! channel for diagnostics. Everything routed to the user passes through
//! [`redact_sensitive`] first.

use std::sync::{Mutex, PoisonError};

use vpcimage_util::redact_sensitive;

/// Interactive output channel shared by all steps of a run.
pub trait Ui: Send + Sync {
    /// Announce a new phase of work.
    fn say(&self, message: &str);
    /// Supplementary detail for the current phase.
    fn message(&self, message: &str);
    /// Report a failure.
    fn error(&self, message: &str);
}

/// Writes to the terminal: progress on stdout, errors on stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleUi;

impl Ui for ConsoleUi {
    fn say(&self, message: &str) {
        println!("{}", UiLine::new(UiLevel::Say, message).rendered());
    }

    fn message(&self, message: &str) {
        println!("{}", UiLine::new(UiLevel::Message, message).rendered());
    }

    fn error(&self, message: &str) {
        eprintln!("{}", UiLine::new(UiLevel::Error, message).rendered());
    }
}

/// Severity of a line of output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiLevel {
    Say,
    Message,
    Error,
}

impl UiLevel {
    /// Marker written before every line of this level.
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Say => "==> ",
            Self::Message => "    ",
            Self::Error => "[ERROR] ",
        }
    }
}

/// One line of output. `text` is already redacted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiLine {
    pub level: UiLevel,
    pub text: String,
}

impl UiLine {
    pub fn new(level: UiLevel, message: &str) -> Self {
        Self {
            level,
            text: redact_sensitive(message),
        }
    }

    /// The line as shown to the user, severity prefix included.
    pub fn rendered(&self) -> String {
        format!("{}{}", self.level.prefix(), self.text)
    }
}

/// Captures output in memory. Useful for previews and tests.
#[derive(Debug, Default)]
pub struct RecordingUi {
    lines: Mutex<Vec<UiLine>>,
}

impl RecordingUi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every line captured so far, in order.
    pub fn lines(&self) -> Vec<UiLine> {
        self.lines.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Text of the captured error lines.
    pub fn errors(&self) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter(|line| line.level == UiLevel::Error)
            .map(|line| line.text)
            .collect()
    }

    fn push(&self, level: UiLevel, message: &str) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(UiLine::new(level, message));
    }
}

impl Ui for RecordingUi {
    fn say(&self, message: &str) {
        self.push(UiLevel::Say, message);
    }

    fn message(&self, message: &str) {
        self.push(UiLevel::Message, message);
    }

    fn error(&self, message: &str) {
        self.push(UiLevel::Error, message);
    }
}
