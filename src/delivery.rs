//! Handing rendered chunks to the operator, one at a time.

use crate::error::{Error, Result};
use crate::splitter::Chunk;
use std::env;
use std::io::{self, BufRead, Write};
use std::process::{Command, Stdio};
use tracing::{debug, info, warn};

/// Receives chunks in order.
pub trait DeliverySink {
    /// Delivers one chunk.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Delivery`] if the chunk could not be handed over.
    fn deliver(&mut self, chunk: &Chunk) -> Result<()>;
}

/// A place text can be copied to.
pub trait Clipboard {
    /// Replaces the clipboard contents with `text`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Delivery`] on failure.
    fn set_text(&mut self, text: &str) -> Result<()>;
}

/// Waits for the operator between chunks.
pub trait Pacer {
    /// Blocks until chunk `next` of `total` may be delivered.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Delivery`] if the operator cannot be reached.
    fn wait(&mut self, next: usize, total: usize) -> Result<()>;
}

/// Clipboard backed by the platform's copy utility.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandClipboard {
    program: String,
    args: Vec<String>,
}

impl CommandClipboard {
    /// Uses `program` with `args`, feeding the text on stdin.
    #[must_use]
    pub fn new(program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|a| (*a).to_string()).collect(),
        }
    }

    /// Picks the copy utility for the current platform.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Delivery`] on platforms without a known utility.
    pub fn detect() -> Result<Self> {
        if cfg!(target_os = "macos") {
            Ok(Self::new("pbcopy", &[]))
        } else if cfg!(windows) {
            Ok(Self::new("clip", &[]))
        } else if cfg!(unix) {
            if env::var_os("WAYLAND_DISPLAY").is_some() {
                Ok(Self::new("wl-copy", &[]))
            } else {
                Ok(Self::new("xclip", &["-selection", "clipboard"]))
            }
        } else {
            Err(Error::delivery(format!(
                "no clipboard utility known for {}",
                env::consts::OS
            )))
        }
    }
}

impl Clipboard for CommandClipboard {
    fn set_text(&mut self, text: &str) -> Result<()> {
        debug!("Copying {} bytes with {}", text.len(), self.program);

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| Error::delivery(format!("failed to run {}: {e}", self.program)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(text.as_bytes())
                .map_err(|e| Error::delivery(format!("failed to write to {}: {e}", self.program)))?;
        }

        let status = child
            .wait()
            .map_err(|e| Error::delivery(format!("{} did not finish: {e}", self.program)))?;

        if status.success() {
            Ok(())
        } else {
            Err(Error::delivery(format!("{} exited with {status}", self.program)))
        }
    }
}

/// Clipboard backed by the `clipboard` crate.
#[cfg(feature = "native-clipboard")]
pub struct NativeClipboard {
    context: clipboard::ClipboardContext,
}

#[cfg(feature = "native-clipboard")]
impl NativeClipboard {
    /// Connects to the system clipboard.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Delivery`] if no clipboard is available.
    pub fn new() -> Result<Self> {
        use clipboard::ClipboardProvider;

        let context = ClipboardProvider::new()
            .map_err(|e| Error::delivery(format!("Clipboard error: {e}")))?;
        Ok(Self { context })
    }
}

#[cfg(feature = "native-clipboard")]
impl Clipboard for NativeClipboard {
    fn set_text(&mut self, text: &str) -> Result<()> {
        use clipboard::ClipboardProvider;

        self.context
            .set_contents(text.to_owned())
            .map_err(|e| Error::delivery(format!("Clipboard error: {e}")))
    }
}

/// Asks the operator to press Enter on the terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinPacer;

impl Pacer for StdinPacer {
    fn wait(&mut self, next: usize, total: usize) -> Result<()> {
        print!("Press Enter to copy chunk {next} of {total}...");
        io::stdout()
            .flush()
            .map_err(|e| Error::delivery(format!("failed to prompt: {e}")))?;

        let mut line = String::new();
        io::stdin()
            .lock()
            .read_line(&mut line)
            .map_err(|e| Error::delivery(format!("failed to read confirmation: {e}")))?;
        Ok(())
    }
}

/// Delivers chunks back to back.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPause;

impl Pacer for NoPause {
    fn wait(&mut self, _next: usize, _total: usize) -> Result<()> {
        Ok(())
    }
}

/// Copies each rendered chunk to a clipboard, pausing in between.
#[derive(Debug)]
pub struct ClipboardSink<C, P> {
    clipboard: C,
    pacer: P,
}

impl<C: Clipboard, P: Pacer> ClipboardSink<C, P> {
    /// Creates a sink from a clipboard backend and a pacer.
    pub const fn new(clipboard: C, pacer: P) -> Self {
        Self { clipboard, pacer }
    }
}

impl<C: Clipboard, P: Pacer> DeliverySink for ClipboardSink<C, P> {
    /// The pacer runs before the next chunk even when this copy failed.
    fn deliver(&mut self, chunk: &Chunk) -> Result<()> {
        let copied = self.clipboard.set_text(&chunk.render());
        match &copied {
            Ok(()) => info!("Chunk {} of {} copied to clipboard", chunk.number, chunk.total),
            Err(e) => warn!("Chunk {} of {} was not copied: {}", chunk.number, chunk.total, e),
        }

        if !chunk.is_last() {
            self.pacer.wait(chunk.number + 1, chunk.total)?;
        }
        copied
    }
}
