//! Line input and styled output for the shell.
//!
//! Reads go through rustyline, which falls back to plain line reads when stdin
//! is not a terminal, so scripts can be piped in. Reads block the calling
//! thread inside `block_in_place` so the session countdown keeps running.

use std::fmt::Display;
use std::io::IsTerminal;

use dialoguer::Password;
use dialoguer::console::{Term, style};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tokio::task::block_in_place;

use espf_admin::services::Prompt;

/// The shell's view of the person (or script) driving it.
pub struct Terminal {
    editor: DefaultEditor,
    interactive: bool,
    out: Term,
}

impl Terminal {
    /// Attach to the process's stdin and stdout.
    ///
    /// # Errors
    ///
    /// Returns `ReadlineError` if the line editor cannot be set up.
    pub fn new() -> Result<Self, ReadlineError> {
        Ok(Self {
            editor: DefaultEditor::new()?,
            interactive: std::io::stdin().is_terminal(),
            out: Term::stdout(),
        })
    }

    /// Whether a person is typing (as opposed to piped input).
    #[must_use]
    pub const fn is_interactive(&self) -> bool {
        self.interactive
    }

    /// Read one shell line. `None` at end of input.
    ///
    /// # Errors
    ///
    /// Returns `ReadlineError` on terminal I/O failures.
    pub fn read_command(&mut self, prompt: &str) -> Result<Option<String>, ReadlineError> {
        match block_in_place(|| self.editor.readline(prompt)) {
            Ok(line) => {
                // Inline passwords stay out of history.
                let keep = self.interactive
                    && !line.trim().is_empty()
                    && !line.trim_start().starts_with("login");
                if keep && let Err(e) = self.editor.add_history_entry(line.as_str()) {
                    tracing::debug!(error = %e, "Could not record history entry");
                }
                Ok(Some(line))
            }
            Err(ReadlineError::Eof) => Ok(None),
            Err(ReadlineError::Interrupted) => Ok(Some(String::new())),
            Err(e) => Err(e),
        }
    }

    /// Read a password without echo. `None` if input ended or the read failed.
    pub fn read_secret(&mut self, prompt: &str) -> Option<String> {
        if !self.interactive {
            return self.read_line(&format!("{prompt}: "));
        }

        let result = block_in_place(|| {
            Password::new()
                .with_prompt(prompt)
                .allow_empty_password(true)
                .interact()
        });
        match result {
            Ok(secret) => Some(secret),
            Err(e) => {
                tracing::debug!(error = %e, "Hidden input failed");
                None
            }
        }
    }

    pub fn success(&self, message: impl Display) {
        self.line(style(message).green());
    }

    pub fn failure(&self, message: impl Display) {
        self.line(style(message).red());
    }

    pub fn info(&self, message: impl Display) {
        self.line(style(message).blue());
    }

    /// Write unstyled text.
    pub fn plain(&self, message: impl Display) {
        self.line(message);
    }

    fn line(&self, text: impl Display) {
        if let Err(e) = self.out.write_line(&text.to_string()) {
            tracing::debug!(error = %e, "Could not write to stdout");
        }
    }
}

impl Prompt for Terminal {
    fn read_line(&mut self, prompt: &str) -> Option<String> {
        match block_in_place(|| self.editor.readline(prompt)) {
            Ok(line) => Some(line),
            Err(ReadlineError::Eof | ReadlineError::Interrupted) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Could not read answer");
                None
            }
        }
    }

    fn notice(&mut self, message: &str) {
        self.failure(message);
    }
}
