//! Reading lines from the user.

use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use crate::error::Result;

/// A blocking source of user input.
pub trait InputSource {
    /// Show `prompt` and wait for a line.
    ///
    /// Returns `Ok(None)` when the user interrupts or input ends; the caller
    /// treats that as the end of the session.
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>>;
}

/// Interactive line editing with history, backed by rustyline.
pub struct LineEditor {
    editor: DefaultEditor,
}

impl LineEditor {
    /// Creates a new line editor attached to the terminal.
    pub fn new() -> Result<Self> {
        Ok(Self {
            editor: DefaultEditor::new()?,
        })
    }
}

impl InputSource for LineEditor {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = self.editor.add_history_entry(line.as_str());
                }
                Ok(Some(line))
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}
