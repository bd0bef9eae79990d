//! Routing of streamed model output.
//!
//! A turn is either a command or text, decided by its first character.  The
//! router buffers fragments until that character exists.  Commands are never
//! displayed.  Text is written through as it arrives, with the active mode's
//! prefix in front of the first line and after every line break.

use futures::StreamExt;

use crate::chat::modes::SENTINEL;
use crate::client::TokenStream;
use crate::error::Result;
use crate::render::{Console, Style};

/// What a turn turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// No non-empty fragment has arrived yet.
    Unknown,
    /// The turn starts with the sentinel and is a command.
    Command,
    /// The turn is text for the active mode.
    Text,
}

/// A completed assistant turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    /// The full text of the turn.
    pub text: String,
    /// Never [`Classification::Unknown`]; empty turns count as text.
    pub classification: Classification,
}

impl Turn {
    /// True when the turn is a `!command`.
    pub fn is_command(&self) -> bool {
        self.classification == Classification::Command
    }
}

/// Classifies and displays one turn, fragment by fragment.
pub struct TokenRouter<'a> {
    console: &'a mut dyn Console,
    style: Style,
    prefix: &'a str,
    text: String,
    classification: Classification,
}

impl<'a> TokenRouter<'a> {
    /// A router that displays text in `style`, indented by `prefix`.
    pub fn new(console: &'a mut dyn Console, style: Style, prefix: &'a str) -> Self {
        Self {
            console,
            style,
            prefix,
            text: String::new(),
            classification: Classification::Unknown,
        }
    }

    /// The classification so far.
    pub fn classification(&self) -> Classification {
        self.classification
    }

    /// Accept the next fragment of the turn.
    pub fn push(&mut self, fragment: &str) {
        self.text.push_str(fragment);
        if self.classification == Classification::Unknown {
            match self.text.chars().next() {
                Some(SENTINEL) => self.classification = Classification::Command,
                Some(_) => {
                    self.classification = Classification::Text;
                    if !self.prefix.is_empty() {
                        self.console.write(self.prefix, self.style);
                    }
                }
                None => {}
            }
        }
        if self.classification == Classification::Text && !fragment.is_empty() {
            if self.prefix.is_empty() {
                self.console.write(fragment, self.style);
            } else {
                let indented = fragment.replace('\n', &format!("\n{}", self.prefix));
                self.console.write(&indented, self.style);
            }
        }
    }

    /// End the turn, terminating displayed text with a line break.
    pub fn finish(self) -> Turn {
        let classification = match self.classification {
            Classification::Command => Classification::Command,
            Classification::Unknown | Classification::Text => {
                self.console.write("\n", self.style);
                Classification::Text
            }
        };
        Turn {
            text: self.text,
            classification,
        }
    }
}

/// Drain `stream` through a [`TokenRouter`] and return the finished turn.
///
/// A failure in the stream aborts the turn; whatever was already displayed
/// stays on screen.
pub async fn route_stream(
    mut stream: TokenStream,
    console: &mut dyn Console,
    style: Style,
    prefix: &str,
) -> Result<Turn> {
    let mut router = TokenRouter::new(console, style, prefix);
    while let Some(fragment) = stream.next().await {
        router.push(&fragment?);
    }
    Ok(router.finish())
}
