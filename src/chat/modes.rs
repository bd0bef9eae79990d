//! The mode registry and `!command` dispatch.
//!
//! The model switches between talking to the user and typing into the
//! terminal by answering with a bare command such as `!term`.  A turn that
//! starts with [`SENTINEL`] is never shown; at the top of the next iteration
//! the session hands it to [`dispatch_command`].

use crate::observability::{MODE_INVALID_COMMANDS, MODE_SWITCHES};
use crate::render::{Console, Style};
use crate::types::Conversation;

/// Marks a model turn as a command rather than displayable text.
pub const SENTINEL: char = '!';

/// Identifies one of the two modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ModeId {
    /// Model output is shown to the user; the user types the next input.
    #[default]
    Chat,

    /// Model output is run in the shell; its output is the next input.
    Terminal,
}

impl ModeId {
    /// The registry entry for this mode.
    pub fn mode(self) -> &'static Mode {
        match self {
            ModeId::Chat => &MODES[0],
            ModeId::Terminal => &MODES[1],
        }
    }
}

/// How a mode is entered and displayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mode {
    /// Which mode this is.
    pub id: ModeId,
    /// What the model types after the sentinel to enter the mode.
    pub command: &'static str,
    /// Human-readable name used in notices.
    pub label: &'static str,
    /// Style of streamed model text while in this mode.
    pub style: Style,
    /// Written before the first line and after every line break of streamed
    /// text; empty for none.
    pub prefix: &'static str,
}

/// Every mode, in a fixed order.
pub static MODES: [Mode; 2] = [
    Mode {
        id: ModeId::Chat,
        command: "chat",
        label: "chat",
        style: Style::CHAT,
        prefix: "",
    },
    Mode {
        id: ModeId::Terminal,
        command: "term",
        label: "terminal",
        style: Style::TERMINAL,
        prefix: "$ ",
    },
];

/// Find the mode entered by `command` (without the sentinel).
pub fn lookup(command: &str) -> Option<&'static Mode> {
    MODES.iter().find(|mode| mode.command == command)
}

/// The system message recorded when `mode` is entered.
pub fn entering_message(mode: &Mode) -> String {
    format!("Entering {} mode", mode.label)
}

/// The system message recorded for an unknown command.
pub fn invalid_command_message(command: &str) -> String {
    format!("\"{SENTINEL}{command}\" is not a valid command")
}

/// What a dispatched command did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// The active mode changed (or was re-entered).
    Switched(ModeId),

    /// The command was not recognized; the mode is unchanged.
    Invalid(String),
}

/// Interpret `directive`, the text of the previous turn, as a command.
///
/// Returns `None` without touching anything when `directive` does not start
/// with the sentinel.  Otherwise exactly one system message is appended to
/// `conversation` and a notice is shown; an unknown command leaves `active`
/// alone.  Dispatch never fails.
pub fn dispatch_command(
    directive: &str,
    active: &mut ModeId,
    conversation: &mut Conversation,
    console: &mut dyn Console,
) -> Option<Dispatch> {
    let command = directive.strip_prefix(SENTINEL)?;
    match lookup(command) {
        Some(mode) => {
            MODE_SWITCHES.click();
            *active = mode.id;
            let message = entering_message(mode);
            conversation.push_system(message.clone());
            console.write_block("---");
            console.write_line(&format!("[{message}]"), Style::NOTICE);
            Some(Dispatch::Switched(mode.id))
        }
        None => {
            MODE_INVALID_COMMANDS.click();
            let message = invalid_command_message(command);
            conversation.push_system(message.clone());
            console.write_line(&format!("<System>: {message}"), Style::ERROR);
            Some(Dispatch::Invalid(command.to_string()))
        }
    }
}
