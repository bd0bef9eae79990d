//! In-memory collaborators for driving a session without a terminal or a
//! network: a model that replays canned turns, input that replays canned
//! lines, and a console that records what it was asked to show.

use std::collections::VecDeque;
use std::sync::Mutex;

use futures::stream;

use crate::chat::input::InputSource;
use crate::client::{ModelClient, TokenStream};
use crate::error::{Error, Result};
use crate::render::{Console, Style};
use crate::types::Message;

/// Something a [`RecordingConsole`] was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleEvent {
    /// Text written with `write` or `write_line` (line break included).
    Write(String, Style),
    /// Markup passed to `write_block`.
    Block(String),
    /// A call to `clear`.
    Clear,
}

/// Console that records every call instead of printing.
#[derive(Debug, Default)]
pub struct RecordingConsole {
    /// Every call, in order.
    pub events: Vec<ConsoleEvent>,
}

impl RecordingConsole {
    /// All written text concatenated, blocks and clears excluded.
    pub fn text(&self) -> String {
        self.writes().into_iter().map(|(text, _)| text).collect()
    }

    /// Every write with its style.
    pub fn writes(&self) -> Vec<(&str, Style)> {
        self.events
            .iter()
            .filter_map(|event| match event {
                ConsoleEvent::Write(text, style) => Some((text.as_str(), *style)),
                _ => None,
            })
            .collect()
    }

    /// Every block's markup.
    pub fn blocks(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|event| match event {
                ConsoleEvent::Block(markup) => Some(markup.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl Console for RecordingConsole {
    fn write(&mut self, text: &str, style: Style) {
        self.events.push(ConsoleEvent::Write(text.to_string(), style));
    }

    fn write_line(&mut self, text: &str, style: Style) {
        self.events
            .push(ConsoleEvent::Write(format!("{text}\n"), style));
    }

    fn write_block(&mut self, markup: &str) {
        self.events.push(ConsoleEvent::Block(markup.to_string()));
    }

    fn clear(&mut self) {
        self.events.push(ConsoleEvent::Clear);
    }
}

/// One canned response of a [`ScriptedClient`].
#[derive(Debug, Clone)]
pub enum ScriptedTurn {
    /// Stream these fragments, then end.
    Fragments(Vec<String>),
    /// Stream these fragments, then fail mid-stream.
    FailAfter(Vec<String>),
    /// Refuse the request outright.
    Refuse,
}

impl ScriptedTurn {
    /// A turn made of the given fragments.
    pub fn fragments<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ScriptedTurn::Fragments(fragments.into_iter().map(Into::into).collect())
    }
}

/// Model client that replays canned turns and remembers every transcript it
/// was sent.
#[derive(Debug, Default)]
pub struct ScriptedClient {
    turns: Mutex<VecDeque<ScriptedTurn>>,
    requests: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedClient {
    /// A client that answers with `turns`, in order.
    pub fn new(turns: impl IntoIterator<Item = ScriptedTurn>) -> Self {
        Self {
            turns: Mutex::new(turns.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every transcript sent so far, oldest first.
    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    /// How many scripted turns have not been consumed.
    pub fn remaining(&self) -> usize {
        self.turns.lock().map(|turns| turns.len()).unwrap_or(0)
    }
}

#[async_trait::async_trait]
impl ModelClient for ScriptedClient {
    async fn stream_chat(&self, conversation: &[Message]) -> Result<TokenStream> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(conversation.to_vec());
        }
        let turn = self
            .turns
            .lock()
            .ok()
            .and_then(|mut turns| turns.pop_front());
        match turn {
            Some(ScriptedTurn::Fragments(fragments)) => {
                Ok(Box::pin(stream::iter(
                    fragments.into_iter().map(Ok::<String, Error>),
                )))
            }
            Some(ScriptedTurn::FailAfter(fragments)) => {
                let items = fragments
                    .into_iter()
                    .map(Ok::<String, Error>)
                    .chain(std::iter::once(Err(Error::streaming(
                        "scripted stream failure",
                        None,
                    ))));
                Ok(Box::pin(stream::iter(items)))
            }
            Some(ScriptedTurn::Refuse) => Err(Error::service_unavailable("scripted refusal", None)),
            None => Err(Error::abort("no scripted turns left")),
        }
    }
}

/// Input that replays canned lines, then reports end of input.
#[derive(Debug, Default)]
pub struct ScriptedInput {
    lines: VecDeque<String>,
    /// Every prompt shown, in order.
    pub prompts: Vec<String>,
}

impl ScriptedInput {
    /// Input that yields `lines`, in order.
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            prompts: Vec::new(),
        }
    }
}

impl InputSource for ScriptedInput {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        self.prompts.push(prompt.to_string());
        Ok(self.lines.pop_front())
    }
}
