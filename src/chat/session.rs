//! The session loop.
//!
//! One [`Session::step`] is one iteration: obtain the next input, call the
//! model, and route its reply.  The input depends on what came before:
//!
//! - a previous turn that was a `!command` is dispatched, and nothing else is
//!   read;
//! - in chat mode the user types a line;
//! - in terminal mode the previous turn is run in the shell and its output is
//!   recorded as `[TERMINAL] ...`.
//!
//! The reply becomes the previous turn of the next step.

use crate::chat::config::GregConfig;
use crate::chat::input::InputSource;
use crate::chat::modes::{ModeId, dispatch_command, entering_message};
use crate::chat::prompt::system_prompt;
use crate::chat::router::{Turn, route_stream};
use crate::chat::terminal::{TerminalExecutor, TerminalOutput};
use crate::client::ModelClient;
use crate::error::Result;
use crate::observability::{SESSION_COMMAND_TURNS, SESSION_TURNS, SESSION_USER_MESSAGES};
use crate::render::{Console, Style, paint};
use crate::types::Conversation;

/// Marker shown when waiting for the user.
const PROMPT_MARKER: &str = ">";

/// What the caller should do after a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Keep going.
    Continue,
    /// The user interrupted or input ended; tear down.
    Exit,
}

/// A conversation between the user, the model and the shell.
///
/// # Example
///
/// ```
/// use greg::chat::testing::{RecordingConsole, ScriptedClient, ScriptedInput, ScriptedTurn};
/// use greg::chat::{GregConfig, ModeId, Session};
///
/// # tokio_test::block_on(async {
/// let client = ScriptedClient::new([ScriptedTurn::fragments(["!", "term"])]);
/// let mut session = Session::new(client, &GregConfig::new("sk-test").without_color());
/// let mut input = ScriptedInput::new(["list my files"]);
/// let mut console = RecordingConsole::default();
///
/// session.step(&mut input, &mut console).await.unwrap();
/// assert!(session.previous().unwrap().is_command());
/// assert_eq!(session.mode(), ModeId::Chat);
/// # });
/// ```
pub struct Session<M: ModelClient> {
    client: M,
    executor: TerminalExecutor,
    conversation: Conversation,
    mode: ModeId,
    previous: Option<Turn>,
    user_prompt: String,
}

impl<M: ModelClient> Session<M> {
    /// Start a session in chat mode.
    ///
    /// The conversation opens with the system prompt built from `config`
    /// followed by the notice that chat mode is active.
    pub fn new(client: M, config: &GregConfig) -> Self {
        let mut conversation = Conversation::new(system_prompt(config));
        conversation.push_system(entering_message(ModeId::Chat.mode()));
        Self {
            client,
            executor: TerminalExecutor::new(config.shell_program.clone()),
            conversation,
            mode: ModeId::Chat,
            previous: None,
            user_prompt: format!("{}: ", paint(PROMPT_MARKER, Style::PROMPT, config.use_color)),
        }
    }

    /// Replace the executor used for terminal mode.
    pub fn with_executor(mut self, executor: TerminalExecutor) -> Self {
        self.executor = executor;
        self
    }

    /// The transcript so far.
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// The active mode.
    pub fn mode(&self) -> ModeId {
        self.mode
    }

    /// The most recent assistant turn, if any.
    pub fn previous(&self) -> Option<&Turn> {
        self.previous.as_ref()
    }

    /// The model client.
    pub fn client(&self) -> &M {
        &self.client
    }

    /// Run one iteration of the loop.
    ///
    /// Errors from the model client or the input source end the session;
    /// everything else, including unknown commands and failing shell
    /// commands, is reported in the conversation instead.
    pub async fn step(
        &mut self,
        input: &mut dyn InputSource,
        console: &mut dyn Console,
    ) -> Result<Step> {
        match self.previous.take() {
            Some(turn) if turn.is_command() => {
                dispatch_command(&turn.text, &mut self.mode, &mut self.conversation, console);
            }
            previous => match self.mode {
                ModeId::Chat => {
                    let Some(line) = input.read_line(&self.user_prompt)? else {
                        return Ok(Step::Exit);
                    };
                    SESSION_USER_MESSAGES.click();
                    self.conversation.push_user(line);
                }
                ModeId::Terminal => {
                    if let Some(turn) = previous.filter(|turn| !turn.text.is_empty()) {
                        let output = self.executor.run(&turn.text).await;
                        self.conversation.push_system(output.to_message());
                        echo(&output, console);
                    }
                }
            },
        }

        let mode = self.mode.mode();
        console.write_line("", Style::DEFAULT);
        let stream = self.client.stream_chat(self.conversation.messages()).await?;
        let turn = route_stream(stream, console, mode.style, mode.prefix).await?;
        console.write_line("", Style::DEFAULT);

        SESSION_TURNS.click();
        if turn.is_command() {
            SESSION_COMMAND_TURNS.click();
        }
        self.conversation.push_assistant(turn.text.clone());
        self.previous = Some(turn);
        Ok(Step::Continue)
    }

    /// Step until the user leaves or something fails.
    pub async fn run(
        &mut self,
        input: &mut dyn InputSource,
        console: &mut dyn Console,
    ) -> Result<()> {
        while self.step(input, console).await? == Step::Continue {}
        Ok(())
    }
}

/// Show terminal output as a fenced block, unless there is nothing to show.
fn echo(output: &TerminalOutput, console: &mut dyn Console) {
    if output.is_blank() {
        return;
    }
    console.write_line("", Style::DEFAULT);
    console.write_block(&fenced("bash", &output.combined()));
}

/// Wrap `body` in a code fence longer than any backtick run inside it.
fn fenced(lang: &str, body: &str) -> String {
    let longest = body
        .split(|c| c != '`')
        .map(str::len)
        .max()
        .unwrap_or(0);
    let fence = "`".repeat(longest.max(2) + 1);
    let mut block = format!("{fence}{lang}\n{body}");
    if !body.ends_with('\n') {
        block.push('\n');
    }
    block.push_str(&fence);
    block
}
