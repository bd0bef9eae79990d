//! The interactive part of greg.
//!
//! The model talks to the user in chat mode and drives the user's shell in
//! terminal mode, switching between them with `!chat` and `!term`.
//!
//! # Architecture
//!
//! - [`modes`]: the mode registry and `!command` dispatch
//! - [`router`]: classification and display of streamed replies
//! - [`terminal`]: running commands and capturing their output
//! - [`session`]: the loop tying them together
//! - [`config`]: the configuration file and command-line flags
//! - [`input`]: reading lines from the user
//! - `testing`: scripted stand-ins for the model, the user and the screen
//!   (behind the `testing` feature)

pub mod config;
pub mod input;
pub mod modes;
pub mod prompt;
pub mod router;
pub mod session;
pub mod terminal;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use config::{ConfigFile, GregArgs, GregConfig, default_config_path};
pub use input::{InputSource, LineEditor};
pub use modes::{Dispatch, MODES, Mode, ModeId, SENTINEL, dispatch_command};
pub use prompt::system_prompt;
pub use router::{Classification, TokenRouter, Turn, route_stream};
pub use session::{Session, Step};
pub use terminal::{TerminalExecutor, TerminalOutput};
