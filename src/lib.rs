//! greg: a shell assistant that lets a chat model use your terminal.
//!
//! The library holds everything but the `main` function: a streaming client
//! for OpenAI-compatible chat endpoints, the console, and the session loop in
//! [`chat`].

pub mod chat;
pub mod client;
pub mod client_logger;
pub mod error;
mod observability;
pub mod render;
mod sse;
pub mod types;

pub use client::{ModelClient, OpenAi, TokenStream};
pub use client_logger::{ClientLogger, JsonlLogger};
pub use error::{Error, Result};
pub use observability::register_biometrics;
pub use render::{AnsiConsole, Console, Style};
pub use types::*;
