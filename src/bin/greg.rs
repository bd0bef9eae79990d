//! greg: chat with a model that can use your terminal.
//!
//! # Usage
//!
//! ```bash
//! # First run asks for an API key and writes ~/.config/greg.json
//! greg
//!
//! # Use another model for this session only
//! greg --model gpt-4o
//!
//! # Talk to a local OpenAI-compatible server and keep a log of the traffic
//! greg --base-url http://localhost:8080/v1/ --log greg.jsonl
//!
//! # Run terminal commands with bash instead of sh
//! greg --shell-program bash
//! ```
//!
//! Press Ctrl-C at any time to clear the screen and quit.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use arrrg::CommandLine;

use greg::chat::{ConfigFile, GregArgs, GregConfig, LineEditor, Session, default_config_path};
use greg::render::ANSI_CLEAR;
use greg::{AnsiConsole, Console, JsonlLogger, OpenAi};

fn clear_and_exit() -> ! {
    let mut stdout = std::io::stdout();
    let _ = stdout.write_all(ANSI_CLEAR.as_bytes());
    let _ = stdout.flush();
    std::process::exit(0);
}

/// Main entry point for greg.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, _) = GregArgs::from_command_line_relaxed("greg [OPTIONS]");
    let config_path = args
        .config
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(default_config_path);

    let mut console = AnsiConsole::with_color(!args.no_color);
    let mut editor = LineEditor::new()?;

    ctrlc::set_handler(|| {
        clear_and_exit();
    })?;

    let file = match ConfigFile::load_or_bootstrap(&config_path, &mut editor, &mut console) {
        Ok(file) => file,
        Err(err) if err.is_abort() => clear_and_exit(),
        Err(err) => return Err(err.into()),
    };
    let config = GregConfig::resolve(file, &args)?;

    let mut client = OpenAi::with_options(
        config.api_key.clone(),
        config.model.clone(),
        config.base_url.as_deref(),
        None,
    )?;
    if let Some(path) = &config.log_path {
        client = client.with_logger(Arc::new(JsonlLogger::open(path)?));
    }

    let mut session = Session::new(client, &config);
    console.clear();
    if let Err(err) = session.run(&mut editor, &mut console).await {
        eprintln!("greg: {err}");
        std::process::exit(1);
    }
    clear_and_exit()
}
