//! Configuration types for greg.
//!
//! Settings come from two places.  The JSON file at `~/.config/greg.json`
//! holds the credential and the descriptions of the user's machine that go
//! into the system prompt; it is created interactively on first run.
//! Command-line flags, parsed with `arrrg`, override the file for one session.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use arrrg_derive::CommandLine;
use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;

use crate::chat::input::InputSource;
use crate::chat::terminal::DEFAULT_SHELL_PROGRAM;
use crate::error::{Error, Result};
use crate::render::{Console, Style};

/// Model used when neither the file nor the command line names one.
pub const DEFAULT_MODEL: &str = "gpt-4";

/// Shell described to the model by default.
pub const DEFAULT_SYSTEM_SHELL: &str = "bash";

/// Editor described to the model by default.
pub const DEFAULT_SYSTEM_EDITOR: &str = "VS Code";

/// Command-line arguments for greg.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct GregArgs {
    /// Path of the configuration file.
    #[arrrg(optional, "Configuration file (default: ~/.config/greg.json)", "PATH")]
    pub config: Option<String>,

    /// Model override.
    #[arrrg(optional, "Model to use (default: from the configuration file)", "MODEL")]
    pub model: Option<String>,

    /// Endpoint override.
    #[arrrg(optional, "Base URL of an OpenAI-compatible API", "URL")]
    pub base_url: Option<String>,

    /// Program that runs terminal commands.
    #[arrrg(optional, "Shell used to run terminal commands (default: sh)", "PROG")]
    pub shell_program: Option<String>,

    /// JSON-lines log of client traffic.
    #[arrrg(optional, "Append client requests and chunks to this file", "PATH")]
    pub log: Option<String>,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

/// The on-disk configuration file.
///
/// Keys are upper-case to match the file users edit by hand.  A missing key
/// falls back to its default when the session configuration is built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Credential for the model endpoint.
    #[serde(rename = "OPENAI_API_KEY", default)]
    pub openai_api_key: Option<String>,

    /// Model name.
    #[serde(rename = "GPT_MODEL", default)]
    pub gpt_model: Option<String>,

    /// Operating system described in the system prompt.
    #[serde(rename = "SYSTEM_PLATFORM", default)]
    pub system_platform: Option<String>,

    /// Shell described in the system prompt.
    #[serde(rename = "SYSTEM_SHELL", default)]
    pub system_shell: Option<String>,

    /// Editor described in the system prompt.
    #[serde(rename = "SYSTEM_EDITOR", default)]
    pub system_editor: Option<String>,
}

impl ConfigFile {
    /// The values a freshly bootstrapped file starts from.
    pub fn defaults() -> Self {
        Self {
            openai_api_key: None,
            gpt_model: Some(DEFAULT_MODEL.to_string()),
            system_platform: Some(default_platform()),
            system_shell: Some(DEFAULT_SYSTEM_SHELL.to_string()),
            system_editor: Some(DEFAULT_SYSTEM_EDITOR.to_string()),
        }
    }

    /// Read and parse the file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|err| Error::io(format!("failed to read {}", path.display()), err))?;
        serde_json::from_str(&contents).map_err(|err| {
            Error::serialization(
                format!("failed to parse {}", path.display()),
                Some(Box::new(err)),
            )
        })
    }

    /// Write the file to `path` with four-space indentation, creating the
    /// parent directory if needed.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|err| Error::io(format!("failed to create {}", parent.display()), err))?;
        }
        let file = File::create(path)
            .map_err(|err| Error::io(format!("failed to create {}", path.display()), err))?;
        let mut writer = BufWriter::new(file);
        let formatter = PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut writer, formatter);
        self.serialize(&mut serializer)?;
        writer
            .flush()
            .map_err(|err| Error::io(format!("failed to write {}", path.display()), err))?;
        Ok(())
    }

    /// Ask for every value that has no default, in file order.
    ///
    /// Returns [`Error::Abort`] if input ends before every question is
    /// answered.
    pub fn prompt_missing(&mut self, input: &mut dyn InputSource) -> Result<()> {
        let fields: [(&str, &mut Option<String>); 5] = [
            ("OPENAI_API_KEY", &mut self.openai_api_key),
            ("GPT_MODEL", &mut self.gpt_model),
            ("SYSTEM_PLATFORM", &mut self.system_platform),
            ("SYSTEM_SHELL", &mut self.system_shell),
            ("SYSTEM_EDITOR", &mut self.system_editor),
        ];
        for (key, value) in fields {
            if value.as_deref().is_some_and(|v| !v.is_empty()) {
                continue;
            }
            match input.read_line(&format!("{key}: "))? {
                Some(answer) => *value = Some(answer.trim().to_string()),
                None => return Err(Error::abort("configuration interrupted")),
            }
        }
        Ok(())
    }

    /// Load the file at `path`, creating it interactively first if it does not
    /// exist.
    pub fn load_or_bootstrap(
        path: &Path,
        input: &mut dyn InputSource,
        console: &mut dyn Console,
    ) -> Result<Self> {
        if !path.exists() {
            console.write_line(
                &format!(
                    "Could not find {}. Configuring now (you can always reconfigure this manually).",
                    path.display()
                ),
                Style::MUTED,
            );
            console.write_line("", Style::MUTED);
            let mut file = Self::defaults();
            file.prompt_missing(input)?;
            file.save(path)?;
        }
        Self::load(path)
    }
}

/// `~/.config/greg.json`, or a relative `.config/greg.json` when `$HOME` is
/// unset.
pub fn default_config_path() -> PathBuf {
    let home = std::env::var_os("HOME").map(PathBuf::from).unwrap_or_default();
    home.join(".config").join("greg.json")
}

/// Operating system and architecture of this machine, e.g. `linux-x86_64`.
pub fn default_platform() -> String {
    format!("{}-{}", std::env::consts::OS, std::env::consts::ARCH)
}

/// Resolved configuration for a session.
///
/// Built once at startup and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GregConfig {
    /// Credential for the model endpoint.
    pub api_key: String,
    /// Model name.
    pub model: String,
    /// Endpoint override, if any.
    pub base_url: Option<String>,
    /// Operating system described to the model.
    pub platform: String,
    /// Shell described to the model.
    pub shell: String,
    /// Editor described to the model.
    pub editor: String,
    /// Program that actually runs terminal commands.
    pub shell_program: String,
    /// Where to log client traffic, if anywhere.
    pub log_path: Option<PathBuf>,
    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,
}

impl GregConfig {
    /// Creates a configuration with defaults and the given credential.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: None,
            platform: default_platform(),
            shell: DEFAULT_SYSTEM_SHELL.to_string(),
            editor: DEFAULT_SYSTEM_EDITOR.to_string(),
            shell_program: DEFAULT_SHELL_PROGRAM.to_string(),
            log_path: None,
            use_color: true,
        }
    }

    /// Combine the configuration file with command-line overrides.
    ///
    /// Fails with an authentication error when no credential is configured.
    pub fn resolve(file: ConfigFile, args: &GregArgs) -> Result<Self> {
        fn nonempty(value: Option<String>) -> Option<String> {
            value.filter(|v| !v.trim().is_empty())
        }
        let api_key = nonempty(file.openai_api_key)
            .ok_or_else(|| Error::authentication("OPENAI_API_KEY is not configured"))?;
        let mut config = Self::new(api_key);
        if let Some(model) = nonempty(args.model.clone()).or(nonempty(file.gpt_model)) {
            config.model = model;
        }
        if let Some(platform) = nonempty(file.system_platform) {
            config.platform = platform;
        }
        if let Some(shell) = nonempty(file.system_shell) {
            config.shell = shell;
        }
        if let Some(editor) = nonempty(file.system_editor) {
            config.editor = editor;
        }
        config.base_url = nonempty(args.base_url.clone());
        if let Some(program) = nonempty(args.shell_program.clone()) {
            config.shell_program = program;
        }
        config.log_path = args.log.as_ref().map(PathBuf::from);
        config.use_color = !args.no_color;
        Ok(config)
    }

    /// Sets the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Sets the machine description used in the system prompt.
    pub fn with_machine(
        mut self,
        platform: impl Into<String>,
        shell: impl Into<String>,
        editor: impl Into<String>,
    ) -> Self {
        self.platform = platform.into();
        self.shell = shell.into();
        self.editor = editor.into();
        self
    }

    /// Sets the program that runs terminal commands.
    pub fn with_shell_program(mut self, program: impl Into<String>) -> Self {
        self.shell_program = program.into();
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::testing::{RecordingConsole, ScriptedInput};

    fn scratch_path(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("greg-config-{}-{name}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir.join("greg.json")
    }

    #[test]
    fn file_keys_are_upper_case() {
        let file: ConfigFile = serde_json::from_str(
            r#"{"OPENAI_API_KEY": "sk-test", "GPT_MODEL": "gpt-4o", "SYSTEM_SHELL": "zsh"}"#,
        )
        .unwrap();
        assert_eq!(file.openai_api_key.as_deref(), Some("sk-test"));
        assert_eq!(file.gpt_model.as_deref(), Some("gpt-4o"));
        assert_eq!(file.system_shell.as_deref(), Some("zsh"));
        assert!(file.system_editor.is_none());
    }

    #[test]
    fn defaults_leave_only_the_key_empty() {
        let file = ConfigFile::defaults();
        assert!(file.openai_api_key.is_none());
        assert_eq!(file.gpt_model.as_deref(), Some("gpt-4"));
        assert_eq!(file.system_shell.as_deref(), Some("bash"));
        assert_eq!(file.system_editor.as_deref(), Some("VS Code"));
        assert_eq!(file.system_platform, Some(default_platform()));
    }

    #[test]
    fn save_uses_four_space_indent() {
        let path = scratch_path("indent");
        let file = ConfigFile {
            openai_api_key: Some("sk-test".to_string()),
            ..ConfigFile::defaults()
        };
        file.save(&path).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("{\n    \"OPENAI_API_KEY\": \"sk-test\",\n    \"GPT_MODEL\""));
        assert_eq!(ConfigFile::load(&path).unwrap(), file);
    }

    #[test]
    fn bootstrap_prompts_for_the_key_and_writes_the_file() {
        let path = scratch_path("bootstrap");
        let mut input = ScriptedInput::new(["  sk-typed  "]);
        let mut console = RecordingConsole::default();

        let file = ConfigFile::load_or_bootstrap(&path, &mut input, &mut console).unwrap();

        assert_eq!(file.openai_api_key.as_deref(), Some("sk-typed"));
        assert_eq!(input.prompts, vec!["OPENAI_API_KEY: "]);
        assert!(path.exists());
        let notice = console.text();
        assert!(notice.starts_with("Could not find "));
        assert!(notice.contains("Configuring now (you can always reconfigure this manually)."));
        assert_eq!(console.writes()[0].1, Style::MUTED);
    }

    #[test]
    fn existing_file_is_loaded_without_prompting() {
        let path = scratch_path("existing");
        ConfigFile {
            openai_api_key: Some("sk-saved".to_string()),
            ..ConfigFile::default()
        }
        .save(&path)
        .unwrap();
        let mut input = ScriptedInput::new(Vec::<String>::new());
        let mut console = RecordingConsole::default();

        let file = ConfigFile::load_or_bootstrap(&path, &mut input, &mut console).unwrap();

        assert_eq!(file.openai_api_key.as_deref(), Some("sk-saved"));
        assert!(input.prompts.is_empty());
        assert!(console.events.is_empty());
    }

    #[test]
    fn bootstrap_interrupted_is_abort() {
        let path = scratch_path("interrupted");
        let mut input = ScriptedInput::new(Vec::<String>::new());
        let mut console = RecordingConsole::default();

        let err = ConfigFile::load_or_bootstrap(&path, &mut input, &mut console).unwrap_err();

        assert!(err.is_abort());
        assert!(!path.exists());
    }

    #[test]
    fn malformed_file_is_serialization_error() {
        let path = scratch_path("malformed");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{not json").unwrap();
        let err = ConfigFile::load(&path).unwrap_err();
        assert!(matches!(err, Error::Serialization { .. }));
    }

    #[test]
    fn resolve_requires_a_key() {
        let err = GregConfig::resolve(ConfigFile::defaults(), &GregArgs::default()).unwrap_err();
        assert!(err.is_authentication());
        let blank = ConfigFile {
            openai_api_key: Some("  ".to_string()),
            ..ConfigFile::defaults()
        };
        assert!(GregConfig::resolve(blank, &GregArgs::default()).is_err());
    }

    #[test]
    fn resolve_fills_defaults() {
        let file = ConfigFile {
            openai_api_key: Some("sk-test".to_string()),
            ..ConfigFile::default()
        };
        let config = GregConfig::resolve(file, &GregArgs::default()).unwrap();
        assert_eq!(config, GregConfig::new("sk-test"));
        assert_eq!(config.model, "gpt-4");
        assert_eq!(config.shell_program, "sh");
        assert!(config.use_color);
    }

    #[test]
    fn args_override_file() {
        let file = ConfigFile {
            openai_api_key: Some("sk-test".to_string()),
            gpt_model: Some("gpt-4".to_string()),
            system_platform: Some("Plan 9".to_string()),
            system_shell: Some("rc".to_string()),
            system_editor: Some("acme".to_string()),
        };
        let args = GregArgs {
            config: None,
            model: Some("gpt-4o".to_string()),
            base_url: Some("http://localhost:8080/v1/".to_string()),
            shell_program: Some("bash".to_string()),
            log: Some("greg.jsonl".to_string()),
            no_color: true,
        };
        let config = GregConfig::resolve(file, &args).unwrap();
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.base_url.as_deref(), Some("http://localhost:8080/v1/"));
        assert_eq!(config.platform, "Plan 9");
        assert_eq!(config.shell, "rc");
        assert_eq!(config.editor, "acme");
        assert_eq!(config.shell_program, "bash");
        assert_eq!(config.log_path, Some(PathBuf::from("greg.jsonl")));
        assert!(!config.use_color);
    }

    #[test]
    fn builder_pattern() {
        let config = GregConfig::new("sk-test")
            .with_model("gpt-4o-mini")
            .with_base_url("http://localhost/v1/")
            .with_machine("macOS", "zsh", "vim")
            .with_shell_program("zsh")
            .without_color();
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.base_url.as_deref(), Some("http://localhost/v1/"));
        assert_eq!(config.platform, "macOS");
        assert_eq!(config.shell, "zsh");
        assert_eq!(config.editor, "vim");
        assert_eq!(config.shell_program, "zsh");
        assert!(!config.use_color);
    }

    #[test]
    fn default_path_ends_in_config_dir() {
        assert!(default_config_path().ends_with(".config/greg.json"));
    }
}
