//! Console output for the session.
//!
//! This module provides the [`Console`] trait the session writes through and
//! [`AnsiConsole`], the implementation that targets a real terminal.  Text is
//! coloured with 24-bit ANSI escapes chosen by an opaque [`Style`] token.

use std::io::{self, Stdout, Write};

use pulldown_cmark::{CodeBlockKind, Event, Parser, Tag, TagEnd};

/// ANSI escape code for bold text.
const ANSI_BOLD: &str = "\x1b[1m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code to erase the display and home the cursor.
pub const ANSI_CLEAR: &str = "\x1b[2J\x1b[H";

/// Width used for rules when the terminal does not say.
const DEFAULT_WIDTH: usize = 80;

///////////////////////////////////////////// Style ////////////////////////////////////////////

/// A colour token for console output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Style {
    rgb: (u8, u8, u8),
    bold: bool,
}

impl Style {
    /// Plain white text.
    pub const DEFAULT: Style = Style::rgb(0xFF, 0xFF, 0xFF);
    /// Assistant text in chat mode.
    pub const CHAT: Style = Style::rgb(0x80, 0xF0, 0x80);
    /// Assistant text in terminal mode.
    pub const TERMINAL: Style = Style::rgb(0x00, 0xFF, 0x00);
    /// Mode change notices.
    pub const NOTICE: Style = Style::rgb(0x40, 0x40, 0x40);
    /// Invalid command notices.
    pub const ERROR: Style = Style::rgb(0xFF, 0x00, 0x00);
    /// Configuration chatter.
    pub const MUTED: Style = Style::rgb(0xA0, 0xA0, 0xA0);
    /// The user's input marker.
    pub const PROMPT: Style = Style::rgb(0x00, 0x00, 0xFF).bold();

    /// A style for the given colour.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self {
            rgb: (r, g, b),
            bold: false,
        }
    }

    /// The same colour, in bold.
    pub const fn bold(self) -> Self {
        Self {
            rgb: self.rgb,
            bold: true,
        }
    }

    /// The escape sequence that switches to this style.
    pub fn ansi(&self) -> String {
        let (r, g, b) = self.rgb;
        let bold = if self.bold { ANSI_BOLD } else { "" };
        format!("{bold}\x1b[38;2;{r};{g};{b}m")
    }
}

impl std::fmt::Display for Style {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (r, g, b) = self.rgb;
        write!(f, "#{r:02X}{g:02X}{b:02X}")?;
        if self.bold {
            write!(f, " bold")?;
        }
        Ok(())
    }
}

//////////////////////////////////////////// Console ///////////////////////////////////////////

/// Where the session sends everything the user sees.
pub trait Console: Send {
    /// Write `text` in `style` without a line break.
    fn write(&mut self, text: &str, style: Style);

    /// Write `text` in `style` followed by a line break.
    fn write_line(&mut self, text: &str, style: Style);

    /// Render a block of markdown: rules and fenced code.
    fn write_block(&mut self, markup: &str);

    /// Clear the screen.
    fn clear(&mut self);
}

/// Console that writes to stdout with optional ANSI styling.
pub struct AnsiConsole {
    stdout: Stdout,
    use_color: bool,
    width: usize,
}

impl AnsiConsole {
    /// Creates a new AnsiConsole with colours enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new AnsiConsole with the specified colour setting.
    pub fn with_color(use_color: bool) -> Self {
        Self {
            stdout: io::stdout(),
            use_color,
            width: terminal_width(),
        }
    }

    /// Flushes stdout so streamed fragments show up immediately.
    fn flush(&mut self) {
        let _ = self.stdout.flush();
    }

    fn styled(&self, text: &str, style: Style) -> String {
        paint(text, style, self.use_color)
    }
}

impl Default for AnsiConsole {
    fn default() -> Self {
        Self::new()
    }
}

impl Console for AnsiConsole {
    fn write(&mut self, text: &str, style: Style) {
        let text = self.styled(text, style);
        let _ = self.stdout.write_all(text.as_bytes());
        self.flush();
    }

    fn write_line(&mut self, text: &str, style: Style) {
        let text = self.styled(text, style);
        let _ = writeln!(self.stdout, "{text}");
        self.flush();
    }

    fn write_block(&mut self, markup: &str) {
        let block = render_block(markup, self.width, self.use_color);
        let _ = self.stdout.write_all(block.as_bytes());
        self.flush();
    }

    fn clear(&mut self) {
        let _ = self.stdout.write_all(ANSI_CLEAR.as_bytes());
        self.flush();
    }
}

/// Wrap `text` in the escapes for `style`, or return it unchanged when colour
/// is off.
pub fn paint(text: &str, style: Style, use_color: bool) -> String {
    if use_color && !text.is_empty() {
        format!("{}{text}{ANSI_RESET}", style.ansi())
    } else {
        text.to_string()
    }
}

/// Width of the terminal from `$COLUMNS`, or 80.
pub fn terminal_width() -> usize {
    std::env::var("COLUMNS")
        .ok()
        .and_then(|cols| cols.trim().parse::<usize>().ok())
        .filter(|cols| *cols > 0)
        .unwrap_or(DEFAULT_WIDTH)
}

/// Render the markdown subset used for console blocks.
///
/// Thematic breaks become a full-width rule.  Fenced and indented code is
/// framed by rules and indented by four spaces.  Everything else is emitted as
/// plain text, one line per paragraph.  The result always ends in a newline.
pub fn render_block(markup: &str, width: usize, use_color: bool) -> String {
    let rule = "─".repeat(width.max(1));
    let code_style = Style::DEFAULT;
    let mut out = String::new();
    let mut in_code = false;

    let newline = |out: &mut String| {
        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
    };

    for event in Parser::new(markup) {
        match event {
            Event::Rule => {
                newline(&mut out);
                out.push_str(&rule);
                out.push('\n');
            }
            Event::Start(Tag::CodeBlock(kind)) => {
                newline(&mut out);
                match kind {
                    CodeBlockKind::Fenced(lang) if !lang.is_empty() => {
                        let label = format!("─ {lang} ");
                        let fill = width.saturating_sub(label.chars().count());
                        out.push_str(&label);
                        out.push_str(&"─".repeat(fill));
                    }
                    _ => out.push_str(&rule),
                }
                out.push('\n');
                in_code = true;
            }
            Event::End(TagEnd::CodeBlock) => {
                newline(&mut out);
                out.push_str(&rule);
                out.push('\n');
                in_code = false;
            }
            Event::Text(text) if in_code => {
                for line in text.lines() {
                    out.push_str("    ");
                    if use_color {
                        out.push_str(&code_style.ansi());
                        out.push_str(line);
                        out.push_str(ANSI_RESET);
                    } else {
                        out.push_str(line);
                    }
                    out.push('\n');
                }
            }
            Event::Text(text) | Event::Code(text) => out.push_str(&text),
            Event::SoftBreak | Event::HardBreak => out.push('\n'),
            Event::End(TagEnd::Paragraph) | Event::End(TagEnd::Heading(_)) => out.push('\n'),
            _ => {}
        }
    }
    newline(&mut out);
    out
}
