use crate::console::LineSource;
use anyhow::Context;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use tracing::{debug, warn};

/// Interactive input through rustyline, with optional persistent history.
///
/// Ctrl-C at the prompt discards the current line and yields an empty one;
/// Ctrl-D yields end of input.
pub struct EditorLineSource {
    editor: DefaultEditor,
    history: Option<PathBuf>,
}

impl EditorLineSource {
    pub fn new(history: Option<PathBuf>) -> anyhow::Result<Self> {
        let mut editor = DefaultEditor::new().context("cannot initialize line editor")?;
        if let Some(path) = &history {
            if path.exists() {
                editor
                    .load_history(path)
                    .with_context(|| format!("cannot load history from {}", path.display()))?;
                debug!(path = %path.display(), "history loaded");
            }
        }
        Ok(Self { editor, history })
    }
}

impl LineSource for EditorLineSource {
    fn read_line(&mut self, prompt: &str) -> anyhow::Result<Option<String>> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    self.editor.add_history_entry(line.as_str())?;
                }
                Ok(Some(line))
            }
            Err(ReadlineError::Interrupted) => Ok(Some(String::new())),
            Err(ReadlineError::Eof) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

impl Drop for EditorLineSource {
    fn drop(&mut self) {
        if let Some(path) = &self.history {
            if let Err(err) = self.editor.save_history(path) {
                warn!(path = %path.display(), error = %err, "cannot save history");
            }
        }
    }
}

/// Reads lines from any buffered reader, e.g. a script file or piped stdin.
///
/// The prompt is echoed to `echo` when one is configured.
pub struct ReaderLines<R> {
    reader: R,
    echo: Option<Box<dyn Write>>,
}

impl<R: BufRead> ReaderLines<R> {
    pub fn new(reader: R) -> Self {
        Self { reader, echo: None }
    }

    pub fn echo_prompt(mut self, out: impl Write + 'static) -> Self {
        self.echo = Some(Box::new(out));
        self
    }
}

impl<R: BufRead> LineSource for ReaderLines<R> {
    fn read_line(&mut self, prompt: &str) -> anyhow::Result<Option<String>> {
        if let Some(out) = &mut self.echo {
            write!(out, "{}", prompt)?;
            out.flush()?;
        }
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let trimmed = line.trim_end_matches(['\n', '\r']).len();
        line.truncate(trimmed);
        Ok(Some(line))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_reader_lines() {
        let mut lines = ReaderLines::new(Cursor::new("\n  \r\necho hi\nlast"));
        assert_eq!(lines.read_line("$ ").unwrap().as_deref(), Some(""));
        assert_eq!(lines.read_line("$ ").unwrap().as_deref(), Some("  "));
        assert_eq!(lines.read_line("$ ").unwrap().as_deref(), Some("echo hi"));
        assert_eq!(lines.read_line("$ ").unwrap().as_deref(), Some("last"));
        assert_eq!(lines.read_line("$ ").unwrap(), None);
        assert_eq!(lines.read_line("$ ").unwrap(), None);
    }

    #[test]
    fn test_reader_lines_rejects_invalid_utf8() {
        let mut lines = ReaderLines::new(Cursor::new(vec![0xff, 0xfe, b'\n']));
        assert!(lines.read_line("").is_err());
    }
}
