use crate::console::{Console, DefaultPrompt, LineSource};
use crate::env::Environment;
use crate::interpreter::{Interpreter, SharedOutput, ShellTaskFactory};
use crate::line_source::EditorLineSource;
use std::path::PathBuf;
use std::sync::Arc;

/// Settings of an interactive shell session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellConfig {
    /// Shown before each line unless the `PROMPT` variable is set.
    pub prompt: String,
    /// Line width of usage text.
    pub usage_width: usize,
    /// History file for the line editor; `None` keeps history in memory only.
    pub history: Option<PathBuf>,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            prompt: "$ ".to_string(),
            usage_width: 80,
            history: None,
        }
    }
}

impl ShellConfig {
    /// The builtin commands, rendering usage at the configured width.
    pub fn interpreter(&self) -> Interpreter {
        Interpreter::default().with_usage_width(self.usage_width)
    }

    pub fn line_editor(&self) -> anyhow::Result<EditorLineSource> {
        EditorLineSource::new(self.history.clone())
    }

    /// A console running lines from `lines` through [`interpreter`](Self::interpreter).
    pub fn console(
        &self,
        env: Environment,
        lines: impl LineSource + 'static,
        stdout: SharedOutput,
    ) -> Console {
        let tasks = ShellTaskFactory::new(Arc::new(self.interpreter()), stdout);
        Console::new(env, lines, tasks).with_prompt(DefaultPrompt::new(self.prompt.clone()))
    }
}
