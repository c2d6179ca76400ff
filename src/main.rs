use anyhow::Context;
use argh::FromArgs;
use cmdshell::config::ShellConfig;
use cmdshell::env::Environment;
use cmdshell::interpreter::SharedOutput;
use cmdshell::line_source::ReaderLines;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

#[derive(FromArgs)]
/// Interactive shell for the builtin commands. Ctrl-C stops the running
/// command, a second Ctrl-C aborts it.
struct Args {
    #[argh(option, default = "String::from(\"$ \")")]
    /// prompt shown before each line; the PROMPT variable overrides it.
    prompt: String,

    #[argh(option)]
    /// history file; defaults to ~/.cmdshell_history.
    history: Option<PathBuf>,

    #[argh(switch)]
    /// neither load nor save history.
    no_history: bool,

    #[argh(option, default = "80")]
    /// line width of usage text.
    width: usize,

    #[argh(positional)]
    /// run the lines of this file instead of reading from the terminal.
    script: Option<PathBuf>,
}

fn default_history() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".cmdshell_history"))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args: Args = argh::from_env();
    let config = ShellConfig {
        prompt: args.prompt,
        usage_width: args.width,
        history: if args.no_history {
            None
        } else {
            args.history.or_else(default_history)
        },
    };
    let stdout: SharedOutput = Arc::new(Mutex::new(io::stdout()));
    let env = Environment::new();

    let mut console = match &args.script {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("cannot open script {}", path.display()))?;
            config
                .console(env, ReaderLines::new(BufReader::new(file)), stdout)
                .with_prompt(|_: &Environment| String::new())
                // Ctrl-C between two script lines ends the script
                .quit_on_idle_interrupt(true)
        }
        None => config.console(env, config.line_editor()?, stdout),
    };
    console.run()?;

    let status = console.env().last_status;
    // saves the line editor history
    drop(console);
    std::process::exit(status);
}
