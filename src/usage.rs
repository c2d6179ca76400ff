//! Plain-text usage rendering.

use crate::discovery::Descriptors;
use std::io::{self, Write};
use tracing::warn;

const INDENT: usize = 2;
const GAP: usize = 2;
/// Narrower than this, help text moves below its syntax column.
const MIN_HELP_WIDTH: usize = 20;
/// Indent of help text placed below its syntax.
const STACKED_INDENT: usize = 6;

/// Formats the descriptors of one command as aligned, wrapped help text.
pub struct Usage<'a, T> {
    descriptors: &'a Descriptors<T>,
    width: usize,
}

impl<'a, T> Usage<'a, T> {
    pub fn new(descriptors: &'a Descriptors<T>) -> Self {
        Self {
            descriptors,
            width: 80,
        }
    }

    /// Maximum line width, 80 by default.
    ///
    /// When the syntax column leaves less than 20 columns for help text, each
    /// help text is printed below its syntax instead. Only a single word longer
    /// than the remaining width can exceed the limit.
    pub fn width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }

    /// The one-line synopsis, e.g. `cp [OPTIONS] SOURCE TARGET`.
    pub fn synopsis(&self, command: &str) -> String {
        let mut line = command.to_string();
        if !self.descriptors.options().is_empty() {
            line.push_str(" [OPTIONS]");
        }
        for arg in self.descriptors.arguments() {
            line.push(' ');
            line.push_str(&arg.syntax());
        }
        line
    }

    /// Writes the usage text. The `Usage:` line is only emitted when `command` is given.
    pub fn render(&self, out: &mut dyn Write, command: Option<&str>) -> io::Result<()> {
        let arguments: Vec<(String, &str)> = self
            .descriptors
            .arguments()
            .iter()
            .map(|arg| (arg.token().to_string(), arg.help()))
            .collect();
        let options: Vec<(String, &str)> = self
            .descriptors
            .options()
            .iter()
            .map(|opt| {
                let syntax = opt.syntax();
                // keep long names aligned when there is no short form
                let syntax = if opt.short().is_none() {
                    format!("    {}", syntax)
                } else {
                    syntax
                };
                (syntax, opt.help())
            })
            .collect();

        let column = arguments
            .iter()
            .chain(&options)
            .map(|(syntax, _)| syntax.chars().count())
            .max()
            .unwrap_or(0);
        let side_by_side = self.width.saturating_sub(INDENT + column + GAP);
        let layout = if side_by_side >= MIN_HELP_WIDTH {
            Layout::Columns {
                column,
                help_width: side_by_side,
            }
        } else {
            Layout::Stacked {
                help_width: self.width.saturating_sub(STACKED_INDENT).max(1),
            }
        };

        let mut first = true;
        if let Some(command) = command {
            writeln!(out, "Usage: {}", self.synopsis(command))?;
            first = false;
        }
        for (title, rows) in [("Arguments:", &arguments), ("Options:", &options)] {
            if rows.is_empty() {
                continue;
            }
            if !first {
                writeln!(out)?;
            }
            first = false;
            writeln!(out, "{}", title)?;
            for (syntax, help) in rows {
                write_row(out, syntax, help, layout)?;
            }
        }
        Ok(())
    }

    /// Convenience wrapper around [`render`](Self::render).
    pub fn to_text(&self, command: Option<&str>) -> String {
        let mut buf = Vec::new();
        match self.render(&mut buf, command) {
            Ok(()) => {}
            Err(err) => warn!(error = %err, "usage rendering stopped early"),
        }
        String::from_utf8_lossy(&buf).into_owned()
    }
}

#[derive(Debug, Clone, Copy)]
enum Layout {
    /// Help text to the right of an aligned syntax column.
    Columns { column: usize, help_width: usize },
    /// Help text on the lines after its syntax.
    Stacked { help_width: usize },
}

fn write_row(out: &mut dyn Write, syntax: &str, help: &str, layout: Layout) -> io::Result<()> {
    let (column, help_width) = match layout {
        Layout::Columns { column, help_width } => (column, help_width),
        Layout::Stacked { help_width } => {
            writeln!(out, "{:indent$}{}", "", syntax, indent = INDENT)?;
            for line in wrap(help, help_width) {
                writeln!(out, "{:pad$}{}", "", line, pad = STACKED_INDENT)?;
            }
            return Ok(());
        }
    };
    let lines = wrap(help, help_width);
    let mut lines = lines.iter();
    match lines.next() {
        Some(line) => writeln!(
            out,
            "{:indent$}{:<column$}{:gap$}{}",
            "",
            syntax,
            "",
            line,
            indent = INDENT,
            column = column,
            gap = GAP
        )?,
        None => writeln!(out, "{:indent$}{}", "", syntax, indent = INDENT)?,
    }
    for line in lines {
        writeln!(out, "{:pad$}{}", "", line, pad = INDENT + column + GAP)?;
    }
    Ok(())
}

/// Greedy word wrap. Words longer than `width` get a line of their own.
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}
