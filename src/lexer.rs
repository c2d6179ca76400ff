//! Splits an input line into words, honouring quotes and backslash escapes.
//!
//! Single quotes keep everything literally. Inside double quotes a backslash
//! only escapes `"` and `\`. Outside quotes a backslash escapes any character.
//! Adjacent quoted and unquoted pieces join into one word, and `""` yields an
//! empty word.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexingError {
    /// A closing quote (single or double) was not found.
    #[error("unterminated {0} quote")]
    UnfinishedQuote(&'static str),
    /// The line ended right after a backslash.
    #[error("line ends with an escape character")]
    TrailingEscape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexingState {
    Start,
    ReadingWord,
    ReadingSingleQuote,
    ReadingDoubleQuote,
}

struct LexingFSM<'a> {
    input: std::str::Chars<'a>,
    state: LexingState,
    buffer: String,
}

impl<'a> LexingFSM<'a> {
    fn new(line: &'a str) -> Self {
        LexingFSM {
            input: line.chars(),
            state: LexingState::Start,
            buffer: String::new(),
        }
    }

    fn make_words(&mut self) -> Result<Vec<String>, LexingError> {
        let mut out = Vec::new();

        while let Some(ch) = self.input.next() {
            match self.state {
                LexingState::Start => self.handle_start(ch)?,
                LexingState::ReadingWord => self.handle_word(ch, &mut out)?,
                LexingState::ReadingSingleQuote => self.handle_single_quote(ch),
                LexingState::ReadingDoubleQuote => self.handle_double_quote(ch)?,
            }
        }

        match self.state {
            LexingState::ReadingSingleQuote => Err(LexingError::UnfinishedQuote("single")),
            LexingState::ReadingDoubleQuote => Err(LexingError::UnfinishedQuote("double")),
            LexingState::ReadingWord => {
                out.push(std::mem::take(&mut self.buffer));
                Ok(out)
            }
            LexingState::Start => Ok(out),
        }
    }

    fn escaped(&mut self) -> Result<char, LexingError> {
        self.input.next().ok_or(LexingError::TrailingEscape)
    }

    fn handle_start(&mut self, ch: char) -> Result<(), LexingError> {
        match ch {
            c if c.is_whitespace() => {}
            '\'' => self.state = LexingState::ReadingSingleQuote,
            '"' => self.state = LexingState::ReadingDoubleQuote,
            '\\' => {
                let c = self.escaped()?;
                self.buffer.push(c);
                self.state = LexingState::ReadingWord;
            }
            c => {
                self.buffer.push(c);
                self.state = LexingState::ReadingWord;
            }
        }
        Ok(())
    }

    fn handle_word(&mut self, ch: char, out: &mut Vec<String>) -> Result<(), LexingError> {
        match ch {
            c if c.is_whitespace() => {
                out.push(std::mem::take(&mut self.buffer));
                self.state = LexingState::Start;
            }
            '\'' => self.state = LexingState::ReadingSingleQuote,
            '"' => self.state = LexingState::ReadingDoubleQuote,
            '\\' => {
                let c = self.escaped()?;
                self.buffer.push(c);
            }
            c => self.buffer.push(c),
        }
        Ok(())
    }

    // Quotes always close into ReadingWord so that `""` still produces a word.
    fn handle_single_quote(&mut self, ch: char) {
        match ch {
            '\'' => self.state = LexingState::ReadingWord,
            c => self.buffer.push(c),
        }
    }

    fn handle_double_quote(&mut self, ch: char) -> Result<(), LexingError> {
        match ch {
            '"' => self.state = LexingState::ReadingWord,
            '\\' => match self.escaped()? {
                c @ ('"' | '\\') => self.buffer.push(c),
                c => {
                    self.buffer.push('\\');
                    self.buffer.push(c);
                }
            },
            c => self.buffer.push(c),
        }
        Ok(())
    }
}

/// Splits `line` into shell words.
///
/// # Examples
/// ```
/// use cmdshell::lexer::split_into_words;
/// let words = split_into_words(r#"echo "hello world" it\'s"#).unwrap();
/// assert_eq!(words, vec!["echo", "hello world", "it's"]);
/// ```
pub fn split_into_words(line: &str) -> Result<Vec<String>, LexingError> {
    LexingFSM::new(line).make_words()
}
