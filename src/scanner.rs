//! Splits a token list into option occurrences and operands.
//!
//! The scanner only knows the shape of each option (names, whether it takes a
//! value). It does no conversion and no required checks; that is left to
//! [`processor`](crate::processor) so override options can be honoured first.
//!
//! Supported forms: `--name`, `--name=value`, `--name value`, `-n`, `-nvalue`,
//! `-n value`, clustered switches `-abc`, and `--` to end option scanning.

use crate::descriptor::Arity;

/// How to treat operands that appear before later options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanMode {
    /// Operands and options may be interleaved.
    #[default]
    Permute,
    /// The first operand ends option scanning; everything after it is an operand.
    StopAtNonOption,
}

/// What the scanner needs to know about one option.
#[derive(Debug, Clone, Copy)]
pub(crate) struct OptionShape<'a> {
    pub short: Option<char>,
    pub long: Option<&'a str>,
    pub arity: Arity,
    pub optional_value: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Occurrence {
    /// Index into the shape table.
    pub option: usize,
    pub value: Option<String>,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct Scan {
    pub occurrences: Vec<Occurrence>,
    pub operands: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ScanError {
    /// The offending token (or `-x` for one letter of a cluster).
    Undefined(String),
    /// The option at this index needs a value and the input ended.
    MissingValue(usize),
    /// A switch was given an attached value, e.g. `--verbose=yes`.
    UnexpectedValue(String),
}

pub(crate) fn scan<S: AsRef<str>>(
    shapes: &[OptionShape<'_>],
    tokens: &[S],
    mode: ScanMode,
) -> Result<Scan, ScanError> {
    let digit_options = shapes
        .iter()
        .any(|s| s.short.is_some_and(|c| c.is_ascii_digit()));
    let mut out = Scan::default();
    let mut rest = tokens.iter().map(|t| AsRef::<str>::as_ref(t));

    while let Some(token) = rest.next() {
        if token == "--" {
            out.operands.extend(rest.by_ref().map(str::to_string));
            break;
        }

        if let Some(body) = token.strip_prefix("--") {
            let (name, inline) = match body.split_once('=') {
                Some((name, value)) => (name, Some(value)),
                None => (body, None),
            };
            let option = shapes
                .iter()
                .position(|s| s.long == Some(name))
                .ok_or_else(|| ScanError::Undefined(format!("--{}", name)))?;
            let shape = shapes[option];
            let value = if shape.arity == Arity::Flag {
                if inline.is_some() {
                    return Err(ScanError::UnexpectedValue(token.to_string()));
                }
                None
            } else if let Some(inline) = inline {
                Some(inline.to_string())
            } else if shape.optional_value {
                None
            } else {
                let next = rest.next().ok_or(ScanError::MissingValue(option))?;
                Some(next.to_string())
            };
            out.occurrences.push(Occurrence { option, value });
            continue;
        }

        let negative_number = !digit_options
            && token.starts_with('-')
            && token[1..].starts_with(|c: char| c.is_ascii_digit())
            && token[1..].parse::<f64>().is_ok();
        if token.len() > 1 && token.starts_with('-') && !negative_number {
            let cluster = &token[1..];
            for (pos, letter) in cluster.char_indices() {
                let option = shapes
                    .iter()
                    .position(|s| s.short == Some(letter))
                    .ok_or_else(|| ScanError::Undefined(format!("-{}", letter)))?;
                let shape = shapes[option];
                if shape.arity == Arity::Flag {
                    out.occurrences.push(Occurrence {
                        option,
                        value: None,
                    });
                    continue;
                }
                let attached = &cluster[pos + letter.len_utf8()..];
                let value = if !attached.is_empty() {
                    Some(attached.to_string())
                } else if shape.optional_value {
                    None
                } else {
                    let next = rest.next().ok_or(ScanError::MissingValue(option))?;
                    Some(next.to_string())
                };
                out.occurrences.push(Occurrence { option, value });
                break;
            }
            continue;
        }

        out.operands.push(token.to_string());
        if mode == ScanMode::StopAtNonOption {
            out.operands.extend(rest.by_ref().map(str::to_string));
            break;
        }
    }

    Ok(out)
}
