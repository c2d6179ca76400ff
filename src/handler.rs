//! Token to value conversion.
//!
//! A [`Handler`] turns one raw token into a typed value. Every slot type that has
//! an obvious textual form implements [`FromToken`] and gets [`DefaultHandler`]
//! for free; commands can still declare an explicit handler per descriptor,
//! either a type implementing [`Handler`] or a plain closure.

use crate::error::ConversionError;
use regex::Regex;
use std::fmt;
use std::marker::PhantomData;
use std::path::PathBuf;
use std::sync::LazyLock;
use std::time::Duration;

/// Conversion strategy from a raw token to a value of type `V`.
pub trait Handler<V> {
    fn convert(&self, token: &str) -> Result<V, ConversionError>;
}

impl<V, F> Handler<V> for F
where
    F: Fn(&str) -> Result<V, ConversionError>,
{
    fn convert(&self, token: &str) -> Result<V, ConversionError> {
        self(token)
    }
}

/// Types with a canonical textual form usable on the command line.
pub trait FromToken: Sized {
    fn from_token(token: &str) -> Result<Self, ConversionError>;
}

/// Handler used when a descriptor does not name one: defers to [`FromToken`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHandler;

impl<V: FromToken> Handler<V> for DefaultHandler {
    fn convert(&self, token: &str) -> Result<V, ConversionError> {
        V::from_token(token)
    }
}

impl FromToken for String {
    fn from_token(token: &str) -> Result<Self, ConversionError> {
        Ok(token.to_string())
    }
}

impl FromToken for PathBuf {
    fn from_token(token: &str) -> Result<Self, ConversionError> {
        if token.is_empty() {
            return Err(ConversionError::new(token, "expected a path"));
        }
        Ok(PathBuf::from(token))
    }
}

macro_rules! from_token_via_parse {
    ($reason:literal => $($ty:ty),+ $(,)?) => {
        $(
            impl FromToken for $ty {
                fn from_token(token: &str) -> Result<Self, ConversionError> {
                    token
                        .parse::<$ty>()
                        .map_err(|_| ConversionError::new(token, $reason))
                }
            }
        )+
    };
}

from_token_via_parse!("expected an integer" => i8, i16, i32, i64, i128, isize);
from_token_via_parse!("expected a non-negative integer" => u8, u16, u32, u64, u128, usize);
from_token_via_parse!("expected a number" => f32, f64);

impl FromToken for char {
    fn from_token(token: &str) -> Result<Self, ConversionError> {
        let mut chars = token.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(ConversionError::new(token, "expected a single character")),
        }
    }
}

impl FromToken for bool {
    fn from_token(token: &str) -> Result<Self, ConversionError> {
        match token.to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(true),
            "false" | "no" | "off" | "0" => Ok(false),
            _ => Err(ConversionError::new(token, "expected true or false")),
        }
    }
}

static DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(\d+(?:\.\d+)?)\s*(ms|s|m|h|d)?\s*$").expect("valid duration regex")
});

/// `150ms`, `2s`, `1.5m`, `1h`, `3d`; a bare number is seconds.
impl FromToken for Duration {
    fn from_token(token: &str) -> Result<Self, ConversionError> {
        let invalid = || ConversionError::new(token, "expected a duration like 500ms, 2s or 1h");
        let caps = DURATION_RE.captures(token).ok_or_else(invalid)?;
        let amount: f64 = caps[1].parse().map_err(|_| invalid())?;
        let unit = caps
            .get(2)
            .map(|m| m.as_str().to_ascii_lowercase())
            .unwrap_or_default();
        let seconds = match unit.as_str() {
            "ms" => amount / 1000.0,
            "" | "s" => amount,
            "m" => amount * 60.0,
            "h" => amount * 3600.0,
            "d" => amount * 86_400.0,
            _ => return Err(invalid()),
        };
        Duration::try_from_secs_f64(seconds).map_err(|_| invalid())
    }
}

/// A byte count written with an optional binary suffix (`4k`, `10MB`, `2GiB`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct ByteSize(pub u64);

impl ByteSize {
    pub fn bytes(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];
        let mut value = self.0;
        let mut unit = None;
        for u in UNITS {
            if value < 1024 || value % 1024 != 0 {
                break;
            }
            value /= 1024;
            unit = Some(u);
        }
        match unit {
            Some(u) => write!(f, "{}{}", value, u),
            None => write!(f, "{}B", value),
        }
    }
}

static SIZE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(\d+)\s*([kmgt]?)(i?b)?\s*$").expect("valid size regex")
});

impl FromToken for ByteSize {
    fn from_token(token: &str) -> Result<Self, ConversionError> {
        let invalid = || ConversionError::new(token, "expected a size like 512, 4k or 10MB");
        let caps = SIZE_RE.captures(token).ok_or_else(invalid)?;
        let amount: u64 = caps[1].parse().map_err(|_| invalid())?;
        let shift = match caps[2].to_ascii_lowercase().as_str() {
            "" => 0,
            "k" => 10,
            "m" => 20,
            "g" => 30,
            "t" => 40,
            _ => return Err(invalid()),
        };
        amount
            .checked_mul(1u64 << shift)
            .map(ByteSize)
            .ok_or_else(|| ConversionError::new(token, "size is too large"))
    }
}

/// Enumerations selectable by name on the command line.
///
/// ```
/// use cmdshell::handler::{named_value, NamedValue};
///
/// #[derive(Debug, Clone, Copy, PartialEq)]
/// enum When { Always, Never }
///
/// impl NamedValue for When {
///     fn variants() -> &'static [(&'static str, Self)] {
///         &[("always", When::Always), ("never", When::Never)]
///     }
/// }
///
/// assert_eq!(named_value::<When>("NEVER").unwrap(), When::Never);
/// assert!(named_value::<When>("sometimes").is_err());
/// ```
pub trait NamedValue: Sized + Clone + 'static {
    fn variants() -> &'static [(&'static str, Self)];
}

/// Looks a variant up by name, ignoring ASCII case.
pub fn named_value<E: NamedValue>(token: &str) -> Result<E, ConversionError> {
    E::variants()
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(token))
        .map(|(_, value)| value.clone())
        .ok_or_else(|| {
            let names: Vec<&str> = E::variants().iter().map(|(name, _)| *name).collect();
            ConversionError::new(token, format!("expected one of {}", names.join(", ")))
        })
}

/// Explicit handler for [`NamedValue`] slots.
pub struct EnumHandler<E>(PhantomData<E>);

impl<E> Default for EnumHandler<E> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<E: NamedValue> Handler<E> for EnumHandler<E> {
    fn convert(&self, token: &str) -> Result<E, ConversionError> {
        named_value(token)
    }
}
