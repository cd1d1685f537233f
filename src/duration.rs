//! Human-readable duration strings.
//!
//! Two grammars are accepted:
//!
//! ```text
//!   units    := (<digits> ('h' | 'm' | 's'))+     e.g. "1h30m", "45s"
//!   seconds  := <digits> [('.' | ',') <digits>] [('e' | 'E') ['+' | '-'] <digits>]
//! ```
//!
//! Unit tokens must appear in decreasing magnitude (`h`, then `m`, then `s`)
//! and each unit at most once.  A bare digit run with no unit goes through
//! the seconds path, so `"90"` is ninety seconds.
//!
//! The parser is a pure function of its input: an explicit [`Lexer`] state
//! enum is driven by one loop over the bytes.

use core::fmt;

use embassy_time::Duration;

/// Longest numeric token the lexer buffers before giving up.
const MAX_TOKEN: usize = 32;

/// Largest millisecond count whose tick conversion cannot overflow.
const MAX_MILLIS: u64 = u64::MAX / embassy_time::TICK_HZ;

/// Why a duration string was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseDurationError {
    /// Input was empty.
    Empty,
    /// A byte that fits neither grammar.
    UnexpectedChar { position: usize, found: char },
    /// A unit appeared out of order or twice.
    UnitOrder,
    /// A unit letter with no digits before it.
    MissingValue,
    /// Digits left over after a unit token (`"1h30"`).
    MissingUnit,
    /// The numeric literal could not be converted.
    InvalidNumber,
    /// The value does not fit in a millisecond counter.
    Overflow,
}

impl fmt::Display for ParseDurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty duration"),
            Self::UnexpectedChar { position, found } => {
                write!(f, "unexpected '{}' at {}", found, position)
            }
            Self::UnitOrder => write!(f, "units must be h, m, s in that order"),
            Self::MissingValue => write!(f, "unit without a value"),
            Self::MissingUnit => write!(f, "value without a unit"),
            Self::InvalidNumber => write!(f, "invalid number"),
            Self::Overflow => write!(f, "duration too large"),
        }
    }
}

impl std::error::Error for ParseDurationError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Unit {
    Seconds,
    Minutes,
    Hours,
}

impl Unit {
    fn from_byte(b: u8) -> Option<Self> {
        match b {
            b'h' => Some(Self::Hours),
            b'm' => Some(Self::Minutes),
            b's' => Some(Self::Seconds),
            _ => None,
        }
    }

    fn millis(self) -> u64 {
        match self {
            Self::Hours => 3_600_000,
            Self::Minutes => 60_000,
            Self::Seconds => 1_000,
        }
    }
}

/// Lexer position within the two grammars.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lexer {
    /// Reading digits that end either in a unit or at end of input.
    Integer,
    /// After the decimal separator.
    Fraction,
    /// Directly after `e`/`E`; a sign is still allowed here.
    ExponentStart,
    /// Exponent digits.
    Exponent,
}

/// Parse `text` into a [`Duration`].
///
/// ```
/// use relaynode::duration::parse;
/// assert_eq!(parse("1h30m").unwrap().as_secs(), 5400);
/// assert_eq!(parse("1.5").unwrap().as_millis(), 1500);
/// assert!(parse("5m6h").is_err());
/// ```
pub fn parse(text: &str) -> Result<Duration, ParseDurationError> {
    if text.is_empty() {
        return Err(ParseDurationError::Empty);
    }

    let mut state = Lexer::Integer;
    let mut token: heapless::String<MAX_TOKEN> = heapless::String::new();
    let mut last_unit: Option<Unit> = None;
    let mut total_ms: u64 = 0;

    for (position, &b) in text.as_bytes().iter().enumerate() {
        let unexpected = ParseDurationError::UnexpectedChar {
            position,
            found: char::from(b),
        };

        state = match (state, b) {
            (Lexer::Integer, b'0'..=b'9')
            | (Lexer::Fraction, b'0'..=b'9') => {
                push(&mut token, b)?;
                state
            }
            (Lexer::Integer, b'h' | b'm' | b's') => {
                let Some(unit) = Unit::from_byte(b) else {
                    return Err(unexpected);
                };
                if token.is_empty() {
                    return Err(ParseDurationError::MissingValue);
                }
                if last_unit.is_some_and(|prev| unit >= prev) {
                    return Err(ParseDurationError::UnitOrder);
                }
                let value: u64 = token
                    .parse()
                    .map_err(|_| ParseDurationError::Overflow)?;
                total_ms = value
                    .checked_mul(unit.millis())
                    .and_then(|ms| total_ms.checked_add(ms))
                    .ok_or(ParseDurationError::Overflow)?;
                last_unit = Some(unit);
                token.clear();
                Lexer::Integer
            }
            (Lexer::Integer, b'.' | b',') if last_unit.is_none() => {
                push(&mut token, b'.')?;
                Lexer::Fraction
            }
            (Lexer::Integer | Lexer::Fraction, b'e' | b'E') if last_unit.is_none() => {
                push(&mut token, b'e')?;
                Lexer::ExponentStart
            }
            (Lexer::ExponentStart, b'+' | b'-') => {
                push(&mut token, b)?;
                Lexer::Exponent
            }
            (Lexer::ExponentStart | Lexer::Exponent, b'0'..=b'9') => {
                push(&mut token, b)?;
                Lexer::Exponent
            }
            _ => return Err(unexpected),
        };
    }

    match state {
        Lexer::Integer if token.is_empty() => from_millis(total_ms),
        Lexer::Integer if last_unit.is_some() => Err(ParseDurationError::MissingUnit),
        _ => seconds(&token),
    }
}

fn push(token: &mut heapless::String<MAX_TOKEN>, b: u8) -> Result<(), ParseDurationError> {
    token
        .push(char::from(b))
        .map_err(|_| ParseDurationError::Overflow)
}

/// Floating-point seconds, truncated to whole milliseconds.
fn seconds(token: &str) -> Result<Duration, ParseDurationError> {
    let secs: f64 = token
        .parse()
        .map_err(|_| ParseDurationError::InvalidNumber)?;
    if !secs.is_finite() || secs < 0.0 {
        return Err(ParseDurationError::InvalidNumber);
    }
    let ms = secs * 1000.0;
    if ms > MAX_MILLIS as f64 {
        return Err(ParseDurationError::Overflow);
    }
    from_millis(ms as u64)
}

fn from_millis(ms: u64) -> Result<Duration, ParseDurationError> {
    if ms > MAX_MILLIS {
        return Err(ParseDurationError::Overflow);
    }
    Ok(Duration::from_millis(ms))
}
