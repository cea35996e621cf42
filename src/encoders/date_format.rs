//! Literal date/time parsing for the date encoder.
//!
//! Patterns use the usual letter codes:
//!
//! | Letter | Field                                   |
//! |--------|-----------------------------------------|
//! | `y` `Y`| year (two letters pivot into 1950-2049) |
//! | `M`    | month (`MMM` or longer: month name)     |
//! | `d`    | day of month                            |
//! | `H`    | hour of day (0-23)                      |
//! | `h`    | clock hour (1-12), used with `a`        |
//! | `a`    | AM/PM marker                            |
//! | `m`    | minute                                  |
//! | `s`    | second                                  |
//! | `S`    | fraction of second                      |
//! | `E`    | day name (consumed, not checked)        |
//!
//! Text in single quotes and any non-letter character is matched literally.
//!
//! A [`DateParser`] holds one or more candidate formats. The first input that
//! parses locks the parser to the candidate that accepted it; every later
//! input must match that format.

use std::sync::OnceLock;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::{Result, SensorError};

/// Formats tried, in order, when no pattern is configured.
pub const BUILTIN_PATTERNS: &[&str] = &[
    "yyyy-MM-dd'T'HH:mm:ss",
    "yyyy-MM-dd HH:mm:ss",
    "yyyy-MM-dd HH:mm",
    "MM/dd/yy HH:mm",
    "yyyy-MM-dd",
];

const MONTH_NAMES: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

const DAY_NAMES: [&str; 7] = [
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NumericField {
    Year,
    Month,
    Day,
    Hour,
    ClockHour,
    Minute,
    Second,
    Fraction,
}

impl NumericField {
    fn from_letter(c: char) -> Option<Self> {
        Some(match c {
            'y' | 'Y' => NumericField::Year,
            'M' => NumericField::Month,
            'd' => NumericField::Day,
            'H' => NumericField::Hour,
            'h' => NumericField::ClockHour,
            'm' => NumericField::Minute,
            's' => NumericField::Second,
            'S' => NumericField::Fraction,
            _ => return None,
        })
    }

    fn max_digits(self, width: usize) -> usize {
        match self {
            NumericField::Year | NumericField::Fraction => width.max(9),
            _ => width.max(2),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(String),
    Numeric {
        field: NumericField,
        width: usize,
        fixed: bool,
    },
    MonthName,
    DayName,
    Marker,
}

impl Token {
    fn is_numeric(&self) -> bool {
        matches!(self, Token::Numeric { .. })
    }
}

/// One compiled pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateFormat {
    pattern: String,
    tokens: Vec<Token>,
}

#[derive(Debug, Default)]
struct Fields {
    year: Option<i32>,
    month: Option<u32>,
    day: Option<u32>,
    hour: Option<u32>,
    clock_hour: Option<u32>,
    pm: Option<bool>,
    minute: u32,
    second: u32,
    nano: u32,
}

/// Why a single format rejected an input.
#[derive(Debug)]
enum Mismatch {
    /// Scanning stopped at this byte position.
    Malformed(usize),
    /// The text matched but the values are not a valid date/time.
    Invalid(String),
}

impl DateFormat {
    /// Compiles a pattern.
    pub fn compile(pattern: &str) -> Result<Self> {
        let invalid = |message: String| SensorError::InvalidParameter {
            name: "formatPattern",
            message,
        };

        let mut tokens: Vec<Token> = Vec::new();
        let mut literal = String::new();
        let mut chars = pattern.chars().peekable();

        while let Some(c) = chars.next() {
            if c == '\'' {
                if chars.peek() == Some(&'\'') {
                    chars.next();
                    literal.push('\'');
                    continue;
                }
                let mut closed = false;
                while let Some(q) = chars.next() {
                    if q == '\'' {
                        if chars.peek() == Some(&'\'') {
                            chars.next();
                            literal.push('\'');
                        } else {
                            closed = true;
                            break;
                        }
                    } else {
                        literal.push(q);
                    }
                }
                if !closed {
                    return Err(invalid(format!("unterminated quote in '{pattern}'")));
                }
                continue;
            }

            if !c.is_ascii_alphabetic() {
                literal.push(c);
                continue;
            }

            let mut width = 1;
            while chars.peek() == Some(&c) {
                chars.next();
                width += 1;
            }

            if !literal.is_empty() {
                tokens.push(Token::Literal(std::mem::take(&mut literal)));
            }

            let token = match c {
                'M' if width >= 3 => Token::MonthName,
                'E' => Token::DayName,
                'a' => Token::Marker,
                _ => match NumericField::from_letter(c) {
                    Some(field) => Token::Numeric {
                        field,
                        width,
                        fixed: false,
                    },
                    None => {
                        return Err(invalid(format!(
                            "unsupported pattern letter '{c}' in '{pattern}'"
                        )))
                    }
                },
            };
            tokens.push(token);
        }
        if !literal.is_empty() {
            tokens.push(Token::Literal(literal));
        }

        // A numeric field directly followed by another one has no separator
        // to stop at, so it reads exactly its pattern width.
        for i in 0..tokens.len().saturating_sub(1) {
            let next_numeric = tokens[i + 1].is_numeric();
            if let Token::Numeric { fixed, .. } = &mut tokens[i] {
                *fixed = next_numeric;
            }
        }

        if !tokens.iter().any(Token::is_numeric) {
            return Err(invalid(format!("'{pattern}' has no numeric fields")));
        }

        Ok(Self {
            pattern: pattern.to_string(),
            tokens,
        })
    }

    /// Returns the source pattern.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    fn scan(&self, input: &str) -> std::result::Result<NaiveDateTime, Mismatch> {
        let bytes = input.as_bytes();
        let mut pos = 0;
        let mut fields = Fields::default();

        for token in &self.tokens {
            match token {
                Token::Literal(text) => {
                    if !input[pos..].starts_with(text.as_str()) {
                        return Err(Mismatch::Malformed(pos));
                    }
                    pos += text.len();
                }
                Token::Numeric {
                    field,
                    width,
                    fixed,
                } => {
                    let (min, max) = if *fixed {
                        (*width, *width)
                    } else {
                        (1, field.max_digits(*width))
                    };
                    let digits = bytes[pos..]
                        .iter()
                        .take(max)
                        .take_while(|b| b.is_ascii_digit())
                        .count();
                    if digits < min {
                        return Err(Mismatch::Malformed(pos));
                    }
                    let text = &input[pos..pos + digits];
                    let value: u64 = text.parse().map_err(|_| Mismatch::Malformed(pos))?;
                    store(&mut fields, *field, *width, text, value)
                        .ok_or(Mismatch::Malformed(pos))?;
                    pos += digits;
                }
                Token::MonthName => {
                    let (month, len) =
                        match_name(&input[pos..], &MONTH_NAMES).ok_or(Mismatch::Malformed(pos))?;
                    fields.month = Some(month as u32 + 1);
                    pos += len;
                }
                Token::DayName => {
                    let (_, len) =
                        match_name(&input[pos..], &DAY_NAMES).ok_or(Mismatch::Malformed(pos))?;
                    pos += len;
                }
                Token::Marker => {
                    let rest = input[pos..].get(..2).map(str::to_ascii_lowercase);
                    fields.pm = match rest.as_deref() {
                        Some("am") => Some(false),
                        Some("pm") => Some(true),
                        _ => return Err(Mismatch::Malformed(pos)),
                    };
                    pos += 2;
                }
            }
        }

        if pos != input.len() {
            return Err(Mismatch::Malformed(pos));
        }
        fields.build()
    }
}

fn store(
    fields: &mut Fields,
    field: NumericField,
    width: usize,
    text: &str,
    value: u64,
) -> Option<()> {
    let small = || u32::try_from(value).ok();
    match field {
        NumericField::Year => {
            let mut year = i32::try_from(value).ok()?;
            if width <= 2 && text.len() == 2 {
                year += if year >= 50 { 1900 } else { 2000 };
            }
            fields.year = Some(year);
        }
        NumericField::Month => fields.month = Some(small()?),
        NumericField::Day => fields.day = Some(small()?),
        NumericField::Hour => fields.hour = Some(small()?),
        NumericField::ClockHour => fields.clock_hour = Some(small()?),
        NumericField::Minute => fields.minute = small()?,
        NumericField::Second => fields.second = small()?,
        NumericField::Fraction => {
            let scale = 10u32.checked_pow(9u32.checked_sub(text.len() as u32)?)?;
            fields.nano = small()?.checked_mul(scale)?;
        }
    }
    Some(())
}

/// Matches a full or three-letter abbreviated name, case-insensitively.
fn match_name(rest: &str, names: &[&str]) -> Option<(usize, usize)> {
    names.iter().enumerate().find_map(|(i, name)| {
        let full = rest.get(..name.len());
        if full.is_some_and(|s| s.eq_ignore_ascii_case(name)) {
            return Some((i, name.len()));
        }
        let short = rest.get(..3);
        short
            .filter(|s| s.eq_ignore_ascii_case(&name[..3]))
            .map(|_| (i, 3))
    })
}

impl Fields {
    fn build(self) -> std::result::Result<NaiveDateTime, Mismatch> {
        let year = self.year.unwrap_or(1970);
        let month = self.month.unwrap_or(1);
        let day = self.day.unwrap_or(1);

        let hour = match (self.hour, self.clock_hour) {
            (Some(h), _) => h,
            (None, Some(h)) => {
                if !(1..=12).contains(&h) {
                    return Err(Mismatch::Invalid(format!(
                        "clock hour {h} must be in range [1, 12]"
                    )));
                }
                h % 12 + if self.pm == Some(true) { 12 } else { 0 }
            }
            (None, None) => 0,
        };

        let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
            Mismatch::Invalid(format!("{year:04}-{month:02}-{day:02} is not a calendar date"))
        })?;
        let time = NaiveTime::from_hms_nano_opt(hour, self.minute, self.second, self.nano)
            .ok_or_else(|| {
                Mismatch::Invalid(format!(
                    "{hour:02}:{:02}:{:02} is not a valid time of day",
                    self.minute, self.second
                ))
            })?;
        Ok(NaiveDateTime::new(date, time))
    }
}

/// Parses date/time literals, locking onto the first format that succeeds.
///
/// # Example
///
/// ```rust
/// use mokosh_sensor::encoders::DateParser;
///
/// let parser = DateParser::with_pattern("MM/dd/YY HH:mm").unwrap();
/// let dt = parser.parse("7/12/10 13:10").unwrap();
/// assert_eq!(dt.to_string(), "2010-07-12 13:10:00");
///
/// let err = parser.parse("13:10 7/12/10").unwrap_err();
/// assert_eq!(
///     err.to_string(),
///     "Invalid format: \"13:10 7/12/10\" is malformed at \":10 7/12/10\""
/// );
/// ```
#[derive(Debug, Clone)]
pub struct DateParser {
    candidates: Vec<DateFormat>,
    locked: OnceLock<usize>,
}

impl DateParser {
    /// Creates a parser for a single configured pattern.
    pub fn with_pattern(pattern: &str) -> Result<Self> {
        Ok(Self {
            candidates: vec![DateFormat::compile(pattern)?],
            locked: OnceLock::new(),
        })
    }

    /// Creates a parser that tries [`BUILTIN_PATTERNS`] until one matches.
    pub fn builtin() -> Self {
        Self {
            candidates: BUILTIN_PATTERNS
                .iter()
                .filter_map(|p| DateFormat::compile(p).ok())
                .collect(),
            locked: OnceLock::new(),
        }
    }

    /// Creates a parser for `pattern`, or the built-in candidates if `None`.
    pub fn new(pattern: Option<&str>) -> Result<Self> {
        match pattern {
            Some(p) => Self::with_pattern(p),
            None => Ok(Self::builtin()),
        }
    }

    /// Returns the pattern this parser is locked to, if any input parsed yet.
    pub fn locked_pattern(&self) -> Option<&str> {
        self.locked
            .get()
            .and_then(|&i| self.candidates.get(i))
            .map(DateFormat::pattern)
    }

    /// Returns true once an input has been parsed.
    pub fn is_locked(&self) -> bool {
        self.locked.get().is_some()
    }

    /// Parses `text` (surrounding whitespace ignored).
    ///
    /// # Errors
    ///
    /// - [`SensorError::FormatConflict`] if the text does not follow the
    ///   locked format, or no candidate format at all
    /// - [`SensorError::InvalidValue`] if it follows a format but names an
    ///   impossible date or time
    pub fn parse(&self, text: &str) -> Result<NaiveDateTime> {
        let input = text.trim();

        if let Some(&idx) = self.locked.get() {
            return self.candidates[idx]
                .scan(input)
                .map_err(|m| mismatch_error(input, m));
        }

        let mut failure: Option<Mismatch> = None;
        for (idx, format) in self.candidates.iter().enumerate() {
            match format.scan(input) {
                Ok(dt) => {
                    if self.locked.set(idx).is_ok() {
                        tracing::debug!(pattern = format.pattern(), "date format locked");
                    }
                    return Ok(dt);
                }
                Err(m) => failure = Some(prefer(failure, m)),
            }
        }

        Err(mismatch_error(input, failure.unwrap_or(Mismatch::Malformed(0))))
    }
}

/// Keeps the more informative of two failures: a value error beats a
/// format error, and a format error further into the text beats an earlier one.
fn prefer(current: Option<Mismatch>, next: Mismatch) -> Mismatch {
    match (current, next) {
        (None, next) => next,
        (Some(cur @ Mismatch::Invalid(_)), _) => cur,
        (Some(_), next @ Mismatch::Invalid(_)) => next,
        (Some(Mismatch::Malformed(a)), Mismatch::Malformed(b)) => Mismatch::Malformed(a.max(b)),
    }
}

fn mismatch_error(input: &str, mismatch: Mismatch) -> SensorError {
    match mismatch {
        Mismatch::Malformed(position) => SensorError::FormatConflict {
            input: input.to_string(),
            position,
            remainder: input[position..].to_string(),
        },
        Mismatch::Invalid(message) => SensorError::InvalidValue {
            input: input.to_string(),
            message,
        },
    }
}
