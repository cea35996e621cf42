//! Base encoder traits and the decoded value model.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDateTime;

use crate::error::{Result, SensorError};
use crate::types::{Real, Sdr, UInt};

/// Trait for all encoders.
///
/// Encoders convert input values into SDR representations.
pub trait Encoder<T> {
    /// Returns the dimensions of the output SDR.
    fn dimensions(&self) -> &[UInt];

    /// Returns the total size of the output SDR.
    fn size(&self) -> usize;

    /// Encodes a value into an SDR.
    ///
    /// # Arguments
    ///
    /// * `value` - The value to encode
    /// * `output` - The SDR to write the encoding to
    fn encode(&self, value: T, output: &mut Sdr) -> Result<()>;

    /// Encodes a value and returns a new SDR.
    fn encode_to_sdr(&self, value: T) -> Result<Sdr> {
        let dims = self.dimensions().to_vec();
        let mut sdr = Sdr::new(&dims);
        self.encode(value, &mut sdr)?;
        Ok(sdr)
    }
}

/// A decoded field value, as produced by [`FieldEncoder::parse`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Calendar date and time.
    DateTime(NaiveDateTime),
    /// Floating point number.
    Float(Real),
    /// Integer number.
    Integer(i64),
    /// Text or category label.
    Text(String),
    /// True/false.
    Boolean(bool),
}

impl FieldValue {
    /// Short name of the variant, used in type mismatch errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::DateTime(_) => "datetime",
            FieldValue::Float(_) => "float",
            FieldValue::Integer(_) => "int",
            FieldValue::Text(_) => "string",
            FieldValue::Boolean(_) => "bool",
        }
    }

    /// Numeric view of the value, for scalar encoders.
    pub fn as_real(&self) -> Option<Real> {
        match self {
            FieldValue::Float(v) => Some(*v),
            FieldValue::Integer(v) => Some(*v as Real),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::DateTime(dt) => write!(f, "{dt}"),
            FieldValue::Float(v) => write!(f, "{v}"),
            FieldValue::Integer(v) => write!(f, "{v}"),
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Boolean(b) => write!(f, "{b}"),
        }
    }
}

impl From<Real> for FieldValue {
    fn from(v: Real) -> Self {
        FieldValue::Float(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Integer(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Boolean(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl From<NaiveDateTime> for FieldValue {
    fn from(v: NaiveDateTime) -> Self {
        FieldValue::DateTime(v)
    }
}

/// One decoded record: field name to value.
pub type Record = BTreeMap<String, FieldValue>;

/// Result of decoding an SDR back through an encoder.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedField {
    /// Best estimate of the encoded value, when the encoder can recover one.
    pub value: Option<FieldValue>,
    /// Human readable description for diagnostics.
    pub description: String,
}

/// Capability shared by every encoder a sensor can configure.
///
/// Unlike [`Encoder<T>`], this trait is object safe: the multi-encoder holds
/// one `Box<dyn FieldEncoder>` per field and dispatches through it, whatever
/// the concrete encoder family.
pub trait FieldEncoder: fmt::Debug + Send + Sync {
    /// Registry key of this encoder family.
    fn kind(&self) -> &'static str;

    /// Output width in bits.
    fn width(&self) -> usize;

    /// Number of bits set by every encoding.
    fn active_bits(&self) -> usize;

    /// Parses literal text into a value this encoder accepts.
    fn parse(&self, text: &str) -> Result<FieldValue>;

    /// Encodes a value into `output`, which must be `width()` bits wide.
    fn encode_value(&self, value: &FieldValue, output: &mut Sdr) -> Result<()>;

    /// Describes an SDR previously produced by this encoder.
    fn decode(&self, encoded: &Sdr) -> Result<DecodedField>;

    /// Encodes a value into a fresh SDR.
    fn encode_field(&self, value: &FieldValue) -> Result<Sdr> {
        let mut sdr = Sdr::new(&[self.width() as UInt]);
        self.encode_value(value, &mut sdr)?;
        Ok(sdr)
    }

    /// Parses `text` and encodes the result.
    fn parse_encode(&self, text: &str) -> Result<Sdr> {
        let value = self.parse(text)?;
        self.encode_field(&value)
    }
}

/// Checks that `output` has the width an encoder produces.
pub(crate) fn check_dimensions(expected: &[UInt], output: &Sdr) -> Result<()> {
    if output.dimensions() != expected {
        return Err(SensorError::DimensionMismatch {
            expected: expected.to_vec(),
            actual: output.dimensions().to_vec(),
        });
    }
    Ok(())
}

/// Extracts a finite number from a value, for the scalar encoder families.
pub(crate) fn expect_real(value: &FieldValue) -> Result<Real> {
    let v = value.as_real().ok_or(SensorError::TypeMismatch {
        expected: "number",
        actual: value.type_name(),
    })?;
    if !v.is_finite() {
        return Err(SensorError::InvalidInput(format!(
            "cannot encode non-finite value {v}"
        )));
    }
    Ok(v)
}

/// Parses numeric text, for the scalar encoder families.
pub(crate) fn parse_real(text: &str) -> Result<FieldValue> {
    let trimmed = text.trim();
    trimmed
        .parse::<Real>()
        .map(FieldValue::Float)
        .map_err(|e| SensorError::InvalidValue {
            input: text.to_string(),
            message: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_value_views() {
        assert_eq!(FieldValue::from(2.5).as_real(), Some(2.5));
        assert_eq!(FieldValue::from(3i64).as_real(), Some(3.0));
        assert_eq!(FieldValue::from("x").as_real(), None);
        assert_eq!(FieldValue::from(true).type_name(), "bool");
        assert_eq!(FieldValue::from("abc").to_string(), "abc");
    }

    #[test]
    fn test_expect_real() {
        assert_eq!(expect_real(&FieldValue::Integer(4)).unwrap(), 4.0);
        assert!(matches!(
            expect_real(&FieldValue::Text("a".into())),
            Err(SensorError::TypeMismatch { .. })
        ));
        assert!(matches!(
            expect_real(&FieldValue::Float(Real::NAN)),
            Err(SensorError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_parse_real() {
        assert_eq!(parse_real(" 35.3 ").unwrap(), FieldValue::Float(35.3));
        assert!(matches!(
            parse_real("abc"),
            Err(SensorError::InvalidValue { .. })
        ));
    }
}
