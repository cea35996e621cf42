//! Boolean Encoder implementation.
//!
//! The Boolean Encoder encodes true/false values into distinct SDR representations.

use crate::encoders::base::check_dimensions;
use crate::encoders::{DecodedField, Encoder, FieldEncoder, FieldValue};
use crate::error::{Result, SensorError};
use crate::spec::FieldEncoding;
use crate::types::{Sdr, UInt};

/// Registry key of [`BooleanEncoder`].
pub const BOOLEAN_KIND: &str = "BooleanEncoder";

/// Parameters for creating a Boolean Encoder.
#[derive(Debug, Clone)]
pub struct BooleanEncoderParams {
    /// Number of active bits for each boolean state.
    pub active_bits: UInt,
}

impl Default for BooleanEncoderParams {
    fn default() -> Self {
        Self { active_bits: 21 }
    }
}

/// Encodes boolean values into SDR representations.
///
/// True and false are encoded into non-overlapping bit patterns.
///
/// # Example
///
/// ```rust
/// use mokosh_sensor::encoders::{BooleanEncoder, BooleanEncoderParams, Encoder};
///
/// let encoder = BooleanEncoder::new(BooleanEncoderParams {
///     active_bits: 10,
/// }).unwrap();
///
/// let sdr_true = encoder.encode_to_sdr(true).unwrap();
/// let sdr_false = encoder.encode_to_sdr(false).unwrap();
///
/// assert_eq!(sdr_true.get_overlap(&sdr_false), 0);
/// assert_eq!(sdr_true.get_sum(), 10);
/// ```
#[derive(Debug, Clone)]
pub struct BooleanEncoder {
    /// Number of active bits.
    active_bits: UInt,

    /// Total size (2 * active_bits).
    size: UInt,

    /// Output dimensions.
    dimensions: Vec<UInt>,
}

impl BooleanEncoder {
    /// Creates a new Boolean Encoder.
    pub fn new(params: BooleanEncoderParams) -> Result<Self> {
        if params.active_bits == 0 {
            return Err(SensorError::InvalidParameter {
                name: "active_bits",
                message: "Must be > 0".to_string(),
            });
        }

        let size = params.active_bits * 2;

        Ok(Self {
            active_bits: params.active_bits,
            size,
            dimensions: vec![size],
        })
    }

    /// Creates a Boolean Encoder from a merged field record. Only `w` is used.
    pub fn from_encoding(encoding: &FieldEncoding) -> Result<Self> {
        Self::new(BooleanEncoderParams {
            active_bits: encoding.w,
        })
    }
}

impl Encoder<bool> for BooleanEncoder {
    fn dimensions(&self) -> &[UInt] {
        &self.dimensions
    }

    fn size(&self) -> usize {
        self.size as usize
    }

    fn encode(&self, value: bool, output: &mut Sdr) -> Result<()> {
        check_dimensions(&self.dimensions, output)?;

        let sparse: Vec<UInt> = if value {
            // True: first half of bits
            (0..self.active_bits).collect()
        } else {
            // False: second half of bits
            (self.active_bits..self.size).collect()
        };

        output.set_sparse_unchecked(sparse);
        Ok(())
    }
}

impl FieldEncoder for BooleanEncoder {
    fn kind(&self) -> &'static str {
        BOOLEAN_KIND
    }

    fn width(&self) -> usize {
        self.size as usize
    }

    fn active_bits(&self) -> usize {
        self.active_bits as usize
    }

    fn parse(&self, text: &str) -> Result<FieldValue> {
        match text.trim().to_ascii_lowercase().as_str() {
            "true" | "t" | "yes" | "y" | "1" => Ok(FieldValue::Boolean(true)),
            "false" | "f" | "no" | "n" | "0" => Ok(FieldValue::Boolean(false)),
            _ => Err(SensorError::InvalidValue {
                input: text.to_string(),
                message: "expected a boolean literal".to_string(),
            }),
        }
    }

    fn encode_value(&self, value: &FieldValue, output: &mut Sdr) -> Result<()> {
        match value {
            FieldValue::Boolean(b) => self.encode(*b, output),
            FieldValue::Integer(i @ (0 | 1)) => self.encode(*i == 1, output),
            other => Err(SensorError::TypeMismatch {
                expected: "bool",
                actual: other.type_name(),
            }),
        }
    }

    fn decode(&self, encoded: &Sdr) -> Result<DecodedField> {
        check_dimensions(&self.dimensions, encoded)?;
        let first = *encoded
            .get_sparse()
            .first()
            .ok_or_else(|| SensorError::InvalidInput("SDR has no active bits".to_string()))?;
        let value = first < self.active_bits;
        Ok(DecodedField {
            value: Some(FieldValue::Boolean(value)),
            description: value.to_string(),
        })
    }
}
