//! Scalar Encoder implementation.
//!
//! The Scalar Encoder converts numerical values into SDR representations
//! where semantically similar values have overlapping active bits.

use crate::encoders::base::{check_dimensions, expect_real, parse_real};
use crate::encoders::{DecodedField, Encoder, FieldEncoder, FieldValue};
use crate::error::{Result, SensorError};
use crate::spec::FieldEncoding;
use crate::types::{Real, Sdr, UInt};

/// Registry key of [`ScalarEncoder`].
pub const SCALAR_KIND: &str = "ScalarEncoder";

/// Largest output width; keeps bit arithmetic (`bucket + size`) in range.
const MAX_SIZE: UInt = UInt::MAX / 2;

/// Converts a derived bucket count to `UInt`, rejecting counts that do not fit.
fn bucket_count(count: Real) -> Result<UInt> {
    if count.is_finite() && count >= 0.0 && count <= Real::from(MAX_SIZE) {
        Ok(count as UInt)
    } else {
        Err(SensorError::InvalidParameter {
            name: "size/radius/resolution",
            message: format!("derived bucket count {count} exceeds {MAX_SIZE}"),
        })
    }
}

/// Parameters for creating a Scalar Encoder.
///
/// The size can be given directly, or computed from `radius` or `resolution`.
/// If `size` is non-zero it wins over both.
#[derive(Debug, Clone)]
pub struct ScalarEncoderParams {
    /// Minimum value of the input range.
    pub minimum: Real,

    /// Maximum value of the input range.
    pub maximum: Real,

    /// Total number of bits in the output.
    /// If 0, it will be computed from radius or resolution.
    pub size: UInt,

    /// Number of active bits for each encoding.
    pub active_bits: UInt,

    /// Two inputs separated by more than the radius have non-overlapping representations.
    pub radius: Real,

    /// Two inputs separated by at least the resolution have different representations.
    pub resolution: Real,

    /// Whether to clamp values outside the range (vs. rejecting them).
    pub clip_input: bool,

    /// Whether the input range is periodic (e.g., angles, hours).
    pub periodic: bool,

    /// Whether inputs are enumerated categories.
    /// If true, every integer in the range gets its own non-overlapping block.
    pub category: bool,

    /// Skip the sparsity sanity check.
    pub forced: bool,
}

impl Default for ScalarEncoderParams {
    fn default() -> Self {
        Self {
            minimum: 0.0,
            maximum: 100.0,
            size: 400,
            active_bits: 21,
            radius: 0.0,
            resolution: 0.0,
            clip_input: true,
            periodic: false,
            category: false,
            forced: false,
        }
    }
}

impl From<&FieldEncoding> for ScalarEncoderParams {
    fn from(enc: &FieldEncoding) -> Self {
        Self {
            minimum: enc.min_val,
            maximum: enc.max_val,
            size: enc.n,
            active_bits: enc.w,
            radius: enc.radius,
            resolution: enc.resolution,
            clip_input: enc.clip,
            periodic: enc.periodic,
            category: false,
            forced: enc.forced,
        }
    }
}

/// Encodes scalar values into SDR representations.
///
/// Similar values produce overlapping bit patterns, preserving
/// semantic similarity in the encoded representation. Periodic encoders
/// centre the run of active bits on the input's bucket and wrap around.
///
/// # Example
///
/// ```rust
/// use mokosh_sensor::encoders::{ScalarEncoder, ScalarEncoderParams, Encoder};
///
/// let encoder = ScalarEncoder::new(ScalarEncoderParams {
///     minimum: 0.0,
///     maximum: 100.0,
///     size: 100,
///     active_bits: 10,
///     ..Default::default()
/// }).unwrap();
///
/// let sdr = encoder.encode_to_sdr(50.0).unwrap();
/// assert_eq!(sdr.get_sum(), 10);
/// ```
#[derive(Debug, Clone)]
pub struct ScalarEncoder {
    minimum: Real,
    maximum: Real,
    size: UInt,
    active_bits: UInt,
    clip_input: bool,
    periodic: bool,
    category: bool,

    /// Precomputed: range of input values.
    range: Real,

    /// Precomputed: input units per bucket.
    resolution: Real,

    /// Precomputed: bits on each side of a periodic run's centre.
    half_width: UInt,

    /// Precomputed: number of distinct bucket positions.
    num_buckets: UInt,

    /// Output dimensions.
    dimensions: Vec<UInt>,
}

impl ScalarEncoder {
    /// Creates a new Scalar Encoder.
    pub fn new(params: ScalarEncoderParams) -> Result<Self> {
        if params.maximum <= params.minimum {
            return Err(SensorError::InvalidParameter {
                name: "maximum",
                message: format!(
                    "maximum ({}) must be greater than minimum ({})",
                    params.maximum, params.minimum
                ),
            });
        }

        if params.active_bits == 0 {
            return Err(SensorError::InvalidParameter {
                name: "active_bits",
                message: "Must be > 0".to_string(),
            });
        }

        let range = params.maximum - params.minimum;
        let w = params.active_bits;

        let num_buckets = if params.category {
            bucket_count((range + 1.0).round())?
        } else if params.size > 0 {
            if params.size < w {
                return Err(SensorError::InvalidParameter {
                    name: "size",
                    message: format!("size ({}) must be >= active_bits ({w})", params.size),
                });
            }
            let size = bucket_count(Real::from(params.size))?;
            if params.periodic {
                size
            } else {
                size - w + 1
            }
        } else if params.radius > 0.0 {
            bucket_count((Real::from(w) * range / params.radius).ceil())?
        } else if params.resolution > 0.0 {
            bucket_count((range / params.resolution).ceil())?
        } else {
            return Err(SensorError::InvalidParameter {
                name: "size/radius/resolution",
                message: "Must specify one of size, radius or resolution".to_string(),
            });
        };

        if num_buckets == 0 {
            return Err(SensorError::InvalidParameter {
                name: "size",
                message: "Encoder would have no buckets".to_string(),
            });
        }

        let size = if params.category {
            num_buckets.checked_mul(w)
        } else if params.periodic {
            Some(num_buckets)
        } else {
            num_buckets.checked_add(w - 1)
        }
        .filter(|&size| size <= MAX_SIZE)
        .ok_or_else(|| SensorError::InvalidParameter {
            name: "size",
            message: format!("encoder would exceed {MAX_SIZE} bits"),
        })?;

        if size < w {
            return Err(SensorError::InvalidParameter {
                name: "size",
                message: format!("size ({size}) must be >= active_bits ({w})"),
            });
        }
        if !params.forced && !params.category && w * 2 > size {
            return Err(SensorError::InvalidParameter {
                name: "active_bits",
                message: format!(
                    "{w} active bits out of {size} is not sparse; set 'forced' to allow it"
                ),
            });
        }

        Ok(Self {
            minimum: params.minimum,
            maximum: params.maximum,
            size,
            active_bits: w,
            clip_input: params.clip_input,
            periodic: params.periodic,
            category: params.category,
            range,
            resolution: if params.category {
                1.0
            } else {
                range / Real::from(num_buckets)
            },
            half_width: (w - 1) / 2,
            num_buckets,
            dimensions: vec![size],
        })
    }

    /// Creates a Scalar Encoder from a merged field record.
    pub fn from_encoding(encoding: &FieldEncoding) -> Result<Self> {
        Self::new(ScalarEncoderParams::from(encoding))
    }

    /// Returns the bucket index for a value.
    ///
    /// # Errors
    ///
    /// Returns [`SensorError::OutOfRange`] for out-of-range input on a
    /// non-periodic encoder that does not clip.
    pub fn bucket_index(&self, value: Real) -> Result<UInt> {
        let mut value = value;

        if self.periodic {
            value = self.minimum + (value - self.minimum).rem_euclid(self.range);
        } else if value < self.minimum || value > self.maximum {
            if !self.clip_input {
                return Err(SensorError::OutOfRange {
                    value,
                    minimum: self.minimum,
                    maximum: self.maximum,
                });
            }
            value = value.clamp(self.minimum, self.maximum);
        }

        let bucket = if self.category {
            (value - self.minimum).round() as UInt
        } else {
            let normalized = (value - self.minimum) / self.range;
            (normalized * Real::from(self.num_buckets)).floor() as UInt
        };
        Ok(bucket.min(self.num_buckets - 1))
    }

    /// Returns the active bits of a bucket, sorted.
    fn bucket_bits(&self, bucket: UInt) -> Vec<UInt> {
        let mut sparse: Vec<UInt> = if self.category {
            let start = bucket * self.active_bits;
            (start..start + self.active_bits).collect()
        } else if self.periodic {
            let start = (bucket + self.size - self.half_width) % self.size;
            (0..self.active_bits).map(|i| (start + i) % self.size).collect()
        } else {
            (bucket..bucket + self.active_bits).collect()
        };
        sparse.sort_unstable();
        sparse
    }

    /// Recovers the bucket from an SDR produced by this encoder.
    fn bucket_of(&self, encoded: &Sdr) -> Result<UInt> {
        let bits = encoded.get_sparse();
        let first = *bits
            .first()
            .ok_or_else(|| SensorError::InvalidInput("SDR has no active bits".to_string()))?;

        let bucket = if self.category {
            first / self.active_bits
        } else if self.periodic {
            // The run starts at the active bit whose predecessor is inactive.
            let start = bits
                .iter()
                .copied()
                .find(|&b| bits.binary_search(&((b + self.size - 1) % self.size)).is_err())
                .unwrap_or(first);
            (start + self.half_width) % self.size
        } else {
            first
        };
        Ok(bucket.min(self.num_buckets - 1))
    }

    /// Returns the centre value of a bucket.
    pub fn bucket_value(&self, bucket: UInt) -> Real {
        if self.category {
            self.minimum + Real::from(bucket)
        } else {
            self.minimum + (Real::from(bucket) + 0.5) * self.resolution
        }
    }

    /// Returns the minimum value.
    pub fn minimum(&self) -> Real {
        self.minimum
    }

    /// Returns the maximum value.
    pub fn maximum(&self) -> Real {
        self.maximum
    }

    /// Returns the resolution (input units per bucket).
    pub fn resolution(&self) -> Real {
        self.resolution
    }

    /// Returns the number of active bits.
    pub fn active_bits(&self) -> UInt {
        self.active_bits
    }

    /// Returns whether this is a periodic encoder.
    pub fn periodic(&self) -> bool {
        self.periodic
    }
}

impl Encoder<Real> for ScalarEncoder {
    fn dimensions(&self) -> &[UInt] {
        &self.dimensions
    }

    fn size(&self) -> usize {
        self.size as usize
    }

    fn encode(&self, value: Real, output: &mut Sdr) -> Result<()> {
        check_dimensions(&self.dimensions, output)?;
        if !value.is_finite() {
            return Err(SensorError::InvalidInput(format!(
                "cannot encode non-finite value {value}"
            )));
        }

        let bucket = self.bucket_index(value)?;
        output.set_sparse_unchecked(self.bucket_bits(bucket));
        Ok(())
    }
}

impl FieldEncoder for ScalarEncoder {
    fn kind(&self) -> &'static str {
        SCALAR_KIND
    }

    fn width(&self) -> usize {
        self.size as usize
    }

    fn active_bits(&self) -> usize {
        self.active_bits as usize
    }

    fn parse(&self, text: &str) -> Result<FieldValue> {
        parse_real(text)
    }

    fn encode_value(&self, value: &FieldValue, output: &mut Sdr) -> Result<()> {
        self.encode(expect_real(value)?, output)
    }

    fn decode(&self, encoded: &Sdr) -> Result<DecodedField> {
        check_dimensions(&self.dimensions, encoded)?;
        let bucket = self.bucket_of(encoded)?;
        let value = self.bucket_value(bucket);
        let description = if self.category {
            format!("{value}")
        } else {
            let low = self.minimum + Real::from(bucket) * self.resolution;
            format!("{:.2}-{:.2}", low, low + self.resolution)
        };
        Ok(DecodedField {
            value: Some(FieldValue::Float(value)),
            description,
        })
    }
}
