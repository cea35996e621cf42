//! Random Distributed Scalar Encoder (RDSE) implementation.
//!
//! The RDSE encodes a numeric scalar value into an SDR using random hashing.
//! Unlike the ScalarEncoder, it does not need to know the minimum and maximum
//! of the input range at construction time.

use crate::encoders::base::{check_dimensions, expect_real, parse_real};
use crate::encoders::{DecodedField, Encoder, FieldEncoder, FieldValue};
use crate::error::{Result, SensorError};
use crate::spec::{FieldEncoding, DEFAULT_SEED};
use crate::types::{Real, Sdr, UInt};

/// Registry key of [`RandomDistributedScalarEncoder`].
pub const RDSE_KIND: &str = "RandomDistributedScalarEncoder";

/// Largest number of buckets [`FieldEncoder::decode`] will scan.
const MAX_DECODE_BUCKETS: i64 = 1 << 20;

/// Parameters for creating an RDSE.
///
/// Members "radius" & "resolution" are mutually exclusive, specify exactly one.
#[derive(Debug, Clone)]
pub struct RdseParams {
    /// Total number of bits in the encoded output SDR.
    pub size: UInt,

    /// Number of true bits in the encoded output SDR.
    pub active_bits: UInt,

    /// Two inputs separated by more than the radius have non-overlapping representations.
    /// Mutually exclusive with `resolution`.
    pub radius: Real,

    /// Two inputs separated by greater than or equal to the resolution will have
    /// different representations.
    /// Mutually exclusive with `radius`.
    pub resolution: Real,

    /// Hash seed. Different seeds give unrelated encodings of the same input.
    pub seed: u32,

    /// Lower bound searched when decoding. Decoding needs `maximum > minimum`.
    pub minimum: Real,

    /// Upper bound searched when decoding.
    pub maximum: Real,
}

impl Default for RdseParams {
    fn default() -> Self {
        Self {
            size: 400,
            active_bits: 21,
            radius: 0.0,
            resolution: 0.0,
            seed: DEFAULT_SEED,
            minimum: 0.0,
            maximum: 0.0,
        }
    }
}

impl From<&FieldEncoding> for RdseParams {
    fn from(enc: &FieldEncoding) -> Self {
        // A record carrying both keeps the finer grained resolution.
        let (radius, resolution) = if enc.resolution > 0.0 {
            (0.0, enc.resolution)
        } else {
            (enc.radius, 0.0)
        };
        Self {
            size: enc.n,
            active_bits: enc.w,
            radius,
            resolution,
            seed: enc.seed,
            minimum: enc.min_val,
            maximum: enc.max_val,
        }
    }
}

/// Random Distributed Scalar Encoder.
///
/// The RDSE encodes numeric scalar (floating point) values into SDRs.
/// Input values are bucketed by resolution; bucket `b` activates the hash
/// positions of `b, b + 1, ..., b + active_bits - 1`, so neighbouring buckets
/// share all but one bit. Colliding positions are re-hashed until exactly
/// `active_bits` distinct bits are set.
///
/// # Example
///
/// ```rust
/// use mokosh_sensor::encoders::{RandomDistributedScalarEncoder, RdseParams, Encoder};
///
/// let encoder = RandomDistributedScalarEncoder::new(RdseParams {
///     size: 25,
///     active_bits: 3,
///     resolution: 0.1,
///     ..Default::default()
/// }).unwrap();
///
/// let sdr = encoder.encode_to_sdr(35.3).unwrap();
/// assert_eq!(sdr.get_sum(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct RandomDistributedScalarEncoder {
    size: UInt,
    active_bits: UInt,
    radius: Real,
    resolution: Real,
    seed: u32,
    minimum: Real,
    maximum: Real,

    /// Output dimensions.
    dimensions: Vec<UInt>,
}

/// Type alias for convenience.
pub type Rdse = RandomDistributedScalarEncoder;

impl RandomDistributedScalarEncoder {
    /// Creates a new RDSE.
    pub fn new(params: RdseParams) -> Result<Self> {
        if params.size == 0 {
            return Err(SensorError::InvalidParameter {
                name: "size",
                message: "Size must be > 0".to_string(),
            });
        }

        if params.active_bits == 0 || params.active_bits > params.size {
            return Err(SensorError::InvalidParameter {
                name: "active_bits",
                message: format!(
                    "active_bits must be in 1..={} (got {})",
                    params.size, params.active_bits
                ),
            });
        }

        let num_resolution_args = u8::from(params.radius > 0.0) + u8::from(params.resolution > 0.0);
        if num_resolution_args == 0 {
            return Err(SensorError::InvalidParameter {
                name: "radius/resolution",
                message: "Need one of: 'radius', 'resolution'".to_string(),
            });
        }
        if num_resolution_args > 1 {
            return Err(SensorError::InvalidParameter {
                name: "radius/resolution",
                message: "Specify only one of: 'radius', 'resolution'".to_string(),
            });
        }

        let w = Real::from(params.active_bits);
        let (radius, resolution) = if params.radius > 0.0 {
            (params.radius, params.radius / w)
        } else {
            (w * params.resolution, params.resolution)
        };

        Ok(Self {
            size: params.size,
            active_bits: params.active_bits,
            radius,
            resolution,
            seed: params.seed,
            minimum: params.minimum,
            maximum: params.maximum,
            dimensions: vec![params.size],
        })
    }

    /// Creates an RDSE from a merged field record.
    pub fn from_encoding(encoding: &FieldEncoding) -> Result<Self> {
        Self::new(RdseParams::from(encoding))
    }

    /// Returns the number of active bits.
    pub fn active_bits(&self) -> UInt {
        self.active_bits
    }

    /// Returns the resolution.
    pub fn resolution(&self) -> Real {
        self.resolution
    }

    /// Returns the radius.
    pub fn radius(&self) -> Real {
        self.radius
    }

    /// Returns the seed.
    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// Returns the bucket a value falls into.
    pub fn bucket_index(&self, value: Real) -> i64 {
        (value / self.resolution).floor() as i64
    }

    /// Active bits of a bucket, sorted and distinct.
    fn bucket_bits(&self, bucket: i64) -> Vec<UInt> {
        let mut taken = vec![false; self.size as usize];
        let mut sparse = Vec::with_capacity(self.active_bits as usize);

        for offset in 0..self.active_bits {
            // Two's complement keeps negative buckets distinct from positive ones.
            let key = (bucket.wrapping_add(i64::from(offset))) as u32;
            let mut hash = Self::murmur_hash3_32(key, self.seed);
            let mut bit = hash % self.size;
            while taken[bit as usize] {
                hash = Self::murmur_hash3_32(hash, self.seed ^ 0x9e37_79b9);
                bit = hash % self.size;
            }
            taken[bit as usize] = true;
            sparse.push(bit);
        }

        sparse.sort_unstable();
        sparse
    }

    /// MurmurHash3-style 32-bit hash function.
    #[inline]
    fn murmur_hash3_32(value: u32, seed: u32) -> u32 {
        let mut h = seed;
        let c1: u32 = 0xcc9e_2d51;
        let c2: u32 = 0x1b87_3593;

        let mut k = value;
        k = k.wrapping_mul(c1);
        k = k.rotate_left(15);
        k = k.wrapping_mul(c2);

        h ^= k;
        h = h.rotate_left(13);
        h = h.wrapping_mul(5).wrapping_add(0xe654_6b64);

        // Finalization mix
        h ^= 4; // length
        h ^= h >> 16;
        h = h.wrapping_mul(0x85eb_ca6b);
        h ^= h >> 13;
        h = h.wrapping_mul(0xc2b2_ae35);
        h ^= h >> 16;

        h
    }
}

impl Encoder<Real> for RandomDistributedScalarEncoder {
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

        output.set_sparse_unchecked(self.bucket_bits(self.bucket_index(value)));
        Ok(())
    }
}

impl FieldEncoder for RandomDistributedScalarEncoder {
    fn kind(&self) -> &'static str {
        RDSE_KIND
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

    /// Scans the buckets of `[minimum, maximum]` for the best overlap.
    ///
    /// Hash placement cannot be inverted, so an unbounded encoder can only
    /// describe the SDR, not recover a value.
    fn decode(&self, encoded: &Sdr) -> Result<DecodedField> {
        check_dimensions(&self.dimensions, encoded)?;
        let bits = encoded.get_sparse();

        if self.maximum <= self.minimum {
            return Ok(DecodedField {
                value: None,
                description: format!("{} active bits, no decode range configured", bits.len()),
            });
        }

        let first = self.bucket_index(self.minimum);
        let last = self.bucket_index(self.maximum);
        if last
            .checked_sub(first)
            .filter(|span| *span <= MAX_DECODE_BUCKETS)
            .is_none()
        {
            return Err(SensorError::InvalidParameter {
                name: "minVal/maxVal",
                message: format!("decode range spans more than {MAX_DECODE_BUCKETS} buckets"),
            });
        }

        let mut best: Option<(usize, i64)> = None;
        for bucket in first..=last {
            let overlap = self
                .bucket_bits(bucket)
                .iter()
                .filter(|b| bits.binary_search(b).is_ok())
                .count();
            if best.map_or(true, |(o, _)| overlap > o) {
                best = Some((overlap, bucket));
            }
        }

        match best {
            Some((overlap, bucket)) if overlap > 0 => {
                let value = (bucket as Real + 0.5) * self.resolution;
                Ok(DecodedField {
                    value: Some(FieldValue::Float(value)),
                    description: format!(
                        "{:.2}-{:.2} ({overlap}/{} bits)",
                        bucket as Real * self.resolution,
                        (bucket + 1) as Real * self.resolution,
                        self.active_bits
                    ),
                })
            }
            _ => Ok(DecodedField {
                value: None,
                description: "no matching bucket in decode range".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn consumption_encoder() -> Rdse {
        RandomDistributedScalarEncoder::new(RdseParams {
            size: 25,
            active_bits: 3,
            resolution: 0.1,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_create_rdse() {
        let encoder = RandomDistributedScalarEncoder::new(RdseParams {
            size: 1000,
            active_bits: 50,
            resolution: 1.23,
            ..Default::default()
        })
        .unwrap();

        assert_eq!(Encoder::size(&encoder), 1000);
        assert_eq!(encoder.active_bits(), 50);
        assert!((encoder.radius() - 61.5).abs() < 1e-9);
    }

    #[test]
    fn test_exact_active_bits_in_small_encoder() {
        // 25 bits with 3 active collides often without re-probing.
        let encoder = consumption_encoder();
        for i in 0..500 {
            let sdr = encoder.encode_to_sdr(Real::from(i) * 0.37 - 50.0).unwrap();
            assert_eq!(sdr.get_sum(), 3);
        }
    }

    #[test]
    fn test_deterministic() {
        let a = consumption_encoder().encode_to_sdr(35.3).unwrap();
        let b = consumption_encoder().encode_to_sdr(35.3).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_seed_changes_encoding() {
        let other = RandomDistributedScalarEncoder::new(RdseParams {
            size: 1000,
            active_bits: 21,
            resolution: 1.0,
            seed: 7,
            ..Default::default()
        })
        .unwrap();
        let base = RandomDistributedScalarEncoder::new(RdseParams {
            size: 1000,
            active_bits: 21,
            resolution: 1.0,
            ..Default::default()
        })
        .unwrap();
        assert_ne!(
            other.encode_to_sdr(10.0).unwrap(),
            base.encode_to_sdr(10.0).unwrap()
        );
    }

    #[test]
    fn test_neighbouring_buckets_overlap() {
        let encoder = RandomDistributedScalarEncoder::new(RdseParams {
            size: 1000,
            active_bits: 21,
            resolution: 1.0,
            ..Default::default()
        })
        .unwrap();
        let a = encoder.encode_to_sdr(10.0).unwrap();
        let b = encoder.encode_to_sdr(11.0).unwrap();
        let far = encoder.encode_to_sdr(500.0).unwrap();
        assert!(a.get_overlap(&b) >= 15);
        assert!(a.get_overlap(&b) > a.get_overlap(&far));
    }

    #[test]
    fn test_encode_nan_fails() {
        let encoder = consumption_encoder();
        assert!(matches!(
            encoder.encode_to_sdr(Real::NAN),
            Err(SensorError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_invalid_params() {
        assert!(RandomDistributedScalarEncoder::new(RdseParams {
            size: 0,
            ..Default::default()
        })
        .is_err());
        assert!(RandomDistributedScalarEncoder::new(RdseParams {
            resolution: 1.0,
            radius: 1.0,
            ..Default::default()
        })
        .is_err());
        assert!(RandomDistributedScalarEncoder::new(RdseParams::default()).is_err());
        assert!(RandomDistributedScalarEncoder::new(RdseParams {
            size: 5,
            active_bits: 6,
            resolution: 1.0,
            ..Default::default()
        })
        .is_err());
    }

    #[test]
    fn test_decode_within_range() {
        let encoder = RandomDistributedScalarEncoder::new(RdseParams {
            size: 1000,
            active_bits: 21,
            resolution: 0.5,
            minimum: 0.0,
            maximum: 100.0,
            ..Default::default()
        })
        .unwrap();

        let sdr = encoder.encode_to_sdr(42.3).unwrap();
        let decoded = FieldEncoder::decode(&encoder, &sdr).unwrap();
        let value = decoded.value.and_then(|v| v.as_real()).unwrap();
        assert!((value - 42.3).abs() <= encoder.resolution());
    }

    #[test]
    fn test_decode_without_range_describes_only() {
        let encoder = consumption_encoder();
        let sdr = encoder.encode_to_sdr(1.0).unwrap();
        let decoded = FieldEncoder::decode(&encoder, &sdr).unwrap();
        assert!(decoded.value.is_none());
        assert!(decoded.description.contains("3 active bits"));
    }

    #[test]
    fn test_decode_rejects_unbounded_range() {
        let encoder = RandomDistributedScalarEncoder::new(RdseParams {
            size: 100,
            active_bits: 9,
            resolution: 0.5,
            minimum: -1e300,
            maximum: 1e300,
            ..Default::default()
        })
        .unwrap();

        let sdr = encoder.encode_to_sdr(1.0).unwrap();
        let err = FieldEncoder::decode(&encoder, &sdr).unwrap_err();
        assert!(matches!(
            err,
            SensorError::InvalidParameter { name: "minVal/maxVal", .. }
        ));
    }
}
