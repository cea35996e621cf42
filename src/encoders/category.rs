//! Category Encoder implementation.
//!
//! The Category Encoder encodes discrete string labels into non-overlapping
//! SDR representations. The first block is reserved for labels outside the
//! configured vocabulary.

use std::collections::HashMap;

use crate::encoders::base::check_dimensions;
use crate::encoders::{DecodedField, Encoder, FieldEncoder, FieldValue};
use crate::error::{Result, SensorError};
use crate::spec::FieldEncoding;
use crate::types::{Sdr, UInt};

/// Registry key of [`CategoryEncoder`].
pub const CATEGORY_KIND: &str = "CategoryEncoder";

/// Parameters for creating a Category Encoder.
#[derive(Debug, Clone)]
pub struct CategoryEncoderParams {
    /// List of category names. The order determines the encoding.
    pub categories: Vec<String>,

    /// Total number of bits in the output SDR.
    /// If 0, computed as `(categories + 1) * active_bits`.
    pub size: UInt,

    /// Number of active bits for each category encoding.
    pub active_bits: UInt,
}

impl Default for CategoryEncoderParams {
    fn default() -> Self {
        Self {
            categories: Vec::new(),
            size: 0,
            active_bits: 21,
        }
    }
}

impl From<&FieldEncoding> for CategoryEncoderParams {
    fn from(enc: &FieldEncoding) -> Self {
        Self {
            categories: enc.categories.clone(),
            size: enc.n,
            active_bits: enc.w,
        }
    }
}

/// Encodes discrete categories into SDR representations.
///
/// Each category is assigned a unique, non-overlapping block of bits; block 0
/// stands for every label the encoder was not configured with.
///
/// # Example
///
/// ```rust
/// use mokosh_sensor::encoders::{CategoryEncoder, CategoryEncoderParams, Encoder};
///
/// let encoder = CategoryEncoder::new(CategoryEncoderParams {
///     categories: vec!["red".to_string(), "green".to_string(), "blue".to_string()],
///     active_bits: 10,
///     ..Default::default()
/// }).unwrap();
///
/// let sdr_red = encoder.encode_to_sdr("red").unwrap();
/// let sdr_blue = encoder.encode_to_sdr("blue").unwrap();
///
/// // Different categories have no overlap
/// assert_eq!(sdr_red.get_overlap(&sdr_blue), 0);
/// ```
#[derive(Debug, Clone)]
pub struct CategoryEncoder {
    /// Mapping from category name to block index (1-based, 0 is unknown).
    category_map: HashMap<String, usize>,

    /// List of categories in order.
    categories: Vec<String>,

    /// Total size of output.
    size: UInt,

    /// Number of active bits per category.
    active_bits: UInt,

    /// Output dimensions.
    dimensions: Vec<UInt>,
}

impl CategoryEncoder {
    /// Creates a new Category Encoder.
    pub fn new(params: CategoryEncoderParams) -> Result<Self> {
        if params.categories.is_empty() {
            return Err(SensorError::InvalidParameter {
                name: "categories",
                message: "Must provide at least one category".to_string(),
            });
        }

        if params.active_bits == 0 {
            return Err(SensorError::InvalidParameter {
                name: "active_bits",
                message: "Must be > 0".to_string(),
            });
        }

        let blocks = params.categories.len() as UInt + 1;
        let min_size = blocks * params.active_bits;
        let size = if params.size > 0 { params.size } else { min_size };
        if size < min_size {
            return Err(SensorError::InvalidParameter {
                name: "size",
                message: format!(
                    "Size {size} is too small for {} categories with {} active bits (need at least {min_size})",
                    params.categories.len(),
                    params.active_bits,
                ),
            });
        }

        let mut category_map = HashMap::new();
        for (idx, cat) in params.categories.iter().enumerate() {
            if category_map.insert(cat.clone(), idx + 1).is_some() {
                return Err(SensorError::InvalidParameter {
                    name: "categories",
                    message: format!("Duplicate category: {cat}"),
                });
            }
        }

        Ok(Self {
            category_map,
            categories: params.categories,
            size,
            active_bits: params.active_bits,
            dimensions: vec![size],
        })
    }

    /// Creates a Category Encoder from a merged field record.
    pub fn from_encoding(encoding: &FieldEncoding) -> Result<Self> {
        Self::new(CategoryEncoderParams::from(encoding))
    }

    /// Returns the number of categories.
    pub fn num_categories(&self) -> usize {
        self.categories.len()
    }

    /// Returns the list of categories.
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Returns the block index of a label; 0 for unknown labels.
    pub fn block_index(&self, category: &str) -> usize {
        self.category_map.get(category).copied().unwrap_or(0)
    }

    fn encode_block(&self, block: usize, output: &mut Sdr) -> Result<()> {
        check_dimensions(&self.dimensions, output)?;
        let start = block as UInt * self.active_bits;
        output.set_sparse_unchecked((start..start + self.active_bits).collect());
        Ok(())
    }
}

impl Encoder<&str> for CategoryEncoder {
    fn dimensions(&self) -> &[UInt] {
        &self.dimensions
    }

    fn size(&self) -> usize {
        self.size as usize
    }

    fn encode(&self, value: &str, output: &mut Sdr) -> Result<()> {
        self.encode_block(self.block_index(value), output)
    }
}

impl FieldEncoder for CategoryEncoder {
    fn kind(&self) -> &'static str {
        CATEGORY_KIND
    }

    fn width(&self) -> usize {
        self.size as usize
    }

    fn active_bits(&self) -> usize {
        self.active_bits as usize
    }

    fn parse(&self, text: &str) -> Result<FieldValue> {
        Ok(FieldValue::Text(text.trim().to_string()))
    }

    fn encode_value(&self, value: &FieldValue, output: &mut Sdr) -> Result<()> {
        match value {
            FieldValue::Text(label) => self.encode(label.as_str(), output),
            other => Err(SensorError::TypeMismatch {
                expected: "string",
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
        let block = (first / self.active_bits) as usize;

        Ok(match block.checked_sub(1).and_then(|i| self.categories.get(i)) {
            Some(label) => DecodedField {
                value: Some(FieldValue::Text(label.clone())),
                description: label.clone(),
            },
            None => DecodedField {
                value: None,
                description: "<unknown>".to_string(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn colours() -> CategoryEncoder {
        CategoryEncoder::new(CategoryEncoderParams {
            categories: vec!["red".to_string(), "green".to_string(), "blue".to_string()],
            active_bits: 10,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_create_encoder() {
        let encoder = colours();
        assert_eq!(encoder.num_categories(), 3);
        assert_eq!(Encoder::<&str>::size(&encoder), 40);
    }

    #[test]
    fn test_encode_categories() {
        let encoder = colours();
        let sdr_red = encoder.encode_to_sdr("red").unwrap();
        let sdr_green = encoder.encode_to_sdr("green").unwrap();
        let sdr_blue = encoder.encode_to_sdr("blue").unwrap();

        assert_eq!(sdr_red.get_sum(), 10);
        assert_eq!(sdr_red.get_overlap(&sdr_green), 0);
        assert_eq!(sdr_red.get_overlap(&sdr_blue), 0);
        assert_eq!(sdr_green.get_overlap(&sdr_blue), 0);
        assert_eq!(sdr_red.get_sparse()[0], 10);
    }

    #[test]
    fn test_unknown_category_uses_reserved_block() {
        let encoder = colours();
        let unknown = encoder.encode_to_sdr("purple").unwrap();
        assert_eq!(unknown.get_sparse(), (0..10).collect::<Vec<_>>());
        let decoded = FieldEncoder::decode(&encoder, &unknown).unwrap();
        assert!(decoded.value.is_none());
    }

    #[test]
    fn test_duplicate_categories() {
        let result = CategoryEncoder::new(CategoryEncoderParams {
            categories: vec!["a".to_string(), "b".to_string(), "a".to_string()],
            active_bits: 5,
            ..Default::default()
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_decode() {
        let encoder = colours();
        let sdr = encoder.parse_encode(" green ").unwrap();
        let decoded = FieldEncoder::decode(&encoder, &sdr).unwrap();
        assert_eq!(decoded.value, Some(FieldValue::Text("green".to_string())));
    }

    #[test]
    fn test_rejects_numbers() {
        let encoder = colours();
        assert!(matches!(
            encoder.encode_field(&FieldValue::Float(1.0)),
            Err(SensorError::TypeMismatch { .. })
        ));
    }
}
