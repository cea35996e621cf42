//! Multi Encoder implementation.
//!
//! The Multi Encoder combines one encoder per field into a single composite
//! encoder, concatenating their outputs into one SDR. Fields are laid out in
//! ascending name order, so the bit layout does not depend on the order in
//! which encoders were added.

use std::fmt;

use crate::encoders::base::check_dimensions;
use crate::encoders::{DecodedField, FieldEncoder, Record};
use crate::error::{Result, SensorError};
use crate::meta::SourceMeta;
use crate::registry::EncoderRegistry;
use crate::spec::EncoderSpec;
use crate::types::{Sdr, UInt};

/// A field in a multi-encoder with its name, offset, and encoder.
#[derive(Debug)]
pub struct EncoderTuple {
    /// Name of this field.
    pub name: String,
    /// Display label, the configured `fieldName`. Equals `name` unless set.
    pub label: String,
    /// Starting bit offset in the combined SDR.
    pub offset: UInt,
    /// Encoder for this field.
    pub encoder: Box<dyn FieldEncoder>,
}

impl EncoderTuple {
    /// Size of this encoder's output in bits.
    pub fn width(&self) -> UInt {
        self.encoder.width() as UInt
    }

    /// One past the last bit of this field.
    pub fn end(&self) -> UInt {
        self.offset + self.width()
    }
}

/// Position of one field in the combined output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldLayout {
    /// Field name.
    pub name: String,
    /// Display label of the field.
    pub label: String,
    /// Encoder kind.
    pub kind: &'static str,
    /// Starting bit offset.
    pub offset: UInt,
    /// Width in bits.
    pub width: UInt,
    /// Active bits per encoding.
    pub active_bits: UInt,
}

impl fmt::Display for FieldLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if self.label != self.name {
            write!(f, " ({})", self.label)?;
        }
        write!(
            f,
            " [{}..{}) {} w={}",
            self.offset,
            self.offset + self.width,
            self.kind,
            self.active_bits
        )
    }
}

/// Combines per-field encoders into a single composite encoder.
///
/// Each sub-encoder's output is placed at a specific offset in the combined SDR.
///
/// # Example
///
/// ```rust
/// use mokosh_sensor::encoders::{FieldValue, MultiEncoder, Record, ScalarEncoder, ScalarEncoderParams};
///
/// let temp_encoder = ScalarEncoder::new(ScalarEncoderParams {
///     minimum: -10.0,
///     maximum: 40.0,
///     size: 50,
///     active_bits: 5,
///     ..Default::default()
/// }).unwrap();
///
/// let humidity_encoder = ScalarEncoder::new(ScalarEncoderParams {
///     minimum: 0.0,
///     maximum: 100.0,
///     size: 50,
///     active_bits: 5,
///     ..Default::default()
/// }).unwrap();
///
/// let multi = MultiEncoder::builder()
///     .add_encoder("temperature", Box::new(temp_encoder))
///     .add_encoder("humidity", Box::new(humidity_encoder))
///     .build()
///     .unwrap();
///
/// assert_eq!(multi.size(), 100);
/// // "humidity" sorts first
/// assert_eq!(multi.get("temperature").unwrap().offset, 50);
///
/// let mut record = Record::new();
/// record.insert("temperature".to_string(), FieldValue::Float(21.5));
/// record.insert("humidity".to_string(), FieldValue::Float(40.0));
/// assert_eq!(multi.encode(&record).unwrap().get_sum(), 10);
/// ```
pub struct MultiEncoder {
    /// Encoders with their field metadata, sorted by name.
    encoders: Vec<EncoderTuple>,
    /// Total size of the combined output.
    size: UInt,
    /// Output dimensions.
    dimensions: Vec<UInt>,
}

impl fmt::Debug for MultiEncoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultiEncoder")
            .field("size", &self.size)
            .field("num_encoders", &self.encoders.len())
            .finish()
    }
}

impl Default for MultiEncoder {
    fn default() -> Self {
        Self::empty()
    }
}

/// Builder for constructing a MultiEncoder.
#[derive(Default)]
pub struct MultiEncoderBuilder {
    encoders: Vec<(String, String, Box<dyn FieldEncoder>)>,
}

impl fmt::Debug for MultiEncoderBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultiEncoderBuilder")
            .field("num_encoders", &self.encoders.len())
            .finish()
    }
}

impl MultiEncoderBuilder {
    /// Creates a new MultiEncoder builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an encoder with a given name.
    pub fn add_encoder(self, name: &str, encoder: Box<dyn FieldEncoder>) -> Self {
        self.add_labelled_encoder(name, name, encoder)
    }

    /// Adds an encoder whose layout and logs show `label` instead of `name`.
    pub fn add_labelled_encoder(
        mut self,
        name: &str,
        label: &str,
        encoder: Box<dyn FieldEncoder>,
    ) -> Self {
        self.encoders
            .push((name.to_string(), label.to_string(), encoder));
        self
    }

    /// Builds the MultiEncoder, assigning offsets in ascending name order.
    ///
    /// # Errors
    ///
    /// Returns [`SensorError::InvalidParameter`] if a name was added twice.
    pub fn build(mut self) -> Result<MultiEncoder> {
        self.encoders.sort_by(|(a, _, _), (b, _, _)| a.cmp(b));
        if let Some(pair) = self.encoders.windows(2).find(|p| p[0].0 == p[1].0) {
            return Err(SensorError::InvalidParameter {
                name: "encoders",
                message: format!("Duplicate field name: {}", pair[0].0),
            });
        }

        let mut offset: UInt = 0;
        let mut tuples = Vec::with_capacity(self.encoders.len());

        for (name, label, encoder) in self.encoders {
            let tuple = EncoderTuple {
                name,
                label,
                offset,
                encoder,
            };
            tracing::debug!(
                field = %tuple.name,
                label = %tuple.label,
                kind = tuple.encoder.kind(),
                offset = tuple.offset,
                width = tuple.width(),
                "composed field encoder"
            );
            offset += tuple.width();
            tuples.push(tuple);
        }

        Ok(MultiEncoder {
            encoders: tuples,
            size: offset,
            dimensions: vec![offset],
        })
    }
}

impl MultiEncoder {
    /// Creates an encoder with no fields. It encodes every record to a
    /// zero-width SDR.
    pub fn empty() -> Self {
        Self {
            encoders: Vec::new(),
            size: 0,
            dimensions: vec![0],
        }
    }

    /// Creates a new MultiEncoder builder.
    pub fn builder() -> MultiEncoderBuilder {
        MultiEncoderBuilder::new()
    }

    /// Builds one encoder per active field of `spec`.
    ///
    /// # Errors
    ///
    /// - [`SensorError::UnknownField`] if `spec` has a field `meta` lacks
    /// - [`SensorError::MissingEncoderKind`] if an active field has no kind
    /// - [`SensorError::UnknownEncoderKind`] if the kind is not registered
    /// - any construction error of the encoder itself
    pub fn compose(
        meta: &SourceMeta,
        spec: &EncoderSpec,
        registry: &EncoderRegistry,
    ) -> Result<Self> {
        let mut builder = Self::builder();

        for (name, encoding) in spec.active() {
            let field = meta.field(name).ok_or_else(|| SensorError::UnknownField {
                field: name.to_string(),
            })?;
            let kind =
                encoding
                    .encoder_kind
                    .as_deref()
                    .ok_or_else(|| SensorError::MissingEncoderKind {
                        field: name.to_string(),
                        field_type: field.field_type().to_string(),
                    })?;
            builder = builder.add_labelled_encoder(
                name,
                &encoding.field_name,
                registry.build(kind, encoding)?,
            );
        }

        builder.build()
    }

    /// Returns the sub-encoders in layout order.
    pub fn encoders(&self) -> &[EncoderTuple] {
        &self.encoders
    }

    /// Returns the sub-encoder of a field.
    pub fn get(&self, name: &str) -> Option<&EncoderTuple> {
        self.encoders
            .binary_search_by(|t| t.name.as_str().cmp(name))
            .ok()
            .map(|i| &self.encoders[i])
    }

    /// Returns the number of sub-encoders.
    pub fn num_encoders(&self) -> usize {
        self.encoders.len()
    }

    /// Returns true if no field is encoded.
    pub fn is_empty(&self) -> bool {
        self.encoders.is_empty()
    }

    /// Returns the total output width in bits.
    pub fn size(&self) -> usize {
        self.size as usize
    }

    /// Returns the output dimensions.
    pub fn dimensions(&self) -> &[UInt] {
        &self.dimensions
    }

    /// Encodes a record into a new SDR.
    pub fn encode(&self, record: &Record) -> Result<Sdr> {
        let mut sdr = Sdr::new(&self.dimensions);
        self.encode_into(record, &mut sdr)?;
        Ok(sdr)
    }

    /// Encodes a record into `output`.
    ///
    /// # Errors
    ///
    /// Returns [`SensorError::MissingField`] if the record lacks a value for a
    /// configured field. Extra record entries are ignored.
    pub fn encode_into(&self, record: &Record, output: &mut Sdr) -> Result<()> {
        check_dimensions(&self.dimensions, output)?;

        let mut all_sparse: Vec<UInt> = Vec::new();

        for tuple in &self.encoders {
            let value = record
                .get(&tuple.name)
                .ok_or_else(|| SensorError::MissingField {
                    field: tuple.name.clone(),
                })?;
            let field_sdr = tuple.encoder.encode_field(value)?;
            all_sparse.extend(field_sdr.get_sparse().into_iter().map(|b| tuple.offset + b));
        }

        // Tuples are laid out in ascending offset order, so bits already are.
        output.set_sparse_unchecked(all_sparse);
        Ok(())
    }

    /// Parses one raw row into a record of the configured fields.
    ///
    /// # Errors
    ///
    /// Returns [`SensorError::RowWidth`] if the row does not have one value
    /// per field of `meta`, or the parse error of the first failing field.
    pub fn parse_row(&self, meta: &SourceMeta, row: &[String]) -> Result<Record> {
        if row.len() != meta.len() {
            return Err(SensorError::RowWidth {
                expected: meta.len(),
                actual: row.len(),
            });
        }

        let mut record = Record::new();
        for tuple in &self.encoders {
            let index = meta
                .index_of(&tuple.name)
                .ok_or_else(|| SensorError::UnknownField {
                    field: tuple.name.clone(),
                })?;
            record.insert(tuple.name.clone(), tuple.encoder.parse(&row[index])?);
        }
        Ok(record)
    }

    /// Describes each field's slice of an SDR produced by this encoder.
    ///
    /// Fields whose slice has no active bits are reported with an empty
    /// description.
    pub fn decode(&self, encoded: &Sdr) -> Result<Vec<(String, DecodedField)>> {
        check_dimensions(&self.dimensions, encoded)?;

        self.encoders
            .iter()
            .map(|tuple| {
                let slice = encoded.slice(tuple.offset, tuple.width());
                let decoded = if slice.get_sum() == 0 {
                    DecodedField {
                        value: None,
                        description: String::new(),
                    }
                } else {
                    tuple.encoder.decode(&slice)?
                };
                Ok((tuple.name.clone(), decoded))
            })
            .collect()
    }

    /// Returns the bit layout of every field.
    pub fn describe(&self) -> Vec<FieldLayout> {
        self.encoders
            .iter()
            .map(|t| FieldLayout {
                name: t.name.clone(),
                label: t.label.clone(),
                kind: t.encoder.kind(),
                offset: t.offset,
                width: t.width(),
                active_bits: t.encoder.active_bits() as UInt,
            })
            .collect()
    }
}
