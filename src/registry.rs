//! Encoder kind identifiers and the constructors behind them.

use std::collections::HashMap;
use std::fmt;

use crate::encoders::{
    BooleanEncoder, CategoryEncoder, DateEncoder, FieldEncoder, RandomDistributedScalarEncoder,
    ScalarEncoder, BOOLEAN_KIND, CATEGORY_KIND, DATE_KIND, RDSE_KIND, SCALAR_KIND,
};
use crate::error::{Result, SensorError};
use crate::meta::FieldType;
use crate::spec::FieldEncoding;

/// Builds an encoder from a merged field record.
pub type EncoderConstructor = fn(&FieldEncoding) -> Result<Box<dyn FieldEncoder>>;

/// Encoder kind chosen for a field type when the settings name none.
///
/// List fields have no default and must be configured explicitly.
pub fn default_kind_for(field_type: FieldType) -> Option<&'static str> {
    match field_type {
        FieldType::DateTime => Some(DATE_KIND),
        FieldType::Float | FieldType::Integer => Some(SCALAR_KIND),
        FieldType::String => Some(CATEGORY_KIND),
        FieldType::Boolean => Some(BOOLEAN_KIND),
        FieldType::List => None,
    }
}

fn boxed<E: FieldEncoder + 'static>(encoder: Result<E>) -> Result<Box<dyn FieldEncoder>> {
    encoder.map(|e| Box::new(e) as Box<dyn FieldEncoder>)
}

/// Lookup table from encoder kind to constructor.
///
/// # Example
///
/// ```rust
/// use mokosh_sensor::registry::EncoderRegistry;
///
/// let registry = EncoderRegistry::default();
/// assert!(registry.contains("RandomDistributedScalarEncoder"));
/// assert!(!registry.contains("SDRCategoryEncoder"));
/// ```
#[derive(Clone)]
pub struct EncoderRegistry {
    constructors: HashMap<String, EncoderConstructor>,
}

impl fmt::Debug for EncoderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncoderRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}

impl Default for EncoderRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl EncoderRegistry {
    /// Creates a registry with no kinds.
    pub fn new() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// Creates a registry with every built-in encoder kind.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(SCALAR_KIND, |enc| boxed(ScalarEncoder::from_encoding(enc)));
        registry.register(RDSE_KIND, |enc| {
            boxed(RandomDistributedScalarEncoder::from_encoding(enc))
        });
        registry.register(DATE_KIND, |enc| boxed(DateEncoder::from_encoding(enc)));
        registry.register(CATEGORY_KIND, |enc| boxed(CategoryEncoder::from_encoding(enc)));
        registry.register(BOOLEAN_KIND, |enc| boxed(BooleanEncoder::from_encoding(enc)));
        registry
    }

    /// Registers a constructor, replacing any previous one for `kind`.
    pub fn register(&mut self, kind: impl Into<String>, constructor: EncoderConstructor) {
        self.constructors.insert(kind.into(), constructor);
    }

    /// Returns true if `kind` is registered.
    pub fn contains(&self, kind: &str) -> bool {
        self.constructors.contains_key(kind)
    }

    /// Returns the registered kinds, sorted.
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }

    /// Builds the encoder `kind` from `encoding`.
    ///
    /// # Errors
    ///
    /// Returns [`SensorError::UnknownEncoderKind`] if `kind` is not registered,
    /// or the constructor's own error.
    pub fn build(&self, kind: &str, encoding: &FieldEncoding) -> Result<Box<dyn FieldEncoder>> {
        let constructor =
            self.constructors
                .get(kind)
                .ok_or_else(|| SensorError::UnknownEncoderKind {
                    kind: kind.to_string(),
                })?;
        constructor(encoding)
    }
}
