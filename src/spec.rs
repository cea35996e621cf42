//! Per-field encoder settings and the merge that produces them.
//!
//! Settings arrive in two layers:
//!
//! - [`EncoderDefaults`]: one record applied to every field
//! - [`FieldOverride`]: optional per-field records, keyed by field name
//!
//! [`merge_spec`] folds them over a [`SourceMeta`] into an [`EncoderSpec`]:
//! one fully resolved [`FieldEncoding`] per source column. Override keys that
//! are present replace the default, absent keys leave it untouched.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::encoders::Holiday;
use crate::error::{Result, SensorError};
use crate::meta::{FieldMeta, FieldType, SourceMeta};
use crate::registry::default_kind_for;
use crate::types::{Real, UInt};

/// Seed used by hashing encoders unless configured otherwise.
pub const DEFAULT_SEED: u32 = 42;

/// Width and radius of one date sub-encoder, written `[width, radius]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "(UInt, Real)", into = "(UInt, Real)")]
pub struct SubfieldSpec {
    /// Number of active bits.
    pub width: UInt,
    /// Input span covered by one full set of active bits.
    pub radius: Real,
}

impl SubfieldSpec {
    /// Creates a sub-encoder spec.
    pub fn new(width: UInt, radius: Real) -> Self {
        Self { width, radius }
    }
}

impl From<(UInt, Real)> for SubfieldSpec {
    fn from((width, radius): (UInt, Real)) -> Self {
        Self { width, radius }
    }
}

impl From<SubfieldSpec> for (UInt, Real) {
    fn from(spec: SubfieldSpec) -> Self {
        (spec.width, spec.radius)
    }
}

/// Custom day-of-week category sub-encoder, written `[width, ["mon,wed", ...]]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "(UInt, Vec<String>)", into = "(UInt, Vec<String>)")]
pub struct CustomDaysSpec {
    /// Number of active bits.
    pub width: UInt,
    /// Day names, each entry may itself be a comma separated list.
    pub days: Vec<String>,
}

impl From<(UInt, Vec<String>)> for CustomDaysSpec {
    fn from((width, days): (UInt, Vec<String>)) -> Self {
        Self { width, days }
    }
}

impl From<CustomDaysSpec> for (UInt, Vec<String>) {
    fn from(spec: CustomDaysSpec) -> Self {
        (spec.width, spec.days)
    }
}

/// Global default record applied to every field before its override.
///
/// `EncoderDefaults::default()` is zero-valued: a field with no override
/// stays inactive and gets no encoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct EncoderDefaults {
    /// Output width.
    pub n: UInt,
    /// Active bits.
    pub w: UInt,
    /// Range minimum.
    pub min_val: Real,
    /// Range maximum.
    pub max_val: Real,
    /// Radius.
    pub radius: Real,
    /// Resolution.
    pub resolution: Real,
    /// Wrap around at the range ends.
    pub periodic: bool,
    /// Clamp out-of-range input instead of failing.
    pub clip: bool,
    /// Skip sanity checks on the derived parameters.
    pub forced: bool,
    /// Hash seed for random distributed encoders.
    pub seed: u32,
    /// Encoder kind used when neither the override nor the field type picks one.
    #[serde(alias = "encoderType")]
    pub encoder_kind: Option<String>,
}

impl Default for EncoderDefaults {
    fn default() -> Self {
        Self {
            n: 0,
            w: 0,
            min_val: 0.0,
            max_val: 0.0,
            radius: 0.0,
            resolution: 0.0,
            periodic: false,
            clip: false,
            forced: false,
            seed: DEFAULT_SEED,
            encoder_kind: None,
        }
    }
}

/// User supplied settings for one field. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct FieldOverride {
    /// Output width.
    pub n: Option<UInt>,
    /// Active bits.
    pub w: Option<UInt>,
    /// Range minimum.
    pub min_val: Option<Real>,
    /// Range maximum.
    pub max_val: Option<Real>,
    /// Radius.
    pub radius: Option<Real>,
    /// Resolution.
    pub resolution: Option<Real>,
    /// Wrap around at the range ends.
    pub periodic: Option<bool>,
    /// Clamp out-of-range input instead of failing.
    pub clip: Option<bool>,
    /// Skip sanity checks on the derived parameters.
    pub forced: Option<bool>,
    /// Name the encoder reports; defaults to the column name.
    pub field_name: Option<String>,
    /// Type the encoder assumes; defaults to the inferred type.
    pub field_type: Option<FieldType>,
    /// Registry key of the encoder to build.
    #[serde(rename = "encoderType", alias = "encoderKind")]
    pub encoder_kind: Option<String>,
    /// Hash seed for random distributed encoders.
    pub seed: Option<u32>,
    /// Vocabulary of a category encoder.
    pub categories: Option<Vec<String>>,

    /// Date sub-encoder: day of year.
    pub season: Option<SubfieldSpec>,
    /// Date sub-encoder: day of week.
    pub day_of_week: Option<SubfieldSpec>,
    /// Date sub-encoder: weekend flag.
    pub weekend: Option<SubfieldSpec>,
    /// Date sub-encoder: custom day categories.
    pub custom_days: Option<CustomDaysSpec>,
    /// Date sub-encoder: holiday proximity.
    pub holiday: Option<SubfieldSpec>,
    /// Holidays used by the holiday sub-encoder.
    pub holidays: Option<Vec<Holiday>>,
    /// Date sub-encoder: time of day.
    pub time_of_day: Option<SubfieldSpec>,
    /// Literal date format the field's parser accepts.
    pub format_pattern: Option<String>,
}

/// Per-field overrides keyed by field name.
pub type FieldOverrides = BTreeMap<String, FieldOverride>;

/// Composite sub-encoder settings of a date field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DateSubfields {
    /// Day of year.
    pub season: Option<SubfieldSpec>,
    /// Day of week.
    pub day_of_week: Option<SubfieldSpec>,
    /// Weekend flag.
    pub weekend: Option<SubfieldSpec>,
    /// Custom day categories.
    pub custom_days: Option<CustomDaysSpec>,
    /// Holiday proximity.
    pub holiday: Option<SubfieldSpec>,
    /// Holidays used by the holiday sub-encoder.
    pub holidays: Option<Vec<Holiday>>,
    /// Time of day.
    pub time_of_day: Option<SubfieldSpec>,
    /// Literal date format.
    pub format_pattern: Option<String>,
}

impl DateSubfields {
    /// Returns true if any sub-encoder is requested.
    pub fn any(&self) -> bool {
        self.season.is_some()
            || self.day_of_week.is_some()
            || self.weekend.is_some()
            || self.custom_days.is_some()
            || self.holiday.is_some()
            || self.time_of_day.is_some()
    }
}

/// Fully resolved settings for one field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldEncoding {
    /// Output width.
    pub n: UInt,
    /// Active bits.
    pub w: UInt,
    /// Range minimum.
    pub min_val: Real,
    /// Range maximum.
    pub max_val: Real,
    /// Radius.
    pub radius: Real,
    /// Resolution.
    pub resolution: Real,
    /// Wrap around at the range ends.
    pub periodic: bool,
    /// Clamp out-of-range input instead of failing.
    pub clip: bool,
    /// Skip sanity checks on the derived parameters.
    pub forced: bool,
    /// Hash seed for random distributed encoders.
    pub seed: u32,
    /// Label the encoder reports in layouts and logs; defaults to the column
    /// name. Records are still keyed by the column name.
    pub field_name: String,
    /// Type the encoder assumes.
    pub field_type: FieldType,
    /// Registry key of the encoder to build.
    pub encoder_kind: Option<String>,
    /// Vocabulary of a category encoder.
    pub categories: Vec<String>,
    /// Date sub-encoders.
    pub date: DateSubfields,
}

impl FieldEncoding {
    /// Starts a field's record from the global defaults.
    pub fn from_defaults(defaults: &EncoderDefaults, field: &FieldMeta) -> Self {
        Self {
            n: defaults.n,
            w: defaults.w,
            min_val: defaults.min_val,
            max_val: defaults.max_val,
            radius: defaults.radius,
            resolution: defaults.resolution,
            periodic: defaults.periodic,
            clip: defaults.clip,
            forced: defaults.forced,
            seed: defaults.seed,
            field_name: field.name().to_string(),
            field_type: field.field_type(),
            encoder_kind: defaults.encoder_kind.clone(),
            categories: Vec::new(),
            date: DateSubfields::default(),
        }
    }

    /// Applies every key present in `o`, leaving the rest untouched.
    pub fn apply(&mut self, o: &FieldOverride) {
        fn set<T: Clone>(target: &mut T, value: Option<&T>) {
            if let Some(v) = value {
                target.clone_from(v);
            }
        }

        set(&mut self.n, o.n.as_ref());
        set(&mut self.w, o.w.as_ref());
        set(&mut self.min_val, o.min_val.as_ref());
        set(&mut self.max_val, o.max_val.as_ref());
        set(&mut self.radius, o.radius.as_ref());
        set(&mut self.resolution, o.resolution.as_ref());
        set(&mut self.periodic, o.periodic.as_ref());
        set(&mut self.clip, o.clip.as_ref());
        set(&mut self.forced, o.forced.as_ref());
        set(&mut self.seed, o.seed.as_ref());
        set(&mut self.field_name, o.field_name.as_ref());
        set(&mut self.field_type, o.field_type.as_ref());
        set(&mut self.categories, o.categories.as_ref());
        if o.encoder_kind.is_some() {
            self.encoder_kind.clone_from(&o.encoder_kind);
        }

        let date = &mut self.date;
        if o.season.is_some() {
            date.season = o.season;
        }
        if o.day_of_week.is_some() {
            date.day_of_week = o.day_of_week;
        }
        if o.weekend.is_some() {
            date.weekend = o.weekend;
        }
        if o.holiday.is_some() {
            date.holiday = o.holiday;
        }
        if o.time_of_day.is_some() {
            date.time_of_day = o.time_of_day;
        }
        if o.custom_days.is_some() {
            date.custom_days.clone_from(&o.custom_days);
        }
        if o.holidays.is_some() {
            date.holidays.clone_from(&o.holidays);
        }
        if o.format_pattern.is_some() {
            date.format_pattern.clone_from(&o.format_pattern);
        }
    }

    /// Returns true if this record asks for an encoder at all.
    ///
    /// Zero active bits and no date sub-encoders means "leave this field out".
    pub fn is_active(&self) -> bool {
        self.w > 0 || self.date.any()
    }
}

/// Merged settings for every field of a source, ordered by field name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EncoderSpec {
    fields: BTreeMap<String, FieldEncoding>,
}

impl EncoderSpec {
    /// Returns the record of a field.
    pub fn get(&self, name: &str) -> Option<&FieldEncoding> {
        self.fields.get(name)
    }

    /// Iterates all records in ascending field name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldEncoding)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Iterates the records that will produce an encoder.
    pub fn active(&self) -> impl Iterator<Item = (&str, &FieldEncoding)> {
        self.iter().filter(|(_, enc)| enc.is_active())
    }

    /// Returns the number of records.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if there are no records.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Merges defaults and per-field overrides over the fields of `meta`.
///
/// # Errors
///
/// Returns [`SensorError::UnknownField`] if an override names a field that
/// `meta` does not declare.
pub fn merge_spec(
    defaults: &EncoderDefaults,
    overrides: &FieldOverrides,
    meta: &SourceMeta,
) -> Result<EncoderSpec> {
    if let Some(unknown) = overrides.keys().find(|name| meta.field(name).is_none()) {
        return Err(SensorError::UnknownField {
            field: unknown.clone(),
        });
    }

    let mut fields = BTreeMap::new();
    for field in meta.fields() {
        let mut encoding = FieldEncoding::from_defaults(defaults, field);
        if let Some(o) = overrides.get(field.name()) {
            encoding.apply(o);
        }
        if encoding.encoder_kind.is_none() {
            encoding.encoder_kind = default_kind_for(encoding.field_type).map(str::to_string);
        }
        fields.insert(field.name().to_string(), encoding);
    }

    Ok(EncoderSpec { fields })
}
