//! Source metadata inferred from a three line header.
//!
//! Every source starts with:
//!
//! ```text
//! timestamp,consumption      <- field names
//! datetime,float             <- field types
//! T,                         <- field flags
//! ```
//!
//! [`SourceMeta::infer`] turns those rows into an ordered list of
//! [`FieldMeta`], keeping the raw rows for diagnostics.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SensorError};
use crate::source::Row;

/// Number of header rows every source starts with.
pub const HEADER_LINES: usize = 3;

/// Semantic type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Date/time literal, parsed by a date encoder.
    DateTime,
    /// Floating point number.
    Float,
    /// Integer number.
    #[serde(alias = "int")]
    Integer,
    /// Free text or category label.
    #[serde(alias = "str")]
    String,
    /// True/false.
    #[serde(alias = "bool")]
    Boolean,
    /// Delimited list of values.
    List,
}

impl FieldType {
    /// Returns the canonical header token for this type.
    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::DateTime => "datetime",
            FieldType::Float => "float",
            FieldType::Integer => "int",
            FieldType::String => "string",
            FieldType::Boolean => "bool",
            FieldType::List => "list",
        }
    }
}

impl FromStr for FieldType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "datetime" => Ok(FieldType::DateTime),
            "float" => Ok(FieldType::Float),
            "int" | "integer" => Ok(FieldType::Integer),
            "string" | "str" => Ok(FieldType::String),
            "bool" | "boolean" => Ok(FieldType::Boolean),
            "list" => Ok(FieldType::List),
            other => Err(format!("unknown field type '{other}'")),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Processing role of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FieldFlag {
    /// Plain field with no special role (`B` or empty in the header).
    #[default]
    None,
    /// The field carries the record's timestamp (`T`).
    Timestamp,
    /// The field identifies the sequence a record belongs to (`S`).
    Sequence,
    /// A truthy value marks a sequence reset (`R`).
    Reset,
    /// The field is a category label (`C`).
    Category,
}

impl FieldFlag {
    /// Returns the single-letter header token for this flag.
    pub fn token(self) -> &'static str {
        match self {
            FieldFlag::None => "B",
            FieldFlag::Timestamp => "T",
            FieldFlag::Sequence => "S",
            FieldFlag::Reset => "R",
            FieldFlag::Category => "C",
        }
    }
}

impl FromStr for FieldFlag {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "" | "B" => Ok(FieldFlag::None),
            "T" => Ok(FieldFlag::Timestamp),
            "S" => Ok(FieldFlag::Sequence),
            "R" => Ok(FieldFlag::Reset),
            "C" => Ok(FieldFlag::Category),
            other => Err(format!("unknown field flag '{other}'")),
        }
    }
}

impl fmt::Display for FieldFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Describes one column of a source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMeta {
    name: String,
    field_type: FieldType,
    flag: FieldFlag,
}

impl FieldMeta {
    /// Creates a field description.
    pub fn new(name: impl Into<String>, field_type: FieldType, flag: FieldFlag) -> Self {
        Self {
            name: name.into(),
            field_type,
            flag,
        }
    }

    /// Returns the field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the field type.
    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    /// Returns the field flag.
    pub fn flag(&self) -> FieldFlag {
        self.flag
    }
}

/// Ordered field descriptions of a source plus the header they came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceMeta {
    fields: Vec<FieldMeta>,
    header: Vec<Row>,
}

impl SourceMeta {
    /// Infers metadata from the three header rows of a source.
    ///
    /// # Errors
    ///
    /// Returns [`SensorError::MalformedHeader`] if there are not exactly three
    /// rows, the rows have different lengths, a name is empty or repeated, or
    /// a type or flag token is not recognized.
    pub fn infer(header: &[Row]) -> Result<Self> {
        if header.len() != HEADER_LINES {
            return Err(SensorError::MalformedHeader(format!(
                "expected {HEADER_LINES} header lines (names, types, flags), got {}",
                header.len()
            )));
        }

        let (names, types, flags) = (&header[0], &header[1], &header[2]);
        if names.is_empty() {
            return Err(SensorError::MalformedHeader(
                "header declares no fields".to_string(),
            ));
        }
        if types.len() != names.len() || flags.len() != names.len() {
            return Err(SensorError::MalformedHeader(format!(
                "header lines are not aligned: {} names, {} types, {} flags",
                names.len(),
                types.len(),
                flags.len()
            )));
        }

        let mut fields: Vec<FieldMeta> = Vec::with_capacity(names.len());
        for (column, ((name, ty), flag)) in names.iter().zip(types).zip(flags).enumerate() {
            let name = name.trim();
            if name.is_empty() {
                return Err(SensorError::MalformedHeader(format!(
                    "column {column} has an empty name"
                )));
            }
            if fields.iter().any(|f| f.name == name) {
                return Err(SensorError::MalformedHeader(format!(
                    "duplicate field name '{name}'"
                )));
            }
            let field_type = ty.parse::<FieldType>().map_err(|e| {
                SensorError::MalformedHeader(format!("column {column} ('{name}'): {e}"))
            })?;
            let flag = flag.parse::<FieldFlag>().map_err(|e| {
                SensorError::MalformedHeader(format!("column {column} ('{name}'): {e}"))
            })?;
            fields.push(FieldMeta::new(name, field_type, flag));
        }

        Ok(Self {
            fields,
            header: header.to_vec(),
        })
    }

    /// Returns the field descriptions in column order.
    pub fn fields(&self) -> &[FieldMeta] {
        &self.fields
    }

    /// Returns the number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the source declares no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the field names in column order.
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(FieldMeta::name).collect()
    }

    /// Returns the field types in column order.
    pub fn field_types(&self) -> Vec<FieldType> {
        self.fields.iter().map(FieldMeta::field_type).collect()
    }

    /// Returns the field flags in column order.
    pub fn flags(&self) -> Vec<FieldFlag> {
        self.fields.iter().map(FieldMeta::flag).collect()
    }

    /// Returns the raw header rows this metadata was inferred from.
    pub fn header(&self) -> &[Row] {
        &self.header
    }

    /// Returns the column index of a field.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Returns the description of a field.
    pub fn field(&self, name: &str) -> Option<&FieldMeta> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Returns the column index of the first field carrying `flag`.
    pub fn index_of_flag(&self, flag: FieldFlag) -> Option<usize> {
        self.fields.iter().position(|f| f.flag == flag)
    }

    /// Column holding the record timestamp, if any.
    pub fn timestamp_index(&self) -> Option<usize> {
        self.index_of_flag(FieldFlag::Timestamp)
    }

    /// Column holding the sequence identifier, if any.
    pub fn sequence_index(&self) -> Option<usize> {
        self.index_of_flag(FieldFlag::Sequence)
    }

    /// Column holding the reset marker, if any.
    pub fn reset_index(&self) -> Option<usize> {
        self.index_of_flag(FieldFlag::Reset)
    }

    /// Column holding the category label, if any.
    pub fn category_index(&self) -> Option<usize> {
        self.index_of_flag(FieldFlag::Category)
    }
}
