//! Configuration documents for sensors.
//!
//! Two documents configure a sensor:
//!
//! - [`SensorParams`]: where rows come from (a file path or inline text)
//! - [`EncoderParameters`]: the global encoder defaults plus per-field overrides
//!
//! Both are plain serde types, so they load from JSON through [`JsonConfig`].
//!
//! # Example
//!
//! ```rust
//! use mokosh_sensor::config::{EncoderParameters, JsonConfig, SensorParams};
//!
//! let params = SensorParams::from_json(r#"{ "path": "data/rec-center.csv" }"#).unwrap();
//! assert_eq!(params.delimiter, ',');
//!
//! let encoders = EncoderParameters::from_json_str(r#"{
//!     "defaults": { "seed": 7 },
//!     "fieldEncodings": { "consumption": { "n": 25, "w": 3, "resolution": 0.1 } }
//! }"#).unwrap();
//! assert_eq!(encoders.defaults.seed, 7);
//! ```

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SensorError};
use crate::spec::{EncoderDefaults, FieldOverride, FieldOverrides};

/// JSON load/save for configuration documents.
pub trait JsonConfig: Serialize + DeserializeOwned + Sized {
    /// Serializes to a pretty-printed JSON string.
    fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| SensorError::Config(format!("JSON serialization failed: {e}")))
    }

    /// Deserializes from a JSON string.
    fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| SensorError::Config(format!("JSON deserialization failed: {e}")))
    }

    /// Serializes to a writer.
    fn save<W: Write>(&self, writer: W) -> Result<()> {
        let mut writer = BufWriter::new(writer);
        serde_json::to_writer_pretty(&mut writer, self)
            .map_err(|e| SensorError::Config(format!("JSON serialization failed: {e}")))?;
        writer
            .flush()
            .map_err(|e| SensorError::Config(format!("Failed to write: {e}")))
    }

    /// Deserializes from a reader.
    fn load<R: Read>(reader: R) -> Result<Self> {
        serde_json::from_reader(BufReader::new(reader))
            .map_err(|e| SensorError::Config(format!("JSON deserialization failed: {e}")))
    }

    /// Saves to a file.
    fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path.as_ref())
            .map_err(|e| SensorError::Config(format!("Failed to create file: {e}")))?;
        self.save(file)
    }

    /// Loads from a file.
    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())
            .map_err(|e| SensorError::Config(format!("Failed to open file: {e}")))?;
        Self::load(file)
    }
}

impl<T> JsonConfig for T where T: Serialize + DeserializeOwned + Sized {}

/// Encoder settings handed to [`Sensor::set_local_parameters`](crate::sensor::Sensor::set_local_parameters).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EncoderParameters {
    /// Applied to every field first.
    pub defaults: EncoderDefaults,
    /// Per-field overrides keyed by field name.
    pub field_encodings: FieldOverrides,
}

impl EncoderParameters {
    /// Creates parameters with zero-valued defaults and no overrides.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the global defaults.
    #[must_use]
    pub fn with_defaults(mut self, defaults: EncoderDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Adds or replaces the override of one field.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, settings: FieldOverride) -> Self {
        self.field_encodings.insert(name.into(), settings);
        self
    }

    /// Parses parameters from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Self::from_json(json)
    }

    /// Loads parameters from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_from_file(path)
    }
}

/// Where a sensor's rows come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SourceLocation {
    /// A file on disk.
    Path(PathBuf),
    /// The rows themselves.
    Inline(String),
}

fn default_delimiter() -> char {
    ','
}

/// Parameters handed to a sensor's source factory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorParams {
    /// Row location.
    #[serde(flatten)]
    pub location: SourceLocation,
    /// Field delimiter. Must be ASCII.
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
}

impl SensorParams {
    /// Reads rows from the file at `path`.
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self {
            location: SourceLocation::Path(path.into()),
            delimiter: default_delimiter(),
        }
    }

    /// Reads rows from `text`.
    pub fn inline(text: impl Into<String>) -> Self {
        Self {
            location: SourceLocation::Inline(text.into()),
            delimiter: default_delimiter(),
        }
    }

    /// Uses `delimiter` between fields.
    #[must_use]
    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Returns the delimiter as a byte.
    ///
    /// # Errors
    ///
    /// Returns [`SensorError::InvalidParameter`] for a non-ASCII delimiter.
    pub fn delimiter_byte(&self) -> Result<u8> {
        u8::try_from(self.delimiter)
            .ok()
            .filter(u8::is_ascii)
            .ok_or_else(|| SensorError::InvalidParameter {
                name: "delimiter",
                message: format!("'{}' is not an ASCII character", self.delimiter),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::SubfieldSpec;

    #[test]
    fn test_sensor_params_json() {
        let p = SensorParams::from_json(r#"{ "inline": "a\nfloat\nB\n1", "delimiter": ";" }"#)
            .unwrap();
        assert_eq!(p, SensorParams::inline("a\nfloat\nB\n1").with_delimiter(';'));

        let p = SensorParams::from_json(r#"{ "path": "/tmp/x.csv" }"#).unwrap();
        assert_eq!(p.location, SourceLocation::Path(PathBuf::from("/tmp/x.csv")));
        assert_eq!(p.delimiter, ',');

        assert!(SensorParams::from_json(r#"{ "delimiter": ";" }"#).is_err());
    }

    #[test]
    fn test_delimiter_byte() {
        assert_eq!(SensorParams::inline("").delimiter_byte().unwrap(), b',');
        assert!(SensorParams::inline("").with_delimiter('§').delimiter_byte().is_err());
    }

    #[test]
    fn test_encoder_parameters_json() {
        let params = EncoderParameters::from_json_str(
            r#"{
                "fieldEncodings": {
                    "consumption": {
                        "n": 25, "w": 3, "resolution": 0.1,
                        "encoderType": "RandomDistributedScalarEncoder"
                    },
                    "timestamp": {
                        "dayOfWeek": [1, 1.0],
                        "timeOfDay": [5, 4.0],
                        "formatPattern": "MM/dd/YY HH:mm"
                    }
                }
            }"#,
        )
        .unwrap();

        assert_eq!(params.defaults, EncoderDefaults::default());
        let ts = &params.field_encodings["timestamp"];
        assert_eq!(ts.time_of_day, Some(SubfieldSpec::new(5, 4.0)));
        let c = &params.field_encodings["consumption"];
        assert_eq!(
            c.encoder_kind.as_deref(),
            Some("RandomDistributedScalarEncoder")
        );
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let err = EncoderParameters::from_json_str(
            r#"{ "fieldEncodings": { "x": { "widht": 3 } } }"#,
        )
        .unwrap_err();
        assert!(matches!(err, SensorError::Config(_)));

        let err = EncoderParameters::from_json_str(r#"{ "defaults": { "resoluton": 0.1 } }"#)
            .unwrap_err();
        assert!(matches!(err, SensorError::Config(_)));

        let params = EncoderParameters::from_json_str(
            r#"{ "defaults": { "resolution": 0.1, "encoderType": "ScalarEncoder" } }"#,
        )
        .unwrap();
        assert_eq!(params.defaults.encoder_kind.as_deref(), Some("ScalarEncoder"));
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("encoders.json");

        let params = EncoderParameters::new().with_field(
            "consumption",
            FieldOverride {
                w: Some(21),
                n: Some(400),
                ..Default::default()
            },
        );
        params.save_to_file(&path).unwrap();
        assert_eq!(EncoderParameters::from_json_file(&path).unwrap(), params);
    }
}
