//! # Mokosh Sensor - header-driven SDR sensors
//!
//! Mokosh Sensor turns self-describing tabular record streams into Sparse
//! Distributed Representations suitable for HTM sequence learning.
//!
//! ## Overview
//!
//! A source starts with a three line header (field names, field types and
//! field flags). From it the sensor:
//!
//! - **Infers metadata**: a [`SourceMeta`](meta::SourceMeta) describing every column
//! - **Merges encoder settings**: defaults plus per-field overrides into an
//!   [`EncoderSpec`](spec::EncoderSpec)
//! - **Builds encoders**: one per configured field, through an
//!   [`EncoderRegistry`](registry::EncoderRegistry)
//! - **Composes them**: a [`MultiEncoder`](encoders::MultiEncoder) ordered by field name
//! - **Streams**: raw rows and encoded SDRs as lazy, single-pass iterators
//!   that report when they are drained
//!
//! ## Quick Start
//!
//! ```rust
//! use mokosh_sensor::prelude::*;
//!
//! let csv = "timestamp,consumption\ndatetime,float\nT,\n7/2/10 0:00,21.2\n7/2/10 1:00,16.4\n";
//!
//! let mut sensor = Sensor::builder()
//!     .factory(CsvSource::create)
//!     .params(SensorParams::inline(csv))
//!     .build()
//!     .unwrap();
//!
//! let params = EncoderParameters::from_json_str(r#"{
//!     "fieldEncodings": {
//!         "consumption": { "n": 50, "w": 5, "resolution": 0.5,
//!                          "encoderType": "RandomDistributedScalarEncoder" },
//!         "timestamp":   { "timeOfDay": [5, 4.0], "formatPattern": "MM/dd/YY HH:mm" }
//!     }
//! }"#).unwrap();
//! sensor.set_local_parameters(&params).unwrap();
//!
//! let outputs: Vec<Sdr> = sensor
//!     .output_stream()
//!     .unwrap()
//!     .collect::<Result<_>>()
//!     .unwrap();
//! assert_eq!(outputs.len(), 2);
//! assert!(sensor.is_terminal());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::similar_names)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_sign_loss)]

pub mod config;
pub mod encoders;
pub mod meta;
pub mod registry;
pub mod sensor;
pub mod source;
pub mod spec;
pub mod stream;
pub mod types;

/// Re-export of commonly used types and traits for convenience.
pub mod prelude {
    pub use crate::config::{EncoderParameters, SensorParams};
    pub use crate::encoders::{
        DateEncoder, Encoder, EncoderTuple, FieldEncoder, FieldValue, MultiEncoder, Record,
        RandomDistributedScalarEncoder, ScalarEncoder,
    };
    pub use crate::error::{ErrorCategory, Result, SensorError};
    pub use crate::meta::{FieldFlag, FieldMeta, FieldType, SourceMeta};
    pub use crate::registry::EncoderRegistry;
    pub use crate::sensor::{Sensor, SensorState};
    pub use crate::source::{CsvSource, Row};
    pub use crate::spec::{EncoderDefaults, EncoderSpec, FieldEncoding, FieldOverride};
    pub use crate::stream::TerminalTracking;
    pub use crate::types::{Real, Sdr, UInt};
}

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Error types for the library.
pub mod error {
    use thiserror::Error;

    use crate::types::{Real, UInt};

    /// Broad class of a [`SensorError`], mirroring where in the pipeline it
    /// was raised.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum ErrorCategory {
        /// Missing or inconsistent configuration.
        Configuration,
        /// Malformed header or row shape.
        Schema,
        /// A value could not be encoded.
        Encoding,
        /// Literal text did not match the expected format.
        Parse,
        /// Operation not valid for the sensor's lifecycle state.
        State,
        /// The underlying row source failed.
        Source,
    }

    /// Main error type for sensor operations.
    #[derive(Error, Debug)]
    pub enum SensorError {
        /// No source factory was supplied to the sensor builder.
        #[error("Factory cannot be absent")]
        MissingFactory,

        /// No sensor parameters were supplied to the sensor builder.
        #[error("Sensor parameters cannot be absent")]
        MissingParams,

        /// No constructor is registered under this encoder kind.
        #[error("Unknown encoder kind: {kind}")]
        UnknownEncoderKind {
            /// The requested kind identifier.
            kind: String,
        },

        /// An override names a field the source does not have.
        #[error("Encoder settings reference unknown field '{field}'")]
        UnknownField {
            /// The offending field name.
            field: String,
        },

        /// A field is configured but no encoder kind could be chosen for it.
        #[error("No encoder kind configured for field '{field}' of type {field_type}")]
        MissingEncoderKind {
            /// The field name.
            field: String,
            /// The field's inferred type, as written in the header.
            field_type: String,
        },

        /// Invalid parameter value.
        #[error("Invalid parameter '{name}': {message}")]
        InvalidParameter {
            /// Name of the invalid parameter.
            name: &'static str,
            /// Description of the error.
            message: String,
        },

        /// Configuration document could not be read or deserialized.
        #[error("Configuration error: {0}")]
        Config(String),

        /// The three line header is missing, misaligned or has unknown tokens.
        #[error("Malformed header: {0}")]
        MalformedHeader(String),

        /// A data row does not have one value per header column.
        #[error("Row has {actual} values, header declares {expected} fields")]
        RowWidth {
            /// Number of header fields.
            expected: usize,
            /// Number of values in the row.
            actual: usize,
        },

        /// Numeric input outside the encoder's range with clipping disabled.
        #[error("Input {value} outside of range [{minimum}, {maximum}]")]
        OutOfRange {
            /// The rejected value.
            value: Real,
            /// Range minimum.
            minimum: Real,
            /// Range maximum.
            maximum: Real,
        },

        /// A record lacks a value for a configured field.
        #[error("Record is missing a value for field '{field}'")]
        MissingField {
            /// The missing field name.
            field: String,
        },

        /// An encoder received a value of the wrong kind.
        #[error("Type mismatch: expected {expected}, got {actual}")]
        TypeMismatch {
            /// What the encoder accepts.
            expected: &'static str,
            /// What it received.
            actual: &'static str,
        },

        /// Dimension mismatch between an SDR and an encoder.
        #[error("Dimension mismatch: expected {expected:?}, got {actual:?}")]
        DimensionMismatch {
            /// Expected dimensions.
            expected: Vec<UInt>,
            /// Actual dimensions.
            actual: Vec<UInt>,
        },

        /// Input rejected by an encoder (non-finite number, bad sparse data, ...).
        #[error("Invalid input: {0}")]
        InvalidInput(String),

        /// Text deviates from the configured or locked literal format.
        #[error("Invalid format: \"{input}\" is malformed at \"{remainder}\"")]
        FormatConflict {
            /// The full literal that failed to parse.
            input: String,
            /// Byte position of the first mismatching character.
            position: usize,
            /// The input from `position` onwards.
            remainder: String,
        },

        /// Text matched the format but does not denote a valid value.
        #[error("Cannot parse \"{input}\": {message}")]
        InvalidValue {
            /// The literal being parsed.
            input: String,
            /// Why it was rejected.
            message: String,
        },

        /// The sensor's single-pass source has already been handed out.
        #[error("Sensor source has already been consumed")]
        AlreadyConsumed,

        /// The row source failed (I/O or CSV framing).
        #[error("Source error: {0}")]
        Source(String),
    }

    impl SensorError {
        /// Returns the broad category of this error.
        pub fn category(&self) -> ErrorCategory {
            match self {
                Self::MissingFactory
                | Self::MissingParams
                | Self::UnknownEncoderKind { .. }
                | Self::UnknownField { .. }
                | Self::MissingEncoderKind { .. }
                | Self::InvalidParameter { .. }
                | Self::Config(_) => ErrorCategory::Configuration,
                Self::MalformedHeader(_) | Self::RowWidth { .. } => ErrorCategory::Schema,
                Self::OutOfRange { .. }
                | Self::MissingField { .. }
                | Self::TypeMismatch { .. }
                | Self::DimensionMismatch { .. }
                | Self::InvalidInput(_) => ErrorCategory::Encoding,
                Self::FormatConflict { .. } | Self::InvalidValue { .. } => ErrorCategory::Parse,
                Self::AlreadyConsumed => ErrorCategory::State,
                Self::Source(_) => ErrorCategory::Source,
            }
        }
    }

    /// Result type alias using `SensorError`.
    pub type Result<T> = std::result::Result<T, SensorError>;
}

pub use error::{ErrorCategory, Result, SensorError};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_error_categories() {
        assert_eq!(SensorError::MissingFactory.category(), ErrorCategory::Configuration);
        assert_eq!(
            SensorError::MalformedHeader("x".into()).category(),
            ErrorCategory::Schema
        );
        assert_eq!(
            SensorError::MissingField { field: "a".into() }.category(),
            ErrorCategory::Encoding
        );
        assert_eq!(SensorError::AlreadyConsumed.category(), ErrorCategory::State);
    }

    #[test]
    fn test_format_conflict_message() {
        let err = SensorError::FormatConflict {
            input: "13:10 7/12/10".into(),
            position: 2,
            remainder: ":10 7/12/10".into(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid format: \"13:10 7/12/10\" is malformed at \":10 7/12/10\""
        );
        assert_eq!(err.category(), ErrorCategory::Parse);
    }
}
