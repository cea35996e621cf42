//! Encoders for converting field values into SDR representations.
//!
//! Every encoder implements the typed [`Encoder<T>`] trait for its natural
//! input type and the object-safe [`FieldEncoder`] trait, through which the
//! [`MultiEncoder`] drives one encoder per field.
//!
//! # Available Encoders
//!
//! ## Scalar Encoders
//! - [`ScalarEncoder`]: Encodes numeric values as contiguous blocks of active bits
//! - [`RandomDistributedScalarEncoder`]: Encodes numeric values using hash-based random bit placement
//!
//! ## Categorical Encoders
//! - [`CategoryEncoder`]: Encodes discrete categories into non-overlapping patterns
//! - [`BooleanEncoder`]: Encodes true/false values
//!
//! ## Temporal Encoders
//! - [`DateEncoder`]: Encodes date/time values with multiple configurable attributes
//!
//! ## Composite Encoders
//! - [`MultiEncoder`]: Concatenates one encoder per record field
//!
//! # Example
//!
//! ```rust
//! use mokosh_sensor::encoders::{ScalarEncoder, ScalarEncoderParams, Encoder};
//!
//! let encoder = ScalarEncoder::new(ScalarEncoderParams {
//!     minimum: 0.0,
//!     maximum: 100.0,
//!     size: 100,
//!     active_bits: 10,
//!     ..Default::default()
//! }).unwrap();
//!
//! let sdr = encoder.encode_to_sdr(50.0).unwrap();
//! assert_eq!(sdr.get_sum(), 10);
//! ```

pub(crate) mod base;
mod boolean;
mod category;
pub mod date;
pub mod date_format;
mod multi;
mod rdse;
mod scalar;

pub use base::{DecodedField, Encoder, FieldEncoder, FieldValue, Record};
pub use boolean::{BooleanEncoder, BooleanEncoderParams, BOOLEAN_KIND};
pub use category::{CategoryEncoder, CategoryEncoderParams, CATEGORY_KIND};
pub use date::{DateEncoder, DateEncoderParams, Holiday, DATE_KIND};
pub use date_format::{DateFormat, DateParser};
pub use multi::{EncoderTuple, FieldLayout, MultiEncoder, MultiEncoderBuilder};
pub use rdse::{RandomDistributedScalarEncoder, Rdse, RdseParams, RDSE_KIND};
pub use scalar::{ScalarEncoder, ScalarEncoderParams, SCALAR_KIND};
