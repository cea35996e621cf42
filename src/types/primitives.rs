//! Primitive type definitions shared by encoders and sensors.

/// Default unsigned integer type, used for widths and bit indices.
pub type UInt = u32;

/// Default floating point type.
///
/// Sensor input is decoded at double precision so that bucket boundaries
/// (e.g. `35.3 / 0.1`) land where a reader expects them.
pub type Real = f64;

/// Element type for dense SDR representation.
pub type ElemDense = u8;

/// Element type for sparse SDR representation (indices).
pub type ElemSparse = UInt;
