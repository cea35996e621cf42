//! Sparse Distributed Representation (SDR) implementation.
//!
//! An SDR is a fixed-width group of boolean values (bits). It can be
//! represented in two formats:
//! - **Dense**: a contiguous array of all bits
//! - **Sparse**: a sorted list of indices of active (true) bits
//!
//! The SDR converts between formats on demand and caches the result.

use crate::error::{Result, SensorError};
use crate::types::{ElemDense, ElemSparse, Real, UInt};

use std::cell::RefCell;
use std::fmt;

/// Type alias for dense SDR data (array of bytes, 0 or 1).
pub type SdrDense = Vec<ElemDense>;

/// Type alias for sparse SDR data (sorted indices of active bits).
pub type SdrSparse = Vec<ElemSparse>;

#[derive(Default)]
struct SdrCache {
    dense: Option<SdrDense>,
    sparse: Option<SdrSparse>,
}

/// Sparse Distributed Representation.
///
/// The output type of every encoder in this crate: a binary vector where only
/// a small number of bits are active.
///
/// # Example
///
/// ```rust
/// use mokosh_sensor::types::Sdr;
///
/// let mut sdr = Sdr::new(&[10]);
/// sdr.set_sparse(&[1, 4, 8]).unwrap();
///
/// assert_eq!(sdr.get_sum(), 3);
/// assert_eq!(sdr.get_dense(), vec![0, 1, 0, 0, 1, 0, 0, 0, 1, 0]);
/// ```
pub struct Sdr {
    dimensions: Vec<UInt>,
    size: usize,
    cache: RefCell<SdrCache>,
}

impl Sdr {
    /// Creates a new SDR with the given dimensions, initialized to all zeros.
    ///
    /// A single zero dimension (`&[0]`) is allowed and produces an empty
    /// placeholder, which is what an unconfigured multi-encoder emits.
    ///
    /// # Panics
    ///
    /// Panics if dimensions is empty, or if a multi-dimensional shape
    /// contains a zero.
    #[must_use]
    pub fn new(dimensions: &[UInt]) -> Self {
        assert!(!dimensions.is_empty(), "Dimensions cannot be empty");
        if dimensions.len() > 1 {
            assert!(
                dimensions.iter().all(|&d| d > 0),
                "Dimensions of a multi-dimensional SDR cannot be zero"
            );
        }

        let size = dimensions.iter().map(|&d| d as usize).product();
        Self {
            dimensions: dimensions.to_vec(),
            size,
            cache: RefCell::new(SdrCache::default()),
        }
    }

    /// Returns the dimensions of this SDR.
    #[inline]
    #[must_use]
    pub fn dimensions(&self) -> &[UInt] {
        &self.dimensions
    }

    /// Returns the total number of bits in the SDR.
    #[inline]
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Sets all bits to zero.
    pub fn zero(&mut self) {
        let cache = self.cache.get_mut();
        cache.dense = Some(vec![0; self.size]);
        cache.sparse = Some(Vec::new());
    }

    // ========================================================================
    // Dense format operations
    // ========================================================================

    /// Sets the SDR value from a dense array where non-zero means active.
    ///
    /// # Errors
    ///
    /// Returns an error if the data length doesn't match the SDR size.
    pub fn set_dense(&mut self, data: &[ElemDense]) -> Result<()> {
        if data.len() != self.size {
            return Err(SensorError::DimensionMismatch {
                expected: vec![self.size as UInt],
                actual: vec![data.len() as UInt],
            });
        }

        let cache = self.cache.get_mut();
        cache.dense = Some(data.iter().map(|&v| u8::from(v != 0)).collect());
        cache.sparse = None;
        Ok(())
    }

    /// Gets the dense representation of the SDR.
    #[must_use]
    pub fn get_dense(&self) -> SdrDense {
        if let Some(dense) = self.cache.borrow().dense.as_ref() {
            return dense.clone();
        }

        let mut dense = vec![0u8; self.size];
        for idx in self.get_sparse() {
            dense[idx as usize] = 1;
        }

        self.cache.borrow_mut().dense = Some(dense.clone());
        dense
    }

    // ========================================================================
    // Sparse format operations
    // ========================================================================

    /// Sets the SDR value from sparse indices.
    ///
    /// # Errors
    ///
    /// Returns an error if indices are not sorted, contain duplicates, or are
    /// out of bounds.
    pub fn set_sparse(&mut self, indices: &[ElemSparse]) -> Result<()> {
        self.validate_sparse(indices)?;
        self.set_sparse_unchecked(indices.to_vec());
        Ok(())
    }

    /// Sets sparse indices without validation (for internal use).
    pub(crate) fn set_sparse_unchecked(&mut self, indices: SdrSparse) {
        let cache = self.cache.get_mut();
        cache.sparse = Some(indices);
        cache.dense = None;
    }

    fn validate_sparse(&self, indices: &[ElemSparse]) -> Result<()> {
        let mut prev: Option<ElemSparse> = None;
        for &idx in indices {
            if idx as usize >= self.size {
                return Err(SensorError::InvalidInput(format!(
                    "sparse index {idx} out of bounds for SDR of size {}",
                    self.size
                )));
            }
            if prev.is_some_and(|p| idx <= p) {
                return Err(SensorError::InvalidInput(
                    "sparse indices must be sorted and unique".to_string(),
                ));
            }
            prev = Some(idx);
        }
        Ok(())
    }

    /// Gets the sparse representation of the SDR.
    #[must_use]
    pub fn get_sparse(&self) -> SdrSparse {
        if let Some(sparse) = self.cache.borrow().sparse.as_ref() {
            return sparse.clone();
        }

        let sparse: SdrSparse = match self.cache.borrow().dense.as_ref() {
            Some(dense) => dense
                .iter()
                .enumerate()
                .filter(|(_, &v)| v != 0)
                .map(|(i, _)| i as ElemSparse)
                .collect(),
            None => Vec::new(),
        };

        self.cache.borrow_mut().sparse = Some(sparse.clone());
        sparse
    }

    /// Returns the number of active (true) bits.
    #[must_use]
    pub fn get_sum(&self) -> usize {
        self.get_sparse().len()
    }

    /// Returns the sparsity (fraction of active bits).
    #[must_use]
    pub fn get_sparsity(&self) -> Real {
        if self.size == 0 {
            return 0.0;
        }
        self.get_sum() as Real / self.size as Real
    }

    /// Returns the number of bits that are active in both SDRs.
    #[must_use]
    pub fn get_overlap(&self, other: &Sdr) -> usize {
        let a = self.get_sparse();
        let b = other.get_sparse();

        let mut count = 0;
        let (mut i, mut j) = (0, 0);
        while i < a.len() && j < b.len() {
            match a[i].cmp(&b[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    count += 1;
                    i += 1;
                    j += 1;
                }
            }
        }
        count
    }

    /// Returns the active bits that fall inside `[offset, offset + len)`,
    /// rebased to start at zero.
    ///
    /// Used to cut a field's slice out of a concatenated multi-field SDR.
    #[must_use]
    pub fn slice(&self, offset: UInt, len: UInt) -> Sdr {
        let mut out = Sdr::new(&[len]);
        let end = offset + len;
        let bits = self
            .get_sparse()
            .into_iter()
            .filter(|&b| b >= offset && b < end)
            .map(|b| b - offset)
            .collect();
        out.set_sparse_unchecked(bits);
        out
    }
}

impl Clone for Sdr {
    fn clone(&self) -> Self {
        let new_sdr = Self::new(&self.dimensions);
        {
            let cache = self.cache.borrow();
            let mut target = new_sdr.cache.borrow_mut();
            target.sparse.clone_from(&cache.sparse);
            target.dense.clone_from(&cache.dense);
        }
        new_sdr
    }
}

impl PartialEq for Sdr {
    fn eq(&self, other: &Self) -> bool {
        self.dimensions == other.dimensions && self.get_sparse() == other.get_sparse()
    }
}

impl Eq for Sdr {}

impl fmt::Debug for Sdr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SDR({:?}) {:?}", self.dimensions, self.get_sparse())
    }
}

impl fmt::Display for Sdr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dims: Vec<String> = self.dimensions.iter().map(ToString::to_string).collect();
        let bits: Vec<String> = self.get_sparse().iter().map(ToString::to_string).collect();
        write!(f, "SDR( {} ) {}", dims.join(", "), bits.join(", "))
    }
}

impl Default for Sdr {
    fn default() -> Self {
        Self::new(&[0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructor() {
        let sdr = Sdr::new(&[3]);
        assert_eq!(sdr.size(), 3);
        assert_eq!(sdr.dimensions(), &[3]);

        let sdr2 = Sdr::new(&[3, 4, 5]);
        assert_eq!(sdr2.size(), 60);
    }

    #[test]
    fn test_empty_placeholder() {
        let sdr = Sdr::new(&[0]);
        assert_eq!(sdr.size(), 0);
        assert!(sdr.get_dense().is_empty());
        assert_eq!(sdr.get_sparsity(), 0.0);
    }

    #[test]
    fn test_zero() {
        let mut sdr = Sdr::new(&[16]);
        sdr.set_dense(&[1; 16]).unwrap();
        sdr.zero();
        assert_eq!(sdr.get_sum(), 0);
    }

    #[test]
    fn test_dense_sparse_conversion() {
        let mut sdr = Sdr::new(&[9]);
        sdr.set_dense(&[0, 1, 0, 0, 1, 0, 0, 0, 1]).unwrap();
        assert_eq!(sdr.get_sparse(), vec![1, 4, 8]);

        sdr.set_sparse(&[1, 4, 8]).unwrap();
        assert_eq!(sdr.get_dense(), vec![0, 1, 0, 0, 1, 0, 0, 0, 1]);
    }

    #[test]
    fn test_set_sparse_rejects_unsorted_and_out_of_bounds() {
        let mut sdr = Sdr::new(&[10]);
        assert!(sdr.set_sparse(&[4, 1]).is_err());
        assert!(sdr.set_sparse(&[1, 1]).is_err());
        assert!(sdr.set_sparse(&[10]).is_err());
    }

    #[test]
    fn test_set_dense_wrong_size() {
        let mut sdr = Sdr::new(&[4]);
        assert!(matches!(
            sdr.set_dense(&[0, 1]),
            Err(SensorError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_overlap() {
        let mut a = Sdr::new(&[20]);
        let mut b = Sdr::new(&[20]);
        a.set_sparse(&[1, 2, 3, 10]).unwrap();
        b.set_sparse(&[2, 3, 11]).unwrap();
        assert_eq!(a.get_overlap(&b), 2);
    }

    #[test]
    fn test_slice() {
        let mut sdr = Sdr::new(&[10]);
        sdr.set_sparse(&[0, 3, 4, 9]).unwrap();
        let slice = sdr.slice(3, 4);
        assert_eq!(slice.size(), 4);
        assert_eq!(slice.get_sparse(), vec![0, 1]);
    }

    #[test]
    fn test_clone_and_eq() {
        let mut sdr = Sdr::new(&[8]);
        sdr.set_sparse(&[2, 5]).unwrap();
        let copy = sdr.clone();
        assert_eq!(sdr, copy);
        assert_eq!(format!("{copy}"), "SDR( 8 ) 2, 5");
    }
}
