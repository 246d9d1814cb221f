//! Coordinate-to-offset mapping over a flat, axis-0-fastest buffer.

use crate::error::{Error, Result};

/// Axis sizes together with their strides.
///
/// `stride[0] = 1` and `stride[i] = stride[i-1] * size[i-1]`, so the first
/// axis (NAXIS1) varies fastest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Strides {
    sizes: Vec<usize>,
    strides: Vec<usize>,
}

impl Strides {
    pub fn new(sizes: &[usize]) -> Self {
        let mut strides = Vec::with_capacity(sizes.len());
        let mut step = 1usize;
        for &size in sizes {
            strides.push(step);
            step = step.saturating_mul(size);
        }
        Strides {
            sizes: sizes.to_vec(),
            strides,
        }
    }

    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    /// Linear offset of `coords`, bounds-checked per axis.
    pub fn offset(&self, coords: &[usize]) -> Result<usize> {
        if coords.len() != self.sizes.len() {
            return Err(Error::DimensionMismatch {
                expected: self.sizes.len(),
                actual: coords.len(),
            });
        }
        let mut offset = 0usize;
        for (axis, ((&c, &size), &stride)) in coords
            .iter()
            .zip(&self.sizes)
            .zip(&self.strides)
            .enumerate()
        {
            if c >= size {
                return Err(Error::IndexOutOfRange {
                    axis,
                    index: c,
                    size,
                });
            }
            offset = offset.saturating_add(c.saturating_mul(stride));
        }
        Ok(offset)
    }

    /// Inverse of [`offset`](Self::offset) for offsets inside the array.
    pub fn coordinates(&self, offset: usize) -> Result<Vec<usize>> {
        let total = self
            .sizes
            .iter()
            .fold(1usize, |acc, &n| acc.saturating_mul(n));
        if self.sizes.is_empty() || offset >= total {
            return Err(Error::IndexOutOfRange {
                axis: 0,
                index: offset,
                size: total,
            });
        }
        let mut rest = offset;
        Ok(self
            .sizes
            .iter()
            .map(|&size| {
                let c = rest % size;
                rest /= size;
                c
            })
            .collect())
    }
}
