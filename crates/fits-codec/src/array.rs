//! Conversion between [`DataContent`] and `ndarray` arrays.
//!
//! Array shapes list the slowest axis first, so `NAXISn` becomes dimension
//! 0 and `NAXIS1` the last dimension; element order is unchanged.

use ndarray::{Array, ArrayD};

use crate::content::DataContent;
use crate::element::Element;
use crate::error::{Error, Result};

impl DataContent {
    /// Copy the content into an array of shape `[NAXISn, ..., NAXIS1]`.
    pub fn to_ndarray<T: Element>(&self) -> Result<ArrayD<T>> {
        let values = self.as_slice::<T>()?.to_vec();
        let shape: Vec<usize> = self.axes().iter().rev().copied().collect();
        Array::from_shape_vec(shape, values).map_err(|_| Error::ElementCountMismatch {
            expected: self.axes().iter().product(),
            actual: self.len(),
        })
    }

    /// Build content from an array, reading it in logical order.
    pub fn from_ndarray<T: Element>(array: &ArrayD<T>) -> Result<Self> {
        let axes: Vec<usize> = array.shape().iter().rev().copied().collect();
        let values: Vec<T> = array.iter().copied().collect();
        DataContent::from_vec(axes, values)
    }
}
