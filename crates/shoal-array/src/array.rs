//! The [`Array`] storage primitive.

use std::sync::Arc;

use smallvec::SmallVec;

use crate::error::ArrayError;

/// An immutable, reference-counted, shape-aware `f32` buffer view.
///
/// Cloning an `Array` clones the `Arc`, not the data. Row slicing
/// ([`slice_rows`](Self::slice_rows), [`index`](Self::index)) produces
/// views into the same storage; [`gather_rows`](Self::gather_rows)
/// materializes a fresh copy. This split is what lets the action
/// demultiplexer stay zero-copy on contiguous batches and fall back to
/// an explicit copy only on scattered ones.
#[derive(Clone, Debug)]
pub struct Array {
    data: Arc<Vec<f32>>,
    offset: usize,
    shape: SmallVec<[usize; 4]>,
}

impl Array {
    /// A zero-filled array of the given shape.
    pub fn zeros(shape: &[usize]) -> Self {
        let len = shape.iter().product();
        Self {
            data: Arc::new(vec![0.0; len]),
            offset: 0,
            shape: shape.iter().copied().collect(),
        }
    }

    /// Wrap owned data in an array of the given shape.
    ///
    /// # Errors
    ///
    /// Returns [`ArrayError::ShapeDataMismatch`] if `data.len()` is not
    /// the product of `shape`.
    pub fn from_vec(shape: &[usize], data: Vec<f32>) -> Result<Self, ArrayError> {
        let expected: usize = shape.iter().product();
        if data.len() != expected {
            return Err(ArrayError::ShapeDataMismatch {
                expected,
                got: data.len(),
            });
        }
        Ok(Self {
            data: Arc::new(data),
            offset: 0,
            shape: shape.iter().copied().collect(),
        })
    }

    /// A rank-0 array holding a single value.
    pub fn from_scalar(value: f32) -> Self {
        Self {
            data: Arc::new(vec![value]),
            offset: 0,
            shape: SmallVec::new(),
        }
    }

    /// The view's shape.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Number of dimensions.
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Total element count of the view.
    pub fn len(&self) -> usize {
        self.shape.iter().product()
    }

    /// Returns `true` if the view holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Leading-dimension row count; a rank-0 array has one row.
    pub fn rows(&self) -> usize {
        self.shape.first().copied().unwrap_or(1)
    }

    /// Elements per leading-dimension row.
    pub fn row_len(&self) -> usize {
        self.shape.iter().skip(1).product()
    }

    /// The view's elements as a flat slice, row-major.
    pub fn as_slice(&self) -> &[f32] {
        &self.data[self.offset..self.offset + self.len()]
    }

    /// The single element of a one-element view.
    ///
    /// # Panics
    ///
    /// Panics if the view does not hold exactly one element.
    pub fn scalar(&self) -> f32 {
        assert_eq!(self.len(), 1, "scalar() on a {}-element view", self.len());
        self.data[self.offset]
    }

    /// Zero-copy view over rows `[start, end)` of the leading dimension.
    ///
    /// # Errors
    ///
    /// Returns [`ArrayError::RankZero`] on a rank-0 array and
    /// [`ArrayError::RowRangeOutOfBounds`] for an invalid range. An empty
    /// range (`start == end`) is valid and yields a 0-row view.
    pub fn slice_rows(&self, start: usize, end: usize) -> Result<Self, ArrayError> {
        if self.ndim() == 0 {
            return Err(ArrayError::RankZero);
        }
        let rows = self.rows();
        if start > end || end > rows {
            return Err(ArrayError::RowRangeOutOfBounds { start, end, rows });
        }
        let row_len = self.row_len();
        let mut shape = self.shape.clone();
        shape[0] = end - start;
        Ok(Self {
            data: Arc::clone(&self.data),
            offset: self.offset + start * row_len,
            shape,
        })
    }

    /// Zero-copy view of row `index` with the leading dimension removed.
    ///
    /// # Errors
    ///
    /// Returns [`ArrayError::RankZero`] on a rank-0 array and
    /// [`ArrayError::RowOutOfBounds`] for an invalid index.
    pub fn index(&self, index: usize) -> Result<Self, ArrayError> {
        if self.ndim() == 0 {
            return Err(ArrayError::RankZero);
        }
        let rows = self.rows();
        if index >= rows {
            return Err(ArrayError::RowOutOfBounds { index, rows });
        }
        let row_len = self.row_len();
        Ok(Self {
            data: Arc::clone(&self.data),
            offset: self.offset + index * row_len,
            shape: self.shape.iter().skip(1).copied().collect(),
        })
    }

    /// Materialize selected rows, in the given order, into fresh storage.
    ///
    /// The result has shape `[rows.len(), tail...]` and shares no storage
    /// with `self`.
    ///
    /// # Errors
    ///
    /// Returns [`ArrayError::RankZero`] on a rank-0 array and
    /// [`ArrayError::RowOutOfBounds`] if any index is invalid.
    pub fn gather_rows(&self, rows: &[usize]) -> Result<Self, ArrayError> {
        if self.ndim() == 0 {
            return Err(ArrayError::RankZero);
        }
        let available = self.rows();
        let row_len = self.row_len();
        let src = self.as_slice();
        let mut data = Vec::with_capacity(rows.len() * row_len);
        for &row in rows {
            if row >= available {
                return Err(ArrayError::RowOutOfBounds {
                    index: row,
                    rows: available,
                });
            }
            data.extend_from_slice(&src[row * row_len..(row + 1) * row_len]);
        }
        let mut shape = self.shape.clone();
        shape[0] = rows.len();
        Ok(Self {
            data: Arc::new(data),
            offset: 0,
            shape,
        })
    }

    /// Whether two arrays view the same backing allocation.
    ///
    /// Lets tests distinguish the zero-copy slice path from a
    /// materialized copy.
    pub fn shares_storage(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }
}
