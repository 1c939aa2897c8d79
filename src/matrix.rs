/*
 * File: /matrix.rs
 * Created Date: Tuesday, October 14th 2026
 * -----
 * HISTORY:
 * Date      		By   	Comments
 * ----------		------	---------------------------------------------------------
 * 2026-10-14				Dense, masked and compressed sparse data matrices
 */

use nalgebra_sparse::{CooMatrix, CscMatrix, CsrMatrix};
use ndarray::{Array2, ArrayView2, Zip};

use crate::error::NmfError;

/// Data matrix X handed to the factorization core.
///
/// Dense matrices mark missing observations with NaN. They are stored with the
/// missing cells zeroed and a separate `observed` mask, so every product and
/// sum over the values only sees observed entries. Compressed sparse matrices
/// cannot carry missing markers: every cell is observed and absent entries
/// are zeros.
///
/// The storage is only reachable through the constructors, which keep hidden
/// cells at zero.
#[derive(Debug, Clone, PartialEq)]
pub struct DataMatrix {
    storage: Storage,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Storage {
    Dense {
        values: Array2<f64>,
        /// `None` when every cell is observed
        observed: Option<Array2<bool>>,
    },
    Csr(CsrMatrix<f64>),
    Csc(CscMatrix<f64>),
}

impl DataMatrix {
    /// Wrap a dense array, treating NaN cells as missing
    pub fn dense(mut values: Array2<f64>) -> Self {
        if !values.iter().any(|v| v.is_nan()) {
            return Self::from_storage(Storage::Dense {
                values,
                observed: None,
            });
        }
        let observed = values.mapv(|v| !v.is_nan());
        values.mapv_inplace(|v| if v.is_nan() { 0.0 } else { v });
        Self::from_storage(Storage::Dense {
            values,
            observed: Some(observed),
        })
    }

    /// Wrap a dense array with an explicit mask (`true` = observed).
    ///
    /// Values under a `false` bit are discarded.
    pub fn masked(mut values: Array2<f64>, observed: Array2<bool>) -> Result<Self, NmfError> {
        if values.dim() != observed.dim() {
            return Err(NmfError::InvalidData(format!(
                "Mask with wrong shape: expected {:?}, but got {:?}",
                values.dim(),
                observed.dim()
            )));
        }
        // NaN inside the observed region is missing as well
        let observed = Zip::from(&observed)
            .and(&values)
            .map_collect(|&obs, &v| obs && !v.is_nan());
        Zip::from(&mut values).and(&observed).for_each(|v, &obs| {
            if !obs {
                *v = 0.0;
            }
        });
        Ok(Self::from_storage(Storage::Dense {
            values,
            observed: Some(observed),
        }))
    }

    /// Build a CSR matrix from the nonzero entries of a dense array
    pub fn csr_from_dense(dense: &Array2<f64>) -> Self {
        Self::from(CsrMatrix::from(&coo_from_dense(dense)))
    }

    /// Build a CSC matrix from the nonzero entries of a dense array
    pub fn csc_from_dense(dense: &Array2<f64>) -> Self {
        Self::from(CscMatrix::from(&coo_from_dense(dense)))
    }

    pub(crate) fn from_storage(storage: Storage) -> Self {
        Self { storage }
    }

    pub(crate) fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Dense values with hidden cells zeroed; `None` for sparse storage
    pub fn as_dense(&self) -> Option<&Array2<f64>> {
        match &self.storage {
            Storage::Dense { values, .. } => Some(values),
            _ => None,
        }
    }

    pub fn as_csr(&self) -> Option<&CsrMatrix<f64>> {
        match &self.storage {
            Storage::Csr(csr) => Some(csr),
            _ => None,
        }
    }

    pub fn as_csc(&self) -> Option<&CscMatrix<f64>> {
        match &self.storage {
            Storage::Csc(csc) => Some(csc),
            _ => None,
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        match &self.storage {
            Storage::Dense { values, .. } => values.dim(),
            Storage::Csr(csr) => (csr.nrows(), csr.ncols()),
            Storage::Csc(csc) => (csc.nrows(), csc.ncols()),
        }
    }

    pub fn nrows(&self) -> usize {
        self.shape().0
    }

    pub fn ncols(&self) -> usize {
        self.shape().1
    }

    pub fn is_sparse(&self) -> bool {
        !matches!(self.storage, Storage::Dense { .. })
    }

    pub fn has_missing(&self) -> bool {
        matches!(self.storage, Storage::Dense { observed: Some(_), .. })
    }

    pub fn observed_mask(&self) -> Option<&Array2<bool>> {
        match &self.storage {
            Storage::Dense { observed, .. } => observed.as_ref(),
            _ => None,
        }
    }

    /// Values the matrix actually stores: observed cells of a dense matrix,
    /// explicit entries of a sparse one
    pub fn stored_values(&self) -> Vec<f64> {
        let mut out = Vec::new();
        self.for_each_stored(|_, _, v| out.push(v));
        out
    }

    /// Visit every stored entry as `(row, col, value)`
    pub fn for_each_stored<F: FnMut(usize, usize, f64)>(&self, mut f: F) {
        match &self.storage {
            Storage::Dense { values, observed } => match observed {
                None => values.indexed_iter().for_each(|((i, j), &v)| f(i, j, v)),
                Some(mask) => Zip::indexed(values).and(mask).for_each(|(i, j), &v, &obs| {
                    if obs {
                        f(i, j, v)
                    }
                }),
            },
            Storage::Csr(csr) => {
                for (i, row) in csr.row_iter().enumerate() {
                    for (&j, &v) in row.col_indices().iter().zip(row.values()) {
                        f(i, j, v);
                    }
                }
            }
            Storage::Csc(csc) => {
                for (j, col) in csc.col_iter().enumerate() {
                    for (&i, &v) in col.row_indices().iter().zip(col.values()) {
                        f(i, j, v);
                    }
                }
            }
        }
    }

    /// Rewrite every stored value in place, pairing it with the value stored
    /// at the same position of `other`.
    ///
    /// `other` must share this storage kind and structure, as the output of
    /// `masked_product` on `other` does.
    pub(crate) fn zip_stored_mut<F>(&mut self, other: &DataMatrix, f: F)
    where
        F: Fn(f64, f64) -> f64,
    {
        match (&mut self.storage, &other.storage) {
            (
                Storage::Dense { values, observed },
                Storage::Dense {
                    values: other_values,
                    ..
                },
            ) => match observed {
                None => Zip::from(values)
                    .and(other_values)
                    .for_each(|v, &o| *v = f(*v, o)),
                Some(mask) => Zip::from(values)
                    .and(other_values)
                    .and(&*mask)
                    .for_each(|v, &o, &obs| {
                        if obs {
                            *v = f(*v, o)
                        }
                    }),
            },
            (Storage::Csr(csr), Storage::Csr(other_csr)) => {
                for (v, &o) in csr.values_mut().iter_mut().zip(other_csr.values()) {
                    *v = f(*v, o);
                }
            }
            (Storage::Csc(csc), Storage::Csc(other_csc)) => {
                for (v, &o) in csc.values_mut().iter_mut().zip(other_csc.values()) {
                    *v = f(*v, o);
                }
            }
            _ => unreachable!("zip_stored_mut requires matrices with identical structure"),
        }
    }

    /// Number of observed cells; every cell of a sparse matrix is observed
    pub fn n_observed(&self) -> usize {
        match self.observed_mask() {
            Some(mask) => mask.iter().filter(|&&obs| obs).count(),
            None => {
                let (n, m) = self.shape();
                n * m
            }
        }
    }

    pub fn sum_observed(&self) -> f64 {
        match &self.storage {
            // hidden cells are stored as zeros
            Storage::Dense { values, .. } => values.sum(),
            Storage::Csr(csr) => csr.values().iter().sum(),
            Storage::Csc(csc) => csc.values().iter().sum(),
        }
    }

    /// Mean over observed cells, sparse zeros included
    pub fn mean_observed(&self) -> f64 {
        let count = self.n_observed();
        if count == 0 {
            return 0.0;
        }
        self.sum_observed() / count as f64
    }

    /// Minimum over observed cells, implicit sparse zeros included.
    /// Returns NaN when a sparse matrix stores NaN.
    pub fn min_observed(&self) -> f64 {
        let (n, m) = self.shape();
        let mut min = f64::INFINITY;
        let mut saw_nan = false;
        let mut stored = 0usize;
        self.for_each_stored(|_, _, v| {
            stored += 1;
            if v.is_nan() {
                saw_nan = true;
            } else if v < min {
                min = v;
            }
        });
        if saw_nan {
            return f64::NAN;
        }
        if self.is_sparse() && stored < n * m {
            min = min.min(0.0);
        }
        min
    }

    /// Sum of squared stored values
    pub fn squared_norm(&self) -> f64 {
        let mut total = 0.0;
        self.for_each_stored(|_, _, v| total += v * v);
        total
    }

    /// Product X·B where missing cells count as zero
    pub fn dot(&self, b: &ArrayView2<f64>) -> Result<Array2<f64>, NmfError> {
        if self.ncols() != b.nrows() {
            return Err(NmfError::InvalidData(format!(
                "Inner dimensions must agree: X has {} columns, the operand {} rows",
                self.ncols(),
                b.nrows()
            )));
        }
        Ok(self.dot_unchecked(b))
    }

    /// `b` must have `self.ncols()` rows
    pub(crate) fn dot_unchecked(&self, b: &ArrayView2<f64>) -> Array2<f64> {
        match &self.storage {
            Storage::Dense { values, .. } => values.dot(b),
            Storage::Csr(csr) => {
                let mut out = Array2::zeros((csr.nrows(), b.ncols()));
                for (i, row) in csr.row_iter().enumerate() {
                    let mut out_row = out.row_mut(i);
                    for (&j, &v) in row.col_indices().iter().zip(row.values()) {
                        out_row.scaled_add(v, &b.row(j));
                    }
                }
                out
            }
            Storage::Csc(csc) => {
                let mut out = Array2::zeros((csc.nrows(), b.ncols()));
                for (j, col) in csc.col_iter().enumerate() {
                    let b_row = b.row(j);
                    for (&i, &v) in col.row_indices().iter().zip(col.values()) {
                        out.row_mut(i).scaled_add(v, &b_row);
                    }
                }
                out
            }
        }
    }

    /// Xᵀ with the same kind of storage
    pub fn transpose(&self) -> DataMatrix {
        let storage = match &self.storage {
            Storage::Dense { values, observed } => Storage::Dense {
                values: values.t().as_standard_layout().into_owned(),
                observed: observed
                    .as_ref()
                    .map(|mask| mask.t().as_standard_layout().into_owned()),
            },
            Storage::Csr(csr) => Storage::Csr(csr.transpose()),
            Storage::Csc(csc) => Storage::Csc(csc.transpose()),
        };
        Self::from_storage(storage)
    }

    /// Dense copy with NaN at missing cells
    pub fn to_dense(&self) -> Array2<f64> {
        match &self.storage {
            Storage::Dense { values, observed } => match observed {
                None => values.clone(),
                Some(mask) => Zip::from(values)
                    .and(mask)
                    .map_collect(|&v, &obs| if obs { v } else { f64::NAN }),
            },
            _ => {
                let mut out = Array2::zeros(self.shape());
                self.for_each_stored(|i, j, v| out[[i, j]] = v);
                out
            }
        }
    }
}

impl From<Array2<f64>> for DataMatrix {
    fn from(values: Array2<f64>) -> Self {
        DataMatrix::dense(values)
    }
}

impl From<CsrMatrix<f64>> for DataMatrix {
    fn from(csr: CsrMatrix<f64>) -> Self {
        DataMatrix::from_storage(Storage::Csr(csr))
    }
}

impl From<CscMatrix<f64>> for DataMatrix {
    fn from(csc: CscMatrix<f64>) -> Self {
        DataMatrix::from_storage(Storage::Csc(csc))
    }
}

fn coo_from_dense(dense: &Array2<f64>) -> CooMatrix<f64> {
    let mut coo = CooMatrix::new(dense.nrows(), dense.ncols());
    for ((i, j), &v) in dense.indexed_iter() {
        if v != 0.0 {
            coo.push(i, j, v);
        }
    }
    coo
}
