use ndarray::{Array2, ArrayView1, Zip};
use rayon::prelude::*;

use crate::error::NmfError;
use crate::matrix::{DataMatrix, Storage};

/// Product W·H evaluated only where X is defined.
///
/// The result has the structure of `x`: the same sparsity pattern for CSR/CSC
/// input, the same observed mask (with zeros in the hidden cells) for masked
/// dense input, and the plain dense product otherwise.
pub fn masked_dot(
    w: &Array2<f64>,
    h: &Array2<f64>,
    x: &DataMatrix,
) -> Result<DataMatrix, NmfError> {
    let (n_samples, n_features) = x.shape();
    if w.nrows() != n_samples || h.ncols() != n_features || w.ncols() != h.nrows() {
        return Err(NmfError::InvalidData(format!(
            "Factors of shape {:?} and {:?} do not multiply to X of shape {:?}",
            w.dim(),
            h.dim(),
            x.shape()
        )));
    }
    Ok(masked_product(w, h, x))
}

/// [`masked_dot`] for factors already known to fit `x`
pub(crate) fn masked_product(w: &Array2<f64>, h: &Array2<f64>, x: &DataMatrix) -> DataMatrix {
    match x.storage() {
        Storage::Dense { observed: None, .. } => DataMatrix::from_storage(Storage::Dense {
            values: w.dot(h),
            observed: None,
        }),
        Storage::Dense {
            observed: Some(mask),
            ..
        } => {
            let n_features = x.ncols();
            let rows: Vec<Vec<f64>> = (0..x.nrows())
                .into_par_iter()
                .map(|i| {
                    let w_row = w.row(i);
                    let mask_row = mask.row(i);
                    (0..n_features)
                        .map(|j| {
                            if mask_row[j] {
                                w_row.dot(&h.column(j))
                            } else {
                                0.0
                            }
                        })
                        .collect()
                })
                .collect();
            let mut values = Array2::zeros(x.shape());
            for (mut row, computed) in values.rows_mut().into_iter().zip(rows.iter()) {
                row.assign(&ArrayView1::from(computed.as_slice()));
            }
            DataMatrix::from_storage(Storage::Dense {
                values,
                observed: Some(mask.clone()),
            })
        }
        Storage::Csr(csr) => {
            let offsets = csr.row_offsets();
            let cols = csr.col_indices();
            let values: Vec<f64> = (0..csr.nrows())
                .into_par_iter()
                .flat_map_iter(|i| {
                    let w_row = w.row(i);
                    (offsets[i]..offsets[i + 1]).map(move |p| w_row.dot(&h.column(cols[p])))
                })
                .collect();
            let mut out = csr.clone();
            out.values_mut().copy_from_slice(&values);
            DataMatrix::from(out)
        }
        Storage::Csc(csc) => {
            let offsets = csc.col_offsets();
            let rows = csc.row_indices();
            let values: Vec<f64> = (0..csc.ncols())
                .into_par_iter()
                .flat_map_iter(|j| {
                    let h_col = h.column(j);
                    (offsets[j]..offsets[j + 1]).map(move |p| w.row(rows[p]).dot(&h_col))
                })
                .collect();
            let mut out = csc.clone();
            out.values_mut().copy_from_slice(&values);
            DataMatrix::from(out)
        }
    }
}

/// Dense W·H with the cells hidden by `observed` zeroed out
pub(crate) fn masked_dense_product(
    w: &Array2<f64>,
    h: &Array2<f64>,
    observed: Option<&Array2<bool>>,
) -> Array2<f64> {
    let mut wh = w.dot(h);
    if let Some(mask) = observed {
        Zip::from(&mut wh).and(mask).for_each(|v, &obs| {
            if !obs {
                *v = 0.0;
            }
        });
    }
    wh
}
