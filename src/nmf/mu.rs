use ndarray::{Array2, Axis, Zip};

use crate::matrix::{DataMatrix, Storage};

use super::divergence::EPSILON;
use super::factorize::{Factor, FactorUpdater};
use super::masked::{masked_dense_product, masked_product};
use super::regularization::Penalty;
use super::update_rules::{flush_small, mm_exponent, multiplicative_update};

/// Multiplicative updates for the beta-divergence (Févotte & Idier, 2011).
///
/// Every sum in the numerator and the denominator runs over the observed
/// entries of X only.
pub struct MultiplicativeUpdate {
    beta: f64,
    gamma: f64,
}

impl MultiplicativeUpdate {
    pub fn new(beta: f64) -> Self {
        Self {
            beta,
            gamma: mm_exponent(beta),
        }
    }

    /// (X ∘ (WH)^(beta-2)) · Hᵀ restricted to the support of X
    fn numerator(&self, x: &DataMatrix, factor: &Array2<f64>, fixed: &Array2<f64>) -> Array2<f64> {
        let beta = self.beta;
        let mut ratio = masked_product(factor, fixed, x);
        ratio.zip_stored_mut(x, |wh, xv| {
            // no negative power of zero
            let wh = if beta < 2.0 && wh == 0.0 { EPSILON } else { wh };
            if beta == 1.0 {
                xv / wh
            } else {
                xv * wh.powf(beta - 2.0)
            }
        });
        ratio.dot_unchecked(&fixed.t())
    }

    /// (WH)^(beta-1) · Hᵀ over the observed cells
    fn denominator(&self, x: &DataMatrix, factor: &Array2<f64>, fixed: &Array2<f64>) -> Array2<f64> {
        let beta = self.beta;
        let power = |wh: f64| {
            let wh = if beta < 1.0 && wh == 0.0 { EPSILON } else { wh };
            wh.powf(beta - 1.0)
        };
        let n_rows = factor.nrows();

        match x.storage() {
            Storage::Dense {
                observed: Some(mask),
                ..
            } => {
                let wh = masked_dense_product(factor, fixed, Some(mask));
                let weights = Zip::from(&wh).and(mask).map_collect(|&v, &obs| match obs {
                    false => 0.0,
                    true if beta == 1.0 => 1.0,
                    true => power(v),
                });
                weights.dot(&fixed.t())
            }
            _ if beta == 1.0 => {
                let fixed_sum = fixed.sum_axis(Axis(1));
                Array2::from_shape_fn((n_rows, fixed.nrows()), |(_, t)| fixed_sum[t])
            }
            Storage::Dense { .. } => factor.dot(fixed).mapv(&power).dot(&fixed.t()),
            // a row of WH at a time, never the full dense product
            _ => {
                let mut denom = Array2::zeros((n_rows, fixed.nrows()));
                for (i, mut row) in denom.axis_iter_mut(Axis(0)).enumerate() {
                    let wh_row = factor.row(i).dot(fixed).mapv(&power);
                    row.assign(&fixed.dot(&wh_row));
                }
                denom
            }
        }
    }
}

impl FactorUpdater for MultiplicativeUpdate {
    fn update_factor(
        &mut self,
        x: &DataMatrix,
        factor: &mut Array2<f64>,
        fixed: &Array2<f64>,
        penalty: Penalty,
        role: Factor,
    ) {
        let (numer, mut denom) = if self.beta == 2.0 && !x.has_missing() {
            (x.dot_unchecked(&fixed.t()), factor.dot(&fixed.dot(&fixed.t())))
        } else {
            (
                self.numerator(x, factor, fixed),
                self.denominator(x, factor, fixed),
            )
        };

        if penalty.l1 > 0.0 {
            denom.mapv_inplace(|v| v + penalty.l1);
        }
        if penalty.l2 > 0.0 {
            denom.scaled_add(penalty.l2, &*factor);
        }

        multiplicative_update(factor, &numer, &denom, self.gamma, EPSILON);

        // entries this small cannot recover and slow down convergence
        let flush = match role {
            Factor::W => self.beta < 1.0,
            Factor::H => self.beta <= 1.0,
        };
        if flush {
            flush_small(factor, f64::EPSILON);
        }
    }

    fn check_every(&self) -> usize {
        10
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nmf::divergence::beta_divergence;
    use crate::nmf::test_utils::{abs_random, all_non_negative, random_mask, with_missing};

    const BETAS: [f64; 6] = [-1.2, 0.0, 0.2, 1.0, 2.0, 2.5];

    #[test]
    fn test_general_path_matches_frobenius_shortcut() {
        let x = DataMatrix::dense(abs_random((9, 6), 1));
        let h = abs_random((3, 6), 2);
        let w = abs_random((9, 3), 3);
        let solver = MultiplicativeUpdate::new(2.0);
        let numer = solver.numerator(&x, &w, &h);
        let denom = solver.denominator(&x, &w, &h);
        let expected_numer = x.dot(&h.t()).unwrap();
        let expected_denom = w.dot(&h.dot(&h.t()));
        for (a, b) in numer.iter().zip(expected_numer.iter()) {
            assert!((a - b).abs() < 1e-10);
        }
        for (a, b) in denom.iter().zip(expected_denom.iter()) {
            assert!((a - b).abs() < 1e-10);
        }
    }

    #[test]
    fn test_sparse_terms_match_dense() {
        let mut dense = abs_random((8, 5), 4);
        dense.column_mut(3).fill(0.0);
        let h = abs_random((2, 5), 5);
        let w = abs_random((8, 2), 6);
        let sparse = DataMatrix::csr_from_dense(&dense);
        let dense = DataMatrix::dense(dense);

        for beta in BETAS {
            let solver = MultiplicativeUpdate::new(beta);
            let pairs = [
                (solver.numerator(&dense, &w, &h), solver.numerator(&sparse, &w, &h)),
                (solver.denominator(&dense, &w, &h), solver.denominator(&sparse, &w, &h)),
            ];
            for (a, b) in pairs.iter() {
                for (u, v) in a.iter().zip(b.iter()) {
                    assert!((u - v).abs() <= 1e-9 * u.abs().max(1.0), "beta {}", beta);
                }
            }
        }
    }

    #[test]
    fn test_updates_decrease_divergence() {
        let x_full = abs_random((12, 8), 7);
        let x_nan = with_missing(&x_full, &random_mask((12, 8), 8));
        for values in [x_full, x_nan] {
            let x = DataMatrix::dense(values);
            let x_t = x.transpose();
            for beta in BETAS {
                let mut solver = MultiplicativeUpdate::new(beta);
                let mut w = abs_random((12, 3), 9);
                let mut h = abs_random((3, 8), 10);
                let mut previous = beta_divergence(&x, &w, &h, beta);
                for _ in 0..20 {
                    let mut h_t = h.t().to_owned();
                    let w_t = w.t().to_owned();
                    solver.update_factor(&x_t, &mut h_t, &w_t, Penalty::default(), Factor::H);
                    h = h_t.t().to_owned();
                    solver.update_factor(&x, &mut w, &h, Penalty::default(), Factor::W);

                    let current = beta_divergence(&x, &w, &h, beta);
                    assert!(
                        current <= previous + 1e-10 * previous.abs(),
                        "beta {}: {} > {}",
                        beta,
                        current,
                        previous
                    );
                    previous = current;
                }
                assert!(all_non_negative(&w) && all_non_negative(&h));
            }
        }
    }

    #[test]
    fn test_missing_cells_do_not_move_factor() {
        // row 0 hides its outlier and must update as if it were absent
        let mut x = ndarray::array![[1.0, 2.0, 50.0], [1.0, 2.0, 3.0]];
        let h = abs_random((1, 3), 11);
        let mut w = Array2::from_elem((2, 1), 0.5);
        x[[0, 2]] = f64::NAN;
        let mut x_row1 = x.clone();
        x_row1[[1, 2]] = f64::NAN;

        let mut solver = MultiplicativeUpdate::new(1.0);
        let mut w_both = w.clone();
        let no_penalty = Penalty::default();
        solver.update_factor(&DataMatrix::dense(x_row1), &mut w_both, &h, no_penalty, Factor::W);
        solver.update_factor(&DataMatrix::dense(x), &mut w, &h, no_penalty, Factor::W);
        assert!((w_both[[0, 0]] - w_both[[1, 0]]).abs() < 1e-12);
        assert!((w[[0, 0]] - w_both[[0, 0]]).abs() < 1e-12);
    }

    #[test]
    fn test_penalty_shrinks_update() {
        let x = DataMatrix::dense(abs_random((6, 4), 12));
        let h = abs_random((2, 4), 13);
        let w0 = abs_random((6, 2), 14);
        let mut solver = MultiplicativeUpdate::new(2.0);

        let mut plain = w0.clone();
        solver.update_factor(&x, &mut plain, &h, Penalty::default(), Factor::W);
        let mut penalized = w0.clone();
        solver.update_factor(&x, &mut penalized, &h, Penalty { l1: 0.5, l2: 0.5 }, Factor::W);
        assert!(penalized.iter().zip(plain.iter()).all(|(p, q)| p <= q));
    }
}
