use log::debug;
use ndarray::Array2;
use ndarray_rand::rand::rngs::StdRng;
use ndarray_rand::rand::seq::SliceRandom;
use ndarray_rand::rand::SeedableRng;

use crate::matrix::DataMatrix;

use super::factorize::{Factor, FactorUpdater};
use super::regularization::Penalty;

/// Projected coordinate descent for the Frobenius loss (Cichocki & Phan, 2009).
///
/// Each call solves the non-negative least-squares subproblem of `factor`
/// one component at a time, every coordinate in closed form.
pub struct CoordinateDescent {
    shuffle: bool,
    rng: StdRng,
    violation: f64,
}

impl CoordinateDescent {
    pub fn new(shuffle: bool, seed: u64) -> Self {
        Self {
            shuffle,
            rng: StdRng::seed_from_u64(seed),
            violation: 0.0,
        }
    }

    /// Sum of |projected gradient| over the last updated factor
    pub fn violation(&self) -> f64 {
        self.violation
    }

    fn component_order(&mut self, n_components: usize) -> Vec<usize> {
        let mut order: Vec<usize> = (0..n_components).collect();
        if self.shuffle {
            order.shuffle(&mut self.rng);
        }
        order
    }
}

impl FactorUpdater for CoordinateDescent {
    fn update_factor(
        &mut self,
        x: &DataMatrix,
        factor: &mut Array2<f64>,
        fixed: &Array2<f64>,
        penalty: Penalty,
        role: Factor,
    ) {
        let n_components = fixed.nrows();

        let mut gram = fixed.dot(&fixed.t());
        if penalty.l2 != 0.0 {
            for t in 0..n_components {
                gram[[t, t]] += penalty.l2;
            }
        }
        let mut cross = x.dot_unchecked(&fixed.t());
        if penalty.l1 != 0.0 {
            cross.mapv_inplace(|v| v - penalty.l1);
        }

        let order = self.component_order(n_components);
        self.violation = coordinate_sweep(factor, &gram, &cross, &order);
        debug!("cd {:?} update: violation {:.6e}", role, self.violation);
    }

    fn check_every(&self) -> usize {
        1
    }
}

/// One pass over the columns of `factor` in `order`; returns the violation
fn coordinate_sweep(
    factor: &mut Array2<f64>,
    gram: &Array2<f64>,
    cross: &Array2<f64>,
    order: &[usize],
) -> f64 {
    let mut violation = 0.0;
    for &t in order {
        let hess = gram[[t, t]];
        for i in 0..factor.nrows() {
            let grad = factor.row(i).dot(&gram.row(t)) - cross[[i, t]];
            let current = factor[[i, t]];
            let projected = if current == 0.0 { grad.min(0.0) } else { grad };
            violation += projected.abs();
            if hess != 0.0 {
                factor[[i, t]] = (current - grad / hess).max(0.0);
            }
        }
    }
    violation
}
