use ndarray::{Array2, Axis};

use crate::matrix::{DataMatrix, Storage};
use crate::util::{squared_norm, trace_dot};

use super::masked::{masked_dense_product, masked_product};

/// Floor applied to WH (and threshold on X) before any log, quotient or power
pub const EPSILON: f64 = 1e-9;

/// Beta-divergence D_beta(X, W·H) summed over the observed entries of X.
///
/// beta = 2 is half the squared Frobenius distance, beta = 1 the generalized
/// Kullback-Leibler divergence and beta = 0 the Itakura-Saito divergence.
/// Entries of X not greater than [`EPSILON`] are treated as exact zeros in
/// the log and power terms, which keeps subnormal data from producing
/// infinities.
pub fn beta_divergence(x: &DataMatrix, w: &Array2<f64>, h: &Array2<f64>, beta: f64) -> f64 {
    if beta == 2.0 {
        return frobenius(x, w, h);
    }

    let wh = masked_product(w, h, x);
    let x_data = x.stored_values();
    let wh_data = wh.stored_values();
    // (x, floored wh) where x is strictly positive
    let positive = x_data
        .iter()
        .zip(wh_data.iter())
        .filter(|(&xv, _)| xv > EPSILON)
        .map(|(&xv, &whv)| (xv, whv.max(EPSILON)));

    if beta == 1.0 {
        let log_term: f64 = positive.map(|(xv, whv)| xv * (xv / whv).ln()).sum();
        let sum_wh = if x.has_missing() {
            wh.sum_observed()
        } else {
            w.sum_axis(Axis(0)).dot(&h.sum_axis(Axis(1)))
        };
        return log_term + sum_wh - x.sum_observed();
    }

    if beta == 0.0 {
        let ratio_term: f64 = positive
            .map(|(xv, whv)| {
                let div = xv / whv;
                div - div.ln()
            })
            .sum();
        return ratio_term - x.n_observed() as f64;
    }

    let (x_beta, cross) = positive.fold((0.0, 0.0), |(x_beta, cross), (xv, whv)| {
        (x_beta + xv.powf(beta), cross + xv * whv.powf(beta - 1.0))
    });
    let sum_wh_beta: f64 = match x.storage() {
        Storage::Dense { .. } => wh_data.iter().map(|&v| v.max(EPSILON).powf(beta)).sum::<f64>(),
        // every cell of a sparse matrix is observed: evaluate WH row by row
        _ => (0..w.nrows())
            .map(|i| {
                w.row(i)
                    .dot(h)
                    .iter()
                    .map(|&v| v.max(EPSILON).powf(beta))
                    .sum::<f64>()
            })
            .sum::<f64>(),
    };

    (x_beta - beta * cross + (beta - 1.0) * sum_wh_beta) / (beta * (beta - 1.0))
}

/// sqrt(2 · D_beta), the error reported after a fit
pub fn reconstruction_error(x: &DataMatrix, w: &Array2<f64>, h: &Array2<f64>, beta: f64) -> f64 {
    (2.0 * beta_divergence(x, w, h, beta)).max(0.0).sqrt()
}

fn frobenius(x: &DataMatrix, w: &Array2<f64>, h: &Array2<f64>) -> f64 {
    match x.storage() {
        Storage::Dense { values, observed } => {
            let wh = masked_dense_product(w, h, observed.as_ref());
            squared_norm(&(values - &wh).view()) / 2.0
        }
        // ||X||² + tr(WᵀW·H·Hᵀ) - 2·tr(X·Hᵀ·Wᵀ), never densifying W·H
        _ => {
            let norm_x = x.squared_norm();
            let wtw_h = w.t().dot(w).dot(h);
            let norm_wh = trace_dot(&wtw_h.view(), &h.view());
            let x_ht = x.dot_unchecked(&h.t());
            let cross = trace_dot(&x_ht.view(), &w.view());
            (norm_x + norm_wh - 2.0 * cross) / 2.0
        }
    }
}
