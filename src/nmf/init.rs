use std::cmp::Ordering;

use ndarray::{Array1, Array2};
use ndarray_rand::rand::rngs::StdRng;
use ndarray_rand::rand::SeedableRng;
use ndarray_rand::rand_distr::{Distribution, StandardNormal};
use ndarray_rand::RandomExt;

use crate::config::Init;
use crate::error::NmfError;
use crate::matrix::DataMatrix;
use crate::util::{clone_to_dmatrix, dmatrix_to_array2};

/// Entries of an NNDSVD factor below this value are set to zero
const NNDSVD_EPS: f64 = 1e-6;

/// What NNDSVD does with the zeros it produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZeroFill {
    /// nndsvd: keep them
    Keep,
    /// nndsvda: replace by mean(X)
    Mean,
    /// nndsvdar: replace by |mean(X) · N(0, 1) / 100|
    SmallRandom,
}

/// Initialization strategy, resolved once before the iterations start
#[derive(Debug, Clone, Copy)]
pub enum InitStrategy<'a> {
    Random,
    Nndsvd(ZeroFill),
    Custom {
        w: &'a Array2<f64>,
        h: &'a Array2<f64>,
    },
}

impl<'a> InitStrategy<'a> {
    /// Map the configured method to a strategy. `None` picks nndsvd when
    /// `n_components <= min(n_samples, n_features)` and random otherwise.
    pub fn resolve(
        init: Option<Init>,
        n_components: usize,
        shape: (usize, usize),
        w: Option<&'a Array2<f64>>,
        h: Option<&'a Array2<f64>>,
    ) -> Result<Self, NmfError> {
        let init = init.unwrap_or(if n_components <= shape.0.min(shape.1) {
            Init::Nndsvd
        } else {
            Init::Random
        });
        Ok(match init {
            Init::Random => InitStrategy::Random,
            Init::Nndsvd => InitStrategy::Nndsvd(ZeroFill::Keep),
            Init::Nndsvda => InitStrategy::Nndsvd(ZeroFill::Mean),
            Init::Nndsvdar => InitStrategy::Nndsvd(ZeroFill::SmallRandom),
            Init::Custom => match (w, h) {
                (Some(w), Some(h)) => InitStrategy::Custom { w, h },
                _ => {
                    return Err(NmfError::InvalidParameter(
                        "init = 'custom' requires both W and H".to_string(),
                    ))
                }
            },
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            InitStrategy::Random => "random",
            InitStrategy::Nndsvd(ZeroFill::Keep) => "nndsvd",
            InitStrategy::Nndsvd(ZeroFill::Mean) => "nndsvda",
            InitStrategy::Nndsvd(ZeroFill::SmallRandom) => "nndsvdar",
            InitStrategy::Custom { .. } => "custom",
        }
    }
}

/// Produce non-negative starting factors W (n_samples × k) and H (k × n_features)
pub fn initialize_nmf(
    x: &DataMatrix,
    n_components: usize,
    strategy: &InitStrategy,
    seed: u64,
) -> Result<(Array2<f64>, Array2<f64>), NmfError> {
    let (n_samples, n_features) = x.shape();
    if x.min_observed() < 0.0 {
        return Err(NmfError::InvalidData(
            "Negative values in data passed to NMF initialization".to_string(),
        ));
    }
    if n_components == 0 {
        return Err(NmfError::InvalidParameter(format!(
            "Number of components must be a positive integer; got (n_components={})",
            n_components
        )));
    }

    match strategy {
        InitStrategy::Random => Ok(random_init(x, n_components, seed)),
        InitStrategy::Nndsvd(fill) => {
            if n_components > n_samples.min(n_features) {
                return Err(NmfError::InvalidParameter(format!(
                    "init = '{}' can only be used when n_components <= min(n_samples, n_features)",
                    strategy.name()
                )));
            }
            if x.has_missing() {
                return Err(NmfError::InvalidParameter(
                    "initializations with NNDSVD are not available with missing values"
                        .to_string(),
                ));
            }
            nndsvd(x, n_components, *fill, seed)
        }
        InitStrategy::Custom { w, h } => {
            check_init(h, (n_components, n_features), "NMF (input H)")?;
            check_init(w, (n_samples, n_components), "NMF (input W)")?;
            Ok(((*w).clone(), (*h).clone()))
        }
    }
}

/// Reject a caller-supplied factor that is non-finite, misshaped, negative
/// or entirely zero
pub fn check_init(a: &Array2<f64>, shape: (usize, usize), whom: &str) -> Result<(), NmfError> {
    if a.iter().any(|v| !v.is_finite()) {
        return Err(NmfError::InvalidData(format!(
            "Input contains NaN, infinity or a value too large passed to {}",
            whom
        )));
    }
    if a.dim() != shape {
        return Err(NmfError::InvalidData(format!(
            "Array with wrong shape passed to {}. Expected {:?}, but got {:?}",
            whom,
            shape,
            a.dim()
        )));
    }
    if a.iter().any(|&v| v < 0.0) {
        return Err(NmfError::InvalidData(format!(
            "Negative values in data passed to {}",
            whom
        )));
    }
    if a.iter().all(|&v| v == 0.0) {
        return Err(NmfError::InvalidData(format!(
            "Array passed to {} is full of zeros.",
            whom
        )));
    }
    Ok(())
}

/// |avg · N(0, 1)| with avg = sqrt(mean(X) / k)
fn random_init(x: &DataMatrix, n_components: usize, seed: u64) -> (Array2<f64>, Array2<f64>) {
    let (n_samples, n_features) = x.shape();
    let avg = (x.mean_observed() / n_components as f64).sqrt();
    let mut rng = StdRng::seed_from_u64(seed);
    let h = Array2::<f64>::random_using((n_components, n_features), StandardNormal, &mut rng)
        .mapv(|v| (avg * v).abs());
    let w = Array2::<f64>::random_using((n_samples, n_components), StandardNormal, &mut rng)
        .mapv(|v| (avg * v).abs());
    (w, h)
}

/// Boutsidis & Gallopoulos (2008) NNDSVD on the leading k singular triplets
fn nndsvd(
    x: &DataMatrix,
    n_components: usize,
    fill: ZeroFill,
    seed: u64,
) -> Result<(Array2<f64>, Array2<f64>), NmfError> {
    let dense = x.to_dense();
    let (n_samples, n_features) = dense.dim();
    let svd = clone_to_dmatrix(dense.view())
        .try_svd(true, true, f64::EPSILON, 0)
        .ok_or_else(|| NmfError::Computation("SVD did not converge".to_string()))?;
    let u = svd
        .u
        .as_ref()
        .map(dmatrix_to_array2)
        .ok_or_else(|| NmfError::Computation("Failed to compute U matrix".to_string()))?;
    let v_t = svd
        .v_t
        .as_ref()
        .map(dmatrix_to_array2)
        .ok_or_else(|| NmfError::Computation("Failed to compute V^T matrix".to_string()))?;
    let sigma = svd.singular_values;

    let mut order: Vec<usize> = (0..sigma.len()).collect();
    order.sort_by(|&a, &b| sigma[b].partial_cmp(&sigma[a]).unwrap_or(Ordering::Equal));

    let mut w = Array2::zeros((n_samples, n_components));
    let mut h = Array2::zeros((n_components, n_features));

    for (j, &idx) in order.iter().take(n_components).enumerate() {
        let left = u.column(idx).to_owned();
        let right = v_t.row(idx).to_owned();

        // the leading singular triplet of a non-negative matrix is non-negative
        if j == 0 {
            let scale = sigma[idx].sqrt();
            w.column_mut(0).assign(&left.mapv(|v| scale * v.abs()));
            h.row_mut(0).assign(&right.mapv(|v| scale * v.abs()));
            continue;
        }

        let left_pos = left.mapv(|v| v.max(0.0));
        let left_neg = left.mapv(|v| (-v).max(0.0));
        let right_pos = right.mapv(|v| v.max(0.0));
        let right_neg = right.mapv(|v| (-v).max(0.0));

        let (lp, ln) = (norm(&left_pos), norm(&left_neg));
        let (rp, rn) = (norm(&right_pos), norm(&right_neg));
        let (m_pos, m_neg) = (lp * rp, ln * rn);

        let (u_part, v_part, u_norm, v_norm, weight) = if m_pos > m_neg {
            (left_pos, right_pos, lp, rp, m_pos)
        } else {
            (left_neg, right_neg, ln, rn, m_neg)
        };
        if weight == 0.0 {
            continue;
        }

        let lambda = (sigma[idx] * weight).sqrt();
        w.column_mut(j).assign(&u_part.mapv(|v| lambda * v / u_norm));
        h.row_mut(j).assign(&v_part.mapv(|v| lambda * v / v_norm));
    }

    w.mapv_inplace(|v| if v < NNDSVD_EPS { 0.0 } else { v });
    h.mapv_inplace(|v| if v < NNDSVD_EPS { 0.0 } else { v });

    match fill {
        ZeroFill::Keep => {}
        ZeroFill::Mean => {
            let avg = x.mean_observed();
            w.mapv_inplace(|v| if v == 0.0 { avg } else { v });
            h.mapv_inplace(|v| if v == 0.0 { avg } else { v });
        }
        ZeroFill::SmallRandom => {
            let avg = x.mean_observed();
            let mut rng = StdRng::seed_from_u64(seed);
            for v in w.iter_mut().chain(h.iter_mut()) {
                if *v == 0.0 {
                    let draw: f64 = StandardNormal.sample(&mut rng);
                    *v = (avg * draw / 100.0).abs();
                }
            }
        }
    }

    Ok((w, h))
}

fn norm(v: &Array1<f64>) -> f64 {
    v.dot(v).sqrt()
}
