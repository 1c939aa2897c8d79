use log::{info, warn};
use ndarray::Array2;

use crate::config::{NmfConfig, Solver};
use crate::error::NmfError;
use crate::matrix::DataMatrix;

use super::cd::CoordinateDescent;
use super::convergence::ConvergenceMonitor;
use super::divergence::{beta_divergence, reconstruction_error};
use super::init::{check_init, initialize_nmf, InitStrategy, ZeroFill};
use super::mu::MultiplicativeUpdate;
use super::regularization::{compute_regularization, Penalty, RegularizationPolicy};

/// Which factor an update is applied to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Factor {
    W,
    H,
}

/// Solver-specific update of one factor.
///
/// `update_factor` improves `factor` (rows × k) for X ≈ factor · fixed with
/// `fixed` (k × cols) held constant. The H update is the same call on the
/// transposed problem Xᵀ ≈ Hᵀ · Wᵀ.
pub trait FactorUpdater {
    fn update_factor(
        &mut self,
        x: &DataMatrix,
        factor: &mut Array2<f64>,
        fixed: &Array2<f64>,
        penalty: Penalty,
        role: Factor,
    );

    /// Number of sweeps between two objective evaluations
    fn check_every(&self) -> usize;
}

/// Outcome of [`non_negative_factorization`]
#[derive(Debug, Clone)]
pub struct NmfResult {
    pub w: Array2<f64>,
    pub h: Array2<f64>,
    pub n_iter: usize,
    /// sqrt(2 · D_beta(X, WH)) at the returned factors
    pub reconstruction_err: f64,
    pub converged: bool,
}

/// Find non-negative W, H with X ≈ W·H under the configured beta-divergence.
///
/// With `init = Custom`, `w_init` and `h_init` are the starting point. With
/// `update_h = false`, `h_init` is required and held fixed while W is solved
/// for. Every check runs before any computation, so a failed call leaves
/// the inputs untouched.
pub fn non_negative_factorization(
    x: &DataMatrix,
    w_init: Option<&Array2<f64>>,
    h_init: Option<&Array2<f64>>,
    config: &NmfConfig,
) -> Result<NmfResult, NmfError> {
    let (n_samples, n_features) = x.shape();
    let n_components = config.n_components.unwrap_or(n_features);
    let beta = config.beta_loss.value();
    let seed = config.seed_or_default();

    check_parameters(config, n_components, beta)?;
    check_data(x, config.solver, beta)?;

    let (mut w, mut h) = if config.update_h {
        let strategy =
            InitStrategy::resolve(config.init, n_components, x.shape(), w_init, h_init)?;
        if config.solver == Solver::MultiplicativeUpdate
            && matches!(strategy, InitStrategy::Nndsvd(ZeroFill::Keep))
        {
            warn!(
                "The multiplicative update ('mu') solver cannot update zeros present in \
                 the initialization, and so leads to poorer results when used jointly \
                 with init='nndsvd'. You may try init='nndsvda' or init='nndsvdar' instead."
            );
        }
        initialize_nmf(x, n_components, &strategy, seed)?
    } else {
        let h = h_init.ok_or_else(|| {
            NmfError::InvalidParameter("H must be provided when update_h is false".to_string())
        })?;
        check_init(h, (n_components, n_features), "NMF (input H)")?;
        let w = match config.solver {
            // zeros never move under multiplicative updates
            Solver::MultiplicativeUpdate => Array2::from_elem(
                (n_samples, n_components),
                (x.mean_observed() / n_components as f64).sqrt(),
            ),
            Solver::CoordinateDescent => Array2::zeros((n_samples, n_components)),
        };
        (w, h.clone())
    };

    let policy = compute_regularization(config.alpha, config.l1_ratio, config.regularization);
    let mut updater: Box<dyn FactorUpdater> = match config.solver {
        Solver::CoordinateDescent => Box::new(CoordinateDescent::new(config.shuffle, seed)),
        Solver::MultiplicativeUpdate => Box::new(MultiplicativeUpdate::new(beta)),
    };

    let (n_iter, converged) = run_sweeps(
        x,
        &mut w,
        &mut h,
        updater.as_mut(),
        &policy,
        config,
        beta,
    );

    if !converged && config.tol > 0.0 {
        warn!(
            "Maximum number of iterations {} reached. Increase it to improve convergence.",
            config.max_iter
        );
    }

    let reconstruction_err = reconstruction_error(x, &w, &h, beta);
    info!(
        "NMF ({}, beta_loss = {}) finished after {} iterations, reconstruction error {:.6}",
        config.solver, config.beta_loss, n_iter, reconstruction_err
    );

    Ok(NmfResult {
        w,
        h,
        n_iter,
        reconstruction_err,
        converged,
    })
}

/// Alternate H (when enabled) and W updates until convergence or `max_iter`
fn run_sweeps(
    x: &DataMatrix,
    w: &mut Array2<f64>,
    h: &mut Array2<f64>,
    updater: &mut dyn FactorUpdater,
    policy: &RegularizationPolicy,
    config: &NmfConfig,
    beta: f64,
) -> (usize, bool) {
    let x_t = if config.update_h {
        Some(x.transpose())
    } else {
        None
    };
    let initial = if config.tol > 0.0 {
        beta_divergence(x, w, h, beta)
    } else {
        f64::INFINITY
    };
    let mut monitor = ConvergenceMonitor::new(config.tol, updater.check_every(), initial);

    let mut n_iter = 0;
    for sweep in 1..=config.max_iter {
        n_iter = sweep;
        if let Some(x_t) = &x_t {
            let mut h_t = h.t().to_owned();
            let w_t = w.t().to_owned();
            updater.update_factor(x_t, &mut h_t, &w_t, policy.h, Factor::H);
            *h = h_t.t().to_owned();
        }
        updater.update_factor(x, w, h, policy.w, Factor::W);

        if monitor.is_check_point(sweep) && monitor.update(sweep, beta_divergence(x, w, h, beta))
        {
            break;
        }
    }
    (n_iter, monitor.converged())
}

fn check_parameters(config: &NmfConfig, n_components: usize, beta: f64) -> Result<(), NmfError> {
    if n_components == 0 {
        return Err(NmfError::InvalidParameter(format!(
            "Number of components must be a positive integer; got (n_components={})",
            n_components
        )));
    }
    if config.max_iter == 0 {
        return Err(NmfError::InvalidParameter(format!(
            "Maximum number of iterations must be a positive integer; got (max_iter={})",
            config.max_iter
        )));
    }
    if !(config.tol >= 0.0) || !config.tol.is_finite() {
        return Err(NmfError::InvalidParameter(format!(
            "Tolerance for stopping criteria must be positive; got (tol={})",
            config.tol
        )));
    }
    if !(config.alpha >= 0.0) || !config.alpha.is_finite() {
        return Err(NmfError::InvalidParameter(format!(
            "Regularization strength must be non-negative; got (alpha={})",
            config.alpha
        )));
    }
    if !(0.0..=1.0).contains(&config.l1_ratio) {
        return Err(NmfError::InvalidParameter(format!(
            "l1_ratio must be between 0 and 1; got (l1_ratio={})",
            config.l1_ratio
        )));
    }
    if !beta.is_finite() {
        return Err(NmfError::InvalidParameter(format!(
            "Invalid beta_loss parameter: got {} instead of a finite number",
            beta
        )));
    }
    if config.solver == Solver::CoordinateDescent && beta != 2.0 {
        return Err(NmfError::InvalidParameter(format!(
            "Invalid beta_loss parameter: solver 'cd' does not handle beta_loss = {:?}",
            beta
        )));
    }
    Ok(())
}

fn check_data(x: &DataMatrix, solver: Solver, beta: f64) -> Result<(), NmfError> {
    let x_min = x.min_observed();
    if x.is_sparse() && x_min.is_nan() {
        return Err(NmfError::InvalidData(
            "NMF with missing values is not implemented for sparse matrices".to_string(),
        ));
    }
    let mut finite = true;
    x.for_each_stored(|_, _, v| finite &= v.is_finite());
    if !finite {
        return Err(NmfError::InvalidData(
            "Input contains NaN, infinity or a value too large passed to NMF (input X)"
                .to_string(),
        ));
    }
    if x_min < 0.0 {
        return Err(NmfError::InvalidData(
            "Negative values in data passed to NMF (input X)".to_string(),
        ));
    }
    if x.has_missing() && solver == Solver::CoordinateDescent {
        return Err(NmfError::InvalidParameter(
            "NMF solver 'cd' cannot handle missing values".to_string(),
        ));
    }
    if beta <= 0.0 && x_min == 0.0 {
        return Err(NmfError::NumericalInstability(
            "When beta_loss <= 0 and X contains zeros, the solver may diverge. \
             Please add small values to X, or use a positive beta_loss."
                .to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BetaLoss, Init, Regularization};
    use crate::nmf::test_utils::{abs_random, all_non_negative, two_column_ramp};
    use ndarray::array;

    fn mu_config(n_components: usize) -> NmfConfig {
        NmfConfig {
            solver: Solver::MultiplicativeUpdate,
            init: Some(Init::Random),
            ..NmfConfig::with_components(n_components)
        }
    }

    #[test]
    fn test_fit_nn_output() {
        let x = DataMatrix::dense(two_column_ramp());
        for solver in [Solver::CoordinateDescent, Solver::MultiplicativeUpdate] {
            for init in [
                None,
                Some(Init::Nndsvd),
                Some(Init::Nndsvda),
                Some(Init::Nndsvdar),
                Some(Init::Random),
            ] {
                let config = NmfConfig {
                    solver,
                    init,
                    seed: Some(0),
                    ..NmfConfig::with_components(2)
                };
                let result = non_negative_factorization(&x, None, None, &config).unwrap();
                assert!(all_non_negative(&result.w) && all_non_negative(&result.h));
            }
        }
    }

    #[test]
    fn test_fit_close() {
        let x = DataMatrix::dense(abs_random((6, 5), 42));
        for solver in [Solver::CoordinateDescent, Solver::MultiplicativeUpdate] {
            let config = NmfConfig {
                solver,
                init: Some(Init::Nndsvdar),
                seed: Some(0),
                tol: 1e-6,
                max_iter: 600,
                ..NmfConfig::with_components(5)
            };
            let result = non_negative_factorization(&x, None, None, &config).unwrap();
            assert!(result.reconstruction_err < 0.1, "{}", result.reconstruction_err);
        }
    }

    #[test]
    fn test_custom_init_is_checked() {
        let a = Array2::<f64>::ones((2, 2));
        let x = DataMatrix::dense(a.clone());
        let config = NmfConfig {
            init: Some(Init::Custom),
            ..NmfConfig::with_components(2)
        };

        let err = non_negative_factorization(&x, Some(&a), Some(&-&a), &config).unwrap_err();
        assert_eq!(err.message(), "Negative values in data passed to NMF (input H)");
        let err = non_negative_factorization(&x, Some(&-&a), Some(&a), &config).unwrap_err();
        assert_eq!(err.message(), "Negative values in data passed to NMF (input W)");
        let zeros = Array2::zeros((2, 2));
        let err = non_negative_factorization(&x, Some(&a), Some(&zeros), &config).unwrap_err();
        assert_eq!(err.message(), "Array passed to NMF (input H) is full of zeros.");
    }

    #[test]
    fn test_parameter_checks() {
        let x = DataMatrix::dense(Array2::ones((2, 2)));
        let run = |config: NmfConfig| non_negative_factorization(&x, None, None, &config);

        let err = run(NmfConfig {
            beta_loss: BetaLoss::KullbackLeibler,
            ..NmfConfig::default()
        })
        .unwrap_err();
        assert!(err
            .message()
            .contains("Invalid beta_loss parameter: solver 'cd' does not handle beta_loss = 1.0"));

        let err = run(NmfConfig::with_components(0)).unwrap_err();
        assert!(err.message().contains("Number of components must be a positive integer"));

        let err = run(NmfConfig {
            max_iter: 0,
            ..NmfConfig::default()
        })
        .unwrap_err();
        assert!(err.message().contains("Maximum number of iterations must be a positive"));

        let err = run(NmfConfig {
            tol: -1.0,
            ..NmfConfig::default()
        })
        .unwrap_err();
        assert!(err.message().contains("Tolerance for stopping criteria must be positive"));

        assert!(run(NmfConfig {
            alpha: -0.1,
            ..NmfConfig::default()
        })
        .is_err());
        assert!(run(NmfConfig {
            l1_ratio: 1.5,
            ..NmfConfig::default()
        })
        .is_err());

        let err = run(NmfConfig {
            init: Some(Init::Nndsvda),
            ..NmfConfig::with_components(3)
        })
        .unwrap_err();
        assert!(err.message().contains(
            "init = 'nndsvda' can only be used when n_components <= min(n_samples, n_features)"
        ));
    }

    #[test]
    fn test_negative_data_rejected() {
        let x = DataMatrix::dense(-Array2::<f64>::ones((2, 2)));
        let err = non_negative_factorization(&x, None, None, &NmfConfig::default()).unwrap_err();
        assert!(matches!(err, NmfError::InvalidData(_)));
        assert!(err.message().contains("Negative values in data passed to"));
    }

    #[test]
    fn test_missing_value_checks() {
        let x = DataMatrix::dense(array![[2.0, 0.0], [f64::NAN, 2.0]]);

        let config = NmfConfig {
            init: Some(Init::Nndsvdar),
            ..mu_config(2)
        };
        let err = non_negative_factorization(&x, None, None, &config).unwrap_err();
        assert!(err
            .message()
            .contains("initializations with NNDSVD are not available with missing values"));

        let config = NmfConfig {
            init: Some(Init::Random),
            ..NmfConfig::with_components(2)
        };
        let err = non_negative_factorization(&x, None, None, &config).unwrap_err();
        assert!(err.message().contains("NMF solver 'cd' cannot handle missing values"));

        assert!(non_negative_factorization(&x, None, None, &mu_config(2)).is_ok());
    }

    #[test]
    fn test_sparse_nan_rejected() {
        let mut coo = nalgebra_sparse::CooMatrix::new(2, 2);
        coo.push(0, 0, 2.0);
        coo.push(1, 0, f64::NAN);
        coo.push(1, 1, 2.0);
        let x = DataMatrix::from(nalgebra_sparse::CsrMatrix::from(&coo));
        let err = non_negative_factorization(&x, None, None, &mu_config(2)).unwrap_err();
        assert!(err
            .message()
            .contains("NMF with missing values is not implemented for sparse matrices"));
    }

    #[test]
    fn test_transform_mode_keeps_h() {
        let x = DataMatrix::dense(abs_random((6, 5), 3));
        for solver in [Solver::CoordinateDescent, Solver::MultiplicativeUpdate] {
            let fit = non_negative_factorization(
                &x,
                None,
                None,
                &NmfConfig {
                    solver,
                    init: Some(Init::Random),
                    ..NmfConfig::with_components(3)
                },
            )
            .unwrap();
            let config = NmfConfig {
                solver,
                update_h: false,
                ..NmfConfig::with_components(3)
            };
            let transformed = non_negative_factorization(&x, None, Some(&fit.h), &config).unwrap();
            assert_eq!(transformed.h, fit.h);
            assert!(all_non_negative(&transformed.w));

            let err = non_negative_factorization(&x, None, None, &config).unwrap_err();
            assert!(matches!(err, NmfError::InvalidParameter(_)));
        }
    }

    #[test]
    fn test_zero_tolerance_runs_all_iterations() {
        let x = DataMatrix::dense(abs_random((5, 4), 4));
        let config = NmfConfig {
            tol: 0.0,
            max_iter: 17,
            regularization: Regularization::None,
            ..mu_config(2)
        };
        let result = non_negative_factorization(&x, None, None, &config).unwrap();
        assert_eq!(result.n_iter, 17);
        assert!(!result.converged);
    }

    #[test]
    fn test_same_seed_same_result() {
        let x = DataMatrix::dense(abs_random((8, 6), 5));
        let config = NmfConfig {
            shuffle: true,
            init: Some(Init::Random),
            seed: Some(11),
            ..NmfConfig::with_components(3)
        };
        let a = non_negative_factorization(&x, None, None, &config).unwrap();
        let b = non_negative_factorization(&x, None, None, &config).unwrap();
        assert_eq!(a.w, b.w);
        assert_eq!(a.h, b.h);
        assert_eq!(a.n_iter, b.n_iter);
    }
}
