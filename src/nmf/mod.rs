pub mod cd;
pub mod convergence;
pub mod divergence;
pub mod factorize;
pub mod init;
pub mod masked;
pub mod mu;
pub mod regularization;
pub mod update_rules;

#[cfg(test)]
pub(crate) mod test_utils;

pub use cd::CoordinateDescent;
pub use convergence::ConvergenceMonitor;
pub use divergence::{beta_divergence, reconstruction_error, EPSILON};
pub use factorize::{non_negative_factorization, Factor, FactorUpdater, NmfResult};
pub use init::{check_init, initialize_nmf, InitStrategy, ZeroFill};
pub use masked::masked_dot;
pub use mu::MultiplicativeUpdate;
pub use regularization::{compute_regularization, Penalty, RegularizationPolicy};
