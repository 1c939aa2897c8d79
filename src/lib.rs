/**
 * File: /src/lib.rs
 * Created Date: Tuesday, October 14th 2026
 * -----
 * HISTORY:
 * Date      		By   	Comments
 * ----------		------	---------------------------------------------------------
 * 2026-10-14				Non-negative matrix factorization with beta-divergences
 */
pub mod config;
pub mod error;
pub mod estimator;
pub mod matrix;
pub mod nmf;
pub mod util;

use log::LevelFilter;

pub use config::{BetaLoss, CliConfig, Init, NmfConfig, Regularization, Solver};
pub use error::NmfError;
pub use estimator::NmfModel;
pub use matrix::DataMatrix;
pub use nmf::{beta_divergence, non_negative_factorization, NmfResult};

/// Install `simple_logger` at `level`; a second call is a no-op
pub fn init_logger(level: LevelFilter) {
    let _ = simple_logger::SimpleLogger::new().with_level(level).init();
}
