use std::error::Error;
use std::fmt;
use std::fs::{self, File};
use std::path::PathBuf;
use std::str::FromStr;

/**
 * File: /src/config.rs
 * Created Date: Tuesday, October 14th 2026
 * -----
 * HISTORY:
 * Date      		By   	Comments
 * ----------		------	---------------------------------------------------------
 * 2026-10-14				Factorization options and CLI arguments
 */
use ndarray::Array2;
use ndarray_npy::ReadNpyExt;
use serde::{Deserialize, Serialize};

use crate::error::NmfError;

/// Numerical solver used for the iterative updates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Solver {
    /// Projected coordinate descent, Frobenius loss only
    CoordinateDescent,
    /// Multiplicative updates for any beta-divergence
    MultiplicativeUpdate,
}

impl FromStr for Solver {
    type Err = NmfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cd" | "coordinate_descent" => Ok(Solver::CoordinateDescent),
            "mu" | "multiplicative_update" => Ok(Solver::MultiplicativeUpdate),
            other => Err(NmfError::InvalidParameter(format!(
                "Invalid solver parameter: got '{}' instead of one of ('cd', 'mu')",
                other
            ))),
        }
    }
}

impl fmt::Display for Solver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Solver::CoordinateDescent => write!(f, "cd"),
            Solver::MultiplicativeUpdate => write!(f, "mu"),
        }
    }
}

/// Initialization method for W and H
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Init {
    Random,
    Nndsvd,
    /// NNDSVD with zeros filled with the data mean
    Nndsvda,
    /// NNDSVD with zeros filled with small random values
    Nndsvdar,
    /// W and H supplied by the caller
    Custom,
}

impl FromStr for Init {
    type Err = NmfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "random" => Ok(Init::Random),
            "nndsvd" => Ok(Init::Nndsvd),
            "nndsvda" => Ok(Init::Nndsvda),
            "nndsvdar" => Ok(Init::Nndsvdar),
            "custom" => Ok(Init::Custom),
            other => Err(NmfError::InvalidParameter(format!(
                "Invalid init parameter: got '{}' instead of one of \
                 ('random', 'nndsvd', 'nndsvda', 'nndsvdar', 'custom')",
                other
            ))),
        }
    }
}

impl fmt::Display for Init {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Init::Random => "random",
            Init::Nndsvd => "nndsvd",
            Init::Nndsvda => "nndsvda",
            Init::Nndsvdar => "nndsvdar",
            Init::Custom => "custom",
        };
        write!(f, "{}", name)
    }
}

/// Beta parameter of the beta-divergence
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum BetaLoss {
    /// beta = 2
    Frobenius,
    /// beta = 1
    KullbackLeibler,
    /// beta = 0
    ItakuraSaito,
    Beta(f64),
}

impl BetaLoss {
    pub fn value(&self) -> f64 {
        match self {
            BetaLoss::Frobenius => 2.0,
            BetaLoss::KullbackLeibler => 1.0,
            BetaLoss::ItakuraSaito => 0.0,
            BetaLoss::Beta(beta) => *beta,
        }
    }
}

impl Default for BetaLoss {
    fn default() -> Self {
        BetaLoss::Frobenius
    }
}

impl From<f64> for BetaLoss {
    fn from(beta: f64) -> Self {
        BetaLoss::Beta(beta)
    }
}

impl FromStr for BetaLoss {
    type Err = NmfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "frobenius" => Ok(BetaLoss::Frobenius),
            "kullback-leibler" => Ok(BetaLoss::KullbackLeibler),
            "itakura-saito" => Ok(BetaLoss::ItakuraSaito),
            other => other.parse::<f64>().map(BetaLoss::Beta).map_err(|_| {
                NmfError::InvalidParameter(format!(
                    "Invalid beta_loss parameter: got '{}' instead of one of \
                     ('frobenius', 'kullback-leibler', 'itakura-saito'), or a float.",
                    other
                ))
            }),
        }
    }
}

impl fmt::Display for BetaLoss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BetaLoss::Frobenius => write!(f, "frobenius"),
            BetaLoss::KullbackLeibler => write!(f, "kullback-leibler"),
            BetaLoss::ItakuraSaito => write!(f, "itakura-saito"),
            BetaLoss::Beta(beta) => write!(f, "{}", beta),
        }
    }
}

/// Which factor receives the L1/L2 penalty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Regularization {
    None,
    /// H only
    Components,
    /// W only
    Transformation,
    Both,
}

impl Regularization {
    pub fn penalizes_w(&self) -> bool {
        matches!(self, Regularization::Transformation | Regularization::Both)
    }

    pub fn penalizes_h(&self) -> bool {
        matches!(self, Regularization::Components | Regularization::Both)
    }
}

impl FromStr for Regularization {
    type Err = NmfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Regularization::None),
            "components" | "h" | "H" => Ok(Regularization::Components),
            "transformation" | "w" | "W" => Ok(Regularization::Transformation),
            "both" => Ok(Regularization::Both),
            other => Err(NmfError::InvalidParameter(format!(
                "Invalid regularization parameter: got '{}' instead of one of \
                 ('both', 'components', 'transformation', 'none')",
                other
            ))),
        }
    }
}

impl fmt::Display for Regularization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Regularization::None => "none",
            Regularization::Components => "components",
            Regularization::Transformation => "transformation",
            Regularization::Both => "both",
        };
        write!(f, "{}", name)
    }
}

macro_rules! string_serde {
    ($($ty:ty),*) => {
        $(
            impl TryFrom<String> for $ty {
                type Error = NmfError;

                fn try_from(value: String) -> Result<Self, Self::Error> {
                    value.parse()
                }
            }

            impl From<$ty> for String {
                fn from(value: $ty) -> Self {
                    value.to_string()
                }
            }
        )*
    };
}

string_serde!(Solver, Init, BetaLoss, Regularization);

/// Options of a single factorization call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NmfConfig {
    /// Defaults to n_features
    pub n_components: Option<usize>,
    /// Defaults to nndsvd when n_components <= min(n_samples, n_features), random otherwise
    pub init: Option<Init>,
    pub solver: Solver,
    pub beta_loss: BetaLoss,
    pub tol: f64,
    pub max_iter: usize,
    pub seed: Option<u64>,
    pub alpha: f64,
    pub l1_ratio: f64,
    pub regularization: Regularization,
    /// Randomize the coordinate order of the cd solver
    pub shuffle: bool,
    /// When false, H is held fixed and only W is solved for
    pub update_h: bool,
}

impl Default for NmfConfig {
    fn default() -> Self {
        Self {
            n_components: None,
            init: None,
            solver: Solver::CoordinateDescent,
            beta_loss: BetaLoss::Frobenius,
            tol: 1e-4,
            max_iter: 200,
            seed: None,
            alpha: 0.0,
            l1_ratio: 0.0,
            regularization: Regularization::Both,
            shuffle: false,
            update_h: true,
        }
    }
}

impl NmfConfig {
    pub fn with_components(n_components: usize) -> Self {
        Self {
            n_components: Some(n_components),
            ..Default::default()
        }
    }

    /// Seed actually used by the random number generator
    pub fn seed_or_default(&self) -> u64 {
        self.seed.unwrap_or(42)
    }
}

/// Arguments of the `fast_nmf` binary
pub struct CliConfig {
    matrix: Array2<f64>,
    nmf: NmfConfig,
    output_dir: PathBuf,
}

impl CliConfig {
    /// constructor
    ///
    /// # Examples
    /// ```bash
    /// $ cargo run -- "data/matrix.npy" 5 nmf.toml
    /// ```
    pub fn new(mut args: impl Iterator<Item = String>) -> Result<CliConfig, Box<dyn Error>> {
        // 0: program name
        // 1: matrix path
        // 2: n_components
        // 3: optional TOML file with NmfConfig fields
        args.next();
        let matrix_path = PathBuf::from(args.next().ok_or("missing matrix path")?);
        let reader = File::open(&matrix_path)?;
        let matrix = Array2::<f64>::read_npy(reader)?;
        let n_components = args
            .next()
            .ok_or("missing number of components")?
            .parse::<usize>()?;

        let mut nmf = match args.next() {
            Some(path) => toml::from_str::<NmfConfig>(&fs::read_to_string(path)?)?,
            None => NmfConfig::default(),
        };
        nmf.n_components = Some(n_components);

        let output_dir = matrix_path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(CliConfig {
            matrix,
            nmf,
            output_dir,
        })
    }

    pub fn get_matrix(&self) -> &Array2<f64> {
        &self.matrix
    }

    pub fn get_nmf(&self) -> &NmfConfig {
        &self.nmf
    }

    pub fn get_output_dir(&self) -> &PathBuf {
        &self.output_dir
    }
}
