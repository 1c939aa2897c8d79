/**
 * File: /src/error.rs
 * Created Date: Tuesday, October 14th 2026
 * -----
 * HISTORY:
 * Date      		By   	Comments
 * ----------		------	---------------------------------------------------------
 * 2026-10-14				Error taxonomy for the factorization core
 */
use std::error::Error;
use std::fmt;

/// Errors raised by the factorization core.
///
/// Every variant is detected before W or H are touched, so a failed call
/// never leaves caller buffers half-updated.
#[derive(Debug, Clone, PartialEq)]
pub enum NmfError {
    /// Unknown enum string, infeasible n_components, incompatible solver/loss
    InvalidParameter(String),
    /// Negative or non-finite values where they are not allowed
    InvalidData(String),
    /// beta_loss <= 0 on data containing exact zeros
    NumericalInstability(String),
    /// Linear algebra failure (SVD)
    Computation(String),
}

impl NmfError {
    pub fn message(&self) -> &str {
        match self {
            NmfError::InvalidParameter(msg)
            | NmfError::InvalidData(msg)
            | NmfError::NumericalInstability(msg)
            | NmfError::Computation(msg) => msg,
        }
    }
}

impl fmt::Display for NmfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NmfError::InvalidParameter(msg) => write!(f, "Invalid parameter: {}", msg),
            NmfError::InvalidData(msg) => write!(f, "Invalid data: {}", msg),
            NmfError::NumericalInstability(msg) => write!(f, "Numerical instability: {}", msg),
            NmfError::Computation(msg) => write!(f, "Computation error: {}", msg),
        }
    }
}

impl Error for NmfError {}
