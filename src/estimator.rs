use ndarray::Array2;

use crate::config::NmfConfig;
use crate::error::NmfError;
use crate::matrix::DataMatrix;
use crate::nmf::{non_negative_factorization, NmfResult};

/// Fitted state kept after `fit_transform`
#[derive(Debug, Clone)]
struct Fitted {
    components: Array2<f64>,
    reconstruction_err: f64,
    n_iter: usize,
}

/// NMF model: learns the components H of X ≈ W·H and projects new data on them
#[derive(Debug, Clone)]
pub struct NmfModel {
    pub config: NmfConfig,
    fitted: Option<Fitted>,
}

impl NmfModel {
    pub fn new(n_components: usize) -> Self {
        Self::with_config(NmfConfig::with_components(n_components))
    }

    pub fn with_config(config: NmfConfig) -> Self {
        Self {
            config,
            fitted: None,
        }
    }

    /// Learn the model and return W. `w` and `h` are only read with `init = Custom`.
    pub fn fit_transform(
        &mut self,
        x: &DataMatrix,
        w: Option<&Array2<f64>>,
        h: Option<&Array2<f64>>,
    ) -> Result<Array2<f64>, NmfError> {
        let config = NmfConfig {
            update_h: true,
            ..self.config.clone()
        };
        let NmfResult {
            w,
            h,
            n_iter,
            reconstruction_err,
            ..
        } = non_negative_factorization(x, w, h, &config)?;
        self.fitted = Some(Fitted {
            components: h,
            reconstruction_err,
            n_iter,
        });
        Ok(w)
    }

    pub fn fit(&mut self, x: &DataMatrix) -> Result<&mut Self, NmfError> {
        self.fit_transform(x, None, None)?;
        Ok(self)
    }

    /// Solve for W with the learned components held fixed
    pub fn transform(&self, x: &DataMatrix) -> Result<Array2<f64>, NmfError> {
        let fitted = self.fitted()?;
        let config = NmfConfig {
            n_components: Some(fitted.components.nrows()),
            update_h: false,
            ..self.config.clone()
        };
        let result = non_negative_factorization(x, None, Some(&fitted.components), &config)?;
        Ok(result.w)
    }

    /// Map W back to data space: W · H
    pub fn inverse_transform(&self, w: &Array2<f64>) -> Result<Array2<f64>, NmfError> {
        let components = &self.fitted()?.components;
        if w.ncols() != components.nrows() {
            return Err(NmfError::InvalidData(format!(
                "W has {} columns but the model has {} components",
                w.ncols(),
                components.nrows()
            )));
        }
        Ok(w.dot(components))
    }

    pub fn components(&self) -> Option<&Array2<f64>> {
        self.fitted.as_ref().map(|f| &f.components)
    }

    pub fn reconstruction_err(&self) -> Option<f64> {
        self.fitted.as_ref().map(|f| f.reconstruction_err)
    }

    pub fn n_iter(&self) -> Option<usize> {
        self.fitted.as_ref().map(|f| f.n_iter)
    }

    fn fitted(&self) -> Result<&Fitted, NmfError> {
        self.fitted.as_ref().ok_or_else(|| {
            NmfError::InvalidParameter(
                "This NmfModel instance is not fitted yet. Call fit_transform first.".to_string(),
            )
        })
    }
}
