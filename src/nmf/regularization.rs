use crate::config::Regularization;

/// L1 and L2 penalty strengths applied to one factor
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Penalty {
    pub l1: f64,
    pub l2: f64,
}

impl Penalty {
    pub fn is_zero(&self) -> bool {
        self.l1 == 0.0 && self.l2 == 0.0
    }
}

/// Penalties for W and H
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RegularizationPolicy {
    pub w: Penalty,
    pub h: Penalty,
}

/// Split `alpha` into L1/L2 parts and route it to the targeted factors
pub fn compute_regularization(
    alpha: f64,
    l1_ratio: f64,
    target: Regularization,
) -> RegularizationPolicy {
    let split = |enabled: bool| {
        if enabled {
            Penalty {
                l1: alpha * l1_ratio,
                l2: alpha * (1.0 - l1_ratio),
            }
        } else {
            Penalty::default()
        }
    };
    RegularizationPolicy {
        w: split(target.penalizes_w()),
        h: split(target.penalizes_h()),
    }
}
