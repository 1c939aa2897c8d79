use ndarray::Array2;

/// Elementwise multiplicative update in place: base *= (numer / denom)^gamma.
///
/// Denominators are floored at `eps`. All operands are non-negative, so the
/// result is too.
pub fn multiplicative_update(
    base: &mut Array2<f64>,
    numer: &Array2<f64>,
    denom: &Array2<f64>,
    gamma: f64,
    eps: f64,
) {
    ndarray::Zip::from(base)
        .and(numer)
        .and(denom)
        .for_each(|r, &n, &d| {
            let ratio = n / d.max(eps);
            *r *= if gamma == 1.0 { ratio } else { ratio.powf(gamma) };
        });
}

/// Exponent of the Maximization-Minimization step for a beta-divergence
pub fn mm_exponent(beta: f64) -> f64 {
    if beta < 1.0 {
        1.0 / (2.0 - beta)
    } else if beta > 2.0 {
        1.0 / (beta - 1.0)
    } else {
        1.0
    }
}

/// Set entries below `threshold` to exactly zero
pub fn flush_small(a: &mut Array2<f64>, threshold: f64) {
    a.mapv_inplace(|v| if v < threshold { 0.0 } else { v });
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_multiplicative_update_floors_denominator() {
        let mut base = array![[1.0, 2.0], [3.0, 4.0]];
        let numer = array![[2.0, 0.0], [1.0, 1e-12]];
        let denom = array![[1.0, 1.0], [0.0, 0.0]];
        multiplicative_update(&mut base, &numer, &denom, 1.0, 1e-9);
        assert_eq!(base[[0, 0]], 2.0);
        assert_eq!(base[[0, 1]], 0.0);
        assert!((base[[1, 0]] - 3e9).abs() < 1.0);
        assert!(base.iter().all(|v| v.is_finite() && *v >= 0.0));
    }

    #[test]
    fn test_gamma_dampens_step() {
        let mut base = array![[1.0]];
        multiplicative_update(&mut base, &array![[4.0]], &array![[1.0]], 0.5, 1e-9);
        assert!((base[[0, 0]] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_mm_exponent() {
        assert_eq!(mm_exponent(0.0), 0.5);
        assert_eq!(mm_exponent(1.0), 1.0);
        assert_eq!(mm_exponent(2.0), 1.0);
        assert_eq!(mm_exponent(3.0), 0.5);
        assert!((mm_exponent(-1.0) - 1.0 / 3.0).abs() < 1e-15);
    }

    #[test]
    fn test_flush_small() {
        let mut a = array![[1e-20, 0.5], [f64::EPSILON, 0.0]];
        flush_small(&mut a, f64::EPSILON);
        assert_eq!(a, array![[0.0, 0.5], [f64::EPSILON, 0.0]]);
    }
}
