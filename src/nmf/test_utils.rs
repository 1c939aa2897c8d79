/// Shared fixtures for the factorization unit tests
use ndarray::Array2;
use ndarray_rand::rand::rngs::StdRng;
use ndarray_rand::rand::SeedableRng;
use ndarray_rand::rand_distr::{StandardNormal, Uniform};
use ndarray_rand::RandomExt;

/// |N(0, 1)| entries, reproducible from `seed`
pub fn abs_random(shape: (usize, usize), seed: u64) -> Array2<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    Array2::<f64>::random_using(shape, StandardNormal, &mut rng).mapv(f64::abs)
}

/// N(0, 1) entries clipped at zero, so roughly half of them are exact zeros
pub fn clipped_random(shape: (usize, usize), seed: u64) -> Array2<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    Array2::<f64>::random_using(shape, StandardNormal, &mut rng).mapv(|v| v.max(0.0))
}

/// Boolean matrix with each entry `true` with probability 1/2
pub fn random_mask(shape: (usize, usize), seed: u64) -> Array2<bool> {
    let mut rng = StdRng::seed_from_u64(seed);
    Array2::random_using(shape, Uniform::new(0.0, 1.0), &mut rng).mapv(|v: f64| v < 0.5)
}

/// Copy of `x` with NaN wherever `hide` is true
pub fn with_missing(x: &Array2<f64>, hide: &Array2<bool>) -> Array2<f64> {
    let mut out = x.clone();
    ndarray::Zip::from(&mut out).and(hide).for_each(|v, &h| {
        if h {
            *v = f64::NAN;
        }
    });
    out
}

/// The 5x2 matrix [[4,6],[3,7],[2,8],[1,9],[0,10]]
pub fn two_column_ramp() -> Array2<f64> {
    Array2::from_shape_fn((5, 2), |(i, j)| {
        let step = (i + 1) as f64;
        if j == 0 {
            5.0 - step
        } else {
            5.0 + step
        }
    })
}

pub fn all_non_negative(a: &Array2<f64>) -> bool {
    a.iter().all(|&v| v >= 0.0)
}
