use log::debug;

/// Relative-improvement stopping rule shared by both solvers.
///
/// The objective is inspected every `check_every` sweeps. The fit stops as
/// soon as `(previous - current) / previous < tol`, where `previous` is the
/// value from the last inspection. A non-positive `tol` disables early
/// stopping.
#[derive(Debug, Clone)]
pub struct ConvergenceMonitor {
    tol: f64,
    check_every: usize,
    previous: f64,
    converged: bool,
}

impl ConvergenceMonitor {
    pub fn new(tol: f64, check_every: usize, initial_objective: f64) -> Self {
        Self {
            tol,
            check_every: check_every.max(1),
            previous: initial_objective,
            converged: false,
        }
    }

    /// Whether the objective should be evaluated after sweep `n_iter` (1-based)
    pub fn is_check_point(&self, n_iter: usize) -> bool {
        self.tol > 0.0 && n_iter % self.check_every == 0
    }

    /// Record the objective of sweep `n_iter`; true means stop
    pub fn update(&mut self, n_iter: usize, objective: f64) -> bool {
        let previous = self.previous;
        self.previous = objective;
        let stop = if previous == 0.0 {
            true
        } else {
            (previous - objective) / previous.abs() < self.tol
        };
        debug!(
            "Iteration {:>4}: objective {:.6e} (previous {:.6e})",
            n_iter, objective, previous
        );
        self.converged = stop;
        stop
    }

    pub fn converged(&self) -> bool {
        self.converged
    }

    pub fn last_objective(&self) -> f64 {
        self.previous
    }
}
