use camcal_core::Real;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

/// Generic non-linear least squares problem with dense parameter/residual vectors.
pub trait NllsProblem {
    /// Number of parameters in the optimization vector.
    fn num_params(&self) -> usize;
    /// Number of residual rows in the problem.
    fn num_residuals(&self) -> usize;

    /// Residuals for the current parameters.
    fn residuals(&self, x: &DVector<Real>) -> DVector<Real>;

    /// Jacobian of [`NllsProblem::residuals`].
    ///
    /// The default is a dense central-difference approximation; problems with
    /// block structure should override it.
    fn jacobian(&self, x: &DVector<Real>) -> DMatrix<Real> {
        let mut j = DMatrix::zeros(self.num_residuals(), x.len());
        let mut x_pert = x.clone();
        for k in 0..x.len() {
            let h = fd_step(x[k]);
            x_pert[k] = x[k] + h;
            let r_plus = self.residuals(&x_pert);
            x_pert[k] = x[k] - h;
            let r_minus = self.residuals(&x_pert);
            x_pert[k] = x[k];
            j.set_column(k, &((r_plus - r_minus) / (2.0 * h)));
        }
        j
    }
}

/// Central-difference step scaled to the parameter magnitude.
pub fn fd_step(x: Real) -> Real {
    1e-6 * x.abs().max(1.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolveOptions {
    /// Maximum number of solver iterations before termination.
    ///
    /// The LM backend follows the MINPACK convention and caps function
    /// evaluations at `max_iters * (n + 1)`.
    pub max_iters: usize,
    /// Relative tolerance on the objective (cost) reduction.
    pub ftol: Real,
    /// Orthogonality/gradient tolerance.
    pub gtol: Real,
    /// Relative tolerance on parameter updates.
    pub xtol: Real,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            max_iters: 100,
            ftol: 1e-12,
            gtol: 1e-12,
            xtol: 1e-12,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SolveReport {
    pub evaluations: usize,
    /// Half the sum of squared residuals at the solution.
    pub final_cost: Real,
    pub converged: bool,
    pub termination: String,
}

pub trait NllsSolverBackend {
    fn solve<P: NllsProblem>(
        &self,
        problem: &P,
        x0: DVector<Real>,
        opts: &SolveOptions,
    ) -> (DVector<Real>, SolveReport);
}
