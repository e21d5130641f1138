/// Reference problems used by the tests, examples and benchmarks.
use crate::numerical::SDC::SDC_errors::{SDCError, SDCResult};
use crate::numerical::SDC::SDC_level::RhsValue;
use crate::numerical::SDC::SDC_problem::SDCProblem;
use log::debug;
use nalgebra::{DMatrix, DVector};
use std::cell::Cell;

/// largest RK4 step of the Lorenz reference solution
const REFERENCE_STEP: f64 = 1e-4;

/// Dahlquist test equation u' = lambda * u, applied componentwise.
#[derive(Debug, Clone)]
pub struct TestEquation {
    pub lambda: f64,
    pub u0: DVector<f64>,
    pub t0: f64,
}

impl TestEquation {
    pub fn new(lambda: f64, u0: DVector<f64>, t0: f64) -> TestEquation {
        TestEquation { lambda, u0, t0 }
    }
}

impl SDCProblem for TestEquation {
    fn nvars(&self) -> usize {
        self.u0.len()
    }

    fn eval_f(&self, u: &DVector<f64>, _t: f64) -> RhsValue {
        RhsValue::Full(self.lambda * u)
    }

    fn solve_system(
        &self,
        rhs: &DVector<f64>,
        factor: f64,
        _u0: &DVector<f64>,
        _t: f64,
    ) -> SDCResult<DVector<f64>> {
        Ok(rhs / (1.0 - factor * self.lambda))
    }

    fn u_exact(&self, t: f64) -> Option<DVector<f64>> {
        Some(&self.u0 * (self.lambda * (t - self.t0)).exp())
    }

    fn name(&self) -> &str {
        "test_equation"
    }
}

/// u' = lambda_impl * u + lambda_expl * u with the first term treated implicitly.
#[derive(Debug, Clone)]
pub struct ImexTestEquation {
    pub lambda_impl: f64,
    pub lambda_expl: f64,
    pub u0: DVector<f64>,
    pub t0: f64,
}

impl ImexTestEquation {
    pub fn new(lambda_impl: f64, lambda_expl: f64, u0: DVector<f64>, t0: f64) -> ImexTestEquation {
        ImexTestEquation {
            lambda_impl,
            lambda_expl,
            u0,
            t0,
        }
    }
}

impl SDCProblem for ImexTestEquation {
    fn nvars(&self) -> usize {
        self.u0.len()
    }

    fn eval_f(&self, u: &DVector<f64>, _t: f64) -> RhsValue {
        RhsValue::Split {
            implicit: self.lambda_impl * u,
            explicit: self.lambda_expl * u,
        }
    }

    fn solve_system(
        &self,
        rhs: &DVector<f64>,
        factor: f64,
        _u0: &DVector<f64>,
        _t: f64,
    ) -> SDCResult<DVector<f64>> {
        Ok(rhs / (1.0 - factor * self.lambda_impl))
    }

    fn u_exact(&self, t: f64) -> Option<DVector<f64>> {
        let lambda = self.lambda_impl + self.lambda_expl;
        Some(&self.u0 * (lambda * (t - self.t0)).exp())
    }

    fn name(&self) -> &str {
        "imex_test_equation"
    }
}

/// u' = p(t) for a polynomial p with coefficients in increasing order, the same for all
/// components. The right-hand side does not depend on u.
#[derive(Debug, Clone)]
pub struct PolynomialForcing {
    pub coeffs: Vec<f64>,
    pub u0: DVector<f64>,
    pub t0: f64,
}

impl PolynomialForcing {
    pub fn new(coeffs: Vec<f64>, u0: DVector<f64>, t0: f64) -> PolynomialForcing {
        PolynomialForcing { coeffs, u0, t0 }
    }

    pub fn p(&self, t: f64) -> f64 {
        self.coeffs.iter().rev().fold(0.0, |acc, c| acc * t + c)
    }

    /// antiderivative of p vanishing at 0
    pub fn antiderivative(&self, t: f64) -> f64 {
        self.coeffs
            .iter()
            .enumerate()
            .rev()
            .fold(0.0, |acc, (k, c)| acc * t + c / (k as f64 + 1.0))
            * t
    }
}

impl SDCProblem for PolynomialForcing {
    fn nvars(&self) -> usize {
        self.u0.len()
    }

    fn eval_f(&self, u: &DVector<f64>, t: f64) -> RhsValue {
        RhsValue::Full(DVector::from_element(u.len(), self.p(t)))
    }

    fn solve_system(
        &self,
        rhs: &DVector<f64>,
        factor: f64,
        _u0: &DVector<f64>,
        t: f64,
    ) -> SDCResult<DVector<f64>> {
        Ok(rhs.add_scalar(factor * self.p(t)))
    }

    fn u_exact(&self, t: f64) -> Option<DVector<f64>> {
        Some(self.u0.add_scalar(self.antiderivative(t) - self.antiderivative(self.t0)))
    }

    fn name(&self) -> &str {
        "polynomial_forcing"
    }
}

/// Lorenz attractor
///   x' = sigma (y - x)
///   y' = rho x - y - x z
///   z' = x y - beta z
/// with a Newton solver for the implicit stage equations.
#[derive(Debug, Clone)]
pub struct LorenzAttractor {
    pub sigma: f64,
    pub rho: f64,
    pub beta: f64,
    pub newton_tol: f64,
    pub newton_maxiter: usize,
    newton_iterations: Cell<usize>,
    rhs_evaluations: Cell<usize>,
}

impl Default for LorenzAttractor {
    fn default() -> Self {
        LorenzAttractor::new(10.0, 28.0, 8.0 / 3.0, 1e-9, 99)
    }
}

impl LorenzAttractor {
    pub fn new(
        sigma: f64,
        rho: f64,
        beta: f64,
        newton_tol: f64,
        newton_maxiter: usize,
    ) -> LorenzAttractor {
        LorenzAttractor {
            sigma,
            rho,
            beta,
            newton_tol,
            newton_maxiter,
            newton_iterations: Cell::new(0),
            rhs_evaluations: Cell::new(0),
        }
    }

    fn rhs(&self, u: &DVector<f64>) -> DVector<f64> {
        DVector::from_vec(vec![
            self.sigma * (u[1] - u[0]),
            self.rho * u[0] - u[1] - u[0] * u[2],
            u[0] * u[1] - self.beta * u[2],
        ])
    }

    fn jacobian(&self, u: &DVector<f64>) -> DMatrix<f64> {
        DMatrix::from_row_slice(
            3,
            3,
            &[
                -self.sigma,
                self.sigma,
                0.0,
                self.rho - u[2],
                -1.0,
                -u[0],
                u[1],
                u[0],
                -self.beta,
            ],
        )
    }

    pub fn newton_iterations(&self) -> usize {
        self.newton_iterations.get()
    }

    pub fn rhs_evaluations(&self) -> usize {
        self.rhs_evaluations.get()
    }

    pub fn reset_counters(&self) {
        self.newton_iterations.set(0);
        self.rhs_evaluations.set(0);
    }

    /// Classical Runge-Kutta 4 from (t0, u0) to t_end with steps of at most `REFERENCE_STEP`.
    /// Does not touch the work counters.
    pub fn reference_solution(&self, u0: &DVector<f64>, t0: f64, t_end: f64) -> DVector<f64> {
        let n = ((t_end - t0).abs() / REFERENCE_STEP).ceil().max(1.0) as usize;
        let h = (t_end - t0) / n as f64;
        let mut y = u0.clone();
        for _ in 0..n {
            let k1 = self.rhs(&y);
            let k2 = self.rhs(&(&y + (h / 2.0) * &k1));
            let k3 = self.rhs(&(&y + (h / 2.0) * &k2));
            let k4 = self.rhs(&(&y + h * &k3));
            y += (h / 6.0) * (k1 + 2.0 * k2 + 2.0 * k3 + k4);
        }
        y
    }
}

impl SDCProblem for LorenzAttractor {
    fn nvars(&self) -> usize {
        3
    }

    fn eval_f(&self, u: &DVector<f64>, _t: f64) -> RhsValue {
        self.rhs_evaluations.set(self.rhs_evaluations.get() + 1);
        RhsValue::Full(self.rhs(u))
    }

    fn solve_system(
        &self,
        rhs: &DVector<f64>,
        factor: f64,
        u0: &DVector<f64>,
        t: f64,
    ) -> SDCResult<DVector<f64>> {
        let mut u = u0.clone();
        let mut res = f64::INFINITY;
        for n in 0..self.newton_maxiter {
            // G(u) = u - factor f(u) - rhs vanishes at the solution
            let G = &u - factor * self.rhs(&u) - rhs;
            res = G.amax();
            if res <= self.newton_tol {
                debug!("Lorenz Newton converged after {} iterations at t = {}", n, t);
                return Ok(u);
            }
            if res.is_nan() {
                break;
            }
            let J = DMatrix::identity(3, 3) - factor * self.jacobian(&u);
            let delta = J.lu().solve(&G).ok_or(SDCError::Convergence {
                t,
                iterations: n,
                residual: res,
            })?;
            u -= delta;
            self.newton_iterations.set(self.newton_iterations.get() + 1);
        }
        let G = &u - factor * self.rhs(&u) - rhs;
        if G.amax() <= self.newton_tol {
            return Ok(u);
        }
        if !res.is_nan() {
            res = G.amax();
        }
        Err(SDCError::Convergence {
            t,
            iterations: self.newton_maxiter,
            residual: res,
        })
    }

    /// u(0) = (1, 1, 1); later times come from a fine RK4 run
    fn u_exact(&self, t: f64) -> Option<DVector<f64>> {
        if !t.is_finite() {
            return None;
        }
        let u0 = DVector::from_element(3, 1.0);
        if t == 0.0 {
            return Some(u0);
        }
        Some(self.reference_solution(&u0, 0.0, t))
    }

    fn name(&self) -> &str {
        "lorenz_attractor"
    }
}
