use crate::numerical::SDC::SDC_errors::SDCResult;
use crate::numerical::SDC::SDC_level::RhsValue;
use nalgebra::DVector;

/// Operators of an initial value problem u' = f(u, t) as seen by the sweepers.
///
/// `eval_f` returns `RhsValue::Split` for problems meant to be swept with the IMEX splitting,
/// the implicit part being the one `solve_system` inverts.
pub trait SDCProblem {
    /// number of unknowns of the state vector
    fn nvars(&self) -> usize;

    /// right-hand side at state `u` and time `t`
    fn eval_f(&self, u: &DVector<f64>, t: f64) -> RhsValue;

    /// Returns `u` with `u - factor * f_impl(u, t) = rhs`, starting from the guess `u0`.
    /// Implementations with an iterative inner solver return `SDCError::Convergence` when
    /// it runs out of iterations.
    fn solve_system(
        &self,
        rhs: &DVector<f64>,
        factor: f64,
        u0: &DVector<f64>,
        t: f64,
    ) -> SDCResult<DVector<f64>>;

    /// exact (or reference) solution if the problem knows it
    fn u_exact(&self, _t: f64) -> Option<DVector<f64>> {
        None
    }

    fn name(&self) -> &str {
        "unnamed_problem"
    }
}
