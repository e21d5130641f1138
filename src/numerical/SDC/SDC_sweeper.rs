//! Spectral deferred correction sweeper.
//!
//! One sweep computes the next iterate u^{k+1} at all collocation nodes from
//!
//!   u^{k+1}_m = u_0 + dt sum_j QΔ[m,j] f(u^{k+1}_j) + dt sum_j (Q - QΔ)[m,j] f(u^k_j) + tau_m
//!
//! with a lower triangular QΔ, so node m only needs nodes 1..m of the current sweep and a
//! single implicit solve with prefactor dt*QΔ[m,m]. With the IMEX splitting the stiff part of
//! the right-hand side goes with QI and the non-stiff part with the strictly lower QE, so the
//! explicit part stays out of the implicit solve. A fully implicit sweep fed with split
//! values uses the strictly lower part of QI for the explicit part.
//!
//! The "known" part dt (Q - QΔ) f(u^k) is accumulated from matrices that are subtracted once
//! when the sweeper is built.
use crate::numerical::SDC::SDC_collocation::Collocation;
use crate::numerical::SDC::SDC_config::SweeperParams;
use crate::numerical::SDC::SDC_errors::{SDCError, SDCResult};
use crate::numerical::SDC::SDC_level::{Level, RhsValue};
use crate::numerical::SDC::SDC_preconditioners::{build_qdelta, is_lower_triangular};
use crate::numerical::SDC::SDC_problem::SDCProblem;
use log::{debug, info};
use nalgebra::{DMatrix, DVector};
use strum_macros::{Display, EnumIter, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
pub enum Splitting {
    /// the whole right-hand side goes through the implicit preconditioner
    #[strum(serialize = "implicit")]
    FullyImplicit,
    /// implicit part with QI, explicit part with QE
    #[strum(serialize = "imex")]
    Imex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
pub enum InitialGuess {
    /// copy u[0] to all nodes
    #[strum(serialize = "spread")]
    Spread,
    /// start from zero at all nodes
    #[strum(serialize = "zero")]
    Zero,
}

#[derive(Debug, Clone)]
pub struct Sweeper {
    pub coll: Collocation,
    pub splitting: Splitting,
    pub initial_guess: InitialGuess,
    pub QI: DMatrix<f64>,
    pub QE: DMatrix<f64>,
    // matrix applied to the explicit part of a split right-hand side: QE for IMEX, the
    // strictly lower part of QI otherwise
    QX: DMatrix<f64>,
    Q_minus_QI: DMatrix<f64>,
    Q_minus_QX: DMatrix<f64>,
}

impl Sweeper {
    pub fn new(params: &SweeperParams) -> SDCResult<Sweeper> {
        let coll = Collocation::new(params.num_nodes, params.quad_type)?;
        let QI = build_qdelta(&coll, params.QI)?;
        let QE = build_qdelta(&coll, params.QE)?;
        info!(
            "creating {} sweeper with QI = {}, QE = {}, initial guess = {}",
            params.splitting, params.QI, params.QE, params.initial_guess
        );
        Self::from_parts(coll, params.splitting, QI, QE, params.initial_guess)
    }

    /// Builds a sweeper from an explicit quadrature and preconditioner pair.
    /// `QE` is only used by the IMEX splitting.
    pub fn from_parts(
        coll: Collocation,
        splitting: Splitting,
        QI: DMatrix<f64>,
        QE: DMatrix<f64>,
        initial_guess: InitialGuess,
    ) -> SDCResult<Sweeper> {
        let n = coll.num_nodes + 1;
        check_square("Qmat", &coll.Qmat, n)?;
        check_square("QI", &QI, n)?;
        check_square("QE", &QE, n)?;
        if !is_lower_triangular(&QI, false) {
            return Err(SDCError::Config(
                "implicit preconditioner QI must be lower triangular".to_string(),
            ));
        }
        if splitting == Splitting::Imex && !is_lower_triangular(&QE, true) {
            return Err(SDCError::Config(
                "explicit preconditioner QE must be strictly lower triangular".to_string(),
            ));
        }
        let QX = match splitting {
            Splitting::Imex => QE.clone(),
            Splitting::FullyImplicit => {
                let mut strict = QI.clone();
                strict.fill_diagonal(0.0);
                strict
            }
        };
        let Q_minus_QI = &coll.Qmat - &QI;
        let Q_minus_QX = &coll.Qmat - &QX;
        Ok(Sweeper {
            coll,
            splitting,
            initial_guess,
            QI,
            QE,
            QX,
            Q_minus_QI,
            Q_minus_QX,
        })
    }

    pub fn num_nodes(&self) -> usize {
        self.coll.num_nodes
    }

    /// A locked level sized for this sweeper.
    pub fn new_level(&self, nvars: usize, dt: f64) -> Level {
        Level::new(nvars, self.coll.num_nodes, dt, self.splitting)
    }

    fn check_level(&self, level: &Level) -> SDCResult<()> {
        SDCError::check_len(
            "number of collocation nodes of the level",
            self.coll.num_nodes,
            level.num_nodes,
        )?;
        level.check_shapes()
    }

    fn check_problem<P: SDCProblem + ?Sized>(&self, level: &Level, problem: &P) -> SDCResult<()> {
        self.check_level(level)?;
        SDCError::check_len("problem size", problem.nvars(), level.nvars)
    }

    // dt * sum_{j=1..M} (MI[m,j] f_j.impl + ME[m,j] f_j.expl) for m = 1..M, j increasing
    fn accumulate(&self, level: &Level, MI: &DMatrix<f64>, ME: &DMatrix<f64>) -> Vec<DVector<f64>> {
        let M = self.coll.num_nodes;
        let dt = level.dt;
        (1..=M)
            .map(|m| {
                let mut acc = DVector::zeros(level.nvars);
                for j in 1..=M {
                    let f = &level.f[j];
                    acc.axpy(dt * MI[(m, j)], f.implicit_part(), 1.0);
                    if let Some(explicit) = f.explicit_part() {
                        acc.axpy(dt * ME[(m, j)], explicit, 1.0);
                    }
                }
                acc
            })
            .collect()
    }

    /// Integrates the right-hand side over [t, t + dt*tau_m] for every node m = 1..M using `Q`
    /// (defaults to the collocation matrix). Any matrix of the collocation shape may be passed,
    /// e.g. `Q - QI` for the part of a sweep that is known from the previous iterate.
    pub fn integrate(
        &self,
        level: &Level,
        Q: Option<&DMatrix<f64>>,
    ) -> SDCResult<Vec<DVector<f64>>> {
        let Q = Q.unwrap_or(&self.coll.Qmat);
        self.integrate_split(level, Q, Q)
    }

    /// Same as [`Sweeper::integrate`] with separate matrices for the implicit and the explicit
    /// part of the right-hand side, e.g. `(Q - QI, Q - QE)` for an IMEX sweep.
    pub fn integrate_split(
        &self,
        level: &Level,
        MI: &DMatrix<f64>,
        ME: &DMatrix<f64>,
    ) -> SDCResult<Vec<DVector<f64>>> {
        if !level.status.rhs_evaluated {
            return Err(SDCError::UninitializedRhs);
        }
        self.check_level(level)?;
        let n = self.coll.num_nodes + 1;
        check_square("integration matrix", MI, n)?;
        check_square("explicit integration matrix", ME, n)?;
        Ok(self.accumulate(level, MI, ME))
    }

    /// Fills the nodes with the initial guess and evaluates the right-hand side everywhere.
    pub fn predict<P: SDCProblem + ?Sized>(&self, level: &mut Level, problem: &P) -> SDCResult<()> {
        if !level.status.unlocked {
            return Err(SDCError::State("predict"));
        }
        self.check_problem(level, problem)?;

        level.f[0] = checked_eval(problem, level, 0, level.time)?;
        for m in 1..=self.coll.num_nodes {
            match self.initial_guess {
                InitialGuess::Spread => {
                    level.u[m] = level.u[0].clone();
                    let t_node = level.node_time(&self.coll.nodes, m);
                    level.f[m] = checked_eval(problem, level, m, t_node)?;
                }
                InitialGuess::Zero => {
                    level.u[m] = DVector::zeros(level.nvars);
                    level.f[m] = RhsValue::zeros(level.nvars, level.splitting);
                }
            }
        }
        level.status.rhs_evaluated = true;
        level.status.updated = true;
        level.status.residual = None;
        debug!("predicted initial guess ({}) at t = {}", self.initial_guess, level.time);
        Ok(())
    }

    /// Re-evaluates f at all current node values, e.g. after u was changed from outside.
    pub fn evaluate_rhs<P: SDCProblem + ?Sized>(
        &self,
        level: &mut Level,
        problem: &P,
    ) -> SDCResult<()> {
        if !level.status.unlocked {
            return Err(SDCError::State("evaluate_rhs"));
        }
        self.check_problem(level, problem)?;
        level.f[0] = checked_eval(problem, level, 0, level.time)?;
        for m in 1..=self.coll.num_nodes {
            let t_node = level.node_time(&self.coll.nodes, m);
            level.f[m] = checked_eval(problem, level, m, t_node)?;
        }
        level.status.rhs_evaluated = true;
        Ok(())
    }

    /// One sweep over all collocation nodes, updating `u[1..=M]` and `f[1..=M]` in place.
    ///
    /// Fails with `SDCError::State` on a locked level and with `SDCError::Shape` before
    /// touching any value if the level does not fit this sweeper or the problem. Errors of the
    /// implicit solve are returned as they are; the nodes before the failing one already hold
    /// the new iterate in that case.
    pub fn update_nodes<P: SDCProblem + ?Sized>(
        &self,
        level: &mut Level,
        problem: &P,
    ) -> SDCResult<()> {
        if !level.status.unlocked {
            return Err(SDCError::State("update_nodes"));
        }
        self.check_problem(level, problem)?;
        if !level.status.rhs_evaluated {
            return Err(SDCError::UninitializedRhs);
        }

        let M = self.coll.num_nodes;
        let dt = level.dt;
        let (QI, QX) = (&self.QI, &self.QX);

        // u0 + dt (Q - QI) F_impl(u^k) + dt (Q - QE) F_expl(u^k) + tau
        let mut integral = self.accumulate(level, &self.Q_minus_QI, &self.Q_minus_QX);
        for (m, known) in integral.iter_mut().enumerate() {
            *known += &level.u[0];
            if let Some(tau) = &level.tau[m] {
                *known += tau;
            }
        }

        for (m, mut rhs) in integral.into_iter().enumerate() {
            // new values from the nodes already swept
            for j in 1..=m {
                let f = &level.f[j];
                rhs.axpy(dt * QI[(m + 1, j)], f.implicit_part(), 1.0);
                if let Some(explicit) = f.explicit_part() {
                    rhs.axpy(dt * QX[(m + 1, j)], explicit, 1.0);
                }
            }

            let t_node = level.node_time(&self.coll.nodes, m + 1);
            let factor = dt * QI[(m + 1, m + 1)];
            let u_new = problem.solve_system(&rhs, factor, &level.u[m + 1], t_node)?;
            let what = format!("solution at node {}", m + 1);
            SDCError::check_len(&what, level.nvars, u_new.len())?;
            level.u[m + 1] = u_new;
            level.f[m + 1] = checked_eval(problem, level, m + 1, t_node)?;
        }

        level.status.updated = true;
        level.status.residual = None;
        level.status.sweep += 1;
        debug!(
            "sweep {} done at t = {}, u[M] = {:?}",
            level.status.sweep,
            level.time,
            level.u[M].as_slice()
        );
        Ok(())
    }

    /// Maximum norm of u0 + dt Q F(u) + tau - u over all nodes, stored in the level status.
    pub fn compute_residual(&self, level: &mut Level) -> SDCResult<f64> {
        let integral = self.integrate(level, None)?;
        let mut res_norm: f64 = 0.0;
        for (m, int) in integral.iter().enumerate() {
            let mut res = &level.u[0] + int;
            if let Some(tau) = &level.tau[m] {
                res += tau;
            }
            res -= &level.u[m + 1];
            res_norm = res_norm.max(res.amax());
        }
        level.status.residual = Some(res_norm);
        level.status.updated = false;
        debug!("residual after sweep {}: {:.3e}", level.status.sweep, res_norm);
        Ok(res_norm)
    }

    /// Value at the right end of the step: the last node if it sits there, otherwise the full
    /// quadrature of the right-hand side.
    pub fn compute_end_point(&self, level: &mut Level) -> SDCResult<()> {
        if !level.status.unlocked {
            return Err(SDCError::State("compute_end_point"));
        }
        self.check_level(level)?;
        let M = self.coll.num_nodes;
        let uend = if self.coll.right_is_node {
            level.u[M].clone()
        } else {
            if !level.status.rhs_evaluated {
                return Err(SDCError::UninitializedRhs);
            }
            let mut uend = level.u[0].clone();
            for (j, f) in level.f[1..=M].iter().enumerate() {
                let w = level.dt * self.coll.weights[j];
                uend.axpy(w, f.implicit_part(), 1.0);
                if let Some(explicit) = f.explicit_part() {
                    uend.axpy(w, explicit, 1.0);
                }
            }
            if let Some(tau) = &level.tau[M - 1] {
                uend += tau;
            }
            uend
        };
        level.uend = Some(uend);
        Ok(())
    }
}

// f at u[m], rejected before it is stored if its shape does not fit the level
fn checked_eval<P: SDCProblem + ?Sized>(
    problem: &P,
    level: &Level,
    m: usize,
    t: f64,
) -> SDCResult<RhsValue> {
    let f = problem.eval_f(&level.u[m], t);
    f.check_shape(level.nvars, m)?;
    Ok(f)
}

fn check_square(what: &str, mat: &DMatrix<f64>, n: usize) -> SDCResult<()> {
    SDCError::check_len(&format!("{} rows", what), n, mat.nrows())?;
    SDCError::check_len(&format!("{} columns", what), n, mat.ncols())
}
