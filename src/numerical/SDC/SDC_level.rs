/// State of one time step at one resolution: node values, right-hand side values,
/// tau corrections and the status flags the sweepers and the outer driver communicate through.
use crate::numerical::SDC::SDC_errors::{SDCError, SDCResult};
use crate::numerical::SDC::SDC_sweeper::Splitting;
use log::debug;
use nalgebra::DVector;
use std::fmt::Display;

/// Right-hand side evaluated at one node.
/// `Full` is the whole operator, `Split` separates the stiff (implicit) part from the
/// non-stiff (explicit) part for IMEX sweeps.
#[derive(Debug, Clone, PartialEq)]
pub enum RhsValue {
    Full(DVector<f64>),
    Split {
        implicit: DVector<f64>,
        explicit: DVector<f64>,
    },
}

impl RhsValue {
    pub fn zeros(nvars: usize, splitting: Splitting) -> Self {
        match splitting {
            Splitting::FullyImplicit => RhsValue::Full(DVector::zeros(nvars)),
            Splitting::Imex => RhsValue::Split {
                implicit: DVector::zeros(nvars),
                explicit: DVector::zeros(nvars),
            },
        }
    }

    /// part treated implicitly; for `Full` this is the whole right-hand side
    pub fn implicit_part(&self) -> &DVector<f64> {
        match self {
            RhsValue::Full(f) => f,
            RhsValue::Split { implicit, .. } => implicit,
        }
    }

    /// explicit part, `None` means identically zero
    pub fn explicit_part(&self) -> Option<&DVector<f64>> {
        match self {
            RhsValue::Full(_) => None,
            RhsValue::Split { explicit, .. } => Some(explicit),
        }
    }

    pub fn total(&self) -> DVector<f64> {
        match self {
            RhsValue::Full(f) => f.clone(),
            RhsValue::Split { implicit, explicit } => implicit + explicit,
        }
    }

    pub fn len(&self) -> usize {
        self.implicit_part().len()
    }

    pub fn is_split(&self) -> bool {
        matches!(self, RhsValue::Split { .. })
    }

    pub(crate) fn check_shape(&self, nvars: usize, node: usize) -> SDCResult<()> {
        SDCError::check_len(&format!("f[{}]", node), nvars, self.len())?;
        if let Some(explicit) = self.explicit_part() {
            SDCError::check_len(&format!("f[{}] (explicit part)", node), nvars, explicit.len())?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct LevelStatus {
    /// set once the level holds a starting value; sweeping a locked level is an error
    pub unlocked: bool,
    /// `u`/`f` hold a new iterate the driver has not looked at yet
    pub updated: bool,
    /// `f[0..=M]` are populated
    pub rhs_evaluated: bool,
    /// last residual computed for the current iterate
    pub residual: Option<f64>,
    /// number of sweeps applied since initialization
    pub sweep: usize,
}

#[derive(Debug, Clone)]
pub struct Level {
    pub nvars: usize,
    pub num_nodes: usize,
    pub splitting: Splitting,
    /// start of the step
    pub time: f64,
    pub dt: f64,
    pub u: Vec<DVector<f64>>,
    pub f: Vec<RhsValue>,
    /// tau[m] corrects node m+1
    pub tau: Vec<Option<DVector<f64>>>,
    pub uend: Option<DVector<f64>>,
    pub status: LevelStatus,
}

impl Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Level {{ nvars: {}, num_nodes: {}, splitting: {}, t: {}, dt: {}, unlocked: {}, \
             sweeps: {} }}",
            self.nvars,
            self.num_nodes,
            self.splitting,
            self.time,
            self.dt,
            self.status.unlocked,
            self.status.sweep
        )
    }
}

impl Level {
    /// Creates a locked level with zero-filled values.
    pub fn new(nvars: usize, num_nodes: usize, dt: f64, splitting: Splitting) -> Level {
        Level {
            nvars,
            num_nodes,
            splitting,
            time: 0.0,
            dt,
            u: vec![DVector::zeros(nvars); num_nodes + 1],
            f: vec![RhsValue::zeros(nvars, splitting); num_nodes + 1],
            tau: vec![None; num_nodes],
            uend: None,
            status: LevelStatus::default(),
        }
    }

    /// Sets the initial value and the start time of the step and unlocks the level.
    /// Node values are left as they are; `predict` fills them.
    pub fn init(&mut self, u0: DVector<f64>, t: f64) -> SDCResult<()> {
        SDCError::check_len("initial value u[0]", self.nvars, u0.len())?;
        self.u[0] = u0;
        self.time = t;
        self.uend = None;
        self.status.unlocked = true;
        self.status.updated = false;
        self.status.rhs_evaluated = false;
        self.status.residual = None;
        self.status.sweep = 0;
        debug!("level unlocked at t = {}, dt = {}", t, self.dt);
        Ok(())
    }

    /// Locks the level again, e.g. when the step is discarded on restart.
    pub fn reset(&mut self) {
        self.status = LevelStatus::default();
        self.uend = None;
        self.tau.iter_mut().for_each(|tau| *tau = None);
    }

    pub fn set_tau(&mut self, m: usize, tau: DVector<f64>) -> SDCResult<()> {
        if m >= self.num_nodes {
            return Err(SDCError::Shape {
                what: "tau index (number of nodes)".to_string(),
                expected: self.num_nodes,
                got: m + 1,
            });
        }
        SDCError::check_len(&format!("tau[{}]", m), self.nvars, tau.len())?;
        self.tau[m] = Some(tau);
        Ok(())
    }

    pub fn clear_tau(&mut self) {
        self.tau.iter_mut().for_each(|tau| *tau = None);
    }

    /// time of node m (1-based like `u`) given node offsets in [0, 1]
    pub fn node_time(&self, nodes: &DVector<f64>, m: usize) -> f64 {
        self.time + self.dt * nodes[m - 1]
    }

    /// Checks all stored values against the declared shapes.
    pub fn check_shapes(&self) -> SDCResult<()> {
        SDCError::check_len("u", self.num_nodes + 1, self.u.len())?;
        SDCError::check_len("f", self.num_nodes + 1, self.f.len())?;
        SDCError::check_len("tau", self.num_nodes, self.tau.len())?;
        for (m, u) in self.u.iter().enumerate() {
            SDCError::check_len(&format!("u[{}]", m), self.nvars, u.len())?;
        }
        for (m, f) in self.f.iter().enumerate() {
            f.check_shape(self.nvars, m)?;
        }
        for (m, tau) in self.tau.iter().enumerate() {
            if let Some(tau) = tau {
                SDCError::check_len(&format!("tau[{}]", m), self.nvars, tau.len())?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_level_is_locked() {
        let level = Level::new(2, 3, 0.1, Splitting::FullyImplicit);
        assert!(!level.status.unlocked);
        assert!(!level.status.rhs_evaluated);
        assert_eq!(level.u.len(), 4);
        assert_eq!(level.f.len(), 4);
        assert_eq!(level.tau.len(), 3);
        assert!(level.tau.iter().all(|tau| tau.is_none()));
        assert!(level.check_shapes().is_ok());
    }

    #[test]
    fn test_init_unlocks_and_checks_shape() {
        let mut level = Level::new(2, 3, 0.1, Splitting::Imex);
        assert!(level.init(DVector::from_vec(vec![1.0]), 0.0).is_err());
        assert!(!level.status.unlocked);
        level.init(DVector::from_vec(vec![1.0, 2.0]), 0.5).unwrap();
        assert!(level.status.unlocked);
        assert_eq!(level.time, 0.5);
        assert!(level.f[0].is_split());
        level.reset();
        assert!(!level.status.unlocked);
    }

    #[test]
    fn test_set_tau() {
        let mut level = Level::new(2, 3, 0.1, Splitting::FullyImplicit);
        assert!(level.set_tau(3, DVector::zeros(2)).is_err());
        assert!(level.set_tau(0, DVector::zeros(3)).is_err());
        level.set_tau(2, DVector::from_vec(vec![1.0, 1.0])).unwrap();
        assert!(level.tau[2].is_some());
        level.clear_tau();
        assert!(level.tau[2].is_none());
    }

    #[test]
    fn test_rhs_value_parts() {
        let full = RhsValue::Full(DVector::from_vec(vec![1.0, 2.0]));
        assert!(full.explicit_part().is_none());
        assert_eq!(full.total(), DVector::from_vec(vec![1.0, 2.0]));
        let split = RhsValue::Split {
            implicit: DVector::from_vec(vec![1.0, 2.0]),
            explicit: DVector::from_vec(vec![0.5, 0.5]),
        };
        assert_eq!(split.total(), DVector::from_vec(vec![1.5, 2.5]));
        assert!(split.check_shape(2, 1).is_ok());
        assert!(split.check_shape(3, 1).is_err());
    }
}
