//! Error type shared by the SDC sweepers, the collocation builder and the driver.
//!
//! All variants derive [`thiserror::Error`]. A `State` error means a sweep was requested on
//! a level that was never initialized, which is a programming error in the caller and should
//! not be retried. `Convergence` comes from a problem's implicit solver and is passed upward
//! untouched, the step-size policy belongs to whoever drives the sweeps.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SDCError {
    /// operation requested on a locked (uninitialized) level
    #[error("level is locked: {0} requires a level initialized with a starting value")]
    State(&'static str),

    /// matrix or container dimensions disagree with node count or problem size
    #[error("shape mismatch in {what}: expected {expected}, got {got}")]
    Shape {
        what: String,
        expected: usize,
        got: usize,
    },

    /// right-hand side has not been evaluated on this level yet
    #[error("right-hand side values are not populated; call predict or evaluate_rhs first")]
    UninitializedRhs,

    /// implicit solve of the problem did not converge
    #[error(
        "implicit solve did not converge at t = {t} after {iterations} iterations \
         (residual = {residual:.3e})"
    )]
    Convergence {
        t: f64,
        iterations: usize,
        residual: f64,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("quadrature error: {0}")]
    Quadrature(String),
}

pub type SDCResult<T> = Result<T, SDCError>;

impl SDCError {
    pub(crate) fn check_len(what: &str, expected: usize, got: usize) -> SDCResult<()> {
        (expected == got).then_some(()).ok_or_else(|| SDCError::Shape {
            what: what.to_string(),
            expected,
            got,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_len() {
        assert!(SDCError::check_len("u", 3, 3).is_ok());
        let err = SDCError::check_len("u", 3, 4).unwrap_err();
        assert!(matches!(err, SDCError::Shape { expected: 3, got: 4, .. }));
        assert!(err.to_string().contains("shape mismatch in u"));
    }

    #[test]
    fn test_convergence_message() {
        let err = SDCError::Convergence {
            t: 0.5,
            iterations: 10,
            residual: 1e-3,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("t = 0.5"));
        assert!(msg.contains("10 iterations"));
    }
}
