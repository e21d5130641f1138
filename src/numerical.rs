//! Spectral deferred correction (SDC) sweeps for initial value problems
//!
//! The collocation problem u(t) = u0 + int_t0^t f(u(s), s) ds on one time step is solved
//! iteratively: each sweep moves through the collocation nodes once and solves a small
//! implicit system per node with a lower triangular approximation QΔ of the integration
//! matrix Q. Fully implicit sweeps and IMEX sweeps (implicit stiff part, explicit non-stiff
//! part) are provided, together with a serial time stepping driver.
///  Example
/// ```
/// use RustedSDC::numerical::SDC::SDC_config::SweeperParams;
/// use RustedSDC::numerical::SDC::SDC_problems::TestEquation;
/// use RustedSDC::numerical::SDC::SDC_sweeper::Sweeper;
/// use nalgebra::DVector;
///
/// let sweeper = Sweeper::new(&SweeperParams::default()).unwrap();
/// let u0 = DVector::from_vec(vec![1.0]);
/// let problem = TestEquation::new(-5.0, u0.clone(), 0.0);
/// let mut level = sweeper.new_level(1, 0.01);
/// level.init(u0, 0.0).unwrap();
/// sweeper.predict(&mut level, &problem).unwrap();
/// for _ in 0..5 {
///     sweeper.update_nodes(&mut level, &problem).unwrap();
/// }
/// assert!(sweeper.compute_residual(&mut level).unwrap() < 1e-10);
/// ```
pub mod SDC;
