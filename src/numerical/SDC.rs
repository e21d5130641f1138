/// errors of sweepers, collocation and driver
pub mod SDC_errors;
/// node values, right-hand side values and status of one time step
pub mod SDC_level;
/// collocation nodes, weights and integration matrix
pub mod SDC_collocation;
/// triangular approximations of the integration matrix
pub mod SDC_preconditioners;
/// interface of the problems the sweepers act on
pub mod SDC_problem;
/// reference problems
pub mod SDC_problems;
/// fully implicit and IMEX sweeps
pub mod SDC_sweeper;
/// parameters and their TOML representation
pub mod SDC_config;
/// serial time stepping
pub mod SDC_main;
