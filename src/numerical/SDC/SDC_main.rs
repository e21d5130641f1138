use core::fmt::Display;

/// Serial time stepping with spectral deferred corrections.
/// Every step starts a fresh level at the current time, predicts the node values and sweeps
/// in groups of `nsweeps` until the collocation residual drops below `restol` or `maxiter`
/// groups have been done; the value at the right end of the step starts the next one.
use crate::numerical::SDC::SDC_config::SDCConfig;
use crate::numerical::SDC::SDC_errors::{SDCError, SDCResult};
use crate::numerical::SDC::SDC_level::Level;
use crate::numerical::SDC::SDC_problem::SDCProblem;
use crate::numerical::SDC::SDC_sweeper::Sweeper;
use log::{info, warn};
use nalgebra::{DMatrix, DVector};
use simplelog::*;
use std::fs::File;
use std::time::Instant;
use strum_macros::Display as StrumDisplay;

#[derive(Debug, Clone, Copy, PartialEq, Eq, StrumDisplay)]
pub enum SDCStatus {
    #[strum(serialize = "running")]
    Running,
    #[strum(serialize = "finished")]
    Finished,
    #[strum(serialize = "failed")]
    Failed,
}

/// counters collected over a run
#[derive(Debug, Clone, Default)]
pub struct SDCStatistics {
    pub steps: usize,
    pub sweeps: usize,
    /// steps that ended at maxiter with the residual still above restol
    pub unconverged_steps: usize,
    /// final residual of every step
    pub residuals: Vec<f64>,
}

pub struct SDC {
    pub sweeper: Sweeper,
    pub problem: Box<dyn SDCProblem>,
    pub dt: f64,
    pub restol: f64,
    /// sweeps between two residual checks
    pub nsweeps: usize,
    /// maximum number of residual checks per step
    pub maxiter: usize,
    pub t0: f64,
    pub t_bound: f64,
    pub t: f64,
    pub y: DVector<f64>,
    pub t_result: DVector<f64>,
    pub y_result: DMatrix<f64>,
    pub status: SDCStatus,
    pub message: Option<String>,
    pub statistics: SDCStatistics,
    pub log_level: Option<LevelFilter>,
    pub log_to_file: Option<String>,
    pub log_to_console: bool,
}

impl Display for SDC {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "SDC {{ problem: {}, nodes: {}, splitting: {}, t0: {}, t_bound: {}, t: {}, y: {:?}, \
             status: {} }}",
            self.problem.name(),
            self.sweeper.num_nodes(),
            self.sweeper.splitting,
            self.t0,
            self.t_bound,
            self.t,
            self.y.as_slice(),
            self.status
        )
    }
}

impl SDC {
    pub fn new(config: &SDCConfig, problem: Box<dyn SDCProblem>) -> SDCResult<SDC> {
        config.check()?;
        let sweeper = Sweeper::new(&config.sweeper)?;
        let nvars = problem.nvars();
        Ok(SDC {
            sweeper,
            problem,
            dt: config.level.dt,
            restol: config.level.restol,
            nsweeps: config.level.nsweeps,
            maxiter: config.step.maxiter,
            t0: 0.0,
            t_bound: 0.0,
            t: 0.0,
            y: DVector::zeros(nvars),
            t_result: DVector::zeros(0),
            y_result: DMatrix::zeros(0, 0),
            status: SDCStatus::Running,
            message: None,
            statistics: SDCStatistics::default(),
            log_level: Some(LevelFilter::Warn),
            log_to_file: None,
            log_to_console: true,
        })
    }

    pub fn set_initial(&mut self, t0: f64, t_bound: f64, y0: DVector<f64>) -> SDCResult<()> {
        SDCError::check_len("initial value", self.problem.nvars(), y0.len())?;
        if !(t_bound > t0) {
            return Err(SDCError::Config(format!(
                "t_bound must be greater than t0; got t0 = {}, t_bound = {}",
                t0, t_bound
            )));
        }
        self.t0 = t0;
        self.t_bound = t_bound;
        self.t = t0;
        self.y = y0;
        self.status = SDCStatus::Running;
        self.message = None;
        self.statistics = SDCStatistics::default();
        info!(
            "SDC initialized for {} on [{}, {}] with y0 = {:?}",
            self.problem.name(),
            t0,
            t_bound,
            self.y.as_slice()
        );
        Ok(())
    }

    pub fn _step_impl(&mut self) -> SDCResult<()> {
        let remaining = self.t_bound - self.t;
        let last_step = remaining <= self.dt * (1.0 + 1e-10);
        let dt = if last_step { remaining } else { self.dt };

        let problem = self.problem.as_ref();
        let mut level = self.sweeper.new_level(problem.nvars(), dt);
        level.init(self.y.clone(), self.t)?;
        let swept = self.sweep_level(&mut level, problem);
        let uend = match swept {
            Ok(()) => level.uend.take().ok_or(SDCError::State("compute_end_point"))?,
            Err(e) => {
                level.reset();
                return Err(e);
            }
        };

        let residual = level.status.residual.unwrap_or(f64::INFINITY);
        self.statistics.steps += 1;
        self.statistics.sweeps += level.status.sweep;
        self.statistics.residuals.push(residual);
        if !(residual < self.restol) {
            self.statistics.unconverged_steps += 1;
            warn!(
                "step at t = {} stopped after {} sweeps with residual {:.3e} > restol = {:.3e}",
                self.t, level.status.sweep, residual, self.restol
            );
        }

        self.y = uend;
        self.t = if last_step { self.t_bound } else { self.t + dt };
        info!(
            "step to t = {:.6} done: {} sweeps, residual {:.3e}",
            self.t, level.status.sweep, residual
        );
        Ok(())
    }

    fn sweep_level(&self, level: &mut Level, problem: &dyn SDCProblem) -> SDCResult<()> {
        self.sweeper.predict(level, problem)?;
        for _ in 0..self.maxiter {
            for _ in 0..self.nsweeps {
                self.sweeper.update_nodes(level, problem)?;
            }
            let residual = self.sweeper.compute_residual(level)?;
            if residual < self.restol {
                break;
            }
        }
        self.sweeper.compute_end_point(level)
    }

    /// Advances by one step. A failed step leaves `t` and `y` at the start of the step and
    /// sets the status to `Failed`.
    pub fn step(&mut self) -> SDCResult<()> {
        if self.status != SDCStatus::Running {
            return Ok(());
        }
        if self.t >= self.t_bound {
            self.status = SDCStatus::Finished;
            return Ok(());
        }
        match self._step_impl() {
            Ok(()) => {
                self.message = None;
                if self.t >= self.t_bound {
                    self.status = SDCStatus::Finished;
                }
                Ok(())
            }
            Err(e) => {
                self.status = SDCStatus::Failed;
                self.message = Some(e.to_string());
                Err(e)
            }
        }
    }

    pub fn main_loop(&mut self) -> SDCResult<()> {
        let start = Instant::now();
        info!(
            "Starting SDC main loop with {} nodes, {} splitting",
            self.sweeper.num_nodes(),
            self.sweeper.splitting
        );
        let mut t: Vec<f64> = vec![self.t];
        let mut y: Vec<DVector<f64>> = vec![self.y.clone()];

        let mut outcome = Ok(());
        while self.status == SDCStatus::Running {
            let steps_before = self.statistics.steps;
            if let Err(e) = self.step() {
                warn!("SDC integration failed at t = {:.6}: {}", self.t, e);
                outcome = Err(e);
                break;
            }
            if self.statistics.steps > steps_before {
                t.push(self.t);
                y.push(self.y.clone());
            }
            if self.statistics.steps > 0 && self.statistics.steps % 1000 == 0 {
                let progress = (self.t - self.t0) / (self.t_bound - self.t0) * 100.0;
                info!(
                    "SDC progress: {:.1}% (t = {:.6}/{:.6})",
                    progress, self.t, self.t_bound
                );
            }
        }

        let rows = y.len();
        let cols = self.y.len();
        let mut flat_vec: Vec<f64> = Vec::with_capacity(rows * cols);
        for vector in y.iter() {
            flat_vec.extend(vector.iter());
        }
        // y_result[time_point, variable]
        self.y_result = DMatrix::from_vec(cols, rows, flat_vec).transpose();
        self.t_result = DVector::from_vec(t);

        let duration = start.elapsed();
        let stats = &self.statistics;
        info!("SDC integration completed:");
        info!("  - Time span: [{:.6}, {:.6}]", self.t0, self.t_bound);
        info!("  - Total steps: {}", stats.steps);
        info!("  - Total sweeps: {}", stats.sweeps);
        if stats.steps > 0 {
            info!(
                "  - Average sweeps per step: {:.2}",
                stats.sweeps as f64 / stats.steps as f64
            );
        }
        info!("  - Steps above restol: {}", stats.unconverged_steps);
        info!("  - Final time: {:.6}", self.t);
        info!("  - Integration time: {:.3} seconds", duration.as_secs_f64());
        outcome
    }

    pub fn solve(&mut self) -> SDCResult<()> {
        info!("Initializing SDC solver: {}", self);
        let outcome = self.main_loop();
        match self.status {
            SDCStatus::Finished => {
                info!("SDC solver completed successfully");
                if let Some(exact) = self.problem.u_exact(self.t) {
                    if exact.len() == self.y.len() {
                        let error = (&self.y - exact).amax();
                        info!("  - Error against exact solution: {:.3e}", error);
                    }
                }
            }
            SDCStatus::Failed => match self.message {
                Some(ref msg) => info!("SDC solver failed: {}", msg),
                None => info!("SDC solver failed with unknown error"),
            },
            SDCStatus::Running => info!("SDC solver stopped while running"),
        }
        outcome
    }

    pub fn get_result(&self) -> (Option<DVector<f64>>, Option<DMatrix<f64>>) {
        (Some(self.t_result.clone()), Some(self.y_result.clone()))
    }

    pub fn get_status(&self) -> SDCStatus {
        self.status
    }

    ////////////////////////////////logging functions
    /// Set logging level (Off, Error, Warn, Info, Debug, Trace)
    pub fn set_log_level(&mut self, level: LevelFilter) {
        self.log_level = Some(level);
        self.init_logger();
    }

    pub fn set_log_file(&mut self, filename: String) {
        self.log_to_file = Some(filename);
        self.init_logger();
    }

    pub fn set_console_logging(&mut self, enabled: bool) {
        self.log_to_console = enabled;
        self.init_logger();
    }

    fn init_logger(&self) {
        let level = self.log_level.unwrap_or(LevelFilter::Info);
        let mut loggers: Vec<Box<dyn SharedLogger>> = Vec::new();
        if self.log_to_console {
            loggers.push(TermLogger::new(
                level,
                Config::default(),
                TerminalMode::Mixed,
                ColorChoice::Auto,
            ));
        }
        if let Some(ref filename) = self.log_to_file {
            if let Ok(file) = File::create(filename) {
                loggers.push(WriteLogger::new(level, Config::default(), file));
            }
        }
        // a logger that is already installed stays in place
        if !loggers.is_empty() {
            let _ = CombinedLogger::init(loggers);
        }
    }

    pub fn enable_debug_logging(&mut self) {
        self.set_log_level(LevelFilter::Debug);
    }

    pub fn enable_info_logging(&mut self) {
        self.set_log_level(LevelFilter::Info);
    }

    pub fn disable_logging(&mut self) {
        self.set_log_level(LevelFilter::Off);
    }

    /// Debug level, optionally mirrored to a file
    pub fn enable_verbose_logging(&mut self, log_file: Option<String>) {
        self.set_log_level(LevelFilter::Debug);
        if let Some(filename) = log_file {
            self.set_log_file(filename);
        }
    }
}
