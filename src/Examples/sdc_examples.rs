#![allow(non_snake_case)]
use crate::numerical::SDC::SDC_config::{SDCConfig, SweeperParams};
use crate::numerical::SDC::SDC_main::SDC;
use crate::numerical::SDC::SDC_preconditioners::QDeltaType;
use crate::numerical::SDC::SDC_problem::SDCProblem;
use crate::numerical::SDC::SDC_problems::{ImexTestEquation, LorenzAttractor, TestEquation};
use crate::numerical::SDC::SDC_sweeper::Sweeper;
use nalgebra::DVector;
use strum::IntoEnumIterator;

pub fn sdc_examples(example: usize) {
    match example {
        0 => {
            // u' = -u on [0, 1] with the default sweeper (3 Radau nodes, LU preconditioner)
            let config = SDCConfig::default();
            let u0 = DVector::from_vec(vec![1.0]);
            let problem = TestEquation::new(-1.0, u0.clone(), 0.0);
            let mut solver = SDC::new(&config, Box::new(problem)).expect("valid configuration");
            solver.set_initial(0.0, 1.0, u0).expect("valid initial value");
            solver.solve().expect("linear problem does not fail");
            let (t, y) = solver.get_result();
            println!("t = {:?}", t.unwrap().as_slice());
            println!("y = {}", y.unwrap());
            println!(
                "error at t = 1: {:.3e}, sweeps: {}",
                (solver.y[0] - (-1.0f64).exp()).abs(),
                solver.statistics.sweeps
            );
        }
        1 => {
            // Lorenz attractor, configuration from TOML
            let input = r#"
                [sweeper]
                num_nodes = 3
                quad_type = "RADAU-RIGHT"
                QI = "LU"
                initial_guess = "spread"

                [level]
                dt = 0.01
                restol = 1e-9

                [step]
                maxiter = 50
            "#;
            let config = SDCConfig::from_toml_str(input).expect("valid configuration");
            let problem = LorenzAttractor::default();
            let u0 = problem.u_exact(0.0).expect("initial value of the Lorenz attractor");
            let mut solver = SDC::new(&config, Box::new(problem)).expect("valid configuration");
            solver.set_log_level(simplelog::LevelFilter::Info);
            solver.set_initial(0.0, 1.0, u0).expect("valid initial value");
            match solver.solve() {
                Ok(()) => println!("Lorenz at t = 1: {:?}", solver.y.as_slice()),
                Err(e) => println!("Lorenz run failed: {}", e),
            }
            println!(
                "steps {}, sweeps {}, status {}",
                solver.statistics.steps,
                solver.statistics.sweeps,
                solver.get_status()
            );
        }
        2 => {
            // residual history of a single Lorenz step for every implicit preconditioner
            let problem = LorenzAttractor::new(10.0, 28.0, 8.0 / 3.0, 1e-12, 99);
            let u0 = DVector::from_vec(vec![1.0, 1.0, 1.0]);
            for QI in QDeltaType::iter().filter(|qd| !qd.is_explicit()) {
                let params = SweeperParams {
                    QI,
                    ..SweeperParams::default()
                };
                let sweeper = Sweeper::new(&params).expect("valid sweeper");
                let mut level = sweeper.new_level(3, 0.05);
                level.init(u0.clone(), 0.0).expect("initial value fits");
                problem.reset_counters();
                sweeper.predict(&mut level, &problem).expect("predict");
                let mut residuals = Vec::new();
                for _ in 0..10 {
                    if let Err(e) = sweeper.update_nodes(&mut level, &problem) {
                        println!("{}: sweep failed: {}", QI, e);
                        break;
                    }
                    residuals.push(sweeper.compute_residual(&mut level).expect("residual"));
                }
                let residuals: Vec<String> =
                    residuals.iter().map(|r| format!("{:.2e}", r)).collect();
                println!(
                    "{:>5}: Newton iterations {:>4}, rhs evaluations {:>4}, residuals [{}]",
                    QI.to_string(),
                    problem.newton_iterations(),
                    problem.rhs_evaluations(),
                    residuals.join(", ")
                );
            }
        }
        3 => {
            // IMEX splitting: stiff decay implicit, slow growth explicit
            let input = r#"
                [sweeper]
                splitting = "imex"
                QI = "LU"
                QE = "EE"

                [level]
                dt = 0.05
                restol = 1e-12
            "#;
            let config = SDCConfig::from_toml_str(input).expect("valid configuration");
            let u0 = DVector::from_vec(vec![1.0, 2.0]);
            let problem = ImexTestEquation::new(-50.0, 1.0, u0.clone(), 0.0);
            let exact = problem.u_exact(0.5).expect("exact solution");
            let mut solver = SDC::new(&config, Box::new(problem)).expect("valid configuration");
            solver.set_initial(0.0, 0.5, u0).expect("valid initial value");
            solver.solve().expect("linear problem does not fail");
            println!(
                "IMEX result {:?}, exact {:?}, sweeps {}",
                solver.y.as_slice(),
                exact.as_slice(),
                solver.statistics.sweeps
            );
        }
        _ => {
            println!("example not found");
        }
    }
}
