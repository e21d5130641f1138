//! examples of usage of RustedSDC
/// SDC sweeps and time stepping examples
pub mod sdc_examples;
