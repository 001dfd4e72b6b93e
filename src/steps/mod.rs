//! The ordered bootstrap steps
//!
//! Each step is a function from configuration and host state to a
//! `StepOutcome`. Steps never panic and never abort the process themselves;
//! the fatal/non-fatal classification lives in the outcome they return, and
//! the runner decides what to do with it.

pub mod cloud_cli;
pub mod container;
pub mod env_file;
pub mod host_agent;
pub mod packages;
pub mod schedule;
pub mod source;
pub mod workdir;
