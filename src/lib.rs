//! highlights-bootstrap - one-shot host bootstrap for the highlights pipeline
//!
//! This crate provides the `bootstrap-runner` binary executed once at
//! instance boot. It installs base tooling, acquires the pipeline source,
//! materializes its environment file from the object store, starts the
//! initial container, and registers the recurring cron job, degrading
//! gracefully when any optional piece is missing.

pub mod command;
pub mod config;
pub mod defaults;
pub mod error;
pub mod host;
pub mod logging;
pub mod runner;
pub mod step;
pub mod steps;
pub mod store;
