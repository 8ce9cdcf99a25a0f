//! Constraint-model construction pipeline for cohort training schedules.
//!
//! The crate turns declarative scheduling rules (cohort availability,
//! exclusions, pinned dates, trainer budgets, grouping options) into a
//! finite-domain constraint model ready for an external solver, and turns
//! the solver's assignment back into a validated schedule.
//!
//! Stages, in order:
//! 1. [`preprocessing::compute_domains`] - reduced legal slot sets per meeting
//! 2. [`preprocessing::compute_grouping_candidates`] - which cohort pairs may share
//! 3. [`preprocessing::compute_conflict_pairs`] - bounded trainer-overlap pairs
//! 4. [`model::assemble`] - variables, hard constraints, weighted objective
//! 5. an external [`solver::Solver`] implementation
//! 6. [`extraction`] - resolved schedule plus independent re-verification
//!
//! [`pipeline::run`] wires the stages together.

pub mod config;
pub mod error;
pub mod extraction;
pub mod model;
pub mod models;
pub mod pipeline;
pub mod preprocessing;
pub mod solver;

#[cfg(test)]
mod testutil;

pub use error::SchedulerError;
pub use pipeline::{run, PipelineOutcome};
