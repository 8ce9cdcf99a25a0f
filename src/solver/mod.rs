//! External solver collaboration surface.
//!
//! The pipeline builds a [`Model`](crate::model::Model) and hands it to a
//! [`Solver`] together with a wall-clock budget; everything downstream only
//! depends on the returned [`SolveOutcome`]. Production deployments plug in
//! a CP or MIP backend behind this trait; the integration tests ship a
//! small exhaustive search.

use crate::model::{Assignment, Model};
use std::time::Duration;

/// Resource limits granted to one solve call.
#[derive(Debug, Clone, Copy)]
pub struct SolveBudget {
    pub wall_clock: Duration,
}

impl SolveBudget {
    pub fn new(wall_clock: Duration) -> Self {
        Self { wall_clock }
    }
}

impl Default for SolveBudget {
    fn default() -> Self {
        Self {
            wall_clock: Duration::from_secs(60),
        }
    }
}

/// Terminal status of a solve call.
///
/// `Feasible` carries a complete assignment that satisfies every hard
/// constraint but is not proven optimal (typically a budget-limited stop).
/// `Inconclusive` means the budget ran out before either a solution or an
/// infeasibility proof was found.
#[derive(Debug, Clone)]
pub enum SolveOutcome {
    Optimal(Assignment),
    Feasible(Assignment),
    Infeasible,
    Inconclusive,
}

impl SolveOutcome {
    /// The assignment, when the outcome carries one.
    pub fn assignment(&self) -> Option<&Assignment> {
        match self {
            SolveOutcome::Optimal(a) | SolveOutcome::Feasible(a) => Some(a),
            SolveOutcome::Infeasible | SolveOutcome::Inconclusive => None,
        }
    }

    pub fn is_solution(&self) -> bool {
        self.assignment().is_some()
    }
}

/// A maximizing finite-domain solver.
pub trait Solver {
    fn solve(&self, model: &Model, budget: &SolveBudget) -> SolveOutcome;
}
