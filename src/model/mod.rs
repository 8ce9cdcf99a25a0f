//! The assembled finite-domain constraint model.
//!
//! A [`Model`] is the neutral exchange format handed to the external
//! solver: integer variables with explicit finite domains, a closed set of
//! hard-constraint variants, and one maximized linear objective. Nothing
//! in here searches.

pub mod assembler;
pub mod constraints;

#[cfg(test)]
mod assembler_tests;

pub use assembler::{assemble, AssembledModel, MeetingVars};
pub use constraints::{CmpOp, Condition, HardConstraint};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Index of a variable inside its [`Model`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VarId(pub usize);

impl std::fmt::Display for VarId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// An integer variable with an explicit finite domain (allowed values,
/// ascending, deduplicated). An empty domain makes the model infeasible.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variable {
    pub id: VarId,
    pub name: String,
    pub domain: Vec<i64>,
}

/// A complete value assignment returned by the solver.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment(BTreeMap<VarId, i64>);

impl Assignment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: VarId) -> Option<i64> {
        self.0.get(&id).copied()
    }

    pub fn set(&mut self, id: VarId, value: i64) {
        self.0.insert(id, value);
    }

    pub fn unset(&mut self, id: VarId) {
        self.0.remove(&id);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Variables, hard constraints, and a maximized linear objective.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Model {
    pub variables: Vec<Variable>,
    pub constraints: Vec<HardConstraint>,
    /// Maximized: `Σ weight * value(var)`.
    pub objective: Vec<(i64, VarId)>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_var(&mut self, name: impl Into<String>, mut domain: Vec<i64>) -> VarId {
        domain.sort_unstable();
        domain.dedup();
        let id = VarId(self.variables.len());
        self.variables.push(Variable {
            id,
            name: name.into(),
            domain,
        });
        id
    }

    /// A 0/1 variable.
    pub fn new_bool(&mut self, name: impl Into<String>) -> VarId {
        self.new_var(name, vec![0, 1])
    }

    pub fn var(&self, id: VarId) -> &Variable {
        &self.variables[id.0]
    }

    /// Adds a hard constraint. Constraints that do not structurally apply
    /// to this model (dangling variable references) are rejected.
    pub fn add(&mut self, constraint: HardConstraint) {
        debug_assert!(
            constraint.applies_to(self),
            "constraint references unknown variables: {:?}",
            constraint
        );
        self.constraints.push(constraint);
    }

    pub fn add_objective_term(&mut self, weight: i64, var: VarId) {
        if weight != 0 {
            self.objective.push((weight, var));
        }
    }

    /// Objective value of a complete assignment; unassigned terms count 0.
    pub fn objective_value(&self, assignment: &Assignment) -> i64 {
        self.objective
            .iter()
            .map(|&(w, v)| w * assignment.get(v).unwrap_or(0))
            .sum()
    }

    /// True if every hard constraint holds under the assignment. Constraints
    /// touching unassigned variables count as unsatisfied.
    pub fn is_satisfied(&self, assignment: &Assignment) -> bool {
        self.constraints
            .iter()
            .all(|c| c.eval(assignment) == Some(true))
    }
}
