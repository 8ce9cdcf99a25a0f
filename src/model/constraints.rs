//! Closed set of hard-constraint variants.
//!
//! Each scheduling rule compiles to one of these tagged variants with a
//! fixed typed payload. Variants know whether they structurally apply to a
//! model (`applies_to`) and how to evaluate themselves against a partial
//! assignment (`eval`) - the latter is the ground truth the verifier and
//! the test solver both rely on.

use super::{Assignment, Model, VarId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CmpOp {
    Le,
    Ge,
    Eq,
}

/// Guard of a conditional constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Condition {
    /// A 0/1 variable is 1.
    LitTrue(VarId),
    EqualsConst(VarId, i64),
    VarsEqual(VarId, VarId),
    And(Vec<Condition>),
}

impl Condition {
    /// Three-valued evaluation: `None` when a referenced variable is
    /// unassigned and the outcome is still open.
    pub fn eval(&self, assignment: &Assignment) -> Option<bool> {
        match self {
            Condition::LitTrue(var) => assignment.get(*var).map(|v| v == 1),
            Condition::EqualsConst(var, value) => assignment.get(*var).map(|v| v == *value),
            Condition::VarsEqual(a, b) => match (assignment.get(*a), assignment.get(*b)) {
                (Some(x), Some(y)) => Some(x == y),
                _ => None,
            },
            Condition::And(parts) => {
                let mut open = false;
                for part in parts {
                    match part.eval(assignment) {
                        Some(false) => return Some(false),
                        Some(true) => {}
                        None => open = true,
                    }
                }
                if open {
                    None
                } else {
                    Some(true)
                }
            }
        }
    }

    fn collect_vars(&self, out: &mut Vec<VarId>) {
        match self {
            Condition::LitTrue(v) | Condition::EqualsConst(v, _) => out.push(*v),
            Condition::VarsEqual(a, b) => {
                out.push(*a);
                out.push(*b);
            }
            Condition::And(parts) => {
                for part in parts {
                    part.collect_vars(out);
                }
            }
        }
    }
}

/// One hard constraint of the assembled model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HardConstraint {
    /// The variable vector takes one of the listed value tuples.
    InTuples { vars: Vec<VarId>, tuples: Vec<Vec<i64>> },
    /// The variable vector avoids every listed value tuple.
    NotInTuples { vars: Vec<VarId>, tuples: Vec<Vec<i64>> },
    /// Membership in an explicit value set.
    InSet { var: VarId, values: Vec<i64> },
    /// `Σ coeff * value(var)  op  rhs`.
    Linear {
        terms: Vec<(i64, VarId)>,
        op: CmpOp,
        rhs: i64,
    },
    AllDifferent { vars: Vec<VarId> },
    Equal { a: VarId, b: VarId },
    /// At most one of the listed 0/1 variables is 1.
    AtMostOne { vars: Vec<VarId> },
    /// `cond => then`.
    If {
        cond: Condition,
        then: Box<HardConstraint>,
    },
    /// `lit = 1  <=>  value(var) == value`.
    IffConst { lit: VarId, var: VarId, value: i64 },
    /// `lit = 1  <=>  all listed 0/1 variables are 1`.
    IffAnd { lit: VarId, of: Vec<VarId> },
}

impl HardConstraint {
    pub fn kind(&self) -> &'static str {
        match self {
            HardConstraint::InTuples { .. } => "in_tuples",
            HardConstraint::NotInTuples { .. } => "not_in_tuples",
            HardConstraint::InSet { .. } => "in_set",
            HardConstraint::Linear { .. } => "linear",
            HardConstraint::AllDifferent { .. } => "all_different",
            HardConstraint::Equal { .. } => "equal",
            HardConstraint::AtMostOne { .. } => "at_most_one",
            HardConstraint::If { .. } => "if",
            HardConstraint::IffConst { .. } => "iff_const",
            HardConstraint::IffAnd { .. } => "iff_and",
        }
    }

    /// Every variable the constraint references.
    pub fn vars(&self) -> Vec<VarId> {
        let mut out = Vec::new();
        self.push_vars(&mut out);
        out
    }

    fn push_vars(&self, out: &mut Vec<VarId>) {
        match self {
            HardConstraint::InTuples { vars, .. }
            | HardConstraint::NotInTuples { vars, .. }
            | HardConstraint::AllDifferent { vars }
            | HardConstraint::AtMostOne { vars } => out.extend(vars.iter().copied()),
            HardConstraint::InSet { var, .. } => out.push(*var),
            HardConstraint::Linear { terms, .. } => out.extend(terms.iter().map(|&(_, v)| v)),
            HardConstraint::Equal { a, b } => {
                out.push(*a);
                out.push(*b);
            }
            HardConstraint::If { cond, then } => {
                cond.collect_vars(out);
                then.push_vars(out);
            }
            HardConstraint::IffConst { lit, var, .. } => {
                out.push(*lit);
                out.push(*var);
            }
            HardConstraint::IffAnd { lit, of } => {
                out.push(*lit);
                out.extend(of.iter().copied());
            }
        }
    }

    /// Structural applicability: every referenced variable exists and tuple
    /// arities match their variable vectors.
    pub fn applies_to(&self, model: &Model) -> bool {
        let arity_ok = match self {
            HardConstraint::InTuples { vars, tuples }
            | HardConstraint::NotInTuples { vars, tuples } => {
                tuples.iter().all(|t| t.len() == vars.len())
            }
            HardConstraint::If { then, .. } => then.applies_to(model),
            _ => true,
        };
        arity_ok && self.vars().iter().all(|v| v.0 < model.variables.len())
    }

    /// Three-valued evaluation against a (possibly partial) assignment:
    /// `Some(false)` once violated, `Some(true)` once certainly satisfied,
    /// `None` while undetermined.
    pub fn eval(&self, assignment: &Assignment) -> Option<bool> {
        match self {
            HardConstraint::InTuples { vars, tuples } => {
                let values: Vec<Option<i64>> = vars.iter().map(|&v| assignment.get(v)).collect();
                let possible = tuples.iter().any(|tuple| {
                    tuple
                        .iter()
                        .zip(&values)
                        .all(|(&t, v)| v.map(|x| x == t).unwrap_or(true))
                });
                if !possible {
                    Some(false)
                } else if values.iter().all(|v| v.is_some()) {
                    Some(true)
                } else {
                    None
                }
            }
            HardConstraint::NotInTuples { vars, tuples } => {
                let values: Vec<Option<i64>> = vars.iter().map(|&v| assignment.get(v)).collect();
                if values.iter().any(|v| v.is_none()) {
                    // A fully matching forbidden tuple can only be ruled
                    // out once everything is assigned.
                    return None;
                }
                let hit = tuples.iter().any(|tuple| {
                    tuple
                        .iter()
                        .zip(&values)
                        .all(|(&t, v)| v == &Some(t))
                });
                Some(!hit)
            }
            HardConstraint::InSet { var, values } => {
                assignment.get(*var).map(|v| values.contains(&v))
            }
            HardConstraint::Linear { terms, op, rhs } => {
                let mut total = 0i64;
                for &(coeff, var) in terms {
                    total += coeff * assignment.get(var)?;
                }
                Some(match op {
                    CmpOp::Le => total <= *rhs,
                    CmpOp::Ge => total >= *rhs,
                    CmpOp::Eq => total == *rhs,
                })
            }
            HardConstraint::AllDifferent { vars } => {
                let mut seen = std::collections::BTreeSet::new();
                let mut open = false;
                for &var in vars {
                    match assignment.get(var) {
                        Some(value) => {
                            if !seen.insert(value) {
                                return Some(false);
                            }
                        }
                        None => open = true,
                    }
                }
                if open {
                    None
                } else {
                    Some(true)
                }
            }
            HardConstraint::Equal { a, b } => match (assignment.get(*a), assignment.get(*b)) {
                (Some(x), Some(y)) => Some(x == y),
                _ => None,
            },
            HardConstraint::AtMostOne { vars } => {
                let mut ones = 0;
                let mut open = false;
                for &var in vars {
                    match assignment.get(var) {
                        Some(1) => ones += 1,
                        Some(_) => {}
                        None => open = true,
                    }
                }
                if ones > 1 {
                    Some(false)
                } else if open {
                    None
                } else {
                    Some(true)
                }
            }
            HardConstraint::If { cond, then } => match cond.eval(assignment) {
                Some(false) => Some(true),
                Some(true) => then.eval(assignment),
                None => match then.eval(assignment) {
                    // Consequence already satisfied: the implication holds
                    // whichever way the guard goes.
                    Some(true) => Some(true),
                    _ => None,
                },
            },
            HardConstraint::IffConst { lit, var, value } => {
                match (assignment.get(*lit), assignment.get(*var)) {
                    (Some(l), Some(v)) => Some((l == 1) == (v == *value)),
                    _ => None,
                }
            }
            HardConstraint::IffAnd { lit, of } => {
                let lit_value = assignment.get(*lit);
                let mut all_one = true;
                let mut open = false;
                for &var in of {
                    match assignment.get(var) {
                        Some(1) => {}
                        Some(_) => all_one = false,
                        None => open = true,
                    }
                }
                match lit_value {
                    Some(l) => {
                        if !all_one {
                            // Some conjunct is already 0.
                            Some(l == 0)
                        } else if open {
                            // Conjuncts so far are all 1 but not all assigned.
                            None
                        } else {
                            Some(l == 1)
                        }
                    }
                    None => None,
                }
            }
        }
    }
}
