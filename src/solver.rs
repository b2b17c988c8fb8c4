//! Integer-constraint solver backing pin assignment
//!
//! The assignment pass submits a problem over integer variables (domain
//! enumerations, equalities, implications, distinctness) and receives a
//! model or UNSAT. The implementation is a complete finite-domain search:
//! a variable's domain is every constant it is equated with anywhere in the
//! problem, closed over variable-variable equalities, and the search walks
//! variables in declaration order with three-valued constraint propagation.
//! Identical problems always produce identical models, which keeps compile
//! output reproducible without solver seeds or external processes.

use std::collections::BTreeSet;

/// Handle to an integer variable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Var(usize);

/// A constraint over integer variables
#[derive(Debug, Clone)]
pub enum Constraint {
    /// `var == constant`
    EqConst(Var, i64),
    /// `a == b`
    EqVar(Var, Var),
    /// All of the inner constraints hold
    And(Vec<Constraint>),
    /// At least one inner constraint holds
    Or(Vec<Constraint>),
    /// The antecedent forces the consequent
    Implies(Box<Constraint>, Box<Constraint>),
    /// All variables take pairwise different values
    Distinct(Vec<Var>),
}

impl Constraint {
    pub fn implies(antecedent: Constraint, consequent: Constraint) -> Constraint {
        Constraint::Implies(Box::new(antecedent), Box::new(consequent))
    }
}

/// A satisfying assignment, indexed by [`Var`]
#[derive(Debug, Clone)]
pub struct Model {
    values: Vec<i64>,
}

impl Model {
    pub fn value(&self, var: Var) -> i64 {
        self.values[var.0]
    }
}

/// Outcome of a [`Solver::check`]
#[derive(Debug, Clone)]
pub enum Satisfiability {
    Sat(Model),
    Unsat,
}

/// A constraint problem under construction
#[derive(Debug, Default)]
pub struct Solver {
    names: Vec<String>,
    constraints: Vec<Constraint>,
}

impl Solver {
    pub fn new() -> Self {
        Solver::default()
    }

    /// Declare an integer variable; the name only aids debugging
    pub fn int_var(&mut self, name: impl Into<String>) -> Var {
        self.names.push(name.into());
        Var(self.names.len() - 1)
    }

    pub fn add(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
    }

    /// Decide the conjunction of all added constraints
    pub fn check(&self) -> Satisfiability {
        let domains = self.domains();
        let mut values: Vec<Option<i64>> = vec![None; self.names.len()];
        if self.search(0, &domains, &mut values) {
            let values = values
                .into_iter()
                .map(|v| v.unwrap_or(0))
                .collect::<Vec<_>>();
            Satisfiability::Sat(Model { values })
        } else {
            Satisfiability::Unsat
        }
    }

    /// Candidate values per variable: constants it is equated with anywhere,
    /// closed over variable equalities
    fn domains(&self) -> Vec<Vec<i64>> {
        let mut sets: Vec<BTreeSet<i64>> = vec![BTreeSet::new(); self.names.len()];
        let mut equalities: Vec<(usize, usize)> = Vec::new();
        for constraint in &self.constraints {
            collect_domain(constraint, &mut sets, &mut equalities);
        }

        let mut changed = true;
        while changed {
            changed = false;
            for &(a, b) in &equalities {
                let union: BTreeSet<i64> = sets[a].union(&sets[b]).copied().collect();
                if union.len() > sets[a].len() {
                    sets[a] = union.clone();
                    changed = true;
                }
                if union.len() > sets[b].len() {
                    sets[b] = union;
                    changed = true;
                }
            }
        }

        sets.into_iter()
            .map(|set| {
                if set.is_empty() {
                    // Unconstrained by any constant; a single placeholder
                    // value keeps the search finite.
                    vec![0]
                } else {
                    set.into_iter().collect()
                }
            })
            .collect()
    }

    fn search(&self, var: usize, domains: &[Vec<i64>], values: &mut Vec<Option<i64>>) -> bool {
        if var == values.len() {
            return self
                .constraints
                .iter()
                .all(|c| eval(c, values) == Some(true));
        }
        for &candidate in &domains[var] {
            values[var] = Some(candidate);
            let contradiction = self
                .constraints
                .iter()
                .any(|c| eval(c, values) == Some(false));
            if !contradiction && self.search(var + 1, domains, values) {
                return true;
            }
        }
        values[var] = None;
        false
    }
}

fn collect_domain(
    constraint: &Constraint,
    sets: &mut [BTreeSet<i64>],
    equalities: &mut Vec<(usize, usize)>,
) {
    match constraint {
        Constraint::EqConst(var, value) => {
            sets[var.0].insert(*value);
        }
        Constraint::EqVar(a, b) => equalities.push((a.0, b.0)),
        Constraint::And(inner) | Constraint::Or(inner) => {
            for c in inner {
                collect_domain(c, sets, equalities);
            }
        }
        Constraint::Implies(a, b) => {
            collect_domain(a, sets, equalities);
            collect_domain(b, sets, equalities);
        }
        Constraint::Distinct(_) => {}
    }
}

/// Three-valued evaluation under a partial assignment
fn eval(constraint: &Constraint, values: &[Option<i64>]) -> Option<bool> {
    match constraint {
        Constraint::EqConst(var, value) => values[var.0].map(|v| v == *value),
        Constraint::EqVar(a, b) => match (values[a.0], values[b.0]) {
            (Some(a), Some(b)) => Some(a == b),
            _ => None,
        },
        Constraint::And(inner) => {
            let mut all_true = true;
            for c in inner {
                match eval(c, values) {
                    Some(false) => return Some(false),
                    Some(true) => {}
                    None => all_true = false,
                }
            }
            if all_true {
                Some(true)
            } else {
                None
            }
        }
        Constraint::Or(inner) => {
            let mut all_false = true;
            for c in inner {
                match eval(c, values) {
                    Some(true) => return Some(true),
                    Some(false) => {}
                    None => all_false = false,
                }
            }
            if all_false {
                Some(false)
            } else {
                None
            }
        }
        Constraint::Implies(a, b) => match eval(a, values) {
            Some(false) => Some(true),
            Some(true) => eval(b, values),
            None => match eval(b, values) {
                Some(true) => Some(true),
                _ => None,
            },
        },
        Constraint::Distinct(vars) => {
            let mut seen = BTreeSet::new();
            let mut complete = true;
            for var in vars {
                match values[var.0] {
                    Some(v) => {
                        if !seen.insert(v) {
                            return Some(false);
                        }
                    }
                    None => complete = false,
                }
            }
            if complete {
                Some(true)
            } else {
                None
            }
        }
    }
}
