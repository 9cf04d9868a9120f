//! Constraint solving for Disco's type system.
//!
//! This crate implements the inference core: given a constraint tree over
//! Disco's type language it reconstructs principal types under a system
//! combining Hindley-Milner unification with coercive subtyping between
//! numeric base types and qualified polymorphism (sorts of qualifiers such
//! as `num` and `finite`).
//!
//! The pipeline: a constraint tree is decomposed into disjunctive
//! alternatives of simple constraints plus a sort map; each alternative is
//! weakly unified (a termination guard), simplified to atomic subtype
//! constraints, turned into a directed graph on atoms, checked for skolem
//! violations, quotiented by strongly-connected components, and finally
//! solved by assigning sort-respecting base types from each variable's
//! bounds. The first alternative that survives yields the substitution.

pub mod decompose;
pub mod graph;
pub mod simplify;
pub mod solve;
pub mod trace;
pub mod unify;

use std::collections::BTreeSet;
use std::fmt;

use disco_types::{
    BaseTy, Qualifier, SynonymRegistry, TyVarId, Type, all_var_ids, free_unification_vars,
    has_qual,
};

use crate::trace::{SolveAction, SolveStep};

// Re-export for convenience.
pub use disco_diag::{Code, Report, Span};
pub use disco_types::Substitution;

// ---------------------------------------------------------------------------
// The constraint language
// ---------------------------------------------------------------------------

/// A constraint over types, as produced by the typing rules.
///
/// Free variables are unification variables; variables bound by `All` become
/// skolems when the quantifier is opened during decomposition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    /// The left type must be a subtype of the right.
    Sub(Type, Type),
    /// The two types must be equal.
    Eq(Type, Type),
    /// The type must satisfy the qualifier.
    Qual(Qualifier, Type),
    /// All of the children must hold.
    And(Vec<Constraint>),
    /// At least one of the children must hold; tried in order.
    Or(Vec<Constraint>),
    /// Universal quantification over the named variables.
    All(Vec<TyVarId>, Box<Constraint>),
    /// The trivially-true constraint.
    True,
}

impl Constraint {
    pub fn and(children: impl IntoIterator<Item = Constraint>) -> Constraint {
        Constraint::And(children.into_iter().collect())
    }

    pub fn or(children: impl IntoIterator<Item = Constraint>) -> Constraint {
        Constraint::Or(children.into_iter().collect())
    }

    pub fn all(vars: impl IntoIterator<Item = TyVarId>, body: Constraint) -> Constraint {
        Constraint::All(vars.into_iter().collect(), Box::new(body))
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::Sub(s, t) => write!(f, "{s} <: {t}"),
            Constraint::Eq(s, t) => write!(f, "{s} = {t}"),
            Constraint::Qual(q, t) => write!(f, "{q} {t}"),
            Constraint::And(cs) => {
                write!(f, "and(")?;
                for (i, c) in cs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{c}")?;
                }
                write!(f, ")")
            }
            Constraint::Or(cs) => {
                write!(f, "or(")?;
                for (i, c) in cs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{c}")?;
                }
                write!(f, ")")
            }
            Constraint::All(vars, body) => {
                write!(f, "∀")?;
                for (i, v) in vars.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, ". {body}")
            }
            Constraint::True => f.write_str("true"),
        }
    }
}

/// A simple constraint: an equality or a subtyping between two types.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum SimpleConstraint {
    Eq(Type, Type),
    Sub(Type, Type),
}

impl SimpleConstraint {
    /// Apply a substitution to both sides.
    pub fn apply(&self, subst: &Substitution) -> SimpleConstraint {
        match self {
            SimpleConstraint::Eq(s, t) => SimpleConstraint::Eq(subst.apply(s), subst.apply(t)),
            SimpleConstraint::Sub(s, t) => SimpleConstraint::Sub(subst.apply(s), subst.apply(t)),
        }
    }
}

impl fmt::Display for SimpleConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimpleConstraint::Eq(s, t) => write!(f, "{s} = {t}"),
            SimpleConstraint::Sub(s, t) => write!(f, "{s} <: {t}"),
        }
    }
}

/// Free unification variables of a constraint. Variables bound by `All` are
/// not free; they are rigid within their body.
pub fn constraint_free_vars(c: &Constraint) -> BTreeSet<TyVarId> {
    fn go(c: &Constraint, bound: &BTreeSet<TyVarId>, out: &mut BTreeSet<TyVarId>) {
        match c {
            Constraint::Sub(s, t) | Constraint::Eq(s, t) => {
                out.extend(free_unification_vars(s).difference(bound));
                out.extend(free_unification_vars(t).difference(bound));
            }
            Constraint::Qual(_, t) => {
                out.extend(free_unification_vars(t).difference(bound));
            }
            Constraint::And(cs) | Constraint::Or(cs) => {
                for child in cs {
                    go(child, bound, out);
                }
            }
            Constraint::All(vars, body) => {
                let mut inner = bound.clone();
                inner.extend(vars.iter().copied());
                go(body, &inner, out);
            }
            Constraint::True => {}
        }
    }

    let mut out = BTreeSet::new();
    go(c, &BTreeSet::new(), &mut out);
    out
}

/// Every variable id mentioned anywhere in a constraint, binders and skolems
/// included. Used to seed the fresh-name counter.
pub fn constraint_all_var_ids(c: &Constraint) -> BTreeSet<TyVarId> {
    let mut out = BTreeSet::new();
    fn go(c: &Constraint, out: &mut BTreeSet<TyVarId>) {
        match c {
            Constraint::Sub(s, t) | Constraint::Eq(s, t) => {
                out.extend(all_var_ids(s));
                out.extend(all_var_ids(t));
            }
            Constraint::Qual(_, t) => out.extend(all_var_ids(t)),
            Constraint::And(cs) | Constraint::Or(cs) => {
                for child in cs {
                    go(child, out);
                }
            }
            Constraint::All(vars, body) => {
                out.extend(vars.iter().copied());
                go(body, out);
            }
            Constraint::True => {}
        }
    }
    go(c, &mut out);
    out
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why a solve failed. The solver returns exactly one of these; it never
/// prints or logs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SolveError {
    /// Equations or subtyping constraints are unsatisfiable over the base
    /// lattice.
    #[error("constraints have no unifier")]
    NoUnify,
    /// The subtyping problem has no finite solution structure; an infinite
    /// type would be needed.
    #[error("subtyping constraints admit no finite solution")]
    NoWeakUnifier,
    /// A base type does not satisfy a required qualifier.
    #[error("base type `{1}` does not satisfy qualifier `{0}`")]
    UnqualBase(Qualifier, BaseTy),
    /// No rule admits the qualifier for the type's constructor.
    #[error("no type of the shape `{1}` satisfies qualifier `{0}`")]
    Unqual(Qualifier, Type),
    /// A qualifier was required of a skolem variable.
    #[error("qualifier `{}` cannot be imposed on rigid variable `s{}`", .0, .1.0)]
    QualSkolem(Qualifier, TyVarId),
    /// Reference to an undefined type synonym.
    #[error("unknown type synonym `{0}`")]
    Unknown(String),
}

/// Turn a solve failure into a user-facing report. The driver attaches the
/// source span, since the solver never sees source text.
pub fn report(err: &SolveError) -> Report {
    match err {
        SolveError::NoUnify => Report::new(Code::Mismatch, err.to_string()),
        SolveError::NoWeakUnifier => Report::new(Code::Cyclic, err.to_string()),
        SolveError::UnqualBase(q, _) => {
            let mut satisfying = BaseTy::ALL
                .into_iter()
                .filter(|b| has_qual(*b, *q))
                .map(|b| b.as_str());
            let report = Report::new(Code::UnqualifiedBase, err.to_string());
            match satisfying.next() {
                Some(first) => {
                    let rest: Vec<&str> = satisfying.collect();
                    let listed = if rest.is_empty() {
                        first.to_string()
                    } else {
                        format!("{first}, {}", rest.join(", "))
                    };
                    report.note(format!("base types satisfying `{q}`: {listed}"))
                }
                None => report.note(format!("no base type satisfies `{q}`")),
            }
        }
        SolveError::Unqual(..) => Report::new(Code::UnqualifiedShape, err.to_string()),
        SolveError::QualSkolem(..) => Report::new(Code::RigidVariable, err.to_string()),
        SolveError::Unknown(_) => Report::new(Code::UndefinedSynonym, err.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Fresh variable generation
// ---------------------------------------------------------------------------

/// Deterministic fresh-name supply.
///
/// Seeded past every id in the input so generated names never collide with
/// existing ones, and reproducible given the same input.
#[derive(Debug, Clone, Copy)]
pub struct FreshVars {
    next: u32,
}

impl FreshVars {
    pub fn starting_at(next: u32) -> Self {
        Self { next }
    }

    /// Seed one past the largest id mentioned in the constraint.
    pub fn seeded_for(c: &Constraint) -> Self {
        let next = constraint_all_var_ids(c)
            .last()
            .map(|v| v.0 + 1)
            .unwrap_or(0);
        Self { next }
    }

    pub fn fresh(&mut self) -> TyVarId {
        let id = TyVarId(self.next);
        self.next += 1;
        id
    }
}

// ---------------------------------------------------------------------------
// Solver
// ---------------------------------------------------------------------------

/// Tunable limits for a solve.
#[derive(Debug, Clone, Copy)]
pub struct SolveOptions {
    /// Upper bound on rewrite steps per phase. High default guard so a
    /// regression introducing divergence surfaces as a solve failure rather
    /// than a hang.
    pub max_steps: usize,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            max_steps: 1_000_000,
        }
    }
}

/// Solves constraints over the type language.
///
/// Owns the fresh-variable supply and the opt-in solve trace. One `Solver`
/// may run many solves; each `solve` call reseeds the supply from its input
/// so results are reproducible.
pub struct Solver<'d> {
    pub(crate) defs: &'d SynonymRegistry,
    pub(crate) fresh: FreshVars,
    pub(crate) options: SolveOptions,
    tracing: bool,
    steps: Vec<SolveStep>,
}

impl<'d> Solver<'d> {
    pub fn new(defs: &'d SynonymRegistry) -> Self {
        Self::with_options(defs, SolveOptions::default())
    }

    pub fn with_options(defs: &'d SynonymRegistry, options: SolveOptions) -> Self {
        Self {
            defs,
            fresh: FreshVars::starting_at(0),
            options,
            tracing: false,
            steps: Vec::new(),
        }
    }

    /// Enable step-by-step solve tracing for observability tools.
    pub fn enable_tracing(&mut self) {
        self.tracing = true;
    }

    /// Whether solve tracing is currently enabled.
    pub fn is_tracing(&self) -> bool {
        self.tracing
    }

    /// The collected solve trace.
    pub fn trace(&self) -> &[SolveStep] {
        &self.steps
    }

    /// Take and clear the collected trace.
    pub fn take_trace(&mut self) -> Vec<SolveStep> {
        std::mem::take(&mut self.steps)
    }

    pub(crate) fn push_step(&mut self, action: SolveAction, detail: impl Into<String>) {
        if !self.tracing {
            return;
        }
        self.steps.push(SolveStep {
            step: self.steps.len(),
            action,
            detail: detail.into(),
        });
    }
}

/// Solve a constraint against a synonym registry.
///
/// On success the substitution's domain is restricted to the unification
/// variables of `constraint` and the substitution is idempotent. When a
/// variable has both lower and upper base-type bounds the lower bound is
/// chosen, so inferred types prefer the simpler end of the numeric lattice.
pub fn solve(defs: &SynonymRegistry, constraint: &Constraint) -> Result<Substitution, SolveError> {
    Solver::new(defs).solve(constraint)
}
