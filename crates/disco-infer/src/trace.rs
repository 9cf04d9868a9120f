//! Tracing types for solver observability.
//!
//! These types capture step-by-step traces of constraint solving, enabling
//! embedding tools to expose the solver's reasoning process. All tracing is
//! opt-in via `Solver::enable_tracing()` — zero overhead when disabled.

use serde::Serialize;

/// A single step in a solve trace.
#[derive(Debug, Clone, Serialize)]
pub struct SolveStep {
    pub step: usize,
    pub action: SolveAction,
    pub detail: String,
}

/// What action was taken during a solve step.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SolveAction {
    /// Constraint tree flattened into alternatives of simple constraints.
    Decompose,
    /// Universal quantifier opened; bound variables became skolems.
    Skolemize,
    /// Termination guard: subtyping constraints weakly unified.
    WeakUnify,
    /// An equality constraint was unified away.
    UnifyEqual,
    /// A type synonym was replaced by its expansion.
    InlineSynonym,
    /// Constructor-vs-constructor subtyping decomposed by variance.
    DecomposeCon,
    /// A variable with a forced shape was expanded to a constructor skeleton.
    ExpandVar,
    /// Base-vs-base subtyping checked against the lattice.
    CheckBase,
    /// A weakly-connected component collapsed onto its skolem.
    CollapseSkolem,
    /// A strongly-connected component collapsed by unification.
    CollapseScc,
    /// A variable assigned a base type from its bounds.
    AssignBase,
    /// A variable with no bounds assigned its sort's canonical base type.
    DefaultSort,
    /// A residual variable-only component merged onto one representative.
    MergeComponent,
    /// Final substitution checked against the atomic constraints.
    Verify,
    /// An alternative failed; the next one is being tried.
    Backtrack,
}
