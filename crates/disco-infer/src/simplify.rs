//! The constraint simplifier.
//!
//! Repeatedly picks a simplifiable simple constraint and reduces it:
//! equalities are unified away, synonyms inlined, constructor-vs-constructor
//! subtyping decomposed by variance, variables with a forced shape expanded
//! to constructor skeletons, and base-vs-base subtyping checked against the
//! lattice. A seen-set prevents reprocessing an identical constraint; the
//! weak unifier having succeeded bounds the set of constraints reachable by
//! structural decomposition, so the loop terminates.
//!
//! On completion every surviving constraint is `Atom <: Atom`.

use std::collections::BTreeSet;

use disco_types::{
    Atom, SortMap, Substitution, TyCon, TyVarId, Type, VarKind, Variance, base_subtype,
};

use crate::decompose::decompose_qual;
use crate::trace::SolveAction;
use crate::unify::unify;
use crate::{SimpleConstraint, SolveError, Solver};

/// What simplification leaves behind: the final sort map, the atomic
/// subtype constraints, and the substitution accumulated along the way.
#[derive(Debug, Clone)]
pub struct SimplifyOutcome {
    pub sort_map: SortMap,
    pub atoms: Vec<(Atom, Atom)>,
    pub subst: Substitution,
}

/// The simplifier's mutable workspace, owned for the duration of one
/// alternative and discarded on success or backtrack.
struct Workspace {
    sort_map: SortMap,
    constraints: Vec<SimpleConstraint>,
    subst: Substitution,
    seen: BTreeSet<SimpleConstraint>,
}

fn is_simplifiable(c: &SimpleConstraint) -> bool {
    match c {
        SimpleConstraint::Eq(..) => true,
        SimpleConstraint::Sub(s, t) => match (s, t) {
            (Type::Con(..), _) | (_, Type::Con(..)) => true,
            (Type::Atom(Atom::Base(_)), Type::Atom(Atom::Base(_))) => true,
            // Atomic with a variable on either side: left for the graph.
            _ => false,
        },
    }
}

impl Solver<'_> {
    pub(crate) fn simplify(
        &mut self,
        sort_map: SortMap,
        constraints: Vec<SimpleConstraint>,
    ) -> Result<SimplifyOutcome, SolveError> {
        let mut ws = Workspace {
            sort_map,
            constraints,
            subst: Substitution::new(),
            seen: BTreeSet::new(),
        };

        let mut budget = self.options.max_steps;
        loop {
            let Some(idx) = ws.constraints.iter().position(is_simplifiable) else {
                break;
            };
            if budget == 0 {
                return Err(SolveError::NoUnify);
            }
            budget -= 1;

            let c = ws.constraints.remove(idx);
            if !ws.seen.insert(c.clone()) {
                continue;
            }
            self.simplify_one(&mut ws, c)?;
        }

        let mut atoms = Vec::with_capacity(ws.constraints.len());
        for c in ws.constraints {
            match c {
                SimpleConstraint::Sub(Type::Atom(a), Type::Atom(b)) => atoms.push((a, b)),
                other => unreachable!("non-atomic constraint survived simplification: {other}"),
            }
        }
        Ok(SimplifyOutcome {
            sort_map: ws.sort_map,
            atoms,
            subst: ws.subst,
        })
    }

    fn simplify_one(&mut self, ws: &mut Workspace, c: SimpleConstraint) -> Result<(), SolveError> {
        match c {
            SimpleConstraint::Eq(s, t) => {
                self.push_step(SolveAction::UnifyEqual, format!("{s} = {t}"));
                let su = unify(self.defs, &[(s, t)])?;
                self.extend_subst(ws, su)
            }
            SimpleConstraint::Sub(s, t) => self.simplify_sub(ws, s, t),
        }
    }

    fn simplify_sub(&mut self, ws: &mut Workspace, s: Type, t: Type) -> Result<(), SolveError> {
        match (s, t) {
            // Synonyms inline before anything structural.
            (Type::Con(TyCon::Def(name), _), other) => {
                let expansion = self
                    .defs
                    .resolve(&name)
                    .ok_or_else(|| SolveError::Unknown(name.clone()))?
                    .clone();
                self.push_step(SolveAction::InlineSynonym, format!("{name} ↦ {expansion}"));
                ws.constraints.push(SimpleConstraint::Sub(expansion, other));
                Ok(())
            }
            (other, Type::Con(TyCon::Def(name), _)) => {
                let expansion = self
                    .defs
                    .resolve(&name)
                    .ok_or_else(|| SolveError::Unknown(name.clone()))?
                    .clone();
                self.push_step(SolveAction::InlineSynonym, format!("{name} ↦ {expansion}"));
                ws.constraints.push(SimpleConstraint::Sub(other, expansion));
                Ok(())
            }

            // Same constructor: decompose argument-wise by variance.
            (Type::Con(c1, args1), Type::Con(c2, args2)) => {
                if c1 != c2 || args1.len() != args2.len() {
                    return Err(SolveError::NoUnify);
                }
                self.push_step(SolveAction::DecomposeCon, format!("{c1} by variance"));
                for ((variance, a), b) in c1.arity().into_iter().zip(args1).zip(args2) {
                    let arg_constraint = match variance {
                        Variance::Covariant => SimpleConstraint::Sub(a, b),
                        Variance::Contravariant => SimpleConstraint::Sub(b, a),
                    };
                    ws.constraints.push(arg_constraint);
                }
                Ok(())
            }

            // A variable whose shape is forced by the other side: expand it
            // to a skeleton of fresh variables and revisit.
            (Type::Atom(atom @ Atom::Var(VarKind::Unification, var)), con @ Type::Con(..)) => {
                let su = self.expand_var(var, &con);
                ws.constraints
                    .push(SimpleConstraint::Sub(Type::Atom(atom), con));
                self.extend_subst(ws, su)
            }
            (con @ Type::Con(..), Type::Atom(atom @ Atom::Var(VarKind::Unification, var))) => {
                let su = self.expand_var(var, &con);
                ws.constraints
                    .push(SimpleConstraint::Sub(con, Type::Atom(atom)));
                self.extend_subst(ws, su)
            }

            (Type::Atom(Atom::Base(b1)), Type::Atom(Atom::Base(b2))) => {
                self.push_step(SolveAction::CheckBase, format!("{b1} <: {b2}"));
                if base_subtype(b1, b2) {
                    Ok(())
                } else {
                    Err(SolveError::NoUnify)
                }
            }

            // A base type or skolem can never flow into or out of a
            // constructed shape.
            (Type::Atom(_), Type::Con(..)) | (Type::Con(..), Type::Atom(_)) => {
                Err(SolveError::NoUnify)
            }

            (s, t) => unreachable!("picked a non-simplifiable constraint: {s} <: {t}"),
        }
    }

    /// Bind `var` to a fresh skeleton matching the constructor of `shape`.
    fn expand_var(&mut self, var: TyVarId, shape: &Type) -> Substitution {
        let Type::Con(con, _) = shape else {
            unreachable!("expand_var called with a non-constructor shape");
        };
        let args: Vec<Type> = con.arity().iter().map(|_| Type::var(self.fresh.fresh())).collect();
        let skeleton = Type::Con(con.clone(), args);
        self.push_step(SolveAction::ExpandVar, format!("t{} := {skeleton}", var.0));
        Substitution::singleton(var, skeleton)
    }

    /// Fold a new substitution into the workspace: compose it, rewrite the
    /// remaining constraints, and re-derive sorts for every variable it
    /// eliminates.
    fn extend_subst(&mut self, ws: &mut Workspace, su: Substitution) -> Result<(), SolveError> {
        if su.is_empty() {
            return Ok(());
        }
        ws.subst = su.compose(&ws.subst);
        for c in ws.constraints.iter_mut() {
            *c = c.apply(&su);
        }
        for (var, ty) in su.bindings() {
            if let Some(sort) = ws.sort_map.remove(*var) {
                for q in sort.iter() {
                    let sorts = decompose_qual(q, ty)?;
                    ws.sort_map.union_with(&sorts);
                }
            }
        }
        Ok(())
    }
}
