//! Unification over the type language.
//!
//! Three entry points: [`unify`] computes most general unifiers for type
//! equations, [`weak_unify`] runs the same algorithm with subtyping
//! constraints coerced to equations (used once per alternative as a
//! termination guard; its output is discarded), and [`unify_atoms`]
//! collapses a set of atoms onto a single representative when a
//! strongly-connected component of the constraint graph is quotiented.

use std::collections::{BTreeSet, VecDeque};

use disco_types::{Atom, Substitution, SynonymRegistry, TyCon, TyVarId, Type, VarKind};

use crate::{SimpleConstraint, SolveError};

/// Find the most general unifier of a list of type equations.
///
/// Synonyms are expanded through the registry; skolems unify only with
/// themselves; the occurs check rejects infinite types with `NoUnify`.
pub fn unify(
    defs: &SynonymRegistry,
    equations: &[(Type, Type)],
) -> Result<Substitution, SolveError> {
    solve_equations(defs, equations.iter().cloned().collect())
}

/// Unify while treating every subtyping constraint as an equation.
///
/// Succeeding here proves the subtyping problem is structurally finite, so
/// the simplifier terminates. Failure is reported as `NoWeakUnifier`.
pub fn weak_unify(
    defs: &SynonymRegistry,
    constraints: &[SimpleConstraint],
) -> Result<Substitution, SolveError> {
    let equations = constraints
        .iter()
        .map(|c| match c {
            SimpleConstraint::Eq(s, t) | SimpleConstraint::Sub(s, t) => (s.clone(), t.clone()),
        })
        .collect();
    solve_equations(defs, equations).map_err(|err| match err {
        SolveError::NoUnify => SolveError::NoWeakUnifier,
        other => other,
    })
}

fn solve_equations(
    defs: &SynonymRegistry,
    equations: VecDeque<(Type, Type)>,
) -> Result<Substitution, SolveError> {
    let mut worklist = equations;
    let mut subst = Substitution::new();

    while let Some((left, right)) = worklist.pop_front() {
        let left = subst.apply(&left);
        let right = subst.apply(&right);
        if left == right {
            continue;
        }

        match (&left, &right) {
            // A unification variable on either side: bind it, occurs check
            // first. Skolems fall through to the structural cases and only
            // ever succeed via the equality short-circuit above.
            (Type::Atom(Atom::Var(VarKind::Unification, v)), other)
            | (other, Type::Atom(Atom::Var(VarKind::Unification, v))) => {
                if occurs_in(*v, other) {
                    return Err(SolveError::NoUnify);
                }
                subst = Substitution::singleton(*v, (*other).clone()).compose(&subst);
            }

            // Synonyms expand before structural comparison.
            (Type::Con(TyCon::Def(name), _), other) | (other, Type::Con(TyCon::Def(name), _)) => {
                let expansion = defs
                    .resolve(name)
                    .ok_or_else(|| SolveError::Unknown(name.clone()))?;
                worklist.push_front((expansion.clone(), (*other).clone()));
            }

            (Type::Con(c1, args1), Type::Con(c2, args2))
                if c1 == c2 && args1.len() == args2.len() =>
            {
                for (a, b) in args1.iter().zip(args2.iter()) {
                    worklist.push_back((a.clone(), b.clone()));
                }
            }

            _ => return Err(SolveError::NoUnify),
        }
    }

    Ok(subst)
}

/// Whether `var` occurs (as a unification variable) inside `ty`.
fn occurs_in(var: TyVarId, ty: &Type) -> bool {
    match ty {
        Type::Atom(Atom::Var(VarKind::Unification, v)) => *v == var,
        Type::Atom(_) => false,
        Type::Con(_, args) => args.iter().any(|a| occurs_in(var, a)),
    }
}

/// Unify a set of atoms onto one representative.
///
/// Fails on two distinct base types, or on a skolem mixed with anything
/// else. The representative is the smallest member in atom order (bases
/// before variables), which keeps results deterministic.
pub fn unify_atoms(atoms: &BTreeSet<Atom>) -> Result<(Substitution, Atom), SolveError> {
    let mut bases = BTreeSet::new();
    let mut skolems = BTreeSet::new();
    let mut vars = BTreeSet::new();
    for atom in atoms {
        match atom {
            Atom::Base(b) => {
                bases.insert(*b);
            }
            Atom::Var(VarKind::Skolem, v) => {
                skolems.insert(*v);
            }
            Atom::Var(VarKind::Unification, v) => {
                vars.insert(*v);
            }
        }
    }

    if bases.len() > 1 || skolems.len() > 1 || (!bases.is_empty() && !skolems.is_empty()) {
        return Err(SolveError::NoUnify);
    }

    let canonical = if let Some(b) = bases.first() {
        Atom::Base(*b)
    } else if let Some(sk) = skolems.first() {
        Atom::Var(VarKind::Skolem, *sk)
    } else if let Some(v) = vars.first() {
        Atom::Var(VarKind::Unification, *v)
    } else {
        return Ok((Substitution::new(), Atom::Base(disco_types::BaseTy::Unit)));
    };

    let mut subst = Substitution::new();
    for v in vars {
        if canonical != Atom::Var(VarKind::Unification, v) {
            subst.bind(v, Type::Atom(canonical));
        }
    }
    Ok((subst, canonical))
}

#[cfg(test)]
mod tests {
    use super::*;
    use disco_types::BaseTy;

    fn v(n: u32) -> Type {
        Type::var(TyVarId(n))
    }

    #[test]
    fn unify_binds_variables() {
        let defs = SynonymRegistry::new();
        let subst = unify(&defs, &[(v(0), Type::base(BaseTy::Int))]).unwrap();
        assert_eq!(subst.apply(&v(0)), Type::base(BaseTy::Int));
    }

    #[test]
    fn unify_decomposes_constructors() {
        let defs = SynonymRegistry::new();
        let subst = unify(
            &defs,
            &[(
                Type::arrow(v(0), Type::base(BaseTy::Bool)),
                Type::arrow(Type::base(BaseTy::Nat), v(1)),
            )],
        )
        .unwrap();
        assert_eq!(subst.apply(&v(0)), Type::base(BaseTy::Nat));
        assert_eq!(subst.apply(&v(1)), Type::base(BaseTy::Bool));
    }

    #[test]
    fn unify_occurs_check() {
        let defs = SynonymRegistry::new();
        let err = unify(&defs, &[(v(0), Type::list(v(0)))]).unwrap_err();
        assert_eq!(err, SolveError::NoUnify);
    }

    #[test]
    fn unify_distinct_bases_fail() {
        let defs = SynonymRegistry::new();
        let err = unify(
            &defs,
            &[(Type::base(BaseTy::Nat), Type::base(BaseTy::Int))],
        )
        .unwrap_err();
        assert_eq!(err, SolveError::NoUnify);
    }

    #[test]
    fn unify_skolem_only_with_itself() {
        let defs = SynonymRegistry::new();
        assert!(unify(&defs, &[(Type::skolem(TyVarId(3)), Type::skolem(TyVarId(3)))]).is_ok());
        assert_eq!(
            unify(
                &defs,
                &[(Type::skolem(TyVarId(3)), Type::base(BaseTy::Int))]
            )
            .unwrap_err(),
            SolveError::NoUnify
        );
        assert_eq!(
            unify(
                &defs,
                &[(Type::skolem(TyVarId(3)), Type::skolem(TyVarId(4)))]
            )
            .unwrap_err(),
            SolveError::NoUnify
        );
    }

    #[test]
    fn unify_variable_with_skolem_binds() {
        let defs = SynonymRegistry::new();
        let subst = unify(&defs, &[(v(0), Type::skolem(TyVarId(7)))]).unwrap();
        assert_eq!(subst.apply(&v(0)), Type::skolem(TyVarId(7)));
    }

    #[test]
    fn unify_expands_synonyms() {
        let mut defs = SynonymRegistry::new();
        defs.register(
            "Point",
            Type::pair(Type::base(BaseTy::Int), Type::base(BaseTy::Int)),
        );
        let subst = unify(&defs, &[(Type::def("Point"), Type::pair(v(0), v(1)))]).unwrap();
        assert_eq!(subst.apply(&v(0)), Type::base(BaseTy::Int));
        assert_eq!(subst.apply(&v(1)), Type::base(BaseTy::Int));
    }

    #[test]
    fn unify_unknown_synonym() {
        let defs = SynonymRegistry::new();
        let err = unify(
            &defs,
            &[(Type::def("Vector"), Type::base(BaseTy::Int))],
        )
        .unwrap_err();
        assert_eq!(err, SolveError::Unknown("Vector".into()));
    }

    #[test]
    fn unify_binds_variable_to_unexpanded_synonym() {
        // The variable rule fires before synonym expansion, so an unknown
        // name on the other side of a variable is not an error here.
        let defs = SynonymRegistry::new();
        let subst = unify(&defs, &[(v(0), Type::def("Vector"))]).unwrap();
        assert_eq!(subst.apply(&v(0)), Type::def("Vector"));
    }

    #[test]
    fn weak_unify_coerces_subtyping() {
        let defs = SynonymRegistry::new();
        // v0 <: List(v0) has no finite solution once coerced to an equation.
        let err = weak_unify(
            &defs,
            &[SimpleConstraint::Sub(v(0), Type::list(v(0)))],
        )
        .unwrap_err();
        assert_eq!(err, SolveError::NoWeakUnifier);

        // An ordinary chain weak-unifies fine.
        assert!(
            weak_unify(
                &defs,
                &[
                    SimpleConstraint::Sub(v(0), v(1)),
                    SimpleConstraint::Sub(v(1), Type::base(BaseTy::Int)),
                ]
            )
            .is_ok()
        );
    }

    #[test]
    fn unify_atoms_prefers_base_representative() {
        let atoms = BTreeSet::from([
            Atom::Base(BaseTy::Int),
            Atom::Var(VarKind::Unification, TyVarId(0)),
            Atom::Var(VarKind::Unification, TyVarId(1)),
        ]);
        let (subst, canonical) = unify_atoms(&atoms).unwrap();
        assert_eq!(canonical, Atom::Base(BaseTy::Int));
        assert_eq!(subst.apply(&v(0)), Type::base(BaseTy::Int));
        assert_eq!(subst.apply(&v(1)), Type::base(BaseTy::Int));
    }

    #[test]
    fn unify_atoms_rejects_mixed_bases_and_skolems() {
        let two_bases = BTreeSet::from([Atom::Base(BaseTy::Int), Atom::Base(BaseTy::Nat)]);
        assert_eq!(unify_atoms(&two_bases).unwrap_err(), SolveError::NoUnify);

        let skolem_base = BTreeSet::from([
            Atom::Base(BaseTy::Int),
            Atom::Var(VarKind::Skolem, TyVarId(2)),
        ]);
        assert_eq!(unify_atoms(&skolem_base).unwrap_err(), SolveError::NoUnify);

        let two_skolems = BTreeSet::from([
            Atom::Var(VarKind::Skolem, TyVarId(2)),
            Atom::Var(VarKind::Skolem, TyVarId(3)),
        ]);
        assert_eq!(unify_atoms(&two_skolems).unwrap_err(), SolveError::NoUnify);
    }
}
