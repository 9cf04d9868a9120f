//! Constraint decomposition.
//!
//! Flattens a constraint tree into disjunctive alternatives, each a sort map
//! plus a list of simple constraints. `And` takes the Cartesian product of
//! its children's alternatives, `Or` concatenates them (dropping children
//! that fail outright), and `All` opens its quantifier by substituting fresh
//! skolems for the bound variables.

use disco_types::{
    Atom, Qualifier, Sort, SortMap, Substitution, TyCon, Type, VarKind, qual_rules,
};

use crate::trace::SolveAction;
use crate::{Constraint, SimpleConstraint, SolveError, Solver};

/// One disjunctive alternative: variable sorts plus simple constraints.
pub type Alternative = (SortMap, Vec<SimpleConstraint>);

impl Solver<'_> {
    /// Decompose a constraint into its alternatives.
    ///
    /// The result is non-empty on success; an error means no alternative can
    /// be formed at all (for `Or`, the first child's error is kept).
    pub(crate) fn decompose(&mut self, c: &Constraint) -> Result<Vec<Alternative>, SolveError> {
        match c {
            Constraint::Sub(s, t) => Ok(vec![(
                SortMap::new(),
                vec![SimpleConstraint::Sub(s.clone(), t.clone())],
            )]),
            Constraint::Eq(s, t) => Ok(vec![(
                SortMap::new(),
                vec![SimpleConstraint::Eq(s.clone(), t.clone())],
            )]),
            Constraint::Qual(q, t) => {
                let sorts = decompose_qual(*q, t)?;
                Ok(vec![(sorts, Vec::new())])
            }
            Constraint::And(children) => {
                let mut alternatives: Vec<Alternative> = vec![(SortMap::new(), Vec::new())];
                for child in children {
                    let child_alts = self.decompose(child)?;
                    let mut next = Vec::with_capacity(alternatives.len() * child_alts.len());
                    for (sorts, constraints) in &alternatives {
                        for (child_sorts, child_constraints) in &child_alts {
                            let mut merged_sorts = sorts.clone();
                            merged_sorts.union_with(child_sorts);
                            let mut merged = constraints.clone();
                            merged.extend(child_constraints.iter().cloned());
                            next.push((merged_sorts, merged));
                        }
                    }
                    alternatives = next;
                }
                Ok(alternatives)
            }
            Constraint::Or(children) => {
                let mut alternatives = Vec::new();
                let mut first_err: Option<SolveError> = None;
                for child in children {
                    match self.decompose(child) {
                        Ok(mut alts) => alternatives.append(&mut alts),
                        Err(err) => {
                            first_err.get_or_insert(err);
                        }
                    }
                }
                if alternatives.is_empty() {
                    Err(first_err.unwrap_or(SolveError::NoUnify))
                } else {
                    Ok(alternatives)
                }
            }
            Constraint::All(vars, body) => {
                let mut skolemize = Substitution::new();
                let mut names = Vec::with_capacity(vars.len());
                for var in vars {
                    let skolem = self.fresh.fresh();
                    names.push(skolem);
                    skolemize.bind(*var, Type::skolem(skolem));
                }
                self.push_step(
                    SolveAction::Skolemize,
                    format!(
                        "opened ∀ over {} variable(s) as {}",
                        vars.len(),
                        names
                            .iter()
                            .map(|v| format!("s{}", v.0))
                            .collect::<Vec<_>>()
                            .join(", ")
                    ),
                );
                let opened = subst_constraint(&skolemize, body);
                self.decompose(&opened)
            }
            Constraint::True => Ok(vec![(SortMap::new(), Vec::new())]),
        }
    }
}

/// What sorts the variables of `ty` must carry for `ty` to satisfy `q`.
///
/// Base types are checked against the qualifier tables; constructed types
/// recurse through `qual_rules`; skolems and synonyms cannot absorb a
/// qualifier here.
pub fn decompose_qual(q: Qualifier, ty: &Type) -> Result<SortMap, SolveError> {
    match ty {
        Type::Atom(Atom::Var(VarKind::Unification, v)) => {
            let mut sorts = SortMap::new();
            sorts.insert_union(*v, Sort::singleton(q));
            Ok(sorts)
        }
        Type::Atom(Atom::Var(VarKind::Skolem, v)) => Err(SolveError::QualSkolem(q, *v)),
        Type::Atom(Atom::Base(b)) => {
            if disco_types::has_qual(*b, q) {
                Ok(SortMap::new())
            } else {
                Err(SolveError::UnqualBase(q, *b))
            }
        }
        Type::Con(TyCon::Def(_), _) => Err(SolveError::Unqual(q, ty.clone())),
        Type::Con(con, args) => {
            let rules = qual_rules(con, q).ok_or_else(|| SolveError::Unqual(q, ty.clone()))?;
            let mut sorts = SortMap::new();
            for (arg, rule) in args.iter().zip(rules) {
                if let Some(arg_qual) = rule {
                    sorts.union_with(&decompose_qual(arg_qual, arg)?);
                }
            }
            Ok(sorts)
        }
    }
}

/// Apply a substitution to every type inside a constraint. `All` binders
/// shadow the substitution within their body.
fn subst_constraint(subst: &Substitution, c: &Constraint) -> Constraint {
    match c {
        Constraint::Sub(s, t) => Constraint::Sub(subst.apply(s), subst.apply(t)),
        Constraint::Eq(s, t) => Constraint::Eq(subst.apply(s), subst.apply(t)),
        Constraint::Qual(q, t) => Constraint::Qual(*q, subst.apply(t)),
        Constraint::And(cs) => {
            Constraint::And(cs.iter().map(|child| subst_constraint(subst, child)).collect())
        }
        Constraint::Or(cs) => {
            Constraint::Or(cs.iter().map(|child| subst_constraint(subst, child)).collect())
        }
        Constraint::All(vars, body) => {
            let mut shadowed = subst.clone();
            for var in vars {
                shadowed.remove(*var);
            }
            Constraint::All(vars.clone(), Box::new(subst_constraint(&shadowed, body)))
        }
        Constraint::True => Constraint::True,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use disco_types::{BaseTy, SynonymRegistry, TyVarId};

    fn v(n: u32) -> Type {
        Type::var(TyVarId(n))
    }

    #[test]
    fn qual_on_variable_records_a_sort() {
        let sorts = decompose_qual(Qualifier::Num, &v(0)).unwrap();
        assert!(sorts.get(TyVarId(0)).contains(Qualifier::Num));
    }

    #[test]
    fn qual_on_base_checks_the_table() {
        assert!(decompose_qual(Qualifier::Num, &Type::base(BaseTy::Nat)).is_ok());
        assert_eq!(
            decompose_qual(Qualifier::Num, &Type::base(BaseTy::Bool)).unwrap_err(),
            SolveError::UnqualBase(Qualifier::Num, BaseTy::Bool)
        );
    }

    #[test]
    fn qual_on_skolem_is_rigid() {
        assert_eq!(
            decompose_qual(Qualifier::Num, &Type::skolem(TyVarId(4))).unwrap_err(),
            SolveError::QualSkolem(Qualifier::Num, TyVarId(4))
        );
    }

    #[test]
    fn qual_recurses_through_constructors() {
        let pair = Type::pair(v(0), v(1));
        let sorts = decompose_qual(Qualifier::Finite, &pair).unwrap();
        assert!(sorts.get(TyVarId(0)).contains(Qualifier::Finite));
        assert!(sorts.get(TyVarId(1)).contains(Qualifier::Finite));

        let arrow = Type::arrow(v(0), v(1));
        assert!(matches!(
            decompose_qual(Qualifier::Num, &arrow).unwrap_err(),
            SolveError::Unqual(Qualifier::Num, _)
        ));
    }

    #[test]
    fn qual_unconstrained_argument_positions() {
        // A list is a container whatever its elements are.
        let sorts = decompose_qual(Qualifier::Container, &Type::list(v(0))).unwrap();
        assert!(sorts.get(TyVarId(0)).is_top());
    }

    #[test]
    fn and_joins_sorts_and_constraints() {
        let defs = SynonymRegistry::new();
        let mut solver = Solver::new(&defs);
        let c = Constraint::and([
            Constraint::Qual(Qualifier::Num, v(0)),
            Constraint::Sub(v(0), Type::base(BaseTy::Int)),
        ]);
        let alts = solver.decompose(&c).unwrap();
        assert_eq!(alts.len(), 1);
        let (sorts, constraints) = &alts[0];
        assert!(sorts.get(TyVarId(0)).contains(Qualifier::Num));
        assert_eq!(constraints.len(), 1);
    }

    #[test]
    fn or_concatenates_alternatives_and_drops_failures() {
        let defs = SynonymRegistry::new();
        let mut solver = Solver::new(&defs);
        let c = Constraint::or([
            Constraint::Qual(Qualifier::Num, Type::base(BaseTy::Bool)),
            Constraint::Eq(v(0), Type::base(BaseTy::Int)),
            Constraint::Eq(v(0), Type::base(BaseTy::Nat)),
        ]);
        let alts = solver.decompose(&c).unwrap();
        assert_eq!(alts.len(), 2);
    }

    #[test]
    fn or_with_all_failures_keeps_the_first_error() {
        let defs = SynonymRegistry::new();
        let mut solver = Solver::new(&defs);
        let c = Constraint::or([
            Constraint::Qual(Qualifier::Num, Type::base(BaseTy::Bool)),
            Constraint::Qual(Qualifier::Bool, Type::base(BaseTy::Nat)),
        ]);
        assert_eq!(
            solver.decompose(&c).unwrap_err(),
            SolveError::UnqualBase(Qualifier::Num, BaseTy::Bool)
        );
    }

    #[test]
    fn and_of_ors_takes_the_product() {
        let defs = SynonymRegistry::new();
        let mut solver = Solver::new(&defs);
        let c = Constraint::and([
            Constraint::or([
                Constraint::Eq(v(0), Type::base(BaseTy::Int)),
                Constraint::Eq(v(0), Type::base(BaseTy::Nat)),
            ]),
            Constraint::or([
                Constraint::Eq(v(1), Type::base(BaseTy::Bool)),
                Constraint::Eq(v(1), Type::base(BaseTy::Unit)),
            ]),
        ]);
        let alts = solver.decompose(&c).unwrap();
        assert_eq!(alts.len(), 4);
    }

    #[test]
    fn all_introduces_fresh_skolems() {
        let defs = SynonymRegistry::new();
        let mut solver = Solver::new(&defs);
        solver.fresh = crate::FreshVars::starting_at(10);
        let c = Constraint::all([TyVarId(0)], Constraint::Sub(v(0), v(1)));
        let alts = solver.decompose(&c).unwrap();
        let (_, constraints) = &alts[0];
        assert_eq!(
            constraints[0],
            SimpleConstraint::Sub(Type::skolem(TyVarId(10)), v(1))
        );
    }

    #[test]
    fn nested_all_binders_shadow() {
        let defs = SynonymRegistry::new();
        let mut solver = Solver::new(&defs);
        solver.fresh = crate::FreshVars::starting_at(10);
        let inner = Constraint::all([TyVarId(0)], Constraint::Sub(v(0), v(1)));
        let outer = Constraint::all([TyVarId(0)], inner);
        let alts = solver.decompose(&outer).unwrap();
        let (_, constraints) = &alts[0];
        // The inner binder wins: the subtype's left side is the inner skolem.
        assert_eq!(
            constraints[0],
            SimpleConstraint::Sub(Type::skolem(TyVarId(11)), v(1))
        );
    }
}
