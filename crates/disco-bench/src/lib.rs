//! Fixture builders for solver benchmarks.
//!
//! Kept in the library so benchmark workloads stay reproducible and can be
//! sanity-checked by tests.

use disco_infer::Constraint;
use disco_types::{BaseTy, Qualifier, TyVarId, Type};

/// `v0 <: v1 <: … <: v_len <: Int`: a long promotion chain that exercises
/// the relation map's cascade of base assignments.
pub fn chain_constraint(len: u32) -> Constraint {
    let mut children: Vec<Constraint> = (0..len)
        .map(|i| Constraint::Sub(Type::var(TyVarId(i)), Type::var(TyVarId(i + 1))))
        .collect();
    children.push(Constraint::Sub(
        Type::var(TyVarId(len)),
        Type::base(BaseTy::Int),
    ));
    Constraint::and(children)
}

/// An `Or` whose first `width - 1` branches fail, forcing the solver to
/// backtrack all the way to the final branch.
pub fn backtracking_constraint(width: u32) -> Constraint {
    let mut children: Vec<Constraint> = (0..width.saturating_sub(1))
        .map(|_| Constraint::Sub(Type::base(BaseTy::Int), Type::base(BaseTy::Nat)))
        .collect();
    children.push(Constraint::Eq(
        Type::var(TyVarId(0)),
        Type::base(BaseTy::Rat),
    ));
    Constraint::or(children)
}

/// A pair tower of variables forced against a pair tower of base types:
/// exercises shape expansion and variance decomposition.
pub fn tower_constraint(depth: u32) -> Constraint {
    let mut shape = Type::base(BaseTy::Int);
    for _ in 0..depth {
        shape = Type::pair(shape, Type::base(BaseTy::Bool));
    }
    Constraint::Sub(Type::var(TyVarId(0)), shape)
}

/// Sort pressure across many qualified variables linked pairwise.
pub fn sorted_mesh_constraint(vars: u32) -> Constraint {
    let mut children = Vec::new();
    for i in 0..vars {
        children.push(Constraint::Qual(Qualifier::Num, Type::var(TyVarId(i))));
    }
    for i in 1..vars {
        children.push(Constraint::Sub(
            Type::var(TyVarId(i - 1)),
            Type::var(TyVarId(i)),
        ));
    }
    Constraint::and(children)
}

#[cfg(test)]
mod tests {
    use super::*;
    use disco_types::SynonymRegistry;

    #[test]
    fn fixtures_solve() {
        let defs = SynonymRegistry::new();
        assert!(disco_infer::solve(&defs, &chain_constraint(8)).is_ok());
        assert!(disco_infer::solve(&defs, &backtracking_constraint(8)).is_ok());
        assert!(disco_infer::solve(&defs, &tower_constraint(4)).is_ok());
        assert!(disco_infer::solve(&defs, &sorted_mesh_constraint(8)).is_ok());
    }
}
