//! The solver pipeline: from decomposed alternatives to a substitution.
//!
//! Each alternative runs through: weak unification (termination guard),
//! simplification to atomic subtype constraints, the atom graph, the skolem
//! check, cycle elimination, and the sort-aware graph solver. The phase
//! substitutions compose right-to-left and the result is checked against
//! the atomic constraints before being returned.

use std::collections::{BTreeMap, BTreeSet};

use disco_types::{
    Atom, BaseTy, Dir, Sort, SortMap, Substitution, TyVarId, Type, UAtom, VarKind, base_subtype,
    dir_types, has_sort, is_dir_type, pick_sort_base,
};

use crate::graph::Graph;
use crate::simplify::SimplifyOutcome;
use crate::trace::SolveAction;
use crate::unify::{unify_atoms, weak_unify};
use crate::{
    Constraint, FreshVars, SimpleConstraint, SolveError, Solver, constraint_free_vars,
};

impl Solver<'_> {
    /// Solve a constraint: decompose it and run each alternative until one
    /// succeeds. When every alternative fails, the first one's error is
    /// returned.
    ///
    /// When a variable ends up with both lower and upper base-type bounds,
    /// the lower bound wins, so inferred types sit at the simpler end of
    /// the numeric lattice.
    pub fn solve(&mut self, constraint: &Constraint) -> Result<Substitution, SolveError> {
        self.fresh = FreshVars::seeded_for(constraint);
        let alternatives = self.decompose(constraint)?;
        self.push_step(
            SolveAction::Decompose,
            format!("{} alternative(s)", alternatives.len()),
        );

        let free = constraint_free_vars(constraint);
        let total_alts = alternatives.len();
        let mut first_err: Option<SolveError> = None;
        for (i, (sort_map, simples)) in alternatives.into_iter().enumerate() {
            if i > 0 {
                self.push_step(
                    SolveAction::Backtrack,
                    format!("alternative {}/{total_alts}", i + 1),
                );
            }
            match self.solve_alternative(sort_map, simples) {
                Ok(subst) => return Ok(finished(&subst, &free)),
                Err(err) => {
                    first_err.get_or_insert(err);
                }
            }
        }
        Err(first_err.unwrap_or(SolveError::NoUnify))
    }

    fn solve_alternative(
        &mut self,
        sort_map: SortMap,
        simples: Vec<SimpleConstraint>,
    ) -> Result<Substitution, SolveError> {
        // Termination guard: the weak unifier's output is discarded.
        weak_unify(self.defs, &simples)?;
        self.push_step(
            SolveAction::WeakUnify,
            "subtyping problem is structurally finite",
        );

        let SimplifyOutcome {
            mut sort_map,
            atoms,
            subst: su_simplify,
        } = self.simplify(sort_map, simples)?;

        let graph = Graph::from_edges(atoms.iter().copied());
        let (su_skolem, graph) = self.check_skolems(graph, &sort_map)?;
        let uatom_graph =
            Graph::sequence(&graph.map(|a| a.as_uatom())).ok_or(SolveError::NoUnify)?;

        let (su_cycle, dag) = self.eliminate_cycles(&uatom_graph, &mut sort_map)?;
        let su_graph = self.solve_graph(&dag, &mut sort_map)?;

        let total = su_graph
            .compose(&su_cycle)
            .compose(&su_skolem)
            .compose(&su_simplify);
        self.verify(&total, &atoms, &sort_map)?;
        Ok(total)
    }

    /// Walk weakly-connected components of the atom graph and reject those
    /// where a skolem meets more than itself: another skolem, a base type,
    /// or a variable with a nontrivial sort. A lone skolem among unsorted
    /// variables absorbs them; the component is then discharged.
    fn check_skolems(
        &mut self,
        mut graph: Graph<Atom>,
        sort_map: &SortMap,
    ) -> Result<(Substitution, Graph<Atom>), SolveError> {
        let mut subst = Substitution::new();
        for component in graph.wccs() {
            let mut skolems: BTreeSet<TyVarId> = BTreeSet::new();
            let mut vars: BTreeSet<TyVarId> = BTreeSet::new();
            let mut has_base = false;
            for atom in &component {
                match atom {
                    Atom::Base(_) => has_base = true,
                    Atom::Var(VarKind::Skolem, v) => {
                        skolems.insert(*v);
                    }
                    Atom::Var(VarKind::Unification, v) => {
                        vars.insert(*v);
                    }
                }
            }
            if skolems.is_empty() {
                continue;
            }
            if skolems.len() > 1 || has_base {
                return Err(SolveError::NoUnify);
            }
            if vars.iter().any(|v| !sort_map.get(*v).is_top()) {
                return Err(SolveError::NoUnify);
            }
            let skolem = skolems
                .first()
                .copied()
                .unwrap_or_else(|| unreachable!("non-empty skolem set"));
            self.push_step(
                SolveAction::CollapseSkolem,
                format!("s{} absorbs {} variable(s)", skolem.0, vars.len()),
            );
            for v in vars {
                subst.bind(v, Type::skolem(skolem));
            }
            graph.remove_nodes(&component);
        }
        Ok((subst, graph))
    }

    /// Condense strongly-connected components, unifying the atoms within
    /// each. The quotient graph is a DAG over the representatives.
    fn eliminate_cycles(
        &mut self,
        graph: &Graph<UAtom>,
        sort_map: &mut SortMap,
    ) -> Result<(Substitution, Graph<UAtom>), SolveError> {
        let (components, condensed) = graph.condensation();
        let mut subst = Substitution::new();
        let mut representatives: Vec<UAtom> = Vec::with_capacity(components.len());
        for component in &components {
            let first = component
                .first()
                .copied()
                .unwrap_or_else(|| unreachable!("components are non-empty"));
            if component.len() == 1 {
                representatives.push(first);
                continue;
            }
            let atoms: BTreeSet<Atom> = component.iter().map(|&ua| Atom::from(ua)).collect();
            let (comp_subst, canonical) = unify_atoms(&atoms)?;
            let rep = canonical.as_uatom().ok_or(SolveError::NoUnify)?;
            self.push_step(
                SolveAction::CollapseScc,
                format!("{} atoms onto {rep}", component.len()),
            );
            subst = comp_subst.compose(&subst);
            representatives.push(rep);
        }

        // Bindings produced here must respect the sort map; sorts of merged
        // variables move to their representative.
        for (var, ty) in subst.bindings() {
            match ty.as_atom() {
                Some(Atom::Base(b)) => {
                    if !has_sort(b, &sort_map.get(*var)) {
                        return Err(SolveError::NoUnify);
                    }
                }
                Some(Atom::Var(VarKind::Unification, rep)) => {
                    if let Some(sort) = sort_map.remove(*var) {
                        sort_map.insert_union(rep, sort);
                    }
                }
                _ => {}
            }
        }

        Ok((subst, condensed.map(|i| representatives[i])))
    }

    /// Assign a base type to every variable under base or sort pressure,
    /// then equate residual variable-only components.
    fn solve_graph(
        &mut self,
        dag: &Graph<UAtom>,
        sort_map: &mut SortMap,
    ) -> Result<Substitution, SolveError> {
        let mut rel_map: RelMap = BTreeMap::new();
        for node in dag.nodes() {
            let UAtom::Var(var) = node else { continue };
            let mut rels = Rels::default();
            for pred in dag.preds(node) {
                match pred {
                    UAtom::Base(b) => {
                        rels.pred_bases.insert(b);
                    }
                    UAtom::Var(w) => {
                        rels.pred_vars.insert(w);
                    }
                }
            }
            for succ in dag.succs(node) {
                match succ {
                    UAtom::Base(b) => {
                        rels.succ_bases.insert(b);
                    }
                    UAtom::Var(w) => {
                        rels.succ_vars.insert(w);
                    }
                }
            }
            rel_map.insert(var, rels);
        }

        let mut subst = Substitution::new();
        let mut budget = self.options.max_steps;
        loop {
            // Base pressure first, then nontrivial sorts.
            let candidate = rel_map
                .iter()
                .find(|(_, rels)| !rels.pred_bases.is_empty() || !rels.succ_bases.is_empty())
                .map(|(var, _)| *var)
                .or_else(|| {
                    rel_map
                        .keys()
                        .copied()
                        .find(|var| !sort_map.get(*var).is_top())
                });
            let Some(var) = candidate else { break };
            if budget == 0 {
                return Err(SolveError::NoUnify);
            }
            budget -= 1;

            let rels = rel_map.remove(&var).unwrap_or_default();
            let sort = sort_map.get(var);
            let choice = match (rels.pred_bases.is_empty(), rels.succ_bases.is_empty()) {
                (true, true) => {
                    let base = pick_sort_base(&sort).ok_or(SolveError::NoUnify)?;
                    self.push_step(
                        SolveAction::DefaultSort,
                        format!("t{} := {base} inhabits {sort}", var.0),
                    );
                    base
                }
                (true, false) => lim_by_sort(
                    Dir::Sub,
                    &rels.succ_bases,
                    &rels.succ_vars,
                    &sort,
                    &rel_map,
                    sort_map,
                )
                .ok_or(SolveError::NoUnify)?,
                (false, true) => lim_by_sort(
                    Dir::Super,
                    &rels.pred_bases,
                    &rels.pred_vars,
                    &sort,
                    &rel_map,
                    sort_map,
                )
                .ok_or(SolveError::NoUnify)?,
                (false, false) => {
                    let lower = lim_by_sort(
                        Dir::Super,
                        &rels.pred_bases,
                        &rels.pred_vars,
                        &sort,
                        &rel_map,
                        sort_map,
                    )
                    .ok_or(SolveError::NoUnify)?;
                    let upper = lim_by_sort(
                        Dir::Sub,
                        &rels.succ_bases,
                        &rels.succ_vars,
                        &sort,
                        &rel_map,
                        sort_map,
                    )
                    .ok_or(SolveError::NoUnify)?;
                    if !base_subtype(lower, upper) {
                        return Err(SolveError::NoUnify);
                    }
                    // Simpler types win.
                    lower
                }
            };

            self.push_step(SolveAction::AssignBase, format!("t{} := {choice}", var.0));
            subst.bind(var, Type::base(choice));
            for rels in rel_map.values_mut() {
                if rels.pred_vars.remove(&var) {
                    rels.pred_bases.insert(choice);
                }
                if rels.succ_vars.remove(&var) {
                    rels.succ_bases.insert(choice);
                }
            }
        }

        // What remains relates top-sorted variables to each other only.
        // Subtyping between two variables is satisfied by making them equal,
        // which also yields simpler types.
        let mut residual: Graph<UAtom> = Graph::new();
        for (var, rels) in &rel_map {
            residual.add_node(UAtom::Var(*var));
            for succ in &rels.succ_vars {
                residual.add_edge(UAtom::Var(*var), UAtom::Var(*succ));
            }
        }
        for component in residual.wccs() {
            if component.len() <= 1 {
                continue;
            }
            let atoms: BTreeSet<Atom> = component.iter().map(|&ua| Atom::from(ua)).collect();
            let (comp_subst, canonical) = unify_atoms(&atoms)?;
            self.push_step(
                SolveAction::MergeComponent,
                format!("{} variables onto {canonical}", component.len()),
            );
            subst = comp_subst.compose(&subst);
        }

        Ok(subst)
    }

    /// Final check: the composed substitution must satisfy every atomic
    /// constraint, and every base binding must satisfy its variable's sort.
    fn verify(
        &mut self,
        total: &Substitution,
        atoms: &[(Atom, Atom)],
        sort_map: &SortMap,
    ) -> Result<(), SolveError> {
        for &(a, b) in atoms {
            let left = total.apply_atom(a);
            let right = total.apply_atom(b);
            let satisfied = left == right
                || matches!(
                    (left.as_atom(), right.as_atom()),
                    (Some(Atom::Base(x)), Some(Atom::Base(y))) if base_subtype(x, y)
                );
            if !satisfied {
                return Err(SolveError::NoUnify);
            }
        }
        for (var, ty) in total.bindings() {
            if let Some(Atom::Base(b)) = ty.as_atom() {
                if !has_sort(b, &sort_map.get(*var)) {
                    return Err(SolveError::NoUnify);
                }
            }
        }
        self.push_step(
            SolveAction::Verify,
            format!("{} atomic constraint(s) satisfied", atoms.len()),
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Relation map and sort-aware limits
// ---------------------------------------------------------------------------

/// Distance-1 neighbors of a variable in the DAG, split by direction and by
/// base/variable.
#[derive(Debug, Clone, Default)]
struct Rels {
    pred_bases: BTreeSet<BaseTy>,
    pred_vars: BTreeSet<TyVarId>,
    succ_bases: BTreeSet<BaseTy>,
    succ_vars: BTreeSet<TyVarId>,
}

impl Rels {
    fn bases(&self, dir: Dir) -> &BTreeSet<BaseTy> {
        match dir {
            Dir::Sub => &self.pred_bases,
            Dir::Super => &self.succ_bases,
        }
    }
}

type RelMap = BTreeMap<TyVarId, Rels>;

/// The direction-limit of `bounds` within `sort`: the GLB of upper bounds
/// when `dir` is `Sub`, the LUB of lower bounds when `dir` is `Super`,
/// restricted to choices that leave every variable neighbor a consistent
/// follow-up choice.
fn lim_by_sort(
    dir: Dir,
    bounds: &BTreeSet<BaseTy>,
    neighbors: &BTreeSet<TyVarId>,
    sort: &Sort,
    rel_map: &RelMap,
    sort_map: &SortMap,
) -> Option<BaseTy> {
    let mut candidates: Option<BTreeSet<BaseTy>> = None;
    for &bound in bounds {
        let admissible = dir_types_by_sort(dir, bound, sort, neighbors, rel_map, sort_map);
        candidates = Some(match candidates {
            None => admissible,
            Some(acc) => acc.intersection(&admissible).copied().collect(),
        });
    }
    let candidates = candidates?;
    // The dir-extreme: the member every other member lies dir-ward of.
    candidates
        .iter()
        .copied()
        .find(|&limit| candidates.iter().all(|&other| is_dir_type(dir, other, limit)))
}

/// Base types in direction `dir` from `bound` that satisfy `sort` and keep
/// every neighbor satisfiable.
fn dir_types_by_sort(
    dir: Dir,
    bound: BaseTy,
    sort: &Sort,
    neighbors: &BTreeSet<TyVarId>,
    rel_map: &RelMap,
    sort_map: &SortMap,
) -> BTreeSet<BaseTy> {
    dir_types(dir, bound)
        .into_iter()
        .filter(|&candidate| has_sort(candidate, sort))
        .filter(|&candidate| {
            neighbors
                .iter()
                .all(|n| neighbor_can_follow(dir, candidate, *n, rel_map, sort_map))
        })
        .collect()
}

/// After fixing `candidate`, the neighbor must still have some choice lying
/// in direction `dir.other()` from `candidate` that satisfies the neighbor's
/// sort and stays within the neighbor's own base bounds.
fn neighbor_can_follow(
    dir: Dir,
    candidate: BaseTy,
    neighbor: TyVarId,
    rel_map: &RelMap,
    sort_map: &SortMap,
) -> bool {
    let neighbor_sort = sort_map.get(neighbor);
    let empty = BTreeSet::new();
    let neighbor_bounds = rel_map
        .get(&neighbor)
        .map(|rels| rels.bases(dir.other()))
        .unwrap_or(&empty);
    dir_types(dir.other(), candidate).into_iter().any(|follow| {
        has_sort(follow, &neighbor_sort)
            && neighbor_bounds.iter().all(|&u| is_dir_type(dir, follow, u))
    })
}

/// Restrict to the constraint's own variables, with every kept range fully
/// resolved so the result is idempotent.
fn finished(total: &Substitution, free: &BTreeSet<TyVarId>) -> Substitution {
    let mut out = Substitution::new();
    for &var in free {
        if total.lookup(var).is_some() {
            out.bind(var, total.apply(&Type::var(var)));
        }
    }
    out
}
