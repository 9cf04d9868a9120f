//! Type representations for Disco.
//!
//! This crate defines the semantic types consumed by the constraint solver:
//! base types and their subtype lattice, atoms (base types and inference
//! variables), constructed types with per-argument variance, sorts of
//! qualifiers, substitutions, sort maps, and the type-synonym registry.
//! Syntactic type annotations live with the surface language, not here.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Unique identifier for a type variable during solving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TyVarId(pub u32);

impl fmt::Display for TyVarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// Whether a variable may be refined by the solver or is rigid.
///
/// Skolems are introduced when a universal quantifier is opened; they unify
/// only with themselves and never enter a substitution's domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VarKind {
    Unification,
    Skolem,
}

// ---------------------------------------------------------------------------
// Base types and the subtype lattice
// ---------------------------------------------------------------------------

/// A concrete base type.
///
/// The numeric fragment forms the diamond `Nat ≤ Int ≤ Rat`,
/// `Nat ≤ Frac ≤ Rat`; `Unit`, `Bool` and `Char` are incomparable with
/// everything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BaseTy {
    Unit,
    Bool,
    Char,
    Nat,
    Int,
    Frac,
    Rat,
}

impl BaseTy {
    pub const ALL: [BaseTy; 7] = [
        BaseTy::Unit,
        BaseTy::Bool,
        BaseTy::Char,
        BaseTy::Nat,
        BaseTy::Int,
        BaseTy::Frac,
        BaseTy::Rat,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BaseTy::Unit => "Unit",
            BaseTy::Bool => "Bool",
            BaseTy::Char => "Char",
            BaseTy::Nat => "Nat",
            BaseTy::Int => "Int",
            BaseTy::Frac => "Frac",
            BaseTy::Rat => "Rat",
        }
    }
}

impl fmt::Display for BaseTy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decide `a ≤ b` in the base-type subtype order.
pub fn base_subtype(a: BaseTy, b: BaseTy) -> bool {
    use BaseTy::*;
    a == b
        || matches!(
            (a, b),
            (Nat, Int) | (Nat, Frac) | (Nat, Rat) | (Int, Rat) | (Frac, Rat)
        )
}

/// Least upper bound of two base types, if one exists.
pub fn base_lub(a: BaseTy, b: BaseTy) -> Option<BaseTy> {
    use BaseTy::*;
    if base_subtype(a, b) {
        Some(b)
    } else if base_subtype(b, a) {
        Some(a)
    } else {
        match (a, b) {
            (Int, Frac) | (Frac, Int) => Some(Rat),
            _ => None,
        }
    }
}

/// Greatest lower bound of two base types, if one exists.
pub fn base_glb(a: BaseTy, b: BaseTy) -> Option<BaseTy> {
    use BaseTy::*;
    if base_subtype(a, b) {
        Some(a)
    } else if base_subtype(b, a) {
        Some(b)
    } else {
        match (a, b) {
            (Int, Frac) | (Frac, Int) => Some(Nat),
            _ => None,
        }
    }
}

/// A direction in the subtype order: `Sub` looks downward (subtypes,
/// predecessors), `Super` looks upward (supertypes, successors).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Dir {
    Sub,
    Super,
}

impl Dir {
    pub fn other(self) -> Dir {
        match self {
            Dir::Sub => Dir::Super,
            Dir::Super => Dir::Sub,
        }
    }
}

/// All base types lying in direction `dir` from `b`, including `b` itself.
pub fn dir_types(dir: Dir, b: BaseTy) -> BTreeSet<BaseTy> {
    BaseTy::ALL
        .into_iter()
        .filter(|&t| match dir {
            Dir::Sub => base_subtype(t, b),
            Dir::Super => base_subtype(b, t),
        })
        .collect()
}

/// Whether `x` lies in direction `dir` from `bound`.
pub fn is_dir_type(dir: Dir, x: BaseTy, bound: BaseTy) -> bool {
    match dir {
        Dir::Sub => base_subtype(x, bound),
        Dir::Super => base_subtype(bound, x),
    }
}

// ---------------------------------------------------------------------------
// Qualifiers and sorts
// ---------------------------------------------------------------------------

/// An atomic predicate a type may be required to satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Qualifier {
    /// Supports addition and multiplication.
    Num,
    /// Closed under subtraction.
    Sub,
    /// Has finitely many inhabitants.
    Finite,
    /// Supports boolean operations.
    Bool,
    /// Enumerable in order.
    Enum,
    /// Is a container of elements.
    Container,
    /// Has a total order.
    Ord,
}

impl Qualifier {
    pub const ALL: [Qualifier; 7] = [
        Qualifier::Num,
        Qualifier::Sub,
        Qualifier::Finite,
        Qualifier::Bool,
        Qualifier::Enum,
        Qualifier::Container,
        Qualifier::Ord,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Qualifier::Num => "num",
            Qualifier::Sub => "sub",
            Qualifier::Finite => "finite",
            Qualifier::Bool => "bool",
            Qualifier::Enum => "enum",
            Qualifier::Container => "container",
            Qualifier::Ord => "ord",
        }
    }
}

impl fmt::Display for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether base type `b` satisfies qualifier `q`.
pub fn has_qual(b: BaseTy, q: Qualifier) -> bool {
    use BaseTy::*;
    match q {
        Qualifier::Num => matches!(b, Nat | Int | Frac | Rat),
        Qualifier::Sub => matches!(b, Int | Rat),
        Qualifier::Finite => matches!(b, Unit | Bool | Char),
        Qualifier::Bool => matches!(b, Bool),
        Qualifier::Enum => matches!(b, Nat | Int | Char),
        Qualifier::Container => false,
        Qualifier::Ord => true,
    }
}

/// A set of qualifiers. The empty set is the top sort, satisfied by
/// everything.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Sort(BTreeSet<Qualifier>);

impl Sort {
    /// The top sort (no requirements).
    pub fn top() -> Self {
        Self::default()
    }

    pub fn singleton(q: Qualifier) -> Self {
        Self(BTreeSet::from([q]))
    }

    pub fn is_top(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, q: Qualifier) -> bool {
        self.0.contains(&q)
    }

    pub fn insert(&mut self, q: Qualifier) {
        self.0.insert(q);
    }

    /// Union another sort into this one. Sorts compose by union.
    pub fn union_with(&mut self, other: &Sort) {
        self.0.extend(other.0.iter().copied());
    }

    pub fn iter(&self) -> impl Iterator<Item = Qualifier> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Qualifier> for Sort {
    fn from_iter<I: IntoIterator<Item = Qualifier>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, q) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{q}")?;
        }
        write!(f, "}}")
    }
}

/// Whether base type `b` satisfies every qualifier in `s`.
pub fn has_sort(b: BaseTy, s: &Sort) -> bool {
    s.iter().all(|q| has_qual(b, q))
}

/// Preference order for choosing a canonical inhabitant of a sort.
const SORT_BASE_PREFERENCE: [BaseTy; 7] = [
    BaseTy::Nat,
    BaseTy::Int,
    BaseTy::Frac,
    BaseTy::Rat,
    BaseTy::Bool,
    BaseTy::Char,
    BaseTy::Unit,
];

/// A canonical base type inhabiting sort `s`, if any does.
pub fn pick_sort_base(s: &Sort) -> Option<BaseTy> {
    SORT_BASE_PREFERENCE.into_iter().find(|&b| has_sort(b, s))
}

// ---------------------------------------------------------------------------
// Atoms
// ---------------------------------------------------------------------------

/// A leaf of the type language: a base type or a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Atom {
    Base(BaseTy),
    Var(VarKind, TyVarId),
}

impl Atom {
    pub fn is_base(self) -> bool {
        matches!(self, Atom::Base(_))
    }

    pub fn is_skolem(self) -> bool {
        matches!(self, Atom::Var(VarKind::Skolem, _))
    }

    pub fn is_unification(self) -> bool {
        matches!(self, Atom::Var(VarKind::Unification, _))
    }

    /// View as a skolem-free atom, when it is one.
    pub fn as_uatom(self) -> Option<UAtom> {
        match self {
            Atom::Base(b) => Some(UAtom::Base(b)),
            Atom::Var(VarKind::Unification, v) => Some(UAtom::Var(v)),
            Atom::Var(VarKind::Skolem, _) => None,
        }
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Atom::Base(b) => write!(f, "{b}"),
            Atom::Var(VarKind::Unification, v) => write!(f, "t{}", v.0),
            Atom::Var(VarKind::Skolem, v) => write!(f, "s{}", v.0),
        }
    }
}

/// An atom known not to be a skolem: a base type or a unification variable.
///
/// The constraint graph is restricted to these after the skolem check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum UAtom {
    Base(BaseTy),
    Var(TyVarId),
}

impl UAtom {
    pub fn is_base(self) -> bool {
        matches!(self, UAtom::Base(_))
    }
}

impl From<UAtom> for Atom {
    fn from(ua: UAtom) -> Atom {
        match ua {
            UAtom::Base(b) => Atom::Base(b),
            UAtom::Var(v) => Atom::Var(VarKind::Unification, v),
        }
    }
}

impl fmt::Display for UAtom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Atom::from(*self))
    }
}

// ---------------------------------------------------------------------------
// Constructors and variance
// ---------------------------------------------------------------------------

/// How a constructor argument position propagates subtyping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Variance {
    Covariant,
    Contravariant,
}

/// A type constructor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TyCon {
    Arrow,
    Pair,
    Sum,
    List,
    /// A user-declared type synonym, expanded on demand via the registry.
    Def(String),
}

impl TyCon {
    /// Per-argument variances. The length is the constructor's arity.
    pub fn arity(&self) -> Vec<Variance> {
        match self {
            TyCon::Arrow => vec![Variance::Contravariant, Variance::Covariant],
            TyCon::Pair | TyCon::Sum => vec![Variance::Covariant, Variance::Covariant],
            TyCon::List => vec![Variance::Covariant],
            TyCon::Def(_) => vec![],
        }
    }
}

impl fmt::Display for TyCon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TyCon::Arrow => f.write_str("→"),
            TyCon::Pair => f.write_str("×"),
            TyCon::Sum => f.write_str("+"),
            TyCon::List => f.write_str("List"),
            TyCon::Def(name) => f.write_str(name),
        }
    }
}

/// Per-argument qualifiers a constructed type's arguments must carry for the
/// whole type to satisfy `q`. `None` means `q` can never hold for `con`;
/// a `None` inside the vector means that argument is unconstrained.
pub fn qual_rules(con: &TyCon, q: Qualifier) -> Option<Vec<Option<Qualifier>>> {
    match (con, q) {
        (TyCon::Pair | TyCon::Sum | TyCon::Arrow, Qualifier::Finite) => {
            Some(vec![Some(Qualifier::Finite), Some(Qualifier::Finite)])
        }
        (TyCon::Pair | TyCon::Sum, Qualifier::Ord) => {
            Some(vec![Some(Qualifier::Ord), Some(Qualifier::Ord)])
        }
        (TyCon::List, Qualifier::Ord) => Some(vec![Some(Qualifier::Ord)]),
        (TyCon::List, Qualifier::Container) => Some(vec![None]),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A semantic type: an atom or a constructor application.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Type {
    Atom(Atom),
    Con(TyCon, Vec<Type>),
}

impl Type {
    pub fn base(b: BaseTy) -> Type {
        Type::Atom(Atom::Base(b))
    }

    /// A unification variable as a type.
    pub fn var(v: TyVarId) -> Type {
        Type::Atom(Atom::Var(VarKind::Unification, v))
    }

    /// A skolem variable as a type.
    pub fn skolem(v: TyVarId) -> Type {
        Type::Atom(Atom::Var(VarKind::Skolem, v))
    }

    pub fn arrow(from: Type, to: Type) -> Type {
        Type::Con(TyCon::Arrow, vec![from, to])
    }

    pub fn pair(left: Type, right: Type) -> Type {
        Type::Con(TyCon::Pair, vec![left, right])
    }

    pub fn sum(left: Type, right: Type) -> Type {
        Type::Con(TyCon::Sum, vec![left, right])
    }

    pub fn list(elem: Type) -> Type {
        Type::Con(TyCon::List, vec![elem])
    }

    /// Reference to a named type synonym.
    pub fn def(name: impl Into<String>) -> Type {
        Type::Con(TyCon::Def(name.into()), vec![])
    }

    pub fn as_atom(&self) -> Option<Atom> {
        match self {
            Type::Atom(a) => Some(*a),
            Type::Con(..) => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Atom(a) => write!(f, "{a}"),
            Type::Con(TyCon::Arrow, args) if args.len() == 2 => {
                write!(f, "({} → {})", args[0], args[1])
            }
            Type::Con(TyCon::Pair, args) if args.len() == 2 => {
                write!(f, "({} × {})", args[0], args[1])
            }
            Type::Con(TyCon::Sum, args) if args.len() == 2 => {
                write!(f, "({} + {})", args[0], args[1])
            }
            Type::Con(TyCon::List, args) if args.len() == 1 => {
                write!(f, "List({})", args[0])
            }
            Type::Con(TyCon::Def(name), args) if args.is_empty() => f.write_str(name),
            Type::Con(con, args) => {
                write!(f, "{con}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Free unification variables of a type.
pub fn free_unification_vars(ty: &Type) -> BTreeSet<TyVarId> {
    let mut vars = BTreeSet::new();
    collect_vars(ty, &mut vars, false);
    vars
}

/// All variable ids appearing in a type, skolems included. Used to seed the
/// fresh-name counter so no generated name collides with an existing one.
pub fn all_var_ids(ty: &Type) -> BTreeSet<TyVarId> {
    let mut vars = BTreeSet::new();
    collect_vars(ty, &mut vars, true);
    vars
}

fn collect_vars(ty: &Type, out: &mut BTreeSet<TyVarId>, include_skolems: bool) {
    match ty {
        Type::Atom(Atom::Var(kind, v)) => {
            if include_skolems || *kind == VarKind::Unification {
                out.insert(*v);
            }
        }
        Type::Atom(Atom::Base(_)) => {}
        Type::Con(_, args) => {
            for arg in args {
                collect_vars(arg, out, include_skolems);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Substitution
// ---------------------------------------------------------------------------

/// Maps unification variables to their resolved types.
///
/// Skolems never appear in the domain. `apply` resolves bindings recursively,
/// so a fully composed substitution is idempotent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Substitution {
    map: BTreeMap<TyVarId, Type>,
}

impl Substitution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn singleton(var: TyVarId, ty: Type) -> Self {
        Self {
            map: BTreeMap::from([(var, ty)]),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn bind(&mut self, var: TyVarId, ty: Type) {
        self.map.insert(var, ty);
    }

    pub fn lookup(&self, var: TyVarId) -> Option<&Type> {
        self.map.get(&var)
    }

    pub fn remove(&mut self, var: TyVarId) -> Option<Type> {
        self.map.remove(&var)
    }

    pub fn bindings(&self) -> &BTreeMap<TyVarId, Type> {
        &self.map
    }

    pub fn domain(&self) -> BTreeSet<TyVarId> {
        self.map.keys().copied().collect()
    }

    /// Apply this substitution to a type, replacing all bound variables.
    pub fn apply(&self, ty: &Type) -> Type {
        match ty {
            Type::Atom(Atom::Var(VarKind::Unification, v)) => match self.lookup(*v) {
                Some(resolved) => self.apply(resolved),
                None => ty.clone(),
            },
            Type::Atom(_) => ty.clone(),
            Type::Con(con, args) => Type::Con(
                con.clone(),
                args.iter().map(|arg| self.apply(arg)).collect(),
            ),
        }
    }

    /// Apply to an atom. The result may be any type.
    pub fn apply_atom(&self, atom: Atom) -> Type {
        self.apply(&Type::Atom(atom))
    }

    /// Compose: `self ∘ earlier`. `self` is applied to `earlier`'s ranges,
    /// and `earlier`'s bindings win on overlapping keys.
    pub fn compose(&self, earlier: &Substitution) -> Substitution {
        let mut map = self.map.clone();
        for (var, ty) in &earlier.map {
            map.insert(*var, self.apply(ty));
        }
        Substitution { map }
    }

    /// Keep only bindings whose key is in `keep`.
    pub fn restrict(&self, keep: &BTreeSet<TyVarId>) -> Substitution {
        Substitution {
            map: self
                .map
                .iter()
                .filter(|(var, _)| keep.contains(var))
                .map(|(var, ty)| (*var, ty.clone()))
                .collect(),
        }
    }
}

impl fmt::Display for Substitution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, (var, ty)) in self.map.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{var} ↦ {ty}")?;
        }
        write!(f, "]")
    }
}

// ---------------------------------------------------------------------------
// Sort maps
// ---------------------------------------------------------------------------

/// The sort assigned to each unification variable. Unmapped variables have
/// the top sort.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortMap {
    map: BTreeMap<TyVarId, Sort>,
}

impl SortMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// The sort of `var`; top if unmapped.
    pub fn get(&self, var: TyVarId) -> Sort {
        self.map.get(&var).cloned().unwrap_or_default()
    }

    /// Union `sort` into the entry for `var`.
    pub fn insert_union(&mut self, var: TyVarId, sort: Sort) {
        if sort.is_top() {
            return;
        }
        self.map.entry(var).or_default().union_with(&sort);
    }

    pub fn remove(&mut self, var: TyVarId) -> Option<Sort> {
        self.map.remove(&var)
    }

    /// Union every entry of `other` into this map.
    pub fn union_with(&mut self, other: &SortMap) {
        for (var, sort) in &other.map {
            self.insert_union(*var, sort.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (TyVarId, &Sort)> + '_ {
        self.map.iter().map(|(var, sort)| (*var, sort))
    }

    pub fn vars(&self) -> BTreeSet<TyVarId> {
        self.map.keys().copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Type-synonym registry
// ---------------------------------------------------------------------------

/// Maps each synonym name to its (non-recursive) expansion.
#[derive(Debug, Clone, Default)]
pub struct SynonymRegistry {
    defs: BTreeMap<String, Type>,
}

impl SynonymRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, expansion: Type) {
        self.defs.insert(name.into(), expansion);
    }

    pub fn resolve(&self, name: &str) -> Option<&Type> {
        self.defs.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.defs.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_diamond_order() {
        use BaseTy::*;
        assert!(base_subtype(Nat, Rat));
        assert!(base_subtype(Nat, Int));
        assert!(base_subtype(Frac, Rat));
        assert!(!base_subtype(Int, Frac));
        assert!(!base_subtype(Frac, Int));
        assert!(!base_subtype(Int, Nat));
        assert!(!base_subtype(Bool, Rat));
    }

    #[test]
    fn lub_and_glb_on_the_diamond() {
        use BaseTy::*;
        assert_eq!(base_lub(Int, Frac), Some(Rat));
        assert_eq!(base_glb(Int, Frac), Some(Nat));
        assert_eq!(base_lub(Nat, Int), Some(Int));
        assert_eq!(base_glb(Rat, Frac), Some(Frac));
        assert_eq!(base_lub(Bool, Nat), None);
        assert_eq!(base_glb(Char, Unit), None);
    }

    #[test]
    fn dir_types_include_self() {
        use BaseTy::*;
        let ups = dir_types(Dir::Super, Nat);
        assert_eq!(ups, BTreeSet::from([Nat, Int, Frac, Rat]));
        let downs = dir_types(Dir::Sub, Int);
        assert_eq!(downs, BTreeSet::from([Nat, Int]));
        assert_eq!(dir_types(Dir::Sub, Bool), BTreeSet::from([Bool]));
    }

    #[test]
    fn qualifier_tables() {
        use BaseTy::*;
        assert!(has_qual(Nat, Qualifier::Num));
        assert!(!has_qual(Nat, Qualifier::Sub));
        assert!(has_qual(Int, Qualifier::Sub));
        assert!(has_qual(Bool, Qualifier::Finite));
        assert!(!has_qual(Bool, Qualifier::Num));
        assert!(has_qual(Char, Qualifier::Ord));
        assert!(BaseTy::ALL.into_iter().all(|b| !has_qual(b, Qualifier::Container)));
    }

    #[test]
    fn sort_membership_is_conjunction() {
        use BaseTy::*;
        let s: Sort = [Qualifier::Num, Qualifier::Sub].into_iter().collect();
        assert!(has_sort(Int, &s));
        assert!(has_sort(Rat, &s));
        assert!(!has_sort(Nat, &s));
        assert!(has_sort(Nat, &Sort::top()));
    }

    #[test]
    fn pick_sort_base_prefers_simple_types() {
        use BaseTy::*;
        assert_eq!(pick_sort_base(&Sort::singleton(Qualifier::Num)), Some(Nat));
        assert_eq!(pick_sort_base(&Sort::singleton(Qualifier::Sub)), Some(Int));
        assert_eq!(pick_sort_base(&Sort::singleton(Qualifier::Bool)), Some(Bool));
        assert_eq!(
            pick_sort_base(&Sort::singleton(Qualifier::Finite)),
            Some(Bool)
        );
        assert_eq!(pick_sort_base(&Sort::singleton(Qualifier::Container)), None);
        assert_eq!(pick_sort_base(&Sort::top()), Some(Nat));
    }

    #[test]
    fn arrow_variance() {
        assert_eq!(
            TyCon::Arrow.arity(),
            vec![Variance::Contravariant, Variance::Covariant]
        );
        assert_eq!(TyCon::List.arity(), vec![Variance::Covariant]);
        assert!(TyCon::Def("Point".into()).arity().is_empty());
    }

    #[test]
    fn qual_rules_table() {
        assert_eq!(
            qual_rules(&TyCon::Pair, Qualifier::Finite),
            Some(vec![Some(Qualifier::Finite), Some(Qualifier::Finite)])
        );
        assert_eq!(
            qual_rules(&TyCon::List, Qualifier::Container),
            Some(vec![None])
        );
        assert_eq!(qual_rules(&TyCon::Arrow, Qualifier::Num), None);
        assert_eq!(qual_rules(&TyCon::Def("Point".into()), Qualifier::Ord), None);
    }

    #[test]
    fn substitution_apply_basic() {
        let mut subst = Substitution::new();
        subst.bind(TyVarId(0), Type::base(BaseTy::Int));

        assert_eq!(subst.apply(&Type::var(TyVarId(0))), Type::base(BaseTy::Int));
        assert_eq!(
            subst.apply(&Type::list(Type::var(TyVarId(0)))),
            Type::list(Type::base(BaseTy::Int))
        );
    }

    #[test]
    fn substitution_leaves_skolems_alone() {
        let mut subst = Substitution::new();
        subst.bind(TyVarId(0), Type::base(BaseTy::Int));

        let rigid = Type::skolem(TyVarId(0));
        assert_eq!(subst.apply(&rigid), rigid);
    }

    #[test]
    fn substitution_apply_resolves_chains() {
        let mut subst = Substitution::new();
        subst.bind(TyVarId(0), Type::var(TyVarId(1)));
        subst.bind(TyVarId(1), Type::base(BaseTy::Nat));

        assert_eq!(subst.apply(&Type::var(TyVarId(0))), Type::base(BaseTy::Nat));
    }

    #[test]
    fn compose_earlier_bindings_win() {
        let mut earlier = Substitution::new();
        earlier.bind(TyVarId(0), Type::var(TyVarId(1)));

        let mut later = Substitution::new();
        later.bind(TyVarId(0), Type::base(BaseTy::Bool));
        later.bind(TyVarId(1), Type::base(BaseTy::Nat));

        let composed = later.compose(&earlier);
        // earlier's t0 ↦ t1 is rewritten by later to t0 ↦ Nat and overrides.
        assert_eq!(
            composed.apply(&Type::var(TyVarId(0))),
            Type::base(BaseTy::Nat)
        );
    }

    #[test]
    fn compose_is_idempotent_on_result() {
        let mut a = Substitution::new();
        a.bind(TyVarId(0), Type::list(Type::var(TyVarId(1))));
        let b = Substitution::singleton(TyVarId(1), Type::base(BaseTy::Rat));

        let composed = b.compose(&a);
        let twice = composed.compose(&composed);
        let ty = Type::pair(Type::var(TyVarId(0)), Type::var(TyVarId(1)));
        assert_eq!(composed.apply(&ty), twice.apply(&ty));
    }

    #[test]
    fn restrict_keeps_only_requested_keys() {
        let mut subst = Substitution::new();
        subst.bind(TyVarId(0), Type::base(BaseTy::Int));
        subst.bind(TyVarId(1), Type::base(BaseTy::Nat));

        let kept = subst.restrict(&BTreeSet::from([TyVarId(1)]));
        assert_eq!(kept.lookup(TyVarId(0)), None);
        assert_eq!(kept.lookup(TyVarId(1)), Some(&Type::base(BaseTy::Nat)));
    }

    #[test]
    fn sort_map_defaults_to_top() {
        let mut sm = SortMap::new();
        assert!(sm.get(TyVarId(7)).is_top());

        sm.insert_union(TyVarId(7), Sort::singleton(Qualifier::Num));
        sm.insert_union(TyVarId(7), Sort::singleton(Qualifier::Sub));
        let merged = sm.get(TyVarId(7));
        assert!(merged.contains(Qualifier::Num));
        assert!(merged.contains(Qualifier::Sub));
    }

    #[test]
    fn free_vars_ignore_skolems_unless_asked() {
        let ty = Type::arrow(Type::var(TyVarId(1)), Type::skolem(TyVarId(2)));
        assert_eq!(free_unification_vars(&ty), BTreeSet::from([TyVarId(1)]));
        assert_eq!(
            all_var_ids(&ty),
            BTreeSet::from([TyVarId(1), TyVarId(2)])
        );
    }

    #[test]
    fn display_forms() {
        let ty = Type::arrow(
            Type::pair(Type::base(BaseTy::Nat), Type::var(TyVarId(3))),
            Type::list(Type::base(BaseTy::Bool)),
        );
        assert_eq!(format!("{ty}"), "((Nat × t3) → List(Bool))");
        assert_eq!(format!("{}", Type::def("Point")), "Point");
        assert_eq!(format!("{}", Type::skolem(TyVarId(2))), "s2");
    }

    #[test]
    fn synonym_registry_resolution() {
        let mut defs = SynonymRegistry::new();
        defs.register(
            "Point",
            Type::pair(Type::base(BaseTy::Int), Type::base(BaseTy::Int)),
        );
        assert!(defs.resolve("Point").is_some());
        assert!(defs.resolve("Vector").is_none());
    }
}
