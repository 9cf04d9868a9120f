use std::hint::black_box;

use divan::{AllocProfiler, Bencher};

use disco_bench::{
    backtracking_constraint, chain_constraint, sorted_mesh_constraint, tower_constraint,
};
use disco_types::SynonymRegistry;

#[global_allocator]
static ALLOC: AllocProfiler = AllocProfiler::system();

fn main() {
    divan::main();
}

#[divan::bench(args = [8, 32, 128])]
fn promotion_chain(bencher: Bencher, len: u32) {
    let defs = SynonymRegistry::new();
    let constraint = chain_constraint(len);
    bencher.bench(|| {
        let subst = disco_infer::solve(black_box(&defs), black_box(&constraint))
            .unwrap_or_else(|err| panic!("chain fixture failed to solve: {err}"));
        black_box(subst.bindings().len())
    });
}

#[divan::bench(args = [4, 16, 64])]
fn or_backtracking(bencher: Bencher, width: u32) {
    let defs = SynonymRegistry::new();
    let constraint = backtracking_constraint(width);
    bencher.bench(|| {
        let subst = disco_infer::solve(black_box(&defs), black_box(&constraint))
            .unwrap_or_else(|err| panic!("backtracking fixture failed to solve: {err}"));
        black_box(subst.bindings().len())
    });
}

#[divan::bench(args = [2, 8, 16])]
fn shape_tower(bencher: Bencher, depth: u32) {
    let defs = SynonymRegistry::new();
    let constraint = tower_constraint(depth);
    bencher.bench(|| {
        let subst = disco_infer::solve(black_box(&defs), black_box(&constraint))
            .unwrap_or_else(|err| panic!("tower fixture failed to solve: {err}"));
        black_box(subst.bindings().len())
    });
}

#[divan::bench(args = [4, 16, 64])]
fn sorted_mesh(bencher: Bencher, vars: u32) {
    let defs = SynonymRegistry::new();
    let constraint = sorted_mesh_constraint(vars);
    bencher.bench(|| {
        let subst = disco_infer::solve(black_box(&defs), black_box(&constraint))
            .unwrap_or_else(|err| panic!("mesh fixture failed to solve: {err}"));
        black_box(subst.bindings().len())
    });
}
