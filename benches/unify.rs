//! Benchmarks comparing the two unification algorithms.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use credo::beliefbase::BeliefStore;
use credo::term::{Literal, Term, Variable};
use credo::unify::{Substitution, Unifier, UnifyAlgorithm};

const ALGORITHMS: [UnifyAlgorithm; 2] = [UnifyAlgorithm::HashIndexed, UnifyAlgorithm::Recursive];

/// 10k ground `edge(from, to)` facts, queried with the first argument bound.
fn bench_ground_heavy(c: &mut Criterion) {
    let store = BeliefStore::from_literals((0..10_000).map(|i| {
        Literal::new("edge", [Term::int(i % 100), Term::int(i)]).unwrap()
    }));
    let snapshot = store.snapshot();
    let y = Variable::named("Y");
    let query = Literal::new("edge", [Term::int(42), Term::var(&y)]).unwrap();

    let mut group = c.benchmark_group("ground_heavy");
    for algorithm in ALGORITHMS {
        let unifier = Unifier::new(algorithm);
        group.bench_with_input(BenchmarkId::from_parameter(algorithm), &query, |bench, query| {
            bench.iter(|| {
                let count = unifier
                    .unify(query, snapshot.candidates(query), &Substitution::new())
                    .count();
                black_box(count)
            })
        });
    }
    group.finish();
}

/// Deeply nested terms with shared variables.
fn bench_nested(c: &mut Criterion) {
    fn nest(depth: usize, leaf: Term) -> Term {
        (0..depth).fold(leaf, |inner, _| {
            Term::from(Literal::new("wrap", [inner, Term::atom("tag")]).unwrap())
        })
    }

    let store = BeliefStore::from_literals((0..500).map(|i| {
        Literal::new("tree", [nest(16, Term::int(i)), nest(16, Term::int(i))]).unwrap()
    }));
    let snapshot = store.snapshot();
    let x = Variable::named("X");
    let query = Literal::new("tree", [Term::var(&x), Term::var(&x)]).unwrap();

    let mut group = c.benchmark_group("nested");
    for algorithm in ALGORITHMS {
        let unifier = Unifier::new(algorithm);
        group.bench_with_input(BenchmarkId::from_parameter(algorithm), &query, |bench, query| {
            bench.iter(|| {
                let count = unifier
                    .unify(query, snapshot.candidates(query), &Substitution::new())
                    .count();
                black_box(count)
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_ground_heavy, bench_nested);
criterion_main!(benches);
