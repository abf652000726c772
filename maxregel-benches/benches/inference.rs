use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};
use maxregel::{
    config::InferenceConfig,
    fact_set::FactSet,
    inference::infer,
    predicate::Predicate,
    rule::build::{filter, filter_part, from, let_, script},
    store::memory::MemoryStore,
    term,
    test_utils::simpsons,
    tracer::NoTracer,
};

fn population(n: i64) -> FactSet {
    FactSet::from_terms(
        "people",
        (0..n).map(|i| term! {"id" => i, "age" => i % 90, "group" => i % 7}),
    )
}

pub fn santa_benchmark(c: &mut Criterion) {
    let rules = vec![
        let_(
            "old_males",
            from("simpsons").then(filter(
                Predicate::field_eq("gender", "male").and(Predicate::field_gt("age", 40)),
            )),
        ),
        let_(
            "santa_candidates",
            from("old_males").then(filter(
                Predicate::field_eq("hair", "middle"),
            )),
        ),
    ];
    let facts = simpsons();

    c.bench_function("santa", |b| {
        b.iter(|| infer(&facts, &rules, NoTracer, InferenceConfig::default()))
    });
}

pub fn script_benchmark(c: &mut Criterion) {
    let facts = population(1_000);
    let rules = script([
        let_("adults", filter_part("people", "age", ">=", 18).unwrap()),
        let_("seniors", filter_part("adults", "age", ">", 65).unwrap()),
    ]);

    c.bench_function("script", |b| b.iter(|| rules.apply(&facts)));
}

pub fn union_benchmark(c: &mut Criterion) {
    let parts: Vec<FactSet> = (0..50).map(|i| population(20).set_part(&format!("p{i}"))).collect();

    c.bench_function("union_chain", |b| {
        b.iter(|| {
            parts
                .iter()
                .fold(FactSet::Empty, |total, part| total.union(part))
                .size()
        })
    });
}

pub fn filter_benchmark(c: &mut Criterion) {
    let rows: Vec<_> = population(1_000).iter().map(|fact| fact.term().clone()).collect();
    let external = FactSet::external(Arc::new(MemoryStore::new().with_table("people", rows)));
    let in_memory = population(1_000);
    let predicate = Predicate::field_eq("group", 3);

    c.bench_function("filter_in_memory", |b| {
        b.iter(|| in_memory.filter(&predicate).map(|facts| facts.size()))
    });
    c.bench_function("filter_pushed_down", |b| {
        b.iter(|| external.filter(&predicate).map(|facts| facts.size()))
    });
}

criterion_group!(
    benches,
    santa_benchmark,
    script_benchmark,
    union_benchmark,
    filter_benchmark
);
criterion_main!(benches);
