#[macro_use]
extern crate criterion;

use criterion::{BenchmarkId, Criterion};
use lazytreap::{script, AggregateKind, ImplicitTreap};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Clone, Copy)]
enum Step {
    Insert(usize, i64),
    Erase(usize),
    Add(usize, usize, i64),
    Reverse(usize, usize),
    Sum(usize, usize),
}

// A fixed mix of edits, updates and queries over a sequence of roughly `size` elements
fn generate_workload(size: usize, steps: usize) -> Vec<Step> {
    let mut rng = StdRng::seed_from_u64(0xBEEF);
    let mut len = size;
    (0..steps)
        .map(|_| {
            let roll = rng.gen_range(0..10);
            if roll < 2 || len < 2 {
                len += 1;
                Step::Insert(rng.gen_range(0..len), rng.gen_range(-1000..1000))
            } else if roll < 3 {
                len -= 1;
                Step::Erase(rng.gen_range(0..=len))
            } else {
                let l = rng.gen_range(0..len);
                let r = rng.gen_range(l..len);
                match roll {
                    3..=5 => Step::Add(l, r, rng.gen_range(-50..50)),
                    6 | 7 => Step::Reverse(l, r),
                    _ => Step::Sum(l, r),
                }
            }
        })
        .collect()
}

fn run_treap(initial: &[i64], workload: &[Step]) -> i64 {
    let mut treap = ImplicitTreap::<i64>::builder()
        .seed(7)
        .build_from(initial.iter().copied());
    let mut acc = 0;
    for &step in workload {
        match step {
            Step::Insert(pos, value) => {
                treap.insert_at(pos, value).unwrap();
            }
            Step::Erase(pos) => acc += treap.erase_at(pos).unwrap(),
            Step::Add(l, r, delta) => treap.range_add(l..=r, delta).unwrap(),
            Step::Reverse(l, r) => treap.range_reverse(l..=r).unwrap(),
            Step::Sum(l, r) => acc += treap.range_query(l..=r, AggregateKind::Sum).unwrap(),
        }
    }
    acc
}

fn run_vec(initial: &[i64], workload: &[Step]) -> i64 {
    let mut vec = initial.to_vec();
    let mut acc = 0;
    for &step in workload {
        match step {
            Step::Insert(pos, value) => vec.insert(pos, value),
            Step::Erase(pos) => acc += vec.remove(pos),
            Step::Add(l, r, delta) => vec[l..=r].iter_mut().for_each(|v| *v += delta),
            Step::Reverse(l, r) => vec[l..=r].reverse(),
            Step::Sum(l, r) => acc += vec[l..=r].iter().sum::<i64>(),
        }
    }
    acc
}

fn bench_mixed_workload(c: &mut Criterion) {
    let mut group = c.benchmark_group("Mixed workload, 10 000 operations");
    for size in [1_000usize, 10_000, 100_000] {
        let initial: Vec<i64> = (0..size as i64).collect();
        let workload = generate_workload(size, 10_000);
        group.bench_with_input(BenchmarkId::new("ImplicitTreap", size), &size, |b, _| {
            b.iter(|| run_treap(&initial, &workload))
        });
        group.bench_with_input(BenchmarkId::new("Vec", size), &size, |b, _| {
            b.iter(|| run_vec(&initial, &workload))
        });
    }
    group.finish();
}

fn bench_build(c: &mut Criterion) {
    c.bench_function("Build a sequence of one million elements", |b| {
        b.iter(|| {
            let treap: ImplicitTreap<i64> = (0..1_000_000).collect();
            treap.len()
        })
    });
}

fn bench_script(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0xCAFE);
    let source: String = (0..5_000)
        .map(|_| {
            let l = rng.gen_range(0..500);
            let r = rng.gen_range(l..1000);
            match rng.gen_range(0..3) {
                0 => format!("add {l} {r} {}\n", rng.gen_range(-9..10)),
                1 => format!("reverse {l} {r}\n"),
                _ => format!("max {l} {r}\n"),
            }
        })
        .collect();
    c.bench_function("Parse and run a 5 000 line script over 1 000 elements", |b| {
        b.iter(|| {
            let commands = script::parse(&source).unwrap();
            let mut treap = ImplicitTreap::<i64>::builder().seed(1).build_from(0..1000);
            script::run(&mut treap, &commands).unwrap().len()
        })
    });
}

criterion_group!(benches, bench_mixed_workload, bench_build, bench_script);
criterion_main!(benches);
