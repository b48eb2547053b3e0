use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use spectra_core::{
    CancelFlag, Family, Graph, Tolerances, analyze_characteristic_polynomial, exact_polynomial,
    family_edges, symmetric_eigenvalues, symmetric_eigenvalues_jacobi,
};

fn cycle(n: usize) -> Graph {
    Graph::new(n, &family_edges(Family::Cycle(n)).unwrap_or_default()).unwrap()
}

fn bench_solvers(c: &mut Criterion) {
    let tol = Tolerances::default();
    let mut group = c.benchmark_group("symmetric_solver");
    for n in [8, 16, 32] {
        let m = cycle(n).adjacency_matrix().to_real();
        group.bench_with_input(BenchmarkId::new("qr", n), &m, |b, m| {
            b.iter(|| symmetric_eigenvalues(black_box(m), &tol))
        });
        group.bench_with_input(BenchmarkId::new("jacobi", n), &m, |b, m| {
            b.iter(|| symmetric_eigenvalues_jacobi(black_box(m), &tol))
        });
    }
    group.finish();
}

fn bench_polynomial(c: &mut Criterion) {
    let tol = Tolerances::default();
    let cancel = CancelFlag::new();
    let mut group = c.benchmark_group("characteristic_polynomial");
    for n in [6, 10, 14] {
        let m = cycle(n).adjacency_matrix();
        group.bench_with_input(BenchmarkId::new("exact", n), &m, |b, m| {
            b.iter(|| exact_polynomial(black_box(m)))
        });
        group.bench_with_input(BenchmarkId::new("analyze", n), &m, |b, m| {
            b.iter(|| analyze_characteristic_polynomial(black_box(m), &tol, &cancel))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_solvers, bench_polynomial);
criterion_main!(benches);
