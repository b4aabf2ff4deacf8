//! Benchmarks for the 15-puzzle solver.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use fifteen::walking::WalkingDistance;
use fifteen::{Board, Direction, HeuristicKind, Solver};

fn scrambled_board() -> Board {
    use Direction::*;
    let mut board = Board::from_tiles(&fifteen::board::GOAL).unwrap();
    for dir in [
        Up, Left, Down, Left, Up, Up, Right, Down, Left, Up, Right, Right, Down, Left,
    ] {
        board = board.shift(dir).unwrap();
    }
    board
}

/// Benchmark building the walking-distance tables from scratch.
fn bench_walking_distance_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("walking_distance");
    group.sample_size(10);
    group.bench_function("build", |b| b.iter(WalkingDistance::build));
    group.finish();
}

/// Benchmark the composite heuristic on a fixed board.
fn bench_heuristic(c: &mut Criterion) {
    let solver = Solver::new(HeuristicKind::WdMd);
    let board = scrambled_board();

    c.bench_function("heuristic_wdmd", |b| {
        b.iter(|| solver.heuristic(black_box(&board)))
    });
}

/// Benchmark a complete optimal solve of a moderate scramble.
fn bench_solve(c: &mut Criterion) {
    let solver = Solver::new(HeuristicKind::WdMd);
    let board = scrambled_board();

    let mut group = c.benchmark_group("solve");
    group.sample_size(10);
    group.bench_function("wdmd_scramble", |b| {
        b.iter(|| solver.find_optimal_path(black_box(&board)))
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_walking_distance_build,
    bench_heuristic,
    bench_solve
);
criterion_main!(benches);
