use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pegsol_core::{Board, Variant};
use pegsol_engine::{exhaust, generate_moves, SearchConfig, Solver};

fn bench_generate_moves(c: &mut Criterion) {
    let boards = [
        ("standard_english", Board::standard(Variant::English)),
        ("standard_european", Board::standard(Variant::European)),
        (
            "midgame",
            Board::with_pegs(Variant::English, &[10, 16, 17, 21, 24, 25, 26, 32, 37]).unwrap(),
        ),
    ];

    for (name, board) in boards {
        c.bench_function(&format!("generate_moves_{}", name), |b| {
            b.iter(|| generate_moves(black_box(&board)))
        });
    }
}

fn bench_search(c: &mut Criterion) {
    let board = Board::with_pegs(Variant::English, &[10, 16, 17, 21, 24, 25, 26, 32, 37]).unwrap();
    let solver = Solver::new(SearchConfig::default()).unwrap();

    c.bench_function("exhaust_midgame", |b| b.iter(|| exhaust(black_box(board))));

    c.bench_function("is_winnable_midgame", |b| {
        b.iter(|| solver.is_winnable(black_box(&board)))
    });
}

criterion_group!(benches, bench_generate_moves, bench_search);
criterion_main!(benches);
