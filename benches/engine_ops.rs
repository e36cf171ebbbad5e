use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use rand::{rngs::StdRng, SeedableRng};
use snake_2048::engine::{Board, Move};
use std::hint::black_box;

fn corpus() -> Vec<Board> {
    let mut rng = StdRng::seed_from_u64(42);
    let mut boards = Vec::new();
    // Empty and two-tile starts
    boards.push(Board::EMPTY);
    let mut b = Board::EMPTY.with_random_tile(&mut rng).with_random_tile(&mut rng);
    boards.push(b);
    // Derive a variety of densities deterministically
    let seq = [Move::Left, Move::Up, Move::Right, Move::Down];
    for i in 0..20 {
        let dir = seq[i % seq.len()];
        let nb = b.shift(dir);
        if nb != b { b = nb.with_random_tile(&mut rng); }
        boards.push(b);
    }
    boards
}

fn bench_shift(c: &mut Criterion) {
    let boards = corpus();
    for dir in Move::ALL {
        c.bench_function(&format!("shift/{dir}"), |bch| {
            bch.iter(|| {
                let mut acc = 0u64;
                for &bd in &boards { acc = acc.wrapping_add(bd.shift(dir).tile(0, 0) as u64); }
                black_box(acc)
            })
        });
    }
}

fn bench_make_move_and_insert(c: &mut Criterion) {
    c.bench_function("board/with_random_tile", |bch| {
        bch.iter_batched(
            || (Board::EMPTY, StdRng::seed_from_u64(7)),
            |(mut bd, mut rng)| {
                for _ in 0..16 { bd = bd.with_random_tile(&mut rng); }
                black_box(bd)
            },
            BatchSize::SmallInput,
        )
    });
    c.bench_function("board/make_move_left", |bch| {
        bch.iter_batched(
            || {
                let mut rng = StdRng::seed_from_u64(9);
                let bd = Board::EMPTY.with_random_tile(&mut rng).with_random_tile(&mut rng);
                (bd, rng)
            },
            |(mut bd, mut rng)| {
                for _ in 0..64 { bd = bd.make_move(Move::Left, &mut rng); }
                black_box(bd)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_queries(c: &mut Criterion) {
    let boards = corpus();
    c.bench_function("query/is_game_over", |bch| {
        bch.iter(|| boards.iter().filter(|bd| bd.is_game_over()).count())
    });
    c.bench_function("query/empty_cells", |bch| {
        bch.iter(|| {
            let mut acc = 0usize;
            for &bd in &boards { acc ^= bd.empty_cells().len(); }
            black_box(acc)
        })
    });
    c.bench_function("query/highest_tile", |bch| {
        bch.iter(|| {
            let mut acc = 0u32;
            for &bd in &boards { acc ^= bd.highest_tile(); }
            black_box(acc)
        })
    });
}

criterion_group!(engine_ops, bench_shift, bench_make_move_and_insert, bench_queries);
criterion_main!(engine_ops);
