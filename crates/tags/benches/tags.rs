//! Criterion benchmarks for the comment codec and tag merge.
//!
//! Run: cargo bench -p tags --bench tags
//!
//! Results show:
//!   comment_decode_*   — payload parse cost vs entry count
//!   comment_encode_*   — serialisation cost vs entry count
//!   merge_*            — merge pass over a block with repeated artist IDs

#![allow(
    clippy::unwrap_used, // benchmark helpers use unwrap for brevity
    clippy::expect_used,
    clippy::panic,
    missing_docs, // criterion_group! macro generates undocumented items
)]

use std::path::Path;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tags::{merge_tags, CommentBlock, MergeTargets};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn make_block(entries: usize) -> CommentBlock {
    let comments = (0..entries)
        .map(|n| match n % 4 {
            0 => format!("MUSICBRAINZ_ARTISTID={n:08x}-0000-0000-0000-000000000000"),
            1 => format!("TITLE=Track {n:04}"),
            2 => format!("MUSICBRAINZ_TRACKID={n:08x}-1111-1111-1111-111111111111"),
            _ => format!("COMMENT=entry {n}"),
        })
        .collect();
    CommentBlock::new("reference libFLAC 1.4.3 20230623", comments)
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("comment");
    for entries in [16usize, 256, 4096] {
        let block = make_block(entries);
        let bytes = block.encode().unwrap();
        group.bench_with_input(
            BenchmarkId::new("decode", entries),
            &bytes,
            |b, bytes| b.iter(|| CommentBlock::decode(black_box(bytes)).unwrap()),
        );
        group.bench_with_input(
            BenchmarkId::new("encode", entries),
            &block,
            |b, block| b.iter(|| black_box(block).encode().unwrap()),
        );
    }
    group.finish();
}

fn bench_merge(c: &mut Criterion) {
    let targets = MergeTargets::default();
    let mut group = c.benchmark_group("merge");
    for entries in [16usize, 256, 4096] {
        let block = make_block(entries);
        group.bench_with_input(BenchmarkId::from_parameter(entries), &block, |b, block| {
            b.iter(|| merge_tags(Path::new("bench.flac"), black_box(block), &targets))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_codec, bench_merge);
criterion_main!(benches);
