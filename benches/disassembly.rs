//! Benchmarks for bytecode disassembly and branch graph construction.
//!
//! Measures the bytecode fallback path in isolation:
//! - Decoding instruction streams of varying shape
//! - Building the branch graph with eager dominance

extern crate cilshader;

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use cilshader::disassembler::MethodDisassembly;
use cilshader::graph::BranchGraphBuilder;
use std::hint::black_box;

/// A straight-line body: ldc.r4; stloc.0; ldloc.0; ret, repeated.
fn straight_line_body(repeats: usize) -> Vec<u8> {
    let mut code = Vec::with_capacity(repeats * 7 + 1);
    for _ in 0..repeats {
        code.extend_from_slice(&[0x22, 0x00, 0x00, 0x80, 0x3F]); // ldc.r4 1.0
        code.push(0x0A); // stloc.0
        code.push(0x06); // ldloc.0
        code.push(0x26); // pop
    }
    code.push(0x2A); // ret
    code
}

/// A chain of counted loops, each a separate back edge.
fn loop_heavy_body(loops: usize) -> Vec<u8> {
    let mut code = Vec::new();
    for _ in 0..loops {
        code.extend_from_slice(&[
            0x16, // ldc.i4.0
            0x0A, // stloc.0
            0x2B, 0x04, // br.s -> condition
            0x06, // body: ldloc.0
            0x17, // ldc.i4.1
            0x58, // add
            0x0A, // stloc.0
            0x06, // condition: ldloc.0
            0x1E, // ldc.i4.8
            0x32, 0xF8, // blt.s -> body
        ]);
    }
    code.push(0x2A); // ret
    code
}

/// Benchmark decoding a long straight-line instruction stream.
fn bench_decode_straight_line(c: &mut Criterion) {
    let code = straight_line_body(256);

    let mut group = c.benchmark_group("disassembly");
    group.throughput(Throughput::Bytes(code.len() as u64));
    group.bench_function("decode_straight_line", |b| {
        b.iter(|| {
            let disasm = MethodDisassembly::from_bytecode(black_box(&code)).unwrap();
            black_box(disasm)
        });
    });
    group.finish();
}

/// Benchmark decoding a branch-dense stream.
fn bench_decode_loops(c: &mut Criterion) {
    let code = loop_heavy_body(64);

    let mut group = c.benchmark_group("disassembly");
    group.throughput(Throughput::Bytes(code.len() as u64));
    group.bench_function("decode_loops", |b| {
        b.iter(|| {
            let disasm = MethodDisassembly::from_bytecode(black_box(&code)).unwrap();
            black_box(disasm)
        });
    });
    group.finish();
}

/// Benchmark branch graph construction, including the dominance fixed point.
fn bench_branch_graph(c: &mut Criterion) {
    let code = loop_heavy_body(64);
    let disasm = MethodDisassembly::from_bytecode(&code).unwrap();

    c.bench_function("branch_graph_with_dominance", |b| {
        b.iter(|| {
            let graph = BranchGraphBuilder::build(black_box(&disasm)).unwrap();
            black_box(graph)
        });
    });
}

criterion_group!(
    benches,
    bench_decode_straight_line,
    bench_decode_loops,
    bench_branch_graph
);
criterion_main!(benches);
