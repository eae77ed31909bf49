//! Benchmarks the gas projection of a few representative opcodes, and the
//! lowering of a stream of simple opcodes into tables.

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use ethereum_types::{Address, U256};
use zk_tracer::opcode::OpCode;
use zk_tracer::structlog::{AccountFacts, OpcodeEvent, StorageFacts, TransactionStart};
use zk_tracer::witness::state::OperandSnapshot;
use zk_tracer::{gas, TraceEvent, Tracer, TracerConfig};

fn snapshot(opcode: OpCode, stack_top_first: &[u64]) -> OperandSnapshot {
    OperandSnapshot {
        opcode,
        stack: stack_top_first.iter().rev().map(|&v| U256::from(v)).collect(),
        gas: 1_000_000,
        memory_size: 1024,
        ..Default::default()
    }
}

fn projection_benchmark(c: &mut Criterion) {
    let cases = [
        ("add", snapshot(OpCode::Add, &[1, 2])),
        ("keccak256", snapshot(OpCode::Keccak256, &[0, 4096])),
        (
            "sstore",
            OperandSnapshot {
                storage: Some(StorageFacts {
                    original: U256::one(),
                    current: U256::from(2u64),
                    warm: false,
                }),
                ..snapshot(OpCode::SStore, &[0, 0])
            },
        ),
        (
            "call",
            OperandSnapshot {
                account: Some(AccountFacts::default()),
                ..snapshot(OpCode::Call, &[100_000, 0xca11, 1, 0, 64, 64, 32])
            },
        ),
    ];

    let mut group = c.benchmark_group("gas_projection");
    for (name, snapshot) in &cases {
        group.bench_with_input(BenchmarkId::from_parameter(name), snapshot, |b, snapshot| {
            b.iter(|| gas::project(snapshot))
        });
    }
    group.finish();
}

fn events(opcodes: usize) -> Vec<TraceEvent> {
    let mut events = vec![TraceEvent::TransactionStart(TransactionStart {
        sender: Address::repeat_byte(0xaa),
        recipient: Some(Address::repeat_byte(0xbb)),
        gas: 10_000_000,
        ..Default::default()
    })];
    events.extend((0..opcodes).map(|i| {
        TraceEvent::Opcode(OpcodeEvent {
            pc: i as u64,
            op: 0x01,
            gas: 10_000_000 - 3 * i as u64,
            gas_cost: 3,
            stack: vec![U256::from(i), U256::one()],
            ..Default::default()
        })
    }));
    events
}

fn trace_writer_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("trace_writer");
    group.sample_size(10);
    for opcodes in [1_000, 10_000] {
        let events = events(opcodes);
        group.bench_function(BenchmarkId::from_parameter(opcodes), |b| {
            b.iter_batched(
                || Tracer::new(TracerConfig::default()),
                |mut tracer| {
                    tracer.handle_events(&events).unwrap();
                    tracer.finalize().unwrap()
                },
                BatchSize::LargeInput,
            )
        });
    }
    group.finish();
}

criterion_group!(benches, projection_benchmark, trace_writer_benchmark);
criterion_main!(benches);
