use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use gcodeflow_core::ModalState;
use gcodeflow_pipeline::{segment_count, ArcExpander, CommandProcessor, PipelineDriver};
use gcodeflow_pipeline::{ProcessorRegistry, StageChain};
use gcodeflow_settings::{PipelineSettings, StageDescriptor};
use std::sync::Arc;

fn program(lines: usize) -> Vec<String> {
    (0..lines)
        .map(|i| match i % 4 {
            0 => format!("G1 X{:.5} Y{:.5} F1200 (pass {})", i as f64 * 0.1, i as f64 * 0.2, i),
            1 => format!("G2 X{} Y0 I5 J0", i % 7),
            2 => "  G0   Z5  ".to_string(),
            _ => "M3 S10000".to_string(),
        })
        .collect()
}

fn chain() -> StageChain {
    let settings = PipelineSettings::new()
        .with_stage(StageDescriptor::new("comment"))
        .with_stage(StageDescriptor::new("whitespace"))
        .with_stage(StageDescriptor::new("spindle_delay").with_argument("delay", 1))
        .with_stage(StageDescriptor::new("decimal").with_argument("precision", 3))
        .with_stage(StageDescriptor::new("arc_expander"))
        .with_stage(StageDescriptor::new("line_splitter").with_argument("max_length", 40));
    StageChain::build(&settings, &ProcessorRegistry::builtin()).expect("bench chain")
}

fn bench_chain(c: &mut Criterion) {
    let chain = Arc::new(chain());
    let mut group = c.benchmark_group("chain");

    for lines in [100, 1_000, 10_000] {
        let input = program(lines);
        group.bench_with_input(BenchmarkId::new("validate", lines), &input, |b, input| {
            b.iter(|| {
                let mut driver = PipelineDriver::new(Arc::clone(&chain));
                black_box(driver.validate(input.iter()))
            })
        });
    }

    group.finish();
}

fn bench_arcs(c: &mut Criterion) {
    let mut state = ModalState::default();
    state.position.x = 10.0;

    c.bench_function("segment_count", |b| {
        b.iter(|| segment_count(black_box(6.2), black_box(25.0), black_box(0.001)))
    });

    for tolerance in [0.1, 0.01, 0.001] {
        let arc = ArcExpander::new(tolerance, 4);
        c.bench_function(&format!("expand_full_circle_tol_{}", tolerance), |b| {
            b.iter(|| arc.process(black_box("G2 X10 Y0 I-10 J0"), &state))
        });
    }
}

criterion_group!(benches, bench_chain, bench_arcs);
criterion_main!(benches);
