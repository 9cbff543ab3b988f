//! Benchmarks for analysis and generation over many annotated types, cold
//! and with a warm generation cache.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use sigmux::{CancellationToken, Compilation, SigmuxConfig, SignalsGenerator, Workspace};
use std::hint::black_box;
use std::path::PathBuf;

fn source(i: usize) -> String {
    format!(
        r#"using SharpSenz;

namespace Bench
{{
    [SignalsSource]
    public partial class Job{i}
    {{
        public partial class SignalsMultiplex {{ }}
        public readonly SignalsMultiplex signals = new SignalsMultiplex();

        public int Run(int a, string label)
        {{
            // SIG: Started
            signals.Run_Started();
            int b = a * 2;
            // SIG: Doubled
            signals.Doubled(a, b);
            if (b > 10)
            {{
                // SIG: Large
                signals.Run_Large();
            }}
            return b;
        }}
    }}
}}
"#
    )
}

fn sources(count: usize) -> Vec<(PathBuf, String)> {
    (0..count)
        .map(|i| (PathBuf::from(format!("Job{i}.cs")), source(i)))
        .collect()
}

fn bench_analyze(c: &mut Criterion) {
    let mut group = c.benchmark_group("analyze");
    for count in [10, 100] {
        let workspace = Workspace::from_sources(SigmuxConfig::default(), sources(count))
            .expect("default config");
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &workspace, |b, ws| {
            b.iter(|| black_box(ws.analyze(&CancellationToken::new()).expect("analysis")))
        });
    }
    group.finish();
}

fn bench_generate(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate");
    for count in [10, 100] {
        let compilation = Compilation::from_sources(sources(count));
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("cold", count), &compilation, |b, comp| {
            b.iter(|| {
                let generator = SignalsGenerator::new(SigmuxConfig::default()).expect("config");
                black_box(generator.generate(comp, &CancellationToken::new()).expect("generation"))
            })
        });
        let warm = SignalsGenerator::new(SigmuxConfig::default()).expect("config");
        group.bench_with_input(BenchmarkId::new("warm", count), &compilation, |b, comp| {
            b.iter(|| black_box(warm.generate(comp, &CancellationToken::new()).expect("generation")))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_analyze, bench_generate);
criterion_main!(benches);
