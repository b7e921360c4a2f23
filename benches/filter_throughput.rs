use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use qsoprint::DecodedLine;
use qsoprint::filter::{ConversationFilter, FilterSettings, TerminationSet};
use std::hint::black_box;
use std::time::{Duration, Instant};

/// A busy band: mostly unrelated traffic with a QSO for K1ABC every `every` lines.
fn synthetic_traffic(lines: usize, every: usize) -> Vec<(Duration, String)> {
    let chatter = [
        "CQ CQ DE W2ZZZ",
        "TEST N0CALL",
        "QRL?",
        "5NN TU",
        "GM OM UR RST 579 579",
    ];
    let qso = [
        "K1ABC DE W2ZZZ",
        "W2ZZZ DE K1ABC GM UR 599",
        "NAME JOHN QTH BOSTON",
        "TNX FER QSO 73",
    ];

    (0..lines)
        .map(|i| {
            let offset = Duration::from_millis(i as u64 * 700);
            let cycle = i % every;
            let text = if cycle < qso.len() {
                qso[cycle]
            } else {
                chatter[i % chatter.len()]
            };
            (offset, text.to_string())
        })
        .collect()
}

fn run_filter(settings: &FilterSettings, traffic: &[(Duration, String)]) -> usize {
    let base = Instant::now();
    let mut filter = ConversationFilter::new(settings.clone());
    traffic
        .iter()
        .map(|(offset, text)| filter.step(DecodedLine::new(text.clone(), base + *offset)).len())
        .sum()
}

fn bench_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter_step");
    let settings = FilterSettings::new(true, "K1ABC")
        .with_window(Duration::from_secs(15))
        .with_termination(TerminationSet::new(["73", "SK", "RR", "DIT DIT"]));

    for every in [8usize, 64, 512] {
        let traffic = synthetic_traffic(10_000, every);
        group.throughput(Throughput::Elements(traffic.len() as u64));
        group.bench_with_input(BenchmarkId::new("qso_every", every), &traffic, |b, traffic| {
            b.iter(|| run_filter(black_box(&settings), black_box(traffic)))
        });
    }

    let traffic = synthetic_traffic(10_000, 64);
    group.bench_function("disabled", |b| {
        let disabled = FilterSettings::disabled();
        b.iter(|| run_filter(black_box(&disabled), black_box(&traffic)))
    });

    group.finish();
}

fn bench_termination_matching(c: &mut Criterion) {
    let set = TerminationSet::new(["73", "SK", "RR", "DIT DIT", "END OF CALL", "END OF CONTACT"]);
    let lines = [
        "TNX FER QSO 73",
        "GM OM UR RST 579 579 NAME JOHN QTH BOSTON",
        "END OF CONTACT",
        "W173ABC DE K1ABC",
    ];

    c.bench_function("termination_matches", |b| {
        b.iter(|| {
            lines
                .iter()
                .filter(|line| set.matches(black_box(line)))
                .count()
        })
    });
}

criterion_group!(benches, bench_filter, bench_termination_matching);
criterion_main!(benches);
