//! Benchmarks for the reader hot paths
//!
//! - verified row copy on a poll with a new tick
//! - typed extraction from an accepted snapshot
//! - session text path queries
//!
//! Platform: Cross-platform (drives an in-process simulated writer)

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use ira_telemetry::test_utils::SimulatedSim;
use ira_telemetry::{
    PollOutcome, SessionText, Snapshot, SnapshotDirectory, TelemetryConnection, VariableDescriptor, VariableType,
    query,
};
use std::hint::black_box;

fn bench_poll(c: &mut Criterion) {
    let mut group = c.benchmark_group("poll");

    for row_len in [40usize, 4096, 16384] {
        let sim = if row_len == 40 {
            SimulatedSim::standard()
        } else {
            let filler = VariableDescriptor {
                name: "Filler".to_string(),
                kind: VariableType::Char,
                offset: 0,
                count: row_len,
                count_as_time: false,
                description: String::new(),
                unit: String::new(),
            };
            SimulatedSim::new(&[filler], row_len)
        };
        let row = vec![7u8; row_len];
        let mut conn = TelemetryConnection::new(sim.platform());
        let mut snapshot = Snapshot::new();
        let _ = conn.poll_non_blocking(Some(&mut snapshot)).expect("resync poll");

        let mut tick = 0;
        group.bench_with_input(BenchmarkId::new("verified_copy", row_len), &row_len, |b, _| {
            b.iter(|| {
                tick += 1;
                sim.publish(tick, &row);
                let outcome = conn.poll_non_blocking(Some(&mut snapshot)).expect("poll");
                assert_eq!(outcome, PollOutcome::NewData);
                black_box(snapshot.len())
            })
        });

        group.bench_with_input(BenchmarkId::new("same_tick", row_len), &row_len, |b, _| {
            b.iter(|| black_box(conn.poll_non_blocking(Some(&mut snapshot)).expect("poll")))
        });
    }

    group.finish();
}

fn bench_extraction(c: &mut Criterion) {
    let sim = SimulatedSim::standard();
    let mut conn = TelemetryConnection::new(sim.platform());
    let mut snapshot = Snapshot::new();
    let _ = conn.poll_non_blocking(Some(&mut snapshot)).expect("resync poll");
    sim.publish_next();
    let _ = conn.poll_non_blocking(Some(&mut snapshot)).expect("poll");

    let directory = SnapshotDirectory::load(&conn).expect("directory");
    let rpm = directory.require("RPM").expect("RPM").clone();
    let pct = directory.require("CarIdxLapDistPct").expect("CarIdxLapDistPct").clone();

    let mut group = c.benchmark_group("extraction");
    group.bench_function("f32_checked", |b| b.iter(|| black_box(snapshot.value::<f32>(&rpm, 0).expect("rpm"))));
    group.bench_function("f32_raw", |b| b.iter(|| black_box(snapshot.read_float(rpm.offset, 0).expect("rpm"))));
    group.bench_function("f32_array", |b| b.iter(|| black_box(snapshot.values::<f32>(&pct).expect("pct"))));
    group.bench_function("find_by_name", |b| {
        b.iter(|| black_box(directory.find_by_name(black_box("CarIdxLapDistPct")).is_some()))
    });
    group.finish();
}

fn session_document(drivers: usize) -> String {
    let mut doc = String::from("---\nWeekendInfo:\n TrackName: spa up\n TrackID: 163\n\nDriverInfo:\n DriverCarIdx: 0\n Drivers:\n");
    for idx in 0..drivers {
        doc.push_str(&format!(
            " - CarIdx: {idx}\n   UserName: Driver {idx}\n   CarNumber: \"{idx}\"\n   IRating: {}\n",
            1500 + idx
        ));
    }
    doc.push_str("\n...\n");
    doc
}

fn bench_session_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("session_query");

    for drivers in [8usize, 64] {
        let doc = session_document(drivers);
        let text = SessionText::new(doc.as_bytes(), 1);
        let last = format!("DriverInfo:Drivers:CarIdx:{{{}}}IRating", drivers - 1);

        group.bench_with_input(BenchmarkId::new("top_level", drivers), &drivers, |b, _| {
            b.iter(|| black_box(query(doc.as_bytes(), "WeekendInfo:TrackID").expect("TrackID")))
        });
        group.bench_with_input(BenchmarkId::new("last_driver", drivers), &drivers, |b, _| {
            b.iter(|| black_box(text.as_int(&last).expect("IRating")))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_poll, bench_extraction, bench_session_query);
criterion_main!(benches);
