use chrono::{DateTime, Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use soreness_risk::processing::{AthleteDayInput, DailyRiskProcessor};
use soreness_risk::soreness::{QualitativeFlags, SorenessReport};
use soreness_risk::{
    BodyPartLocation, HistoricSorenessTracker, SessionKind, Side, SorenessRecord, SportName,
    TrainingLoadCalculator, TrainingSession,
};

/// Benchmarks for the daily pass and its heaviest stages
///
/// Inputs scale with the number of tracked body parts and logged sessions.

fn event_date() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 3, 20, 0, 0).unwrap()
}

fn create_benchmark_sessions(days: i64) -> Vec<TrainingSession> {
    let sports = [SportName::Soccer, SportName::DistanceRunning, SportName::Cycling];
    (0..days)
        .map(|day| TrainingSession {
            id: format!("session-{}", day),
            kind: SessionKind::Practice,
            sport_name: sports[(day % 3) as usize],
            event_date: event_date() - Duration::days(day) - Duration::hours(4),
            duration_minutes: Some(45.0 + (day % 4) as f64 * 15.0),
            session_rpe: Some(3.0 + (day % 6) as f64),
            power_load: if day % 2 == 0 { Some(250.0 + day as f64) } else { None },
        })
        .collect()
}

fn create_benchmark_reports(parts: usize) -> Vec<SorenessReport> {
    BodyPartLocation::ALL
        .iter()
        .cycle()
        .take(parts)
        .enumerate()
        .map(|(i, location)| SorenessReport {
            body_part: location.code(),
            side: if location.is_bilateral() { 1 + (i % 2) as u8 } else { 0 },
            pain: i % 3 == 0,
            severity: Some((1 + i % 5) as f64),
            movement: None,
            flags: QualitativeFlags::default(),
            reported_at: event_date() - Duration::hours(3),
        })
        .collect()
}

fn bench_daily_pass(c: &mut Criterion) {
    let processor = DailyRiskProcessor::new();
    let mut group = c.benchmark_group("Daily Pass");

    for &parts in &[1, 8, 38] {
        let mut input = AthleteDayInput::new(event_date());
        input.soreness_reports = create_benchmark_reports(parts);
        input.sessions = create_benchmark_sessions(35);
        input.expected_weekly_workouts = Some(5);

        group.throughput(Throughput::Elements(parts as u64));
        group.bench_with_input(BenchmarkId::new("process", parts), &input, |b, input| {
            b.iter(|| processor.process(black_box(input.clone())));
        });
    }

    group.finish();
}

fn bench_historic_tracking(c: &mut Criterion) {
    let tracker = HistoricSorenessTracker::new();
    let mut group = c.benchmark_group("Historic Soreness");

    for &days in &[7, 30, 90] {
        group.throughput(Throughput::Elements(days as u64));
        group.bench_with_input(BenchmarkId::new("update_daily", days), &days, |b, &days| {
            b.iter(|| {
                let mut states = Vec::new();
                for day in 0..days {
                    let at = event_date() + Duration::days(day);
                    let records = [
                        SorenessRecord::new(BodyPartLocation::Knee, Side::Right, true, 3.0, at),
                        SorenessRecord::new(BodyPartLocation::Knee, Side::Left, false, 2.0, at),
                    ];
                    tracker.update_daily(&mut states, &records, &[], at);
                }
                black_box(states)
            });
        });
    }

    group.finish();
}

fn bench_load_metrics(c: &mut Criterion) {
    let calculator = TrainingLoadCalculator::new();
    let sessions = create_benchmark_sessions(35);
    let history = DailyRiskProcessor::bucket_sessions(&sessions, event_date());

    c.bench_function("summarize_load", |b| {
        b.iter(|| calculator.summarize(black_box(&history)));
    });
}

criterion_group!(benches, bench_daily_pass, bench_historic_tracking, bench_load_metrics);
criterion_main!(benches);
