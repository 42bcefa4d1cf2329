use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, TimeDelta, TimeZone, Utc};

use shiftbook::clock::FixedClock;
use shiftbook::config::Settings;
use shiftbook::engine::generate_series;
use shiftbook::limits::Limits;
use shiftbook::model::{Frequency, Repetition, ShiftTemplate};
use shiftbook::store::ShiftStore;

const ROUNDS: usize = 500;

fn percentile(sorted: &[Duration], p: f64) -> Duration {
    if sorted.is_empty() {
        return Duration::ZERO;
    }
    let idx = ((sorted.len() as f64) * p / 100.0) as usize;
    sorted[idx.min(sorted.len() - 1)]
}

fn print_latency(label: &str, latencies: &mut [Duration]) {
    if latencies.is_empty() {
        return;
    }
    latencies.sort();
    let total: Duration = latencies.iter().sum();
    let avg = total / latencies.len() as u32;
    println!("  {label}:");
    println!(
        "    n={}, avg={:.3}ms, p50={:.3}ms, p95={:.3}ms, p99={:.3}ms, max={:.3}ms",
        latencies.len(),
        avg.as_secs_f64() * 1000.0,
        percentile(latencies, 50.0).as_secs_f64() * 1000.0,
        percentile(latencies, 95.0).as_secs_f64() * 1000.0,
        percentile(latencies, 99.0).as_secs_f64() * 1000.0,
        latencies[latencies.len() - 1].as_secs_f64() * 1000.0,
    );
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
}

fn template(tz: Option<chrono_tz::Tz>) -> ShiftTemplate {
    let start = Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, 0).unwrap();
    let mut t = ShiftTemplate::new("Bench", start, start + TimeDelta::hours(8));
    t.timezone = tz;
    t
}

fn bench_generate(label: &str, tz: Option<chrono_tz::Tz>, rule: Repetition) {
    let template = template(tz);
    let limits = Limits::default();
    let mut latencies = Vec::with_capacity(ROUNDS);
    let mut produced = 0usize;
    for _ in 0..ROUNDS {
        let t = Instant::now();
        produced += generate_series(&template, &rule, now(), &limits).len();
        latencies.push(t.elapsed());
    }
    print_latency(&format!("{label} ({} instances/run)", produced / ROUNDS), &mut latencies);
}

fn bench_store() {
    let clock = Arc::new(FixedClock::new(now()));
    let store = ShiftStore::new(Settings::default(), clock);
    let daily = Some(Repetition::new(Frequency::Days, 1));

    let mut adds = Vec::with_capacity(ROUNDS);
    let mut series_ids = Vec::with_capacity(ROUNDS);
    for _ in 0..ROUNDS {
        let t = Instant::now();
        let added = tokio_test::block_on(store.add_shift(template(None), daily)).unwrap();
        adds.push(t.elapsed());
        series_ids.push(added[0].series_id.clone());
    }
    print_latency("store add_shift (daily series)", &mut adds);

    let mut updates = Vec::with_capacity(series_ids.len());
    for series_id in series_ids.iter().take(50) {
        let t = Instant::now();
        tokio_test::block_on(store.update_series(series_id, template(None), daily)).unwrap();
        updates.push(t.elapsed());
    }
    print_latency("store update_series", &mut updates);

    let total = tokio_test::block_on(store.len());
    println!("  collection size: {total}");
}

fn main() {
    println!("=== series expansion ===");
    bench_generate("daily, UTC", None, Repetition::new(Frequency::Days, 1));
    bench_generate("daily, Europe/Rome", Some(chrono_tz::Europe::Rome), Repetition::new(Frequency::Days, 1));
    bench_generate("weekly, America/New_York", Some(chrono_tz::America::New_York), Repetition::new(Frequency::Weeks, 1));
    bench_generate("monthly, UTC", None, Repetition::new(Frequency::Months, 1));
    bench_generate("zero interval", None, Repetition::new(Frequency::Days, 0));

    println!("=== store ===");
    bench_store();
}
