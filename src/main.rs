//! Speedcube Server
//!
//! Demo driver: runs one day of a daily challenge against the in-memory
//! store and logs the resulting leaderboard.

use std::sync::Arc;

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use speedcube::{
    competition::{CompetitionService, MemoryStore, NewAttempt},
    config::EngineConfig,
    core::{clock::ManualClock, format::format_millis, scheduler::ManualScheduler},
    scramble::{ProcessScrambler, ScrambleService},
    timing::{InspectionEngine, Penalty, StopwatchEngine},
    VERSION,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = EngineConfig::from_env();
    info!("Speedcube Server v{}", VERSION);
    info!(
        "Inspection: {} ms (+2 after {} ms, DNF after {} ms)",
        config.inspection.duration.as_millis(),
        config.inspection.plus2_threshold.as_millis(),
        config.inspection.dnf_threshold.as_millis()
    );
    info!("Scramble strategy: {}", config.scramble.strategy);

    let service = CompetitionService::new(
        Arc::new(MemoryStore::new()),
        ScrambleService::from_config(&config.scramble),
        config.leaderboard,
    );

    demo_day(&service, &config, Utc::now().date_naive()).await
}

type DemoService = CompetitionService<MemoryStore, Option<ProcessScrambler>>;

/// Demo function to run a competition day.
async fn demo_day(service: &DemoService, config: &EngineConfig, date: NaiveDate) -> Result<()> {
    info!("=== Daily Challenge {} ===", date);

    let daily = service.scramble_for_date(date).await?;
    info!("Scramble ({:?}): {}", daily.source, daily.scramble);

    // One solve timed end to end on a virtual clock
    let (raw_ms, penalty) = timed_solve(config, 15_600, 11_234);
    info!("Timed solve: {} with penalty {}", format_millis(raw_ms), penalty);
    service
        .create_attempt(NewAttempt {
            participant_id: "demo".into(),
            raw_time_ms: raw_ms,
            penalty,
            competition_date: date,
        })
        .await?;

    let submissions: [(&str, u64, Penalty); 9] = [
        ("alice", 9_871, Penalty::None),
        ("alice", 8_912, Penalty::None),
        ("bob", 10_455, Penalty::Plus2),
        ("bob", 7_930, Penalty::Dnf),
        ("carol", 12_004, Penalty::None),
        ("dave", 65_432, Penalty::None),
        ("erin", 8_912, Penalty::None),
        ("frank", 6_001, Penalty::None),
        ("grace", 9_050, Penalty::Dnf),
    ];

    let mut frank_attempt = None;
    for (who, raw, penalty) in submissions {
        let attempt = service
            .create_attempt(NewAttempt {
                participant_id: who.into(),
                raw_time_ms: raw,
                penalty,
                competition_date: date,
            })
            .await?;
        if who == "frank" {
            frank_attempt = Some(attempt.id);
        }
    }

    // Judge reviews frank's solve and rules it a DNF
    if let Some(id) = frank_attempt {
        service.correct_penalty(id, Penalty::Dnf).await?;
        info!("Penalty corrected: frank -> DNF");
    }

    info!("=== Leaderboard ===");
    let snapshot = service.leaderboard_snapshot(date).await?;
    for entry in &snapshot.entries {
        info!(
            "#{}: {} - {} ({} attempts)",
            entry.rank,
            entry.participant_id,
            format_millis(entry.best_effective_time_ms),
            entry.attempts_count
        );
    }
    info!("Leaderboard digest: {}", snapshot.digest_hex());

    info!("=== Verifying Idempotence ===");
    let again = service.recompute(date).await?;
    if again.digest == snapshot.digest {
        info!("Recompute matches: {}", again.digest_hex());
    } else {
        anyhow::bail!("recompute diverged: {} vs {}", snapshot.digest_hex(), again.digest_hex());
    }

    let stats = service.participant_stats(&"alice".into(), Some(date)).await?;
    info!(
        "alice: {} attempts, best {}",
        stats.attempts,
        stats.best_single_ms.map(format_millis).unwrap_or_else(|| "DNF".into())
    );

    Ok(())
}

/// Inspect for `inspection_ms`, then solve for `solve_ms`, on a virtual clock.
fn timed_solve(config: &EngineConfig, inspection_ms: u64, solve_ms: u64) -> (u64, Penalty) {
    let clock = ManualClock::new();
    let scheduler = ManualScheduler::new(clock.clone());

    let mut inspection = InspectionEngine::new(clock.clone(), scheduler.clone(), config.inspection.clone());
    inspection.start();
    scheduler.advance_ms(inspection_ms);
    let inspected = inspection.stop();
    info!(
        "Inspection: {} elapsed, penalty {}",
        format_millis(inspected.elapsed_ms),
        inspected.penalty
    );

    let mut stopwatch = StopwatchEngine::new(clock, scheduler.clone(), config.stopwatch.clone());
    stopwatch.start();
    scheduler.advance_ms(solve_ms);
    let raw_ms = stopwatch.stop().unwrap_or(solve_ms);

    (raw_ms, inspected.penalty)
}
