mod common;

use std::sync::Arc;

use common::{
    RecordingNotifier, Script, ScriptedProvider, catalog, flat, friday, saturday, series,
    surging, test_config,
};
use daily_store::db::{connection, migrate};
use daily_store::repo::SnapshotRepo;
use daily_store::sink::SqliteSnapshotSink;
use market_data::io::sink::SnapshotSink;
use market_data::requests::batch::SkipReason;
use market_scanner::cli::RunMode;
use market_scanner::notify::Channel;
use market_scanner::runner::{Runner, StepResult};
use market_data::universe::UniverseCatalog;

fn screen_provider() -> ScriptedProvider {
    ScriptedProvider::default()
        .with("005930.KS", Script::Ok(surging("005930.KS", 30)))
        .with("000660.KS", Script::Ok(flat("000660.KS", 30)))
        .with("999990.KS", Script::Unknown)
        .with("247540.KQ", Script::Ok(surging("247540.KQ", 30)))
}

#[tokio::test]
async fn potential_dry_run_reports_candidates_and_skips() {
    let notifier = Arc::new(RecordingNotifier::default());
    let runner = Runner::new(
        test_config(),
        catalog(),
        Arc::new(screen_provider()),
        notifier.clone(),
        None,
    )
    .unwrap();

    let summary = runner.run(&[RunMode::Potential], friday(), false).await;
    assert_eq!(summary.exit_code(), 0);

    let mode = &summary.modes[0];
    assert_eq!(mode.analysed, 3);
    assert_eq!(mode.persisted, StepResult::Skipped);
    assert_eq!(mode.notified, StepResult::Done(1));

    let codes: Vec<_> = mode.candidates.iter().map(|c| c.instrument.code.as_str()).collect();
    assert!(codes.contains(&"005930"));
    assert!(codes.contains(&"247540"));
    assert!(!codes.contains(&"000660"));

    assert_eq!(mode.skipped.len(), 1);
    assert_eq!(mode.skipped[0].code, "999990");
    assert_eq!(mode.skipped[0].reason, SkipReason::UnknownInstrument);

    let sent = notifier.messages();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, Channel::Korea);
    assert!(sent[0].1.contains("2025-03-07 급등주 포착 결과"));
    assert!(sent[0].1.contains("🔵 KOSPI 급등주:"));
    assert!(sent[0].1.contains("🔴 KOSDAQ 급등주:"));
    assert!(sent[0].1.contains("상장폐지 (999990): unknown instrument"));
}

#[tokio::test]
async fn snapshot_rows_are_persisted_idempotently() {
    let dir = tempfile::TempDir::new().unwrap();
    let db = dir.path().join("scanner.db").to_string_lossy().to_string();
    migrate::run_sqlite(&db).unwrap();

    let sink: Arc<dyn SnapshotSink> = Arc::new(SqliteSnapshotSink::new(db.clone()));
    let runner = Runner::new(
        test_config(),
        catalog(),
        Arc::new(screen_provider()),
        Arc::new(RecordingNotifier::default()),
        Some(sink),
    )
    .unwrap();

    let first = runner.run(&[RunMode::Potential], friday(), false).await;
    assert_eq!(first.modes[0].persisted, StepResult::Done(3));
    let second = runner.run(&[RunMode::Potential], friday(), false).await;
    assert_eq!(second.modes[0].persisted, StepResult::Done(3));

    let mut conn = connection::connect_sqlite(&db).unwrap();
    let day = chrono::NaiveDate::from_ymd_opt(2025, 3, 7).unwrap();
    let stored = SnapshotRepo::load_day(&mut conn, day).unwrap();
    let codes: Vec<_> = stored.iter().map(|r| r.code.as_str()).collect();
    assert_eq!(codes, vec!["000660", "005930", "247540"]);
}

#[tokio::test]
async fn persistence_failure_does_not_stop_notification() {
    let sink: Arc<dyn SnapshotSink> =
        Arc::new(SqliteSnapshotSink::new("/nonexistent-dir/for/sure/scanner.db"));
    let notifier = Arc::new(RecordingNotifier::default());
    let runner = Runner::new(
        test_config(),
        catalog(),
        Arc::new(screen_provider()),
        notifier.clone(),
        Some(sink),
    )
    .unwrap();

    let summary = runner.run(&[RunMode::Potential], friday(), false).await;
    assert_eq!(summary.exit_code(), 0);
    assert!(matches!(summary.modes[0].persisted, StepResult::Failed(_)));
    assert_eq!(notifier.messages().len(), 1);
}

#[tokio::test]
async fn notification_failure_keeps_exit_status() {
    let runner = Runner::new(
        test_config(),
        catalog(),
        Arc::new(screen_provider()),
        Arc::new(RecordingNotifier::failing()),
        None,
    )
    .unwrap();

    let summary = runner.run(&[RunMode::Potential], friday(), false).await;
    assert!(matches!(summary.modes[0].notified, StepResult::Failed(_)));
    assert_eq!(summary.exit_code(), 0);
}

#[tokio::test]
async fn unreachable_source_is_fatal() {
    let provider = ScriptedProvider::default()
        .with("005930.KS", Script::Transient)
        .with("000660.KS", Script::Transient)
        .with("999990.KS", Script::Transient);
    let notifier = Arc::new(RecordingNotifier::default());
    let runner = Runner::new(
        test_config(),
        catalog(),
        Arc::new(provider),
        notifier.clone(),
        None,
    )
    .unwrap();

    let summary = runner.run(&[RunMode::Potential], friday(), false).await;
    assert_eq!(summary.exit_code(), 1);
    let mode = &summary.modes[0];
    assert!(mode.fatal.as_deref().unwrap().contains("unreachable"));
    assert_eq!(mode.skipped.len(), 3);
    assert!(notifier.messages().is_empty());
}

#[tokio::test]
async fn weekend_runs_are_skipped_unless_forced() {
    let provider = Arc::new(screen_provider());
    let notifier = Arc::new(RecordingNotifier::default());
    let runner = Runner::new(
        test_config(),
        catalog(),
        provider.clone(),
        notifier.clone(),
        None,
    )
    .unwrap();

    let skipped = runner.run(&[RunMode::Potential], saturday(), false).await;
    assert!(skipped.weekend_skip);
    assert!(skipped.modes.is_empty());
    assert_eq!(skipped.exit_code(), 0);
    assert_eq!(provider.calls(), 0);

    let forced = runner.run(&[RunMode::Potential], saturday(), true).await;
    assert!(!forced.weekend_skip);
    assert_eq!(forced.modes.len(), 1);
    assert_eq!(notifier.messages().len(), 1);
}

#[tokio::test]
async fn wave_with_short_history_lists_insufficient_instruments() {
    let provider = ScriptedProvider::default()
        .with("005930.KS", Script::Ok(flat("005930.KS", 40)))
        .with("000660.KS", Script::Ok(flat("000660.KS", 40)))
        .with("999990.KS", Script::Ok(flat("999990.KS", 40)))
        .with("247540.KQ", Script::Ok(flat("247540.KQ", 40)));
    let notifier = Arc::new(RecordingNotifier::default());
    let runner = Runner::new(
        test_config(),
        catalog(),
        Arc::new(provider),
        notifier.clone(),
        None,
    )
    .unwrap();

    let summary = runner.run(&[RunMode::Wave], friday(), false).await;
    assert_eq!(summary.exit_code(), 0);
    let mode = &summary.modes[0];
    assert_eq!(mode.analysed, 0);
    assert!(mode.candidates.is_empty());
    assert_eq!(mode.skipped.len(), 4);
    assert!(
        mode.skipped
            .iter()
            .all(|s| matches!(s.reason, SkipReason::InsufficientHistory { .. }))
    );

    let sent = notifier.messages();
    assert!(sent[0].1.starts_with("오늘 조건에 맞는 파동주가 없습니다."));
    assert!(sent[0].1.contains("분석 제외 4종목"));
}

#[tokio::test]
async fn envelope_mode_sends_recommendation_to_us_channel() {
    let closes: Vec<f64> = (0..250).map(|i| 50.0 + i as f64 * 0.1).collect();
    let provider = ScriptedProvider::default()
        .with("TQQQ", Script::Ok(series("TQQQ", &closes, &vec![1.0e6; 250])));
    let notifier = Arc::new(RecordingNotifier::default());
    let runner = Runner::new(
        test_config(),
        UniverseCatalog::default(),
        Arc::new(provider),
        notifier.clone(),
        None,
    )
    .unwrap();

    let summary = runner.run(&[RunMode::Tqqq], friday(), false).await;
    assert_eq!(summary.exit_code(), 0);
    assert_eq!(summary.modes[0].analysed, 1);

    let sent = notifier.messages();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, Channel::Us);
    assert!(sent[0].1.contains("TQQQ 종가: 74.90"));
    assert!(sent[0].1.ends_with("구매 추천"));
}

#[tokio::test]
async fn envelope_mode_without_data_is_fatal_but_still_notifies() {
    let notifier = Arc::new(RecordingNotifier::default());
    let runner = Runner::new(
        test_config(),
        UniverseCatalog::default(),
        Arc::new(ScriptedProvider::default().with("TQQQ", Script::Transient)),
        notifier.clone(),
        None,
    )
    .unwrap();

    let summary = runner.run(&[RunMode::Tqqq], friday(), false).await;
    assert_eq!(summary.exit_code(), 1);
    let sent = notifier.messages();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].1.starts_with("TQQQ 데이터를 가져오는데 실패했습니다."));
}

#[tokio::test]
async fn all_runs_modes_in_order() {
    let closes: Vec<f64> = (0..250).map(|i| 50.0 + i as f64 * 0.1).collect();
    let provider = screen_provider().with("TQQQ", Script::Ok(series("TQQQ", &closes, &vec![1.0e6; 250])));
    let runner = Runner::new(
        test_config(),
        catalog(),
        Arc::new(provider),
        Arc::new(RecordingNotifier::default()),
        None,
    )
    .unwrap();

    let summary = runner.run(RunMode::All.expand(), friday(), false).await;
    let modes: Vec<_> = summary.modes.iter().map(|m| m.mode).collect();
    assert_eq!(modes, vec![RunMode::Tqqq, RunMode::Potential, RunMode::Wave]);
    assert_eq!(summary.exit_code(), 0);
}
