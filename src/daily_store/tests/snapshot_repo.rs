mod common;

use common::{assert_sqlite_pragmas, day, row, setup_db};
use daily_store::repo::SnapshotRepo;
use daily_store::sink::SqliteSnapshotSink;
use market_data::io::sink::SnapshotSink;
use market_data::models::instrument::Universe;

#[test]
fn connection_applies_pragmas() {
    let (_db, mut conn) = setup_db();
    assert_sqlite_pragmas(&mut conn);
}

#[test]
fn upsert_is_idempotent_per_date_and_code() {
    let (_db, mut conn) = setup_db();
    let d = day(2025, 3, 7);
    let rows = vec![
        row(Universe::Primary, d, "005930", 55_000.0),
        row(Universe::Primary, d, "000660", 180_000.0),
    ];

    assert_eq!(SnapshotRepo::store_daily_snapshot(&mut conn, Universe::Primary, &rows).unwrap(), 2);
    assert_eq!(SnapshotRepo::store_daily_snapshot(&mut conn, Universe::Primary, &rows).unwrap(), 2);
    assert_eq!(SnapshotRepo::count_day(&mut conn, d).unwrap(), 2);

    // A re-run with new prices overwrites.
    let mut updated = rows.clone();
    updated[0].close = 56_000.0;
    updated[0].change_rate = None;
    SnapshotRepo::store_daily_snapshot(&mut conn, Universe::Primary, &updated).unwrap();

    let stored = SnapshotRepo::load_day(&mut conn, d).unwrap();
    assert_eq!(stored.len(), 2);
    let samsung = stored.iter().find(|r| r.code == "005930").unwrap();
    assert_eq!(samsung.close, 56_000.0);
    assert_eq!(samsung.change_rate, None);
}

#[test]
fn days_are_kept_apart() {
    let (_db, mut conn) = setup_db();
    let rows = vec![
        row(Universe::Secondary, day(2025, 3, 6), "247540", 100.0),
        row(Universe::Secondary, day(2025, 3, 7), "247540", 101.0),
    ];
    SnapshotRepo::store_daily_snapshot(&mut conn, Universe::Secondary, &rows).unwrap();

    let loaded = SnapshotRepo::load_day(&mut conn, day(2025, 3, 7)).unwrap();
    assert_eq!(loaded, vec![rows[1].clone()]);
    assert!(SnapshotRepo::load_day(&mut conn, day(2025, 3, 8)).unwrap().is_empty());
}

#[test]
fn universe_argument_is_stored() {
    let (_db, mut conn) = setup_db();
    let d = day(2025, 3, 7);
    SnapshotRepo::store_daily_snapshot(&mut conn, Universe::Secondary, &[row(Universe::Primary, d, "A", 1.0)])
        .unwrap();
    let loaded = SnapshotRepo::load_day(&mut conn, d).unwrap();
    assert_eq!(loaded[0].universe, Universe::Secondary);
}

#[tokio::test]
async fn sink_writes_both_universes() {
    let (db, mut conn) = setup_db();
    let d = day(2025, 3, 7);
    let sink = SqliteSnapshotSink::new(db.path.clone());
    let rows = vec![
        row(Universe::Primary, d, "005930", 55_000.0),
        row(Universe::Secondary, d, "247540", 120_000.0),
    ];

    assert_eq!(sink.write(&rows).await.unwrap(), 2);
    assert_eq!(sink.write(&rows).await.unwrap(), 2);

    let loaded = SnapshotRepo::load_day(&mut conn, d).unwrap();
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded[0].universe, Universe::Primary);
    assert_eq!(loaded[1].universe, Universe::Secondary);
}

#[tokio::test]
async fn sink_reports_unavailable_database() {
    let sink = SqliteSnapshotSink::new("/nonexistent-dir/for/sure/scanner.db");
    let rows = vec![row(Universe::Primary, day(2025, 3, 7), "A", 1.0)];
    assert!(sink.write(&rows).await.is_err());
}

#[tokio::test]
async fn readiness_requires_migrated_schema() {
    let (db, _conn) = setup_db();
    SqliteSnapshotSink::new(db.path.clone()).check_ready().await.unwrap();

    let dir = tempfile::TempDir::new().unwrap();
    let fresh = dir.path().join("fresh.db").to_string_lossy().to_string();
    let err = SqliteSnapshotSink::new(fresh).check_ready().await.unwrap_err();
    assert!(err.to_string().contains("init-db"));
}
