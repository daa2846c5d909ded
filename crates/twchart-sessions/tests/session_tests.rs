use std::fs;
use std::path::Path;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use tempfile::TempDir;
use twchart_sessions::{
    load_session_from_file, parse_session, session_id, BreadData, Probe, ProbePosition,
    RowPolicy, Session, SessionFilter, SessionStore, Stage,
};

const CIABATTA: &str = "Ciabatta
Date: 2025-05-24
Ambient Probe: 1
Note: 6:50PM: preparing to make biga
Preferment: 6:51PM
Bulk ferment: 7:00AM
Done: 8:30AM
";

const FULL_BAKE: &str = "Ciabatta
Date: 2025-05-24

Ambient Probe: 1
Oven Probe: 2
Dough Probe: 3
Other Probe: 4

Note: 6:50PM: preparing to make biga

Preferment: 6:51PM
Note: 6:53PM: finished mixing biga

Bulk ferment: 7:00AM
Note: 8:00AM: 10 stretch and folds

Final Proof: 9:00AM
Note: 9:00AM: shaped dough

Bake: 10:30AM
Done: 10:55AM

Note: 12:00PM: bread is delicious and crunchy
";

const FOCACCIA: &str = "Focaccia
Date: 2025-06-02
Bulk ferment: 9:00AM
Bake: 1:00PM
Done: 1:25PM
";

const SENSOR_CSV: &str = "DateTime,Probe 1,Probe 2
2025-05-24 18:50:00,71.5,
2025-05-24 18:51:00,71.6,72.0
garbage,1,2
";

fn ts(d: u32, h: u32, mi: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 5, d)
        .unwrap()
        .and_hms_opt(h, mi, 0)
        .unwrap()
}

fn pos(n: u8) -> ProbePosition {
    ProbePosition::new(n).unwrap()
}

fn finished(name: &str, start: NaiveDateTime, end: NaiveDateTime) -> Stage {
    let mut stage = Stage::new(name, start);
    stage.finish(end);
    stage
}

/// Helper: a store directory holding two logs, one with sensor data.
fn create_test_store() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("ciabatta.txt"), CIABATTA).unwrap();
    fs::write(dir.path().join("ciabatta.csv"), SENSOR_CSV).unwrap();
    fs::write(dir.path().join("focaccia.txt"), FOCACCIA).unwrap();
    dir
}

fn write_broken_log(dir: &Path) {
    fs::write(dir.join("broken.txt"), "Rye\nBake: whenever\n").unwrap();
}

// ============================================================
// Log parsing
// ============================================================

#[test]
fn test_parse_ciabatta_end_to_end() {
    let session = parse_session(CIABATTA).unwrap();

    assert_eq!(session.name, "Ciabatta");
    assert_eq!(session.date, NaiveDate::from_ymd_opt(2025, 5, 24));
    assert_eq!(
        session.probes,
        vec![Probe {
            name: "Ambient".into(),
            position: pos(1),
        }]
    );
    assert_eq!(session.events.len(), 1);
    assert_eq!(session.events[0].note, "preparing to make biga");
    assert_eq!(session.events[0].time, ts(24, 18, 50));
    assert_eq!(
        session.stages,
        vec![
            finished("Preferment", ts(24, 18, 51), ts(25, 7, 0)),
            finished("Bulk ferment", ts(25, 7, 0), ts(25, 8, 30)),
        ]
    );
    assert_eq!(session.stages[0].duration, Some(Duration::minutes(12 * 60 + 9)));
    assert_eq!(session.stages[1].duration, Some(Duration::minutes(90)));
    assert_eq!(session.start_time, Some(ts(24, 18, 50)));
}

#[test]
fn test_parse_full_bake() {
    let session = parse_session(FULL_BAKE).unwrap();

    let probes: Vec<_> = session
        .probes
        .iter()
        .map(|p| (p.name.as_str(), p.position.get()))
        .collect();
    assert_eq!(
        probes,
        [("Ambient", 1), ("Oven", 2), ("Dough", 3), ("Other", 4)]
    );

    assert_eq!(
        session.stages,
        vec![
            finished("Preferment", ts(24, 18, 51), ts(25, 7, 0)),
            finished("Bulk ferment", ts(25, 7, 0), ts(25, 9, 0)),
            finished("Final Proof", ts(25, 9, 0), ts(25, 10, 30)),
            finished("Bake", ts(25, 10, 30), ts(25, 10, 55)),
        ]
    );

    let events: Vec<_> = session
        .events
        .iter()
        .map(|e| (e.note.as_str(), e.time))
        .collect();
    assert_eq!(
        events,
        [
            ("preparing to make biga", ts(24, 18, 50)),
            ("finished mixing biga", ts(24, 18, 53)),
            ("10 stretch and folds", ts(25, 8, 0)),
            ("shaped dough", ts(25, 9, 0)),
            ("bread is delicious and crunchy", ts(25, 12, 0)),
        ]
    );
}

#[test]
fn test_stage_labels() {
    let session = parse_session(FULL_BAKE).unwrap();
    let labels: Vec<_> = session.stages.iter().map(Stage::label).collect();
    assert_eq!(
        labels,
        [
            "Preferment (12h 9m)",
            "Bulk ferment (2h)",
            "Final Proof (1h 30m)",
            "Bake (25m)",
        ]
    );
}

#[test]
fn test_stages_and_events_keep_line_order() {
    let input = "Rye\nDate: 2025-05-01\nB: 9:00AM\nNote: 9:05AM: two\nA: 9:10AM\nNote: 9:06AM: one\n";
    let session = parse_session(input).unwrap();

    let names: Vec<_> = session.stages.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["B", "A"]);
    let notes: Vec<_> = session.events.iter().map(|e| e.note.as_str()).collect();
    assert_eq!(notes, ["two", "one"]);
}

#[test]
fn test_stage_without_done_stays_open() {
    let session = parse_session("Rye\nDate: 2025-05-01\nProof: 9:00AM\n").unwrap();
    assert_eq!(session.stages[0].end, None);
    assert_eq!(session.stages[0].duration, None);
}

#[test]
fn test_parse_error_is_fatal() {
    let err = parse_session("Rye\nDate: 2025-05-01\nNote: 9:00AM\n").unwrap_err();
    assert_eq!(err.line_number, 3);
    assert!(err.to_string().starts_with("line 3:"));
}

#[test]
fn test_session_round_trips_through_json() {
    let session = parse_session(FULL_BAKE).unwrap();
    let json = serde_json::to_string(&session).unwrap();
    let back: Session = serde_json::from_str(&json).unwrap();
    assert_eq!(back, session);
}

// ============================================================
// Sensor data and charts
// ============================================================

#[test]
fn test_load_session_with_sibling_csv() {
    let dir = create_test_store();
    let session =
        load_session_from_file(&dir.path().join("ciabatta.txt"), RowPolicy::Skip).unwrap();

    assert_eq!(session.data.len(), 2);

    let series = session.chart_data();
    assert_eq!(series.len(), 1);
    assert_eq!(series[0].name, "Ambient");
    let values: Vec<_> = series[0].points.iter().map(|p| p.value).collect();
    assert_eq!(values, [Some(71.5), Some(71.6)]);
}

#[test]
fn test_abort_policy_rejects_bad_csv_row() {
    let dir = create_test_store();
    let err = load_session_from_file(&dir.path().join("ciabatta.txt"), RowPolicy::Abort)
        .unwrap_err();
    assert!(format!("{:#}", err).contains("ciabatta.csv"));
}

#[test]
fn test_time_bounds_of_full_bake() {
    let session = parse_session(FULL_BAKE).unwrap();
    assert_eq!(session.time_bounds(), Some((ts(24, 18, 50), ts(25, 12, 0))));
}

// ============================================================
// Legacy model
// ============================================================

#[test]
fn test_legacy_json_converts_to_session() {
    let json = r#"{
        "name": "Ciabatta",
        "preferment": {"start": "2025-05-24T18:51:00"},
        "bulk_ferment": {"start": "2025-05-25T07:00:00"},
        "final_proof": {"start": "2025-05-25T09:00:00", "duration": 5400},
        "bake": {"end": "2025-05-25T10:55:00"},
        "ambient_probe_position": 1
    }"#;
    let bread: BreadData = serde_json::from_str(json).unwrap();
    let session = Session::from(bread);

    assert_eq!(
        session.stages,
        vec![
            finished("Preferment", ts(24, 18, 51), ts(25, 7, 0)),
            finished("Bulk Fermentation", ts(25, 7, 0), ts(25, 9, 0)),
            finished("Final Proof", ts(25, 9, 0), ts(25, 10, 30)),
            finished("Bake", ts(25, 10, 30), ts(25, 10, 55)),
        ]
    );
    assert_eq!(session.probes.len(), 1);
}

#[test]
fn test_legacy_rejects_bad_probe_position() {
    let json = r#"{"name": "Rye", "oven_probe_position": 7}"#;
    assert!(serde_json::from_str::<BreadData>(json).is_err());
}

// ============================================================
// Store
// ============================================================

#[test]
fn test_store_list_newest_first() {
    let dir = create_test_store();
    let store = SessionStore::with_dir(dir.path().to_path_buf());

    let summaries = store.list(&SessionFilter::default()).unwrap();

    let ids: Vec<_> = summaries.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, ["focaccia", "ciabatta"]);
    assert!(summaries[1].has_data);
    assert!(!summaries[0].has_data);
    assert_eq!(summaries[0].stages, 2);
    assert_eq!(summaries[0].duration, Some(Duration::minutes(265)));
}

#[test]
fn test_store_list_skips_broken_logs() {
    let dir = create_test_store();
    write_broken_log(dir.path());
    fs::write(dir.path().join("notes.md"), "not a log").unwrap();
    let store = SessionStore::with_dir(dir.path().to_path_buf());

    let summaries = store.list(&SessionFilter::default()).unwrap();
    assert_eq!(summaries.len(), 2);
}

#[test]
fn test_store_list_with_filters() {
    let dir = create_test_store();
    let store = SessionStore::with_dir(dir.path().to_path_buf());

    let by_name = store
        .list(&SessionFilter {
            search: Some("FOCA".into()),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(by_name.len(), 1);
    assert_eq!(by_name[0].name, "Focaccia");

    let by_date = store
        .list(&SessionFilter {
            before: NaiveDate::from_ymd_opt(2025, 5, 31),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(by_date.len(), 1);
    assert_eq!(by_date[0].name, "Ciabatta");
}

#[test]
fn test_store_missing_dir_lists_nothing() {
    let dir = TempDir::new().unwrap();
    let store = SessionStore::with_dir(dir.path().join("nope"));
    assert!(store.list(&SessionFilter::default()).unwrap().is_empty());
}

#[test]
fn test_store_load_by_id() {
    let dir = create_test_store();
    let store = SessionStore::with_dir(dir.path().to_path_buf());

    let session = store.load("ciabatta").unwrap();
    assert_eq!(session.name, "Ciabatta");
    assert_eq!(session.data.len(), 2);

    assert!(store.load("missing").is_err());
}

#[test]
fn test_store_import_copies_log_and_csv() {
    let source = TempDir::new().unwrap();
    let log = source.path().join("bake.txt");
    fs::write(&log, CIABATTA).unwrap();
    fs::write(source.path().join("bake.csv"), SENSOR_CSV).unwrap();

    let target = TempDir::new().unwrap();
    let store = SessionStore::with_dir(target.path().join("sessions"));

    let id = store.import(&log).unwrap();
    assert_eq!(id, session_id(CIABATTA.as_bytes()));
    assert!(store.sessions_dir().join(format!("{}.csv", id)).exists());

    let session = store.load(&id).unwrap();
    assert_eq!(session.name, "Ciabatta");
    assert_eq!(session.data.len(), 2);

    // Same content, same id.
    assert_eq!(store.import(&log).unwrap(), id);
    assert_eq!(store.list(&SessionFilter::default()).unwrap().len(), 1);
}

#[test]
fn test_store_import_rejects_unparseable_log() {
    let source = TempDir::new().unwrap();
    write_broken_log(source.path());

    let target = TempDir::new().unwrap();
    let store = SessionStore::with_dir(target.path().to_path_buf());

    assert!(store.import(&source.path().join("broken.txt")).is_err());
    assert!(fs::read_dir(target.path()).unwrap().next().is_none());
}
