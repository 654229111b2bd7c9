//! File-backed and in-memory specifics: persistence, separators and the
//! filter language

use snax_core::{IfExists, Table, Value};
use snax_runtime::{DataSource, FileDataSource, MemoryDataSource, RuntimeError, Select};
use tempfile::TempDir;

const GAMES: &str = "\
game_id;season;venue;venue_time_zone_id
2017020001;20172018;Bell MTS Place;America/Winnipeg
2017020423;20172018;Rogers Arena;America/Vancouver
2016020045;20162017;United Center;America/Chicago
2017020812;20172018;KeyBank Center;America/New_York
";

fn games_file(dir: &TempDir) -> FileDataSource {
    let path = dir.path().join("games.csv");
    std::fs::write(&path, GAMES).unwrap();
    FileDataSource::new("games", path).with_separator(b';')
}

#[tokio::test]
async fn test_filter_language_on_file_source() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let source = games_file(&dir);
    let selected = source
        .select(
            Select::all()
                .columns(["game_id"])
                .filter(
                    "(venue_time_zone_id == 'America/Winnipeg' \
                     or venue_time_zone_id contains 'Vancouver') and season == 20172018",
                ),
        )
        .await?;
    let expected = Table::from_rows(
        vec!["game_id"],
        vec![vec![Value::Int(2017020001)], vec![Value::Int(2017020423)]],
    )?;
    assert_eq!(selected, expected);
    Ok(())
}

#[tokio::test]
async fn test_filter_errors_name_the_source() {
    let dir = TempDir::new().unwrap();
    let source = games_file(&dir);

    let err = source.select(Select::all().filter("attendance > 100")).await.unwrap_err();
    assert!(matches!(err, RuntimeError::ColumnNotFound { .. }));
    assert!(err.to_string().contains("games"));

    let err = source.select(Select::all().filter("season ==")).await.unwrap_err();
    assert!(matches!(err, RuntimeError::InvalidPredicate(_)));
}

#[tokio::test]
async fn test_insert_persists_to_file() {
    let dir = TempDir::new().unwrap();
    let source = games_file(&dir);
    let data = Table::from_rows(
        vec!["game_id", "home_goals"],
        vec![
            vec![Value::Int(2017020001), Value::Int(3)],
            vec![Value::Int(2018020001), Value::Int(1)],
        ],
    )
    .unwrap();
    source
        .insert(&["game_id".into()], &["home_goals".into()], &data, IfExists::Error)
        .await
        .unwrap();

    let text = std::fs::read_to_string(source.path()).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("game_id;season;venue;venue_time_zone_id;home_goals"));
    assert_eq!(lines.next(), Some("2017020001;20172018;Bell MTS Place;America/Winnipeg;3"));
    assert_eq!(text.lines().last(), Some("2018020001;;;;1"));

    let reopened = FileDataSource::new("games", source.path()).with_separator(b';');
    let selected = reopened.select(Select::all()).await.unwrap();
    assert_eq!(selected.num_rows(), 5);
    assert_eq!(selected.column("home_goals").unwrap()[1], Value::Null);
}

#[tokio::test]
async fn test_missing_file_is_created_on_first_insert() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("new.csv");
    let source = FileDataSource::new("new", &path);
    assert!(source.select(Select::all()).await.unwrap().is_empty());
    assert!(!path.exists());

    let data = Table::from_rows(
        vec!["id", "flag"],
        vec![vec![Value::Int(1), Value::Bool(true)]],
    )
    .unwrap();
    source
        .insert(&["id".into()], &["flag".into()], &data, IfExists::Error)
        .await
        .unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "id,flag\n1,True\n");
}

#[tokio::test]
async fn test_failed_insert_leaves_file_untouched() {
    let dir = TempDir::new().unwrap();
    let source = games_file(&dir);
    let data = Table::from_rows(
        vec!["game_id", "venue"],
        vec![vec![Value::Int(2017020001), Value::from("Somewhere")]],
    )
    .unwrap();
    let err = source
        .insert(&["game_id".into()], &["venue".into()], &data, IfExists::Error)
        .await
        .unwrap_err();
    assert!(matches!(err, RuntimeError::Conflict { .. }));
    assert_eq!(std::fs::read_to_string(source.path()).unwrap(), GAMES);
}

#[tokio::test]
async fn test_reloaded_timestamp_key_matches_stored_row() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("readings.csv");
    let ts = snax_core::cast::parse_timestamp("2021-01-01T10:00:00", None).unwrap();
    let reading = |v: i64| {
        Table::from_rows(vec!["ts", "v"], vec![vec![Value::Timestamp(ts), Value::Int(v)]]).unwrap()
    };

    FileDataSource::new("readings", &path)
        .insert(&["ts".into()], &["v".into()], &reading(1), IfExists::Error)
        .await
        .unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "ts,v\n2021-01-01T10:00:00,1\n");

    let reopened = FileDataSource::new("readings", &path);
    let err = reopened
        .insert(&["ts".into()], &["v".into()], &reading(2), IfExists::Error)
        .await
        .unwrap_err();
    assert!(matches!(err, RuntimeError::Conflict { rows: 1, .. }));

    reopened
        .insert(&["ts".into()], &["v".into()], &reading(3), IfExists::Ignore)
        .await
        .unwrap();
    let reopened = FileDataSource::new("readings", &path);
    reopened
        .insert(&["ts".into()], &["v".into()], &reading(4), IfExists::Replace)
        .await
        .unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "ts,v\n2021-01-01T10:00:00,4\n");
    let selected = reopened.select(Select::all()).await.unwrap();
    assert_eq!(selected.rows(), &[vec![Value::Timestamp(ts), Value::Int(4)]]);
}

#[tokio::test]
async fn test_memory_source_filter_with_nulls_and_membership() {
    let source = MemoryDataSource::new(
        "users",
        Table::from_rows(
            vec!["id", "first_name", "age"],
            vec![
                vec![Value::Int(1), Value::from("Cirillo"), Value::Float(45.8)],
                vec![Value::Int(2), Value::Null, Value::Float(4.9)],
                vec![Value::Int(3), Value::from("Marion"), Value::Null],
            ],
        )
        .unwrap(),
    );
    let selected = source
        .select(Select::all().columns(["id"]).filter("first_name != null and id not in (3, 4)"))
        .await
        .unwrap();
    assert_eq!(selected.rows(), &[vec![Value::Int(1)]]);

    let selected = source
        .select(Select::all().columns(["id"]).filter("age == None"))
        .await
        .unwrap();
    assert_eq!(selected.rows(), &[vec![Value::Int(3)]]);
}
