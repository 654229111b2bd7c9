//! Loading complete feature repositories from disk

use snax_core::{Entity, Feature, Table, Value, ValueType, DUMMY_ENTITY_NAME};
use snax_repository::{parse_repo, RepoLoader, RepositoryError};
use snax_runtime::{DataSource, FileDataSource, Select};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

const GAMES_CSV: &str = "\
game_id,season,type,away_team_id,home_team_id,away_goals,home_goals,outcome,venue,venue_time_zone_id
2017020001,20172018,R,52,9,2,3,away win REG,Bell MTS Place,America/Winnipeg
2017020002,20172018,R,16,54,3,6,home win REG,T-Mobile Arena,America/Los_Angeles
2017020423,20172018,R,9,23,2,5,home win REG,Rogers Arena,America/Vancouver
2016020045,20162017,R,4,16,4,7,home win REG,United Center,America/Chicago
";

const SPORTS_MANIFEST: &str = r#"
data_sources:
  - name: nhl_games_csv
    type: csv
    path: data/game.csv

entities:
  - name: game
    join_keys: [game_id]

feature_views:
  - name: nhl_games_csv
    source: nhl_games_csv
    features:
      - { name: game_id, dtype: int }
      - { name: season, dtype: string }
      - { name: outcome, dtype: string }
      - { name: venue, dtype: string }
      - { name: venue_time_zone_id, dtype: string }
"#;

const WINE_CSV: &str = "\
fixed_acidity,volatile_acidity,citric_acid,pH
7.4,0.7,0,3.51
7.8,0.88,0.04,3.2
";

const WINE_MANIFEST: &str = r#"
data_sources:
  - name: winequality_csv
    type: csv
    path: data/winequality.csv
    separator: ","
    field_mapping:
      citric_acid: citric_acidity
      pH: ph
    tags:
      owner: john.doe@gmail.com

feature_views:
  - name: winequality_acidity_csv
    source: winequality_csv
    features:
      - { name: volatile_acidity, dtype: float }
      - { name: fixed_acidity, dtype: float }
      - { name: citric_acidity, dtype: float }
      - { name: ph, dtype: float }
"#;

fn write(root: &Path, relative: &str, text: &str) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, text).unwrap();
}

fn sports_repo() -> TempDir {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "data/game.csv", GAMES_CSV);
    write(dir.path(), "nhl_games.yaml", SPORTS_MANIFEST);
    dir
}

#[tokio::test]
async fn test_parse_sports_repo() {
    let repo = sports_repo();
    let contents = parse_repo(repo.path()).await.unwrap();

    let sources: Vec<&str> = contents.data_sources().iter().map(|s| s.name()).collect();
    let entities: Vec<&str> = contents.entities().iter().map(|e| e.name()).collect();
    let views: Vec<&str> = contents.feature_views().iter().map(|v| v.name()).collect();
    assert_eq!(sources, vec!["nhl_games_csv"]);
    assert_eq!(entities, vec!["game", DUMMY_ENTITY_NAME]);
    assert_eq!(views, vec!["nhl_games_csv"]);

    let view = contents.get_feature_view("nhl_games_csv").unwrap();
    assert!(view.entities().is_none());
    assert_eq!(view.feature("venue"), Some(Feature::new("venue", ValueType::String)));
}

#[tokio::test]
async fn test_csv_paths_resolve_against_repo_root() {
    let repo = sports_repo();
    let contents = parse_repo(repo.path()).await.unwrap();
    let source = contents.get_data_source("nhl_games_csv").unwrap();
    let game = contents.get_entity("game").unwrap();

    let game_ids = source
        .select(
            Select::all()
                .columns([game.clone()])
                .filter(
                    "(venue_time_zone_id == 'America/Winnipeg' \
                     or venue_time_zone_id contains 'Vancouver') and season == 20172018",
                ),
        )
        .await
        .unwrap();
    let expected = Table::from_rows(
        vec!["game_id"],
        vec![vec![Value::Int(2017020001)], vec![Value::Int(2017020423)]],
    )
    .unwrap();
    assert_eq!(game_ids, expected);
}

#[tokio::test]
async fn test_view_from_repo_joins_repo_entity() {
    let repo = sports_repo();
    let contents = parse_repo(repo.path()).await.unwrap();
    let view = contents.get_feature_view("nhl_games_csv").unwrap();
    let game = contents.get_entity("game").unwrap();

    let dataframe = Table::from_rows(
        vec!["game_id"],
        vec![vec![Value::Int(2017020423)], vec![Value::Int(2017020001)]],
    )
    .unwrap();
    let result = view
        .add_features_for_entity(&dataframe, &["outcome", "venue"], game)
        .await
        .unwrap();
    let expected = Table::from_rows(
        vec!["game_id", "outcome", "venue"],
        vec![
            vec![
                Value::Int(2017020423),
                Value::from("home win REG"),
                Value::from("Rogers Arena"),
            ],
            vec![
                Value::Int(2017020001),
                Value::from("away win REG"),
                Value::from("Bell MTS Place"),
            ],
        ],
    )
    .unwrap();
    assert_eq!(result, expected);
}

#[tokio::test]
async fn test_parse_winequality_repo_with_field_mapping() {
    let repo = TempDir::new().unwrap();
    write(repo.path(), "data/winequality.csv", WINE_CSV);
    write(repo.path(), "features/winequality.yml", WINE_MANIFEST);

    let contents = parse_repo(repo.path()).await.unwrap();
    assert_eq!(contents.entities(), &[Entity::dummy()]);
    assert_eq!(contents.data_sources().len(), 1);
    assert_eq!(contents.feature_views().len(), 1);

    let source = contents.get_data_source("winequality_csv").unwrap();
    assert_eq!(
        source.info().tags().get("owner").map(String::as_str),
        Some("john.doe@gmail.com")
    );

    let expected_source = Arc::new(FileDataSource::new("winequality_csv", "elsewhere.csv"));
    let expected_view = snax_runtime::FeatureView::new(
        "winequality_acidity_csv",
        None,
        Some(vec![
            Feature::new("ph", ValueType::Float),
            Feature::new("citric_acidity", ValueType::Float),
            Feature::new("fixed_acidity", ValueType::Float),
            Feature::new("volatile_acidity", ValueType::Float),
        ]),
        expected_source,
    );
    assert_eq!(contents.feature_views()[0], expected_view);

    let selected = source
        .select(Select::all().columns(["citric_acidity", "ph"]))
        .await
        .unwrap();
    assert_eq!(selected.columns(), &["citric_acidity".to_string(), "ph".to_string()]);
    assert_eq!(selected.get(1, 1), Some(&Value::Float(3.2)));
}

#[tokio::test]
async fn test_definitions_merge_across_files() {
    let repo = TempDir::new().unwrap();
    write(
        repo.path(),
        "a_sources.yaml",
        "data_sources:\n  - name: users\n    type: memory\n    data:\n      \
         columns: [id, name]\n      rows:\n        - [1, Ann]\n",
    );
    write(repo.path(), "b_entities.yaml", "entities:\n  - {name: user, join_keys: [id]}\n");
    write(
        repo.path(),
        "nested/c_views.yaml",
        "feature_views:\n  - name: users_view\n    source: users\n    \
         entities: [user]\n    tags: {team: growth}\n",
    );

    let contents = RepoLoader::new(repo.path()).unwrap().load().await.unwrap();
    let view = contents.get_feature_view("users_view").unwrap();
    assert_eq!(view.entities().map(<[Entity]>::len), Some(1));
    assert_eq!(view.tags().get("team").map(String::as_str), Some("growth"));

    let dataframe = Table::from_rows(vec!["id"], vec![vec![Value::Int(1)]]).unwrap();
    let result = view
        .add_features_to_dataframe(&dataframe, &["name"], "user")
        .await
        .unwrap();
    assert_eq!(result.get(0, 1), Some(&Value::from("Ann")));
}

#[tokio::test]
async fn test_duplicate_names_across_files() {
    let repo = sports_repo();
    write(repo.path(), "more/games.yaml", "entities:\n  - {name: game, join_keys: [id]}\n");
    let err = parse_repo(repo.path()).await.unwrap_err();
    assert!(matches!(err, RepositoryError::Duplicate { kind: "entity", .. }));
    assert_eq!(err.to_string(), "Duplicate entity 'game'");
}

#[tokio::test]
async fn test_bad_data_source_surfaces_runtime_error() {
    let repo = TempDir::new().unwrap();
    write(
        repo.path(),
        "bad.yaml",
        "data_sources:\n  - {name: wide, type: csv, path: x.csv, separator: \"é\"}\n",
    );
    let err = parse_repo(repo.path()).await.unwrap_err();
    assert!(matches!(err, RepositoryError::Runtime(_)));
}

#[tokio::test]
async fn test_empty_repo_has_only_dummy_entity() {
    let repo = TempDir::new().unwrap();
    let contents = parse_repo(repo.path()).await.unwrap();
    assert!(contents.data_sources().is_empty());
    assert!(contents.feature_views().is_empty());
    assert_eq!(contents.entities(), &[Entity::dummy()]);
}
