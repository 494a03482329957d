mod common;

use std::fs;

use assert_cmd::Command;
use common::TestWorkspace;
use csv_integrate::store::{RowSource, SqliteStore, StoreValue};
use predicates::str::contains;

fn binary() -> Command {
    let mut command = Command::cargo_bin("csv-integrate").expect("binary exists");
    command.env("RUST_LOG", "csv_integrate=info");
    command
}

#[test]
fn infer_prints_columns_and_create_statement() {
    let workspace = TestWorkspace::new();
    let input = workspace.write(
        "netflix_titles.csv",
        "show_id,title,release_year,rating\ns1,Inception,2010,8.8\ns2,Up,2009,\n",
    );

    binary()
        .args(["infer", "-i", input.to_str().unwrap()])
        .assert()
        .success()
        .stdout(contains("release_year  Integer"))
        .stdout(contains(
            "CREATE TABLE \"netflix_titles\" (\"show_id\" varchar(2) NOT NULL, \"title\" varchar(9), \
             \"release_year\" INT, \"rating\" FLOAT, PRIMARY KEY (\"show_id\"))",
        ));
}

#[test]
fn infer_writes_schema_yaml() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("ratings.tsv", "tconst\taverageRating\ntt1\t5.5\n");
    let output = workspace.path().join("ratings.yaml");

    binary()
        .args([
            "infer",
            "-i",
            input.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
            "--text-threshold",
            "2",
        ])
        .assert()
        .success()
        .stdout(contains("\"tconst\" TEXT NOT NULL"));

    let yaml = fs::read_to_string(&output).expect("schema written");
    assert!(yaml.contains("name: averageRating"));
    assert!(yaml.contains("sql_type: Float"));
}

#[test]
fn infer_rejects_unknown_key_column() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("t.csv", "a,b\n1,2\n");

    binary()
        .args(["infer", "-i", input.to_str().unwrap(), "--key", "missing"])
        .assert()
        .failure()
        .stderr(contains("missing"));
}

#[test]
fn load_then_integrate_builds_rated_movies() {
    let workspace = TestWorkspace::new();
    let files = workspace.write_catalogs();
    let database = workspace.path().join("integration.db");
    let mut load = binary();
    load.args([
        "load",
        "--database",
        database.to_str().unwrap(),
        "--input-dir",
        workspace.path().to_str().unwrap(),
    ]);
    for file in &files {
        load.args(["-i", file]);
    }
    load.assert()
        .success()
        .stderr(contains("Added 3 rows to table imdb_title_ratings"));

    binary()
        .args(["integrate", "--database", database.to_str().unwrap()])
        .assert()
        .success()
        .stderr(contains("Matched 2 of 3 record(s) from netflix_titles"));

    let store = SqliteStore::open(&database).unwrap();
    let count = store
        .first_row("SELECT COUNT(*) FROM \"rated_movies\"")
        .unwrap()
        .unwrap();
    assert_eq!(count, vec![StoreValue::Integer(3)]);
}

#[test]
fn load_reads_files_from_config() {
    let workspace = TestWorkspace::new();
    workspace.write("first.csv", "id,name\n1,one\n");
    let database = workspace.path().join("configured.db");
    let config = workspace.write(
        "config.yaml",
        &format!(
            "database: {}\nload:\n  input_dir: {}\n  input_files: [first.csv]\n",
            database.display(),
            workspace.path().display()
        ),
    );

    binary()
        .args(["load", "-c", config.to_str().unwrap()])
        .assert()
        .success();

    let store = SqliteStore::open(&database).unwrap();
    let row = store
        .first_row("SELECT \"name\" FROM \"first\"")
        .unwrap()
        .unwrap();
    assert_eq!(row, vec![StoreValue::Text("one".into())]);
}

#[test]
fn unknown_config_keys_fail() {
    let workspace = TestWorkspace::new();
    let config = workspace.write("config.yaml", "databse: typo.db\n");

    binary()
        .args(["integrate", "-c", config.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(contains("Parsing config file"));
}

#[test]
fn missing_input_file_fails() {
    let workspace = TestWorkspace::new();
    let database = workspace.path().join("db.sqlite");

    binary()
        .args([
            "load",
            "--database",
            database.to_str().unwrap(),
            "--input-dir",
            workspace.path().to_str().unwrap(),
            "-i",
            "absent.csv",
        ])
        .assert()
        .failure()
        .stderr(contains("absent.csv"));
}

#[test]
fn load_delimiter_flag_overrides_the_extension() {
    let workspace = TestWorkspace::new();
    workspace.write("piped.csv", "id|name\n7|seven\n");
    let database = workspace.path().join("piped.db");

    binary()
        .args([
            "load",
            "--database",
            database.to_str().unwrap(),
            "--input-dir",
            workspace.path().to_str().unwrap(),
            "-i",
            "piped.csv",
            "--delimiter",
            "|",
        ])
        .assert()
        .success();

    let store = SqliteStore::open(&database).unwrap();
    let row = store
        .first_row("SELECT \"id\", \"name\" FROM \"piped\"")
        .unwrap()
        .unwrap();
    assert_eq!(
        row,
        vec![StoreValue::Integer(7), StoreValue::Text("seven".into())]
    );
}
