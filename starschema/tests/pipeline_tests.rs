use arrow::array::{Array, Int64Array};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use common::config::Settings;
use common::{Error, Result};
use datafusion::prelude::DataFrame;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::{json, Value};
use starschema::pipeline::RunReport;
use starschema::processor::{Engine, ParquetSink, TableSink, TableWrite};
use starschema::schema::StarTable;
use starschema::utils::paths::{SourceLocations, TableLayout};
use starschema::{run_pipelines, run_with_sink, PipelineSelection};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn song(song_id: &str, title: &str, artist_id: &str, year: Value) -> Value {
    json!({
        "num_songs": 1,
        "artist_id": artist_id,
        "artist_latitude": 35.14968,
        "artist_longitude": -90.04892,
        "artist_location": "Memphis, TN",
        "artist_name": format!("Artist {}", artist_id),
        "song_id": song_id,
        "title": title,
        "duration": 218.93179,
        "year": year
    })
}

fn event(page: &str, song: Option<&str>, user_id: Value, ts: i64) -> Value {
    json!({
        "artist": song.map(|_| "Some Artist"),
        "auth": "Logged In",
        "firstName": "Ryan",
        "gender": "M",
        "itemInSession": 0,
        "lastName": "Smith",
        "length": 236.79955,
        "level": "free",
        "location": "San Jose-Sunnyvale-Santa Clara, CA",
        "method": "PUT",
        "page": page,
        "registration": 1541016707796.0,
        "sessionId": 583,
        "song": song,
        "status": 200,
        "ts": ts,
        "userAgent": "Mozilla/5.0 (X11; Linux x86_64)",
        "userId": user_id
    })
}

fn write_ndjson(path: &Path, lines: &[String]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, lines.join("\n")).unwrap();
}

/// Input tree with the layout of the public song/log datasets.
fn fixture_input() -> TempDir {
    let dir = tempfile::tempdir().unwrap();

    write_ndjson(
        &dir.path().join("song_data/A/B/C/TRABCEI128F424C983.json"),
        &[
            song("SOAAAAA12AB0181AAA", "Song A", "ARAAAAA1187B9AAAAA", json!(2004)).to_string(),
            song("SOAAAAA12AB0181AAA", "Song A", "ARAAAAA1187B9AAAAA", json!(2004)).to_string(),
        ],
    );
    write_ndjson(
        &dir.path().join("song_data/A/B/C/TRABCFL128F149BB0D.json"),
        &[
            song("SOCCCCC12AB0181CCC", "Song C", "ARCCCCC1187B9CCCCC", json!(0)).to_string(),
            song("SOGHOST12AB0181GGG", "Ghost", "ARGGGGG1187B9GGGGG", Value::Null).to_string(),
            "{not json".to_string(),
        ],
    );
    // Outside the default song glob.
    write_ndjson(
        &dir.path().join("song_data/A/A/A/TRAAAAW128F429D538.json"),
        &[song("SOBBBBB12AB0181BBB", "Song B", "ARBBBBB1187B9BBBBB", json!(1999)).to_string()],
    );

    write_ndjson(
        &dir.path().join("log_data/2018/11/2018-11-02-events.json"),
        &[
            event("NextSong", Some("Song A"), json!("26"), 1541121934796).to_string(),
            event("NextSong", Some("Song B"), json!("26"), 1541121935796).to_string(),
            event("Home", None, json!("26"), 1541121936796).to_string(),
            event("nextsong", Some("Song A"), json!("26"), 1541121937796).to_string(),
        ],
    );
    write_ndjson(
        &dir.path().join("log_data/2018/11/2018-11-03-events.json"),
        &[
            event("NextSong", Some("Song C"), json!(10), 1541203200000).to_string(),
            event("Logout", None, json!(10), 1541203260000).to_string(),
            event("Login", None, json!(""), 1541203270000).to_string(),
        ],
    );

    dir
}

fn settings(input: &Path, output: &Path) -> Settings {
    Settings::for_locations(input.to_str().unwrap(), output.to_str().unwrap())
}

fn parquet_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let Ok(entries) = fs::read_dir(dir) else {
        return files;
    };
    for entry in entries {
        let path = entry.unwrap().path();
        if path.is_dir() {
            files.extend(parquet_files(&path));
        } else if path.extension().is_some_and(|ext| ext == "parquet") {
            files.push(path);
        }
    }
    files
}

fn read_table(dir: &Path) -> Vec<RecordBatch> {
    parquet_files(dir)
        .into_iter()
        .flat_map(|path| {
            let file = fs::File::open(path).unwrap();
            ParquetRecordBatchReaderBuilder::try_new(file)
                .unwrap()
                .build()
                .unwrap()
                .map(|batch| batch.unwrap())
                .collect::<Vec<_>>()
        })
        .collect()
}

fn row_count(dir: &Path) -> usize {
    read_table(dir).iter().map(|b| b.num_rows()).sum()
}

fn written(report: &RunReport, table: StarTable) -> &TableWrite {
    report
        .outcome(table)
        .and_then(|o| o.result.as_ref().ok())
        .unwrap_or_else(|| panic!("{} was not written", table))
}

#[tokio::test]
async fn test_full_run_writes_five_tables() {
    let input = fixture_input();
    let output = tempfile::tempdir().unwrap();

    let report = run_pipelines(&settings(input.path(), output.path()), PipelineSelection::All)
        .await
        .unwrap();

    assert!(report.is_success(), "failed: {:?}", report.failed());
    assert_eq!(report.tables.len(), 5);
    assert_eq!(report.skipped_records(), 2, "one malformed line, read twice");

    let out = output.path();
    assert_eq!(row_count(&out.join("songs_table")), 2);
    assert_eq!(row_count(&out.join("artists_table")), 3);
    assert_eq!(row_count(&out.join("users_table")), 2);
    assert_eq!(row_count(&out.join("time_table")), 3);
    assert_eq!(row_count(&out.join("songplays_table")), 2);

    for table in StarTable::ALL {
        assert!(out.join(format!("{}_table", table.name())).join("_SUCCESS").is_file());
    }
}

#[tokio::test]
async fn test_partition_directories_encode_values() {
    let input = fixture_input();
    let output = tempfile::tempdir().unwrap();

    run_pipelines(&settings(input.path(), output.path()), PipelineSelection::All)
        .await
        .unwrap();

    let out = output.path();
    assert!(out
        .join("songs_table/year=2004/artist_id=ARAAAAA1187B9AAAAA")
        .is_dir());
    assert!(out.join("songs_table/year=0/artist_id=ARCCCCC1187B9CCCCC").is_dir());
    assert!(out.join("time_table/year=2018/month=11").is_dir());
    assert!(out.join("songplays_table/year=2018/month=11").is_dir());
    assert!(!parquet_files(&out.join("artists_table")).is_empty());

    let nested: Vec<_> = fs::read_dir(out.join("users_table"))
        .unwrap()
        .filter(|e| e.as_ref().unwrap().path().is_dir())
        .collect();
    assert!(nested.is_empty(), "users is unpartitioned");
}

#[tokio::test]
async fn test_null_year_song_is_reported_and_excluded() {
    let input = fixture_input();
    let output = tempfile::tempdir().unwrap();

    let report = run_pipelines(&settings(input.path(), output.path()), PipelineSelection::Songs)
        .await
        .unwrap();

    let songs = written(&report, StarTable::Songs);
    assert_eq!(songs.rows_written, 2);
    assert_eq!(songs.rejected_rows, 1);

    let years: HashSet<String> = fs::read_dir(output.path().join("songs_table"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .filter(|name| name.starts_with("year="))
        .collect();
    assert_eq!(years, HashSet::from(["year=2004".to_string(), "year=0".to_string()]));

    // The artist of the rejected song is not partitioned, so it stays.
    assert_eq!(written(&report, StarTable::Artists).rows_written, 3);
}

#[tokio::test]
async fn test_strict_partitions_fail_only_songs() {
    let input = fixture_input();
    let output = tempfile::tempdir().unwrap();
    let mut settings = settings(input.path(), output.path());
    settings.pipeline.strict_partitions = true;

    let report = run_pipelines(&settings, PipelineSelection::All).await.unwrap();

    assert!(!report.is_success());
    assert_eq!(report.failed(), vec![StarTable::Songs]);
    let err = report.outcome(StarTable::Songs).unwrap().result.as_ref().unwrap_err();
    match err {
        Error::TableWrite { table, source } => {
            assert_eq!(table, "songs");
            assert!(matches!(**source, Error::NullPartitionKey { rows: 1, .. }));
        }
        other => panic!("Expected TableWrite, got {:?}", other),
    }
    assert!(!output.path().join("songs_table/_SUCCESS").exists());
    assert_eq!(row_count(&output.path().join("songplays_table")), 2);
}

#[tokio::test]
async fn test_play_count_matches_next_song_events() {
    let input = fixture_input();
    let output = tempfile::tempdir().unwrap();

    run_pipelines(&settings(input.path(), output.path()), PipelineSelection::Events)
        .await
        .unwrap();

    // Three NextSong events at three distinct seconds; "nextsong" does not count.
    assert_eq!(row_count(&output.path().join("time_table")), 3);
    assert!(!output.path().join("songs_table").exists());
}

#[tokio::test]
async fn test_songplays_only_for_catalog_titles() {
    let input = fixture_input();
    let output = tempfile::tempdir().unwrap();

    run_pipelines(&settings(input.path(), output.path()), PipelineSelection::All)
        .await
        .unwrap();

    let batches = read_table(&output.path().join("songplays_table"));
    let mut song_ids = Vec::new();
    let mut ids = HashSet::new();
    for batch in &batches {
        let songs = batch
            .column_by_name("song_id")
            .unwrap()
            .as_any()
            .downcast_ref::<arrow::array::StringArray>()
            .unwrap();
        let keys = batch
            .column_by_name("songplay_id")
            .unwrap()
            .as_any()
            .downcast_ref::<Int64Array>()
            .unwrap();
        for i in 0..batch.num_rows() {
            song_ids.push(songs.value(i).to_string());
            assert!(!keys.is_null(i));
            ids.insert(keys.value(i));
        }
    }
    song_ids.sort();

    // "Song B" exists only outside the configured glob, so its play is dropped.
    assert_eq!(song_ids, vec!["SOAAAAA12AB0181AAA", "SOCCCCC12AB0181CCC"]);
    assert_eq!(ids.len(), 2);
}

#[tokio::test]
async fn test_rerun_replaces_output() {
    let input = fixture_input();
    let output = tempfile::tempdir().unwrap();
    let settings = settings(input.path(), output.path());

    run_pipelines(&settings, PipelineSelection::All).await.unwrap();
    let stale = output.path().join("users_table/part-stale.parquet");
    fs::copy(&parquet_files(&output.path().join("artists_table"))[0], &stale).unwrap();

    let report = run_pipelines(&settings, PipelineSelection::All).await.unwrap();

    assert!(report.is_success());
    assert!(!stale.exists());
    assert_eq!(row_count(&output.path().join("users_table")), 2);
    assert_eq!(row_count(&output.path().join("songplays_table")), 2);
}

/// Sink that fails one table and delegates the rest.
struct FailingSink {
    inner: ParquetSink,
    fail: StarTable,
}

#[async_trait]
impl TableSink for FailingSink {
    async fn write_table(&self, table: StarTable, df: DataFrame) -> Result<TableWrite> {
        if table == self.fail {
            return Err(Error::table_write(
                table.name(),
                Error::Storage("simulated permission denied".to_string()),
            ));
        }
        self.inner.write_table(table, df).await
    }
}

#[tokio::test]
async fn test_failed_table_does_not_affect_others() {
    let input = fixture_input();
    let output = tempfile::tempdir().unwrap();
    let settings = settings(input.path(), output.path());

    let engine = Engine::new(&settings.s3).unwrap();
    let sources = SourceLocations::from_settings(&settings);
    let sink = FailingSink {
        inner: ParquetSink::new(&engine, TableLayout::from_settings(&settings), false, "isolation"),
        fail: StarTable::Time,
    };

    let report = run_with_sink(
        &engine,
        &sources,
        &sink,
        &settings.pipeline,
        PipelineSelection::All,
        "isolation",
    )
    .await;

    assert_eq!(report.failed(), vec![StarTable::Time]);
    assert!(!output.path().join("time_table").exists());

    let out = output.path();
    assert_eq!(row_count(&out.join("songs_table")), 2);
    assert_eq!(row_count(&out.join("artists_table")), 3);
    assert_eq!(row_count(&out.join("users_table")), 2);
    assert_eq!(row_count(&out.join("songplays_table")), 2);
}

#[tokio::test]
async fn test_missing_event_logs_yield_empty_tables() {
    let input = fixture_input();
    let output = tempfile::tempdir().unwrap();
    let mut settings = settings(input.path(), output.path());
    settings.io.log_glob = "log_data/1999/*/*.json".to_string();

    let report = run_pipelines(&settings, PipelineSelection::Events).await.unwrap();

    assert!(report.is_success());
    assert_eq!(written(&report, StarTable::Users).rows_written, 0);
    assert_eq!(written(&report, StarTable::Songplays).rows_written, 0);
}

#[tokio::test]
async fn test_unreadable_catalog_fails_only_dependent_tables() {
    let input = fixture_input();
    let output = tempfile::tempdir().unwrap();
    let settings = settings(input.path(), output.path());

    let engine = Engine::new(&settings.s3).unwrap();
    let sources = SourceLocations {
        songs: "s3://unregistered-bucket/song_data/*.json".to_string(),
        ..SourceLocations::from_settings(&settings)
    };
    let sink = ParquetSink::new(&engine, TableLayout::from_settings(&settings), false, "catalog-down");

    let report = run_with_sink(
        &engine,
        &sources,
        &sink,
        &settings.pipeline,
        PipelineSelection::All,
        "catalog-down",
    )
    .await;

    assert_eq!(
        report.failed(),
        vec![StarTable::Songs, StarTable::Artists, StarTable::Songplays]
    );
    let err = report.outcome(StarTable::Songplays).unwrap().result.as_ref().unwrap_err();
    match err {
        Error::TableWrite { table, source } => {
            assert_eq!(table, "songplays");
            assert!(matches!(**source, Error::SourceUnavailable { .. }));
        }
        other => panic!("Expected TableWrite, got {:?}", other),
    }

    assert_eq!(written(&report, StarTable::Users).rows_written, 2);
    assert_eq!(written(&report, StarTable::Time).rows_written, 3);
    assert_eq!(row_count(&output.path().join("users_table")), 2);
    assert_eq!(row_count(&output.path().join("time_table")), 3);
    assert!(!output.path().join("songplays_table").exists());
}
