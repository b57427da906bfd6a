use super::{source_failure, write_table, RunReport};
use crate::processor::dimensions::{artists_table, songs_table};
use crate::processor::{Engine, RecordLoader, TableSink};
use crate::schema::StarTable;
use crate::utils::paths::SourceLocations;
use common::config::PipelineConfig;
use tracing::{error, info};

/// Song Catalog Pipeline: song metadata to the `songs` and `artists` tables.
pub async fn run_song_pipeline(
    engine: &Engine,
    sources: &SourceLocations,
    sink: &dyn TableSink,
    config: &PipelineConfig,
) -> RunReport {
    let mut report = RunReport::default();
    info!(source = %sources.songs, "Starting song catalog pipeline");

    let songs = match RecordLoader::new(engine).load_songs(&sources.songs).await {
        Ok((songs, ingest)) => {
            report.ingest.push(ingest);
            songs
        }
        Err(e) => {
            error!(source = %sources.songs, error = %e, "Song source unreadable");
            for table in [StarTable::Songs, StarTable::Artists] {
                report.tables.push(source_failure(table, &sources.songs, &e));
            }
            return report;
        }
    };

    let (songs_outcome, artists_outcome) = futures::join!(
        write_table(sink, StarTable::Songs, songs_table(songs.clone()), config.preview_rows),
        write_table(sink, StarTable::Artists, artists_table(songs), config.preview_rows),
    );
    report.tables.push(songs_outcome);
    report.tables.push(artists_outcome);

    info!(failed = report.failed().len(), "Song catalog pipeline finished");
    report
}
