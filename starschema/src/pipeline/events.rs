use super::{source_failure, write_table, RunReport};
use crate::processor::dimensions::users_table;
use crate::processor::ingest::next_song_plays;
use crate::processor::time::{time_table, with_event_time};
use crate::processor::{Engine, FactAssembler, RecordLoader, TableSink};
use crate::schema::StarTable;
use crate::utils::paths::SourceLocations;
use common::config::PipelineConfig;
use common::Result;
use datafusion::prelude::DataFrame;
use tracing::{error, info, warn};

const EVENT_TABLES: [StarTable; 3] = [StarTable::Users, StarTable::Time, StarTable::Songplays];

/// Event Pipeline: play events to `users`, `time` and `songplays`. The song
/// catalog is read again here for fact enrichment; if that read fails only
/// `songplays` fails.
pub async fn run_event_pipeline(
    engine: &Engine,
    sources: &SourceLocations,
    sink: &dyn TableSink,
    config: &PipelineConfig,
) -> RunReport {
    let mut report = RunReport::default();
    let loader = RecordLoader::new(engine);
    info!(source = %sources.events, "Starting event pipeline");

    let plays = match loader.load_events(&sources.events).await {
        Ok((events, ingest)) => {
            report.ingest.push(ingest);
            next_song_plays(events).and_then(with_event_time)
        }
        Err(e) => Err(e),
    };
    let plays = match plays {
        Ok(plays) => plays,
        Err(e) => {
            error!(source = %sources.events, error = %e, "Event source unreadable");
            for table in EVENT_TABLES {
                report.tables.push(source_failure(table, &sources.events, &e));
            }
            return report;
        }
    };

    match plays.clone().count().await {
        Ok(count) => info!(plays = count, "Song plays selected"),
        Err(e) => warn!(error = %e, "Could not count song plays"),
    }

    let songplays = match loader.load_songs(&sources.songs).await {
        Ok((catalog, ingest)) => {
            report.ingest.push(ingest);
            Ok(assemble_facts(engine, config, plays.clone(), catalog).await)
        }
        Err(e) => {
            error!(source = %sources.songs, error = %e, "Song catalog unreadable");
            Err(source_failure(StarTable::Songplays, &sources.songs, &e))
        }
    };

    let users = users_table(plays.clone());
    let time = time_table(plays);
    let (users_outcome, time_outcome, songplays_outcome) = futures::join!(
        write_table(sink, StarTable::Users, users, config.preview_rows),
        write_table(sink, StarTable::Time, time, config.preview_rows),
        async {
            match songplays {
                Ok(facts) => {
                    write_table(sink, StarTable::Songplays, facts, config.preview_rows).await
                }
                Err(outcome) => outcome,
            }
        },
    );
    report.tables.push(users_outcome);
    report.tables.push(time_outcome);
    report.tables.push(songplays_outcome);

    info!(failed = report.failed().len(), "Event pipeline finished");
    report
}

async fn assemble_facts(
    engine: &Engine,
    config: &PipelineConfig,
    plays: DataFrame,
    catalog: DataFrame,
) -> Result<DataFrame> {
    FactAssembler::from_config(config)
        .songplays(engine, plays, catalog)
        .await
}
