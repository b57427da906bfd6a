pub mod logging;
pub mod models;
pub mod pipeline;
pub mod processor;
pub mod schema;
pub mod storage;
pub mod utils;

use common::config::{PipelineConfig, Settings};
use common::Result;
use pipeline::{run_event_pipeline, run_song_pipeline, RunReport};
use processor::{Engine, ParquetSink, TableSink};
use tracing::info;
use utils::paths::{SourceLocations, TableLayout};
use uuid::Uuid;

/// Which pipelines a run executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineSelection {
    All,
    Songs,
    Events,
}

impl PipelineSelection {
    fn runs_songs(self) -> bool {
        matches!(self, PipelineSelection::All | PipelineSelection::Songs)
    }

    fn runs_events(self) -> bool {
        matches!(self, PipelineSelection::All | PipelineSelection::Events)
    }
}

/// Runs the selected pipelines against the configured locations, writing
/// Parquet through a fresh engine. Table failures are reported in the
/// returned `RunReport`; only setup failures are returned as `Err`.
pub async fn run_pipelines(settings: &Settings, selection: PipelineSelection) -> Result<RunReport> {
    let engine = Engine::new(&settings.s3)?;
    let sources = SourceLocations::from_settings(settings);
    let layout = TableLayout::from_settings(settings);

    for location in [sources.songs.as_str(), sources.events.as_str(), layout.root()] {
        engine.register_location(location).await?;
        if settings.s3.verify_buckets {
            engine.verify_location(location).await?;
        }
    }

    let run_id = Uuid::new_v4().to_string();
    let sink = ParquetSink::new(&engine, layout, settings.pipeline.strict_partitions, &run_id);
    info!(
        run_id = %run_id,
        songs = %sources.songs,
        events = %sources.events,
        output = %sink.layout().root(),
        "Starting run"
    );

    Ok(run_with_sink(&engine, &sources, &sink, &settings.pipeline, selection, &run_id).await)
}

/// Runs the selected pipelines against an arbitrary sink. The catalog pipeline
/// goes first when both are selected.
pub async fn run_with_sink(
    engine: &Engine,
    sources: &SourceLocations,
    sink: &dyn TableSink,
    config: &PipelineConfig,
    selection: PipelineSelection,
    run_id: &str,
) -> RunReport {
    let mut report = RunReport::new(run_id);
    if selection.runs_songs() {
        report.merge(run_song_pipeline(engine, sources, sink, config).await);
    }
    if selection.runs_events() {
        report.merge(run_event_pipeline(engine, sources, sink, config).await);
    }
    report
}

/// Loads settings from `config_path` and runs the selected pipelines.
pub async fn run_from_config(config_path: &str, selection: PipelineSelection) -> Result<RunReport> {
    let settings = Settings::new(config_path)?;
    run_pipelines(&settings, selection).await
}
