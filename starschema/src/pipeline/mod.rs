pub mod events;
pub mod songs;

pub use events::run_event_pipeline;
pub use songs::run_song_pipeline;

use crate::processor::{preview, IngestReport, TableSink, TableWrite};
use crate::schema::StarTable;
use common::{Error, Result};
use datafusion::prelude::DataFrame;
use tracing::{error, info, warn};

/// Terminal state of one table for a run.
#[derive(Debug)]
pub struct TableOutcome {
    pub table: StarTable,
    pub result: Result<TableWrite>,
}

impl TableOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Everything one run produced: the sources it read and one outcome per
/// attempted table.
#[derive(Debug, Default)]
pub struct RunReport {
    pub run_id: String,
    pub ingest: Vec<IngestReport>,
    pub tables: Vec<TableOutcome>,
}

impl RunReport {
    pub fn new(run_id: &str) -> Self {
        Self {
            run_id: run_id.to_string(),
            ..Default::default()
        }
    }

    pub fn merge(&mut self, other: RunReport) {
        self.ingest.extend(other.ingest);
        self.tables.extend(other.tables);
    }

    pub fn outcome(&self, table: StarTable) -> Option<&TableOutcome> {
        self.tables.iter().find(|o| o.table == table)
    }

    pub fn failed(&self) -> Vec<StarTable> {
        self.tables
            .iter()
            .filter(|o| !o.is_success())
            .map(|o| o.table)
            .collect()
    }

    /// True when at least one table was attempted and every attempt succeeded.
    pub fn is_success(&self) -> bool {
        !self.tables.is_empty() && self.tables.iter().all(TableOutcome::is_success)
    }

    pub fn skipped_records(&self) -> usize {
        self.ingest.iter().map(|r| r.skipped).sum()
    }

    pub fn log_summary(&self) {
        for ingest in &self.ingest {
            info!(
                run_id = %self.run_id,
                location = %ingest.location,
                files = ingest.files,
                records = ingest.records,
                skipped = ingest.skipped,
                "Source summary"
            );
        }
        for outcome in &self.tables {
            match &outcome.result {
                Ok(write) => info!(
                    run_id = %self.run_id,
                    table = %outcome.table,
                    location = %write.location,
                    rows = write.rows_written,
                    rejected = write.rejected_rows,
                    "Table succeeded"
                ),
                Err(e) => error!(
                    run_id = %self.run_id,
                    table = %outcome.table,
                    error = %e,
                    "Table failed"
                ),
            }
        }
    }
}

/// Failure outcome for a table whose input could not be produced.
pub(crate) fn source_failure(table: StarTable, location: &str, cause: &Error) -> TableOutcome {
    let reason = match cause {
        Error::SourceUnavailable { reason, .. } => reason.clone(),
        other => other.to_string(),
    };
    TableOutcome {
        table,
        result: Err(Error::table_write(
            table.name(),
            Error::SourceUnavailable {
                location: location.to_string(),
                reason,
            },
        )),
    }
}

/// Previews and writes one table. Errors building the row-set fail only this table.
pub(crate) async fn write_table(
    sink: &dyn TableSink,
    table: StarTable,
    df: Result<DataFrame>,
    preview_rows: usize,
) -> TableOutcome {
    let result = match df {
        Ok(df) => {
            if let Err(e) = preview(table.name(), &df, preview_rows).await {
                warn!(table = %table, error = %e, "Preview failed");
            }
            sink.write_table(table, df).await
        }
        Err(e) => Err(Error::table_write(table.name(), e)),
    };
    TableOutcome { table, result }
}
