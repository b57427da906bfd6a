use super::Engine;
use crate::models::{EventRecord, NEXT_SONG_PAGE, SongRecord};
use crate::schema::{RawSchema, get_raw_schema};
use arrow::datatypes::SchemaRef;
use arrow::json::ReaderBuilder;
use arrow::record_batch::RecordBatch;
use common::{Error, Result};
use datafusion::datasource::listing::ListingTableUrl;
use datafusion::prelude::*;
use futures::TryStreamExt;
use object_store::ObjectMeta;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{info, warn};

const BATCH_SIZE: usize = 8192;
const SKIPPED_SAMPLES: usize = 5;

/// Outcome of reading one logical source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub location: String,
    pub files: usize,
    pub records: usize,
    pub skipped: usize,
}

impl IngestReport {
    fn new(location: &str) -> Self {
        Self {
            location: location.to_string(),
            ..Default::default()
        }
    }

    fn record_skip(&mut self, origin: &str, line_no: usize, reason: &str) {
        if self.skipped < SKIPPED_SAMPLES {
            warn!(
                file = origin,
                line = line_no,
                reason,
                "Skipping malformed record"
            );
        }
        self.skipped += 1;
    }
}

/// Decodes newline-delimited JSON into typed records. Blank lines are ignored;
/// lines that are not valid UTF-8 or fail to decode are counted in
/// `report.skipped`.
pub fn parse_records<T: DeserializeOwned>(
    content: &[u8],
    origin: &str,
    report: &mut IngestReport,
) -> Vec<T> {
    let mut records = Vec::new();
    for (idx, raw) in content.split(|b| *b == b'\n').enumerate() {
        let line = match std::str::from_utf8(raw) {
            Ok(line) => line.trim(),
            Err(e) => {
                report.record_skip(origin, idx + 1, &format!("invalid UTF-8: {}", e));
                continue;
            }
        };
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<T>(line) {
            Ok(record) => records.push(record),
            Err(e) => report.record_skip(origin, idx + 1, &e.to_string()),
        }
    }
    report.records += records.len();
    records
}

/// Serializes typed records into Arrow batches of the given schema.
pub fn records_to_batches<T: Serialize>(
    schema: SchemaRef,
    records: &[T],
) -> Result<Vec<RecordBatch>> {
    let mut decoder = ReaderBuilder::new(schema)
        .with_batch_size(BATCH_SIZE)
        .build_decoder()?;

    let mut batches = Vec::new();
    for chunk in records.chunks(BATCH_SIZE) {
        decoder.serialize(chunk)?;
        if let Some(batch) = decoder.flush()? {
            batches.push(batch);
        }
    }
    Ok(batches)
}

/// Keeps only the events that are actual song plays.
pub fn next_song_plays(events: DataFrame) -> Result<DataFrame> {
    Ok(events.filter(col("page").eq(lit(NEXT_SONG_PAGE)))?)
}

pub struct RecordLoader<'a> {
    engine: &'a Engine,
}

impl<'a> RecordLoader<'a> {
    pub fn new(engine: &'a Engine) -> Self {
        Self { engine }
    }

    pub async fn load_songs(&self, location: &str) -> Result<(DataFrame, IngestReport)> {
        let (records, report) = self.read_records::<SongRecord>(location).await?;
        let schema = get_raw_schema(RawSchema::Songs);
        let batches = records_to_batches(schema.clone(), &records)?;
        Ok((self.engine.read_batches(schema, batches)?, report))
    }

    pub async fn load_events(&self, location: &str) -> Result<(DataFrame, IngestReport)> {
        let (records, report) = self.read_records::<EventRecord>(location).await?;
        let schema = get_raw_schema(RawSchema::Events);
        let batches = records_to_batches(schema.clone(), &records)?;
        Ok((self.engine.read_batches(schema, batches)?, report))
    }

    async fn read_records<T: DeserializeOwned>(
        &self,
        location: &str,
    ) -> Result<(Vec<T>, IngestReport)> {
        let unavailable = |reason: String| Error::SourceUnavailable {
            location: location.to_string(),
            reason,
        };

        let files = self
            .list_source_files(location)
            .await
            .map_err(|e| unavailable(e.to_string()))?;

        let mut report = IngestReport::new(location);
        if files.is_empty() {
            warn!(location, "No JSON files matched source location");
            return Ok((Vec::new(), report));
        }

        let ctx = self.engine.session_context();
        let table_url = ListingTableUrl::parse(location)?;
        let store = ctx.runtime_env().object_store(table_url.object_store())?;

        let mut records = Vec::new();
        for meta in &files {
            let bytes = store
                .get(&meta.location)
                .await
                .map_err(|e| unavailable(e.to_string()))?
                .bytes()
                .await
                .map_err(|e| unavailable(e.to_string()))?;
            records.extend(parse_records::<T>(
                &bytes,
                meta.location.as_ref(),
                &mut report,
            ));
            report.files += 1;
        }

        info!(
            location,
            files = report.files,
            records = report.records,
            skipped = report.skipped,
            "Source ingested"
        );
        Ok((records, report))
    }

    /// Lists the `.json` files under a location, honouring glob patterns.
    pub async fn list_source_files(&self, location: &str) -> Result<Vec<ObjectMeta>> {
        let ctx = self.engine.session_context();
        let table_url = ListingTableUrl::parse(location)?;
        let store = ctx.runtime_env().object_store(table_url.object_store())?;
        let state = ctx.state();

        let mut files: Vec<ObjectMeta> = table_url
            .list_all_files(&state, store.as_ref(), "json")
            .await?
            .try_collect()
            .await?;
        files.sort_by(|a, b| a.location.cmp(&b.location));
        Ok(files)
    }
}
