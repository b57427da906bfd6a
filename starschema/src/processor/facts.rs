use super::keys::{PartitionOffsetKeys, SequentialKeys, SurrogateKeys};
use super::matching::{matcher_for, TitleMatcher};
use super::Engine;
use arrow::array::{ArrayRef, Int64Array};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use common::config::{PipelineConfig, SurrogateKeyStrategy};
use common::Result;
use datafusion::common::JoinType;
use datafusion::prelude::*;
use std::sync::Arc;
use tracing::info;

pub const SONGPLAY_ID: &str = "songplay_id";

/// Builds the `songplays` fact table from time-stamped song plays and the raw
/// song catalog.
pub struct FactAssembler {
    matcher: Arc<dyn TitleMatcher>,
    keys: Arc<dyn SurrogateKeys>,
}

impl FactAssembler {
    pub fn new(matcher: Arc<dyn TitleMatcher>, keys: Arc<dyn SurrogateKeys>) -> Self {
        Self { matcher, keys }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        let keys: Arc<dyn SurrogateKeys> = match config.surrogate_keys {
            SurrogateKeyStrategy::Sequential => Arc::new(SequentialKeys::new()),
            SurrogateKeyStrategy::PartitionOffset => Arc::new(PartitionOffsetKeys::new()),
        };
        Self::new(matcher_for(config.title_match), keys)
    }

    /// Inner join of plays with the catalog on the title predicate. Plays whose
    /// title matches no catalog entry are not part of the result.
    ///
    /// The catalog side is deduplicated first, so a catalog row repeated verbatim
    /// does not yield a second fact row; joining the raw catalog would.
    pub fn enrich(&self, plays: DataFrame, catalog: DataFrame) -> Result<DataFrame> {
        let catalog = catalog
            .select_columns(&["song_id", "title", "artist_id"])?
            .distinct()?;

        let joined = plays.join_on(
            catalog,
            JoinType::Inner,
            [self.matcher.predicate(col("song"), col("title"))],
        )?;

        Ok(joined.select(vec![
            col("start_time"),
            col("year"),
            col("month"),
            ident("userId").alias("user_id"),
            col("level"),
            col("song_id"),
            col("artist_id"),
            ident("sessionId").alias("session_id"),
            col("location"),
            ident("userAgent").alias("user_agent"),
        ])?)
    }

    /// Enriches plays and prepends a `songplay_id` column.
    pub async fn songplays(
        &self,
        engine: &Engine,
        plays: DataFrame,
        catalog: DataFrame,
    ) -> Result<DataFrame> {
        let enriched = self.enrich(plays, catalog)?;
        let schema = enriched.schema().inner().clone();
        let batches = enriched.collect().await?;

        let (keyed_schema, keyed) = self.assign_keys(schema, batches)?;
        let rows: usize = keyed.iter().map(|b| b.num_rows()).sum();
        info!(
            rows,
            title_match = self.matcher.name(),
            "Song plays matched to catalog"
        );

        engine.read_batches(keyed_schema, keyed)
    }

    fn assign_keys(
        &self,
        schema: SchemaRef,
        batches: Vec<RecordBatch>,
    ) -> Result<(SchemaRef, Vec<RecordBatch>)> {
        let mut fields = vec![Arc::new(Field::new(SONGPLAY_ID, DataType::Int64, false))];
        fields.extend(schema.fields().iter().cloned());
        let keyed_schema = Arc::new(Schema::new(fields));

        let mut keyed = Vec::with_capacity(batches.len());
        for (partition, batch) in batches.into_iter().enumerate() {
            let ids = self.keys.allocate(partition, batch.num_rows())?;
            let mut columns: Vec<ArrayRef> = vec![Arc::new(Int64Array::from(ids))];
            columns.extend(batch.columns().iter().cloned());
            keyed.push(RecordBatch::try_new(keyed_schema.clone(), columns)?);
        }
        Ok((keyed_schema, keyed))
    }
}
