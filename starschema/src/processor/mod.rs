pub mod dimensions;
pub mod facts;
pub mod ingest;
pub mod keys;
pub mod matching;
pub mod partition;
pub mod sink;
pub mod time;
mod udf;

pub use facts::FactAssembler;
pub use ingest::{IngestReport, RecordLoader};
pub use keys::{PartitionOffsetKeys, SequentialKeys, SurrogateKeys};
pub use matching::{CaseInsensitiveTitle, ExactTitle, TitleMatcher};
pub use sink::{ParquetSink, TableSink, TableWrite};
pub use udf::{calendar_udf, epoch_seconds_udf, floor_seconds, register_udfs, CalendarPart};

use crate::storage::S3Manager;
use crate::utils::arrow::batches_to_json;
use crate::utils::paths::bucket_of;
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use common::config::S3Settings;
use common::Result;
use datafusion::datasource::MemTable;
use datafusion::execution::context::SessionContext;
use datafusion::prelude::{DataFrame, SessionConfig};
use std::sync::Arc;
use tracing::{debug, info};

/// Dataframe engine shared by both pipelines: one DataFusion session with the
/// calendar UDFs registered and S3 buckets mounted on demand.
pub struct Engine {
    ctx: Arc<SessionContext>,
    s3_manager: Arc<S3Manager>,
}

impl Engine {
    pub fn new(s3: &S3Settings) -> Result<Self> {
        // Globs such as `log_data/*/*/*.json` span several directory levels.
        let mut config = SessionConfig::new();
        config.options_mut().execution.listing_table_ignore_subdirectory = false;

        let ctx = SessionContext::new_with_config(config);
        register_udfs(&ctx)?;

        Ok(Self {
            ctx: Arc::new(ctx),
            s3_manager: Arc::new(S3Manager::new(s3.clone())),
        })
    }

    /// Makes an `s3://` location readable/writable by the session. Local
    /// paths are served by the built-in filesystem store and need nothing.
    pub async fn register_location(&self, location: &str) -> Result<()> {
        if let Some(bucket) = bucket_of(location) {
            self.s3_manager
                .register_object_store(&self.ctx, &bucket)
                .await?;
            info!(bucket = %bucket, "Registered S3 object store");
        }
        Ok(())
    }

    pub async fn verify_location(&self, location: &str) -> Result<()> {
        match bucket_of(location) {
            Some(bucket) => self.s3_manager.verify_bucket_exists(&bucket).await,
            None => Ok(()),
        }
    }

    pub fn session_context(&self) -> Arc<SessionContext> {
        self.ctx.clone()
    }

    /// In-memory row-set with an explicit schema, also when `batches` is empty.
    pub fn read_batches(&self, schema: SchemaRef, batches: Vec<RecordBatch>) -> Result<DataFrame> {
        let table = MemTable::try_new(schema, vec![batches])?;
        Ok(self.ctx.read_table(Arc::new(table))?)
    }
}

/// Logs the schema and the first `rows` rows of a row-set at debug level.
pub async fn preview(label: &str, df: &DataFrame, rows: usize) -> Result<()> {
    if rows == 0 || !tracing::enabled!(tracing::Level::DEBUG) {
        return Ok(());
    }

    let fields: Vec<String> = df
        .schema()
        .fields()
        .iter()
        .map(|f| format!("{}: {}", f.name(), f.data_type()))
        .collect();
    debug!(table = label, schema = ?fields, "Row-set schema");

    let batches = df.clone().limit(0, Some(rows))?.collect().await?;
    for row in batches_to_json(batches)? {
        debug!(table = label, row = %row, "Preview");
    }
    Ok(())
}
