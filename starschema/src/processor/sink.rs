use super::partition::split_null_partitions;
use super::Engine;
use arrow::datatypes::DataType;
use crate::schema::StarTable;
use crate::utils::paths::TableLayout;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{Error, Result};
use datafusion::dataframe::DataFrameWriteOptions;
use datafusion::datasource::listing::ListingTableUrl;
use datafusion::execution::context::SessionContext;
use datafusion::prelude::*;
use futures::TryStreamExt;
use object_store::ObjectMeta;
use object_store::path::Path;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

pub const SUCCESS_MARKER: &str = "_SUCCESS";

/// Result of one table write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableWrite {
    pub table: StarTable,
    pub location: String,
    pub rows_written: usize,
    /// Rows left out because a partition column was null.
    pub rejected_rows: usize,
}

#[derive(Debug, Serialize)]
struct SuccessMarker<'a> {
    run_id: &'a str,
    table: &'a str,
    location: &'a str,
    rows_written: usize,
    rejected_rows: usize,
    partition_columns: &'a [&'a str],
    created_at: DateTime<Utc>,
}

/// Destination of the star schema tables. Each call is an independent unit:
/// a failure affects only the table being written.
#[async_trait]
pub trait TableSink: Send + Sync {
    async fn write_table(&self, table: StarTable, df: DataFrame) -> Result<TableWrite>;
}

/// Writes each table as hive-partitioned Parquet under its own directory,
/// replacing whatever the directory held before.
pub struct ParquetSink {
    ctx: Arc<SessionContext>,
    layout: TableLayout,
    strict_partitions: bool,
    run_id: String,
}

impl ParquetSink {
    pub fn new(engine: &Engine, layout: TableLayout, strict_partitions: bool, run_id: &str) -> Self {
        Self {
            ctx: engine.session_context(),
            layout,
            strict_partitions,
            run_id: run_id.to_string(),
        }
    }

    pub fn layout(&self) -> &TableLayout {
        &self.layout
    }

    async fn write(&self, table: StarTable, df: DataFrame) -> Result<TableWrite> {
        validate_columns(table, &df)?;
        let location = self.layout.location(table);
        let partition_columns = table.partition_columns();

        let check = split_null_partitions(df, partition_columns).await?;
        if check.rejected_rows > 0 {
            error!(
                table = %table,
                rows = check.rejected_rows,
                columns = ?partition_columns,
                sample = %serde_json::to_string(&check.sample)?,
                "Rows with null partition key"
            );
            if self.strict_partitions {
                return Err(Error::NullPartitionKey {
                    table: table.name().to_string(),
                    columns: partition_columns.join(", "),
                    rows: check.rejected_rows,
                });
            }
        }

        let rows_written = check.valid.clone().count().await?;

        let removed = self.clear_destination(&location).await?;
        if removed > 0 {
            info!(table = %table, objects = removed, "Cleared previous table output");
        }

        // Partition values become directory names.
        let mut valid = check.valid;
        for column in partition_columns {
            valid = valid.with_column(column, cast(col(*column), DataType::Utf8))?;
        }

        let options = DataFrameWriteOptions::new().with_partition_by(
            partition_columns.iter().map(|c| c.to_string()).collect(),
        );
        valid.write_parquet(&location, options, None).await?;

        let write = TableWrite {
            table,
            location,
            rows_written,
            rejected_rows: check.rejected_rows,
        };
        self.write_marker(&write).await?;

        info!(
            table = %table,
            location = %write.location,
            rows = write.rows_written,
            rejected = write.rejected_rows,
            "Table written"
        );
        Ok(write)
    }

    /// Deletes every object under the table location. Returns how many were removed.
    async fn clear_destination(&self, location: &str) -> Result<usize> {
        let table_url = ListingTableUrl::parse(location)?;
        let store = self.ctx.runtime_env().object_store(table_url.object_store())?;

        let existing: Vec<ObjectMeta> = match store.list(Some(table_url.prefix())).try_collect().await {
            Ok(objects) => objects,
            Err(object_store::Error::NotFound { .. }) => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        for meta in &existing {
            match store.delete(&meta.location).await {
                Ok(()) | Err(object_store::Error::NotFound { .. }) => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(existing.len())
    }

    async fn write_marker(&self, write: &TableWrite) -> Result<()> {
        let marker = SuccessMarker {
            run_id: &self.run_id,
            table: write.table.name(),
            location: &write.location,
            rows_written: write.rows_written,
            rejected_rows: write.rejected_rows,
            partition_columns: write.table.partition_columns(),
            created_at: Utc::now(),
        };
        let marker_json = serde_json::to_vec_pretty(&marker)?;

        let table_url = ListingTableUrl::parse(&write.location)?;
        let store = self.ctx.runtime_env().object_store(table_url.object_store())?;
        let marker_key: Path = table_url.prefix().child(SUCCESS_MARKER);

        if let Err(e) = store.put(&marker_key, marker_json.into()).await {
            warn!(table = %write.table, error = %e, "Failed to write success marker");
            return Err(e.into());
        }
        Ok(())
    }
}

fn validate_columns(table: StarTable, df: &DataFrame) -> Result<()> {
    let actual: Vec<&str> = df
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().as_str())
        .collect();
    if actual != table.columns() {
        return Err(Error::SchemaMismatch(format!(
            "{} expects columns {:?}, got {:?}",
            table,
            table.columns(),
            actual
        )));
    }
    Ok(())
}

#[async_trait]
impl TableSink for ParquetSink {
    async fn write_table(&self, table: StarTable, df: DataFrame) -> Result<TableWrite> {
        self.write(table, df)
            .await
            .map_err(|e| Error::table_write(table.name(), e))
    }
}
