use crate::utils::arrow::batches_to_json;
use common::Result;
use datafusion::prelude::*;
use serde_json::Value;

const SAMPLE_ROWS: usize = 5;

/// A row-set split on partition-key nullness.
pub struct PartitionCheck {
    /// Rows whose partition columns are all non-null.
    pub valid: DataFrame,
    pub rejected_rows: usize,
    /// Up to five rejected rows, for the defect report.
    pub sample: Vec<Value>,
}

fn any_null(columns: &[&str]) -> Option<Expr> {
    columns
        .iter()
        .map(|c| col(*c).is_null())
        .reduce(|acc, next| acc.or(next))
}

pub async fn split_null_partitions(df: DataFrame, columns: &[&str]) -> Result<PartitionCheck> {
    let Some(predicate) = any_null(columns) else {
        return Ok(PartitionCheck {
            valid: df,
            rejected_rows: 0,
            sample: Vec::new(),
        });
    };

    let rejected = df.clone().filter(predicate.clone())?;
    let rejected_rows = rejected.clone().count().await?;
    let sample = if rejected_rows > 0 {
        batches_to_json(rejected.limit(0, Some(SAMPLE_ROWS))?.collect().await?)?
    } else {
        Vec::new()
    };

    Ok(PartitionCheck {
        valid: df.filter(not(predicate))?,
        rejected_rows,
        sample,
    })
}
