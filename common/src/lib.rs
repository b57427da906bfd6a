use arrow::error::ArrowError;
use aws_smithy_runtime_api::client::result::CreateUnhandledError;
use aws_smithy_runtime_api::client::result::SdkError;
use aws_smithy_runtime_api::http::Response;
use parquet::errors::ParquetError;
use datafusion::error::DataFusionError;
use thiserror::Error;
use url::ParseError;

pub mod config;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("S3 error: {0}")]
    S3(#[from] aws_sdk_s3::Error),

    #[error("AWS SDK error: {0}")]
    AwsSdk(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Parquet error: {0}")]
    Parquet(#[from] ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),

    #[error("DataFusion error: {0}")]
    DataFusion(#[from] DataFusionError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Table {table}: {rows} row(s) with null partition key among ({columns})")]
    NullPartitionKey {
        table: String,
        columns: String,
        rows: usize,
    },

    #[error("Source {location} unreadable: {reason}")]
    SourceUnavailable { location: String, reason: String },

    #[error("Write of table {table} failed: {source}")]
    TableWrite {
        table: String,
        #[source]
        source: Box<Error>,
    },

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Wraps an error with the name of the table whose write it aborted.
    pub fn table_write(table: &str, source: Error) -> Self {
        match source {
            already @ Error::TableWrite { .. } => already,
            other => Error::TableWrite {
                table: table.to_string(),
                source: Box::new(other),
            },
        }
    }
}

// Implement From for various SdkError types
impl<E: std::fmt::Debug + CreateUnhandledError> From<SdkError<E, Response>> for Error {
    fn from(err: SdkError<E, Response>) -> Self {
        Error::AwsSdk(format!("{:?}", err))
    }
}

impl From<object_store::Error> for Error {
    fn from(err: object_store::Error) -> Self {
        Error::Storage(format!("Object store error: {}", err))
    }
}

impl From<ParseError> for Error {
    fn from(err: ParseError) -> Self {
        Error::InvalidInput(format!("URL parse error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_write_wraps_once() {
        let inner = Error::Storage("permission denied".to_string());
        let wrapped = Error::table_write("users", inner);
        let rewrapped = Error::table_write("time", wrapped);

        match rewrapped {
            Error::TableWrite { table, source } => {
                assert_eq!(table, "users");
                assert!(matches!(*source, Error::Storage(_)));
            }
            other => panic!("Expected TableWrite, got {:?}", other),
        }
    }

    #[test]
    fn test_null_partition_message_names_table() {
        let err = Error::NullPartitionKey {
            table: "songs".to_string(),
            columns: "year, artist_id".to_string(),
            rows: 2,
        };
        let message = err.to_string();
        assert!(message.contains("songs"));
        assert!(message.contains("year, artist_id"));
    }
}
