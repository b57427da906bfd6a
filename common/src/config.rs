use config::{Config, ConfigError};
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub io: IoConfig,
    #[serde(default)]
    pub tables: TableNames,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub s3: S3Settings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IoConfig {
    pub input_data: String,  // root of song_data/ and log_data/
    pub output_data: String, // root of the five table directories
    #[serde(default = "default_song_glob")]
    pub song_glob: String,
    #[serde(default = "default_log_glob")]
    pub log_glob: String,
}

/// Directory names of the five output tables under `io.output_data`.
#[derive(Debug, Deserialize, Clone)]
pub struct TableNames {
    #[serde(default = "default_songs_dir")]
    pub songs: String,
    #[serde(default = "default_artists_dir")]
    pub artists: String,
    #[serde(default = "default_users_dir")]
    pub users: String,
    #[serde(default = "default_time_dir")]
    pub time: String,
    #[serde(default = "default_songplays_dir")]
    pub songplays: String,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TitleMatch {
    #[default]
    Exact,
    CaseInsensitive,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SurrogateKeyStrategy {
    #[default]
    Sequential,
    PartitionOffset,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PipelineConfig {
    /// Fail a partitioned table instead of excluding rows with null partition keys.
    #[serde(default)]
    pub strict_partitions: bool,
    #[serde(default)]
    pub title_match: TitleMatch,
    #[serde(default)]
    pub surrogate_keys: SurrogateKeyStrategy,
    #[serde(default = "default_preview_rows")]
    pub preview_rows: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct S3Settings {
    pub endpoint: Option<String>,
    #[serde(default = "default_s3_region")]
    pub region: String,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    #[serde(default)]
    pub allow_http: bool,
    #[serde(default = "default_verify_buckets")]
    pub verify_buckets: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

fn default_song_glob() -> String {
    "song_data/A/B/C/*.json".to_string()
}

fn default_log_glob() -> String {
    "log_data/*/*/*.json".to_string()
}

fn default_songs_dir() -> String {
    "songs_table".to_string()
}

fn default_artists_dir() -> String {
    "artists_table".to_string()
}

fn default_users_dir() -> String {
    "users_table".to_string()
}

fn default_time_dir() -> String {
    "time_table".to_string()
}

fn default_songplays_dir() -> String {
    "songplays_table".to_string()
}

fn default_preview_rows() -> usize {
    10
}

fn default_s3_region() -> String {
    "us-west-2".to_string()
}

fn default_verify_buckets() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            songs: default_songs_dir(),
            artists: default_artists_dir(),
            users: default_users_dir(),
            time: default_time_dir(),
            songplays: default_songplays_dir(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            strict_partitions: false,
            title_match: TitleMatch::default(),
            surrogate_keys: SurrogateKeyStrategy::default(),
            preview_rows: default_preview_rows(),
        }
    }
}

impl Default for S3Settings {
    fn default() -> Self {
        Self {
            endpoint: None,
            region: default_s3_region(),
            access_key: None,
            secret_key: None,
            allow_http: false,
            verify_buckets: default_verify_buckets(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Settings {
    pub fn new(path: &str) -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(
                config::Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__"),
            );

        let config = builder.build()?;
        let settings: Settings = config.try_deserialize()?;

        debug!(
            input = %settings.io.input_data,
            output = %settings.io.output_data,
            song_glob = %settings.io.song_glob,
            log_glob = %settings.io.log_glob,
            "Loaded pipeline settings"
        );

        Ok(settings)
    }

    /// Settings for the given roots with every other value defaulted.
    pub fn for_locations(input_data: &str, output_data: &str) -> Self {
        Self {
            io: IoConfig {
                input_data: input_data.to_string(),
                output_data: output_data.to_string(),
                song_glob: default_song_glob(),
                log_glob: default_log_glob(),
            },
            tables: TableNames::default(),
            pipeline: PipelineConfig::default(),
            s3: S3Settings::default(),
            logging: LoggingConfig::default(),
        }
    }
}
