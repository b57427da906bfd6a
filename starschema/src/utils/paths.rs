use crate::schema::StarTable;
use common::config::{Settings, TableNames};
use url::Url;

/// Rewrites Hadoop-style `s3a://` / `s3n://` schemes to `s3://`.
pub fn normalize_scheme(location: &str) -> String {
    for legacy in ["s3a://", "s3n://"] {
        if let Some(rest) = location.strip_prefix(legacy) {
            return format!("s3://{}", rest);
        }
    }
    location.to_string()
}

/// Joins a root location and a relative path with exactly one separator.
pub fn join_location(root: &str, relative: &str) -> String {
    let root = normalize_scheme(root);
    let relative = relative.trim_start_matches('/');
    if root.is_empty() {
        return relative.to_string();
    }
    format!("{}/{}", root.trim_end_matches('/'), relative)
}

/// Bucket name of an `s3://` location, `None` for anything else.
pub fn bucket_of(location: &str) -> Option<String> {
    let normalized = normalize_scheme(location);
    let url = Url::parse(&normalized).ok()?;
    if url.scheme() != "s3" {
        return None;
    }
    url.host_str().map(str::to_string)
}

/// Where the two raw inputs are read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocations {
    pub songs: String,
    pub events: String,
}

impl SourceLocations {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            songs: join_location(&settings.io.input_data, &settings.io.song_glob),
            events: join_location(&settings.io.input_data, &settings.io.log_glob),
        }
    }
}

/// Directory of each output table under one output root.
#[derive(Debug, Clone)]
pub struct TableLayout {
    root: String,
    names: TableNames,
}

impl TableLayout {
    pub fn new(root: &str, names: TableNames) -> Self {
        Self {
            root: normalize_scheme(root),
            names,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(&settings.io.output_data, settings.tables.clone())
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn dir_name(&self, table: StarTable) -> &str {
        match table {
            StarTable::Songs => &self.names.songs,
            StarTable::Artists => &self.names.artists,
            StarTable::Users => &self.names.users,
            StarTable::Time => &self.names.time,
            StarTable::Songplays => &self.names.songplays,
        }
    }

    /// Table location, always with a trailing `/` so it is written as a directory.
    pub fn location(&self, table: StarTable) -> String {
        let dir = self.dir_name(table).trim_matches('/');
        format!("{}/", join_location(&self.root, dir))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_location_normalizes_separators() {
        assert_eq!(
            join_location("s3a://udacity-dend/", "song_data/A/B/C/*.json"),
            "s3://udacity-dend/song_data/A/B/C/*.json"
        );
        assert_eq!(join_location("/data", "/log_data/*/*/*.json"), "/data/log_data/*/*/*.json");
    }

    #[test]
    fn test_bucket_of() {
        assert_eq!(bucket_of("s3a://udacity-dend/log_data"), Some("udacity-dend".to_string()));
        assert_eq!(bucket_of("s3://out/"), Some("out".to_string()));
        assert_eq!(bucket_of("/tmp/output"), None);
        assert_eq!(bucket_of("file:///tmp/output"), None);
    }

    #[test]
    fn test_table_locations_are_directories() {
        let layout = TableLayout::new("s3a://warehouse/star", TableNames::default());
        assert_eq!(layout.location(StarTable::Songs), "s3://warehouse/star/songs_table/");
        assert_eq!(layout.location(StarTable::Songplays), "s3://warehouse/star/songplays_table/");
    }

    #[test]
    fn test_sources_from_settings() {
        let settings = Settings::for_locations("s3a://udacity-dend/", "/tmp/out");
        let sources = SourceLocations::from_settings(&settings);
        assert_eq!(sources.songs, "s3://udacity-dend/song_data/A/B/C/*.json");
        assert_eq!(sources.events, "s3://udacity-dend/log_data/*/*/*.json");
    }
}
