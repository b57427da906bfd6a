use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use lazy_static::lazy_static;
use std::sync::Arc;

// Raw source schemas. Field names match the serialized record keys.
pub fn raw_songs_schema() -> Schema {
    Schema::new(vec![
        Field::new("song_id", DataType::Utf8, false),
        Field::new("title", DataType::Utf8, false),
        Field::new("artist_id", DataType::Utf8, true),
        Field::new("artist_name", DataType::Utf8, true),
        Field::new("artist_location", DataType::Utf8, true),
        Field::new("artist_latitude", DataType::Float64, true),
        Field::new("artist_longitude", DataType::Float64, true),
        Field::new("year", DataType::Int32, true),
        Field::new("duration", DataType::Float64, true),
        Field::new("num_songs", DataType::Int64, true),
    ])
}

pub fn raw_events_schema() -> Schema {
    Schema::new(vec![
        Field::new("artist", DataType::Utf8, true),
        Field::new("auth", DataType::Utf8, true),
        Field::new("firstName", DataType::Utf8, true),
        Field::new("gender", DataType::Utf8, true),
        Field::new("itemInSession", DataType::Int64, true),
        Field::new("lastName", DataType::Utf8, true),
        Field::new("length", DataType::Float64, true),
        Field::new("level", DataType::Utf8, true),
        Field::new("location", DataType::Utf8, true),
        Field::new("method", DataType::Utf8, true),
        Field::new("page", DataType::Utf8, true),
        Field::new("registration", DataType::Float64, true),
        Field::new("sessionId", DataType::Int64, true),
        Field::new("song", DataType::Utf8, true),
        Field::new("status", DataType::Int64, true),
        Field::new("ts", DataType::Int64, true),
        Field::new("userAgent", DataType::Utf8, true),
        Field::new("userId", DataType::Utf8, true),
    ])
}

pub enum RawSchema {
    Songs,
    Events,
}

pub fn get_raw_schema(kind: RawSchema) -> SchemaRef {
    match kind {
        RawSchema::Songs => RAW_SONGS_SCHEMA.clone(),
        RawSchema::Events => RAW_EVENTS_SCHEMA.clone(),
    }
}

// Lazy-loaded static schemas
lazy_static! {
    static ref RAW_SONGS_SCHEMA: SchemaRef = Arc::new(raw_songs_schema());
    static ref RAW_EVENTS_SCHEMA: SchemaRef = Arc::new(raw_events_schema());
}

/// The five tables of the star schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StarTable {
    Songs,
    Artists,
    Users,
    Time,
    Songplays,
}

impl StarTable {
    pub const ALL: [StarTable; 5] = [
        StarTable::Songs,
        StarTable::Artists,
        StarTable::Users,
        StarTable::Time,
        StarTable::Songplays,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            StarTable::Songs => "songs",
            StarTable::Artists => "artists",
            StarTable::Users => "users",
            StarTable::Time => "time",
            StarTable::Songplays => "songplays",
        }
    }

    /// Hive partition columns, outermost first. Empty for flat tables.
    pub fn partition_columns(&self) -> &'static [&'static str] {
        match self {
            StarTable::Songs => &["year", "artist_id"],
            StarTable::Time | StarTable::Songplays => &["year", "month"],
            StarTable::Artists | StarTable::Users => &[],
        }
    }

    /// Column order of the table as written.
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            StarTable::Songs => &["song_id", "title", "artist_id", "year", "duration"],
            StarTable::Artists => &["artist_id", "name", "location", "latitude", "longitude"],
            StarTable::Users => &["user_id", "first_name", "last_name", "gender", "level"],
            StarTable::Time => &["start_time", "hour", "day", "week", "month", "year", "weekday"],
            StarTable::Songplays => &[
                "songplay_id",
                "start_time",
                "year",
                "month",
                "user_id",
                "level",
                "song_id",
                "artist_id",
                "session_id",
                "location",
                "user_agent",
            ],
        }
    }
}

impl std::fmt::Display for StarTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.name())
    }
}
