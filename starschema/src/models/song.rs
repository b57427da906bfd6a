use serde::{Deserialize, Serialize};

/// One song metadata document from `song_data/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SongRecord {
    pub song_id: String,
    pub title: String,
    #[serde(default)]
    pub artist_id: Option<String>,
    #[serde(default)]
    pub artist_name: Option<String>,
    #[serde(default)]
    pub artist_location: Option<String>,
    #[serde(default)]
    pub artist_latitude: Option<f64>,
    #[serde(default)]
    pub artist_longitude: Option<f64>,
    #[serde(default)]
    pub year: Option<i32>, // 0 when the release year is unknown
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub num_songs: Option<i64>,
}
