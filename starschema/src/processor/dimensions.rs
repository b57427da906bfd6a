//! Dimension extraction: project a fixed column set and drop exact duplicates.
//!
//! Deduplication is over the whole projected tuple. Two rows sharing a business
//! key (`song_id`, `artist_id`, `user_id`) but differing in any other column are
//! both kept; a user who changed subscription level appears once per level.

use common::Result;
use datafusion::prelude::*;

/// `songs(song_id, title, artist_id, year, duration)` from song records.
pub fn songs_table(songs: DataFrame) -> Result<DataFrame> {
    let projected = songs.select_columns(&["song_id", "title", "artist_id", "year", "duration"])?;
    Ok(projected.distinct()?)
}

/// `artists(artist_id, name, location, latitude, longitude)` from song records.
pub fn artists_table(songs: DataFrame) -> Result<DataFrame> {
    let projected = songs.select(vec![
        col("artist_id"),
        col("artist_name").alias("name"),
        col("artist_location").alias("location"),
        col("artist_latitude").alias("latitude"),
        col("artist_longitude").alias("longitude"),
    ])?;
    Ok(projected.distinct()?)
}

/// `users(user_id, first_name, last_name, gender, level)` from song plays.
pub fn users_table(plays: DataFrame) -> Result<DataFrame> {
    let projected = plays.select(vec![
        ident("userId").alias("user_id"),
        ident("firstName").alias("first_name"),
        ident("lastName").alias("last_name"),
        col("gender"),
        col("level"),
    ])?;
    Ok(projected.distinct()?)
}
