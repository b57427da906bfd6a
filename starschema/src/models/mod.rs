mod de;
mod event;
mod song;

pub use event::EventRecord;
pub use song::SongRecord;

/// Page value that marks an actual song play in the activity log.
pub const NEXT_SONG_PAGE: &str = "NextSong";
