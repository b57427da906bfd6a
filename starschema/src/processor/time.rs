use super::udf::{calendar_udf, epoch_seconds_udf, CalendarPart};
use common::Result;
use datafusion::prelude::*;

/// Adds `start_time` (whole epoch seconds) plus the `year`/`month` partition
/// keys to song-play rows. Calendar parts are taken in UTC.
pub fn with_event_time(plays: DataFrame) -> Result<DataFrame> {
    let start_time = epoch_seconds_udf().call(vec![col("ts")]);
    let year = calendar_udf(CalendarPart::Year).call(vec![col("start_time")]);
    let month = calendar_udf(CalendarPart::Month).call(vec![col("start_time")]);

    Ok(plays
        .with_column("start_time", start_time)?
        .with_column("year", year)?
        .with_column("month", month)?)
}

/// `time(start_time, hour, day, week, month, year, weekday)`, one row per
/// distinct `start_time`. Expects the output of [`with_event_time`].
pub fn time_table(plays: DataFrame) -> Result<DataFrame> {
    let part = |p: CalendarPart| calendar_udf(p).call(vec![col("start_time")]).alias(p.column());

    let projected = plays.select(vec![
        col("start_time"),
        part(CalendarPart::Hour),
        part(CalendarPart::Day),
        part(CalendarPart::Week),
        col("month"),
        col("year"),
        part(CalendarPart::Weekday),
    ])?;
    Ok(projected.distinct()?)
}
