use common::Result;
use datafusion::execution::context::SessionContext;
use datafusion::logical_expr::{create_udf, ScalarUDF, Volatility};
use datafusion::arrow::datatypes::DataType;
use datafusion::logical_expr::ColumnarValue;
use datafusion::arrow::array::{Array, Int32Array, Int64Array};
use datafusion::common::DataFusionError;
use std::sync::Arc;
use chrono::{DateTime, Datelike, Timelike, Utc};

pub const EPOCH_SECONDS: &str = "epoch_seconds";

/// Calendar parts derived from a second-precision UTC instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarPart {
    Hour,
    Day,
    Week,
    Month,
    Year,
    Weekday,
}

impl CalendarPart {
    pub const ALL: [CalendarPart; 6] = [
        CalendarPart::Hour,
        CalendarPart::Day,
        CalendarPart::Week,
        CalendarPart::Month,
        CalendarPart::Year,
        CalendarPart::Weekday,
    ];

    pub fn udf_name(&self) -> &'static str {
        match self {
            CalendarPart::Hour => "cal_hour",
            CalendarPart::Day => "cal_day",
            CalendarPart::Week => "cal_week",
            CalendarPart::Month => "cal_month",
            CalendarPart::Year => "cal_year",
            CalendarPart::Weekday => "cal_weekday",
        }
    }

    /// Output column name in the time table.
    pub fn column(&self) -> &'static str {
        match self {
            CalendarPart::Hour => "hour",
            CalendarPart::Day => "day",
            CalendarPart::Week => "week",
            CalendarPart::Month => "month",
            CalendarPart::Year => "year",
            CalendarPart::Weekday => "weekday",
        }
    }

    pub fn extract(&self, instant: &DateTime<Utc>) -> i32 {
        match self {
            CalendarPart::Hour => instant.hour() as i32,
            CalendarPart::Day => instant.day() as i32,
            CalendarPart::Week => instant.iso_week().week() as i32,
            CalendarPart::Month => instant.month() as i32,
            CalendarPart::Year => instant.year(),
            CalendarPart::Weekday => instant.weekday().number_from_monday() as i32,
        }
    }
}

/// Registers all UDFs with the SessionContext
pub fn register_udfs(ctx: &SessionContext) -> Result<()> {
    ctx.register_udf(epoch_seconds_udf());
    for part in CalendarPart::ALL {
        ctx.register_udf(calendar_udf(part));
    }
    Ok(())
}

/// `epoch_seconds(ts_millis)`: floor division of epoch milliseconds by 1000.
pub fn epoch_seconds_udf() -> ScalarUDF {
    create_udf(
        EPOCH_SECONDS,
        vec![DataType::Int64],
        DataType::Int64,
        Volatility::Immutable,
        Arc::new(|args| millis_to_seconds(args).map_err(|e| DataFusionError::Internal(e.to_string()))),
    )
}

/// `cal_<part>(epoch_seconds)`: one calendar part of the UTC instant.
pub fn calendar_udf(part: CalendarPart) -> ScalarUDF {
    create_udf(
        part.udf_name(),
        vec![DataType::Int64],
        DataType::Int32,
        Volatility::Immutable,
        Arc::new(move |args| {
            extract_calendar_part(args, part).map_err(|e| DataFusionError::Internal(e.to_string()))
        }),
    )
}

pub fn floor_seconds(ts_millis: i64) -> i64 {
    ts_millis.div_euclid(1000)
}

fn int64_arg(args: &[ColumnarValue]) -> Result<Int64Array> {
    let arrays = ColumnarValue::values_to_arrays(args)?;
    let array = arrays
        .first()
        .ok_or_else(|| DataFusionError::Internal("Expected one argument".to_string()))?;
    let ints = array
        .as_any()
        .downcast_ref::<Int64Array>()
        .ok_or_else(|| DataFusionError::Internal("Expected int64 array".to_string()))?;
    Ok(ints.clone())
}

fn millis_to_seconds(args: &[ColumnarValue]) -> Result<ColumnarValue> {
    let millis = int64_arg(args)?;
    let result: Int64Array = millis.iter().map(|opt_ts| opt_ts.map(floor_seconds)).collect();
    Ok(ColumnarValue::Array(Arc::new(result)))
}

fn extract_calendar_part(args: &[ColumnarValue], part: CalendarPart) -> Result<ColumnarValue> {
    let seconds = int64_arg(args)?;
    let result: Int32Array = seconds
        .iter()
        .map(|opt_secs| {
            opt_secs
                .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
                .map(|instant| part.extract(&instant))
        })
        .collect();
    Ok(ColumnarValue::Array(Arc::new(result)))
}
