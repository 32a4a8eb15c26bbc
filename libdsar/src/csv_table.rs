use std::path::{Path, PathBuf};
use time::format_description::FormatItem;
use time::macros::format_description;
use time::PrimitiveDateTime;

use super::config::Metric;
use super::constants::DATETIME_COLUMN;
use super::error::CsvTableError;
use super::interval::{from_nanos, to_nanos, Interval};
use super::nslc::Nslc;
use super::table::Table;

const DATETIME_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

pub fn format_timestamp(nanos: i64) -> Result<String, CsvTableError> {
    Ok(from_nanos(nanos).format(DATETIME_FORMAT)?)
}

pub fn parse_timestamp(s: &str) -> Result<i64, CsvTableError> {
    let datetime = PrimitiveDateTime::parse(s.trim(), DATETIME_FORMAT)
        .map_err(|_| CsvTableError::BadTimestamp(s.to_string()))?;
    Ok(to_nanos(datetime))
}

/// Write a table with a leading datetime column. Missing values are empty cells.
pub fn write_table(table: &Table, path: &Path) -> Result<(), CsvTableError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path)?;
    let mut header = vec![DATETIME_COLUMN.to_string()];
    header.extend(table.columns().iter().cloned());
    writer.write_record(&header)?;

    for (timestamp, row) in table.rows() {
        let mut record = Vec::with_capacity(row.len() + 1);
        record.push(format_timestamp(timestamp)?);
        record.extend(row.iter().map(|v| {
            if v.is_nan() {
                String::new()
            } else {
                v.to_string()
            }
        }));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Read a table written by [write_table]. Columns other than datetime are taken from the
/// header; empty cells become NaN.
pub fn read_table(path: &Path) -> Result<Table, CsvTableError> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();
    let time_idx = headers
        .iter()
        .position(|h| h == DATETIME_COLUMN)
        .ok_or_else(|| CsvTableError::MissingDatetimeColumn(path.to_path_buf()))?;

    let columns: Vec<String> = headers
        .iter()
        .enumerate()
        .filter(|(idx, _)| *idx != time_idx)
        .map(|(_, h)| h.to_string())
        .collect();
    let mut table = Table::with_columns(columns);

    for record in reader.records() {
        let record = record?;
        let mut timestamp = None;
        let mut values = Vec::with_capacity(record.len());
        for (idx, field) in record.iter().enumerate() {
            if idx == time_idx {
                timestamp = Some(parse_timestamp(field)?);
            } else if field.trim().is_empty() {
                values.push(f64::NAN);
            } else {
                values.push(
                    field
                        .trim()
                        .parse::<f64>()
                        .map_err(|_| CsvTableError::BadValue(field.to_string()))?,
                );
            }
        }
        match timestamp {
            Some(t) => table.push_row(t, values),
            None => return Err(CsvTableError::BadTimestamp(String::new())),
        }
    }
    Ok(table)
}

/// `{output}/{metric}/{NSLC}/{resample}`
pub fn daily_directory(output: &Path, metric: Metric, nslc: &Nslc, resample: Interval) -> PathBuf {
    output
        .join(metric.to_string())
        .join(nslc.to_string())
        .join(resample.to_string())
}

/// Save one day of results as `{NSLC}_{YYYY-MM-DD}.csv`, dated by the first row.
/// Empty tables are skipped and give `None`.
pub fn save_daily(
    table: &Table,
    output: &Path,
    metric: Metric,
    nslc: &Nslc,
    resample: Interval,
) -> Result<Option<PathBuf>, CsvTableError> {
    let first = match table.first_timestamp() {
        Some(t) => t,
        None => {
            log::info!("{nslc} :: Empty {metric} table, nothing saved");
            return Ok(None);
        }
    };
    let date = from_nanos(first).date();
    let path = daily_directory(output, metric, nslc, resample).join(format!("{nslc}_{date}.csv"));
    write_table(table, &path)?;
    log::info!("{date} :: {nslc} :: Saved to {}", path.display());
    Ok(Some(path))
}
