use std::path::{Path, PathBuf};

use super::config::Metric;
use super::csv_table::{daily_directory, read_table, write_table};
use super::error::CombineError;
use super::interval::Interval;
use super::nslc::Nslc;
use super::smoothing::daily_median;
use super::table::Table;

/// `{output}/{metric}/{NSLC}/combined_{resample}_{NSLC}.csv`
pub fn combined_path(output: &Path, metric: Metric, nslc: &Nslc, resample: Interval) -> PathBuf {
    output
        .join(metric.to_string())
        .join(nslc.to_string())
        .join(format!("combined_{resample}_{nslc}.csv"))
}

/// `{output}/{metric}/{NSLC}/daily_{resample}_{NSLC}.csv`
pub fn daily_median_path(
    output: &Path,
    metric: Metric,
    nslc: &Nslc,
    resample: Interval,
) -> PathBuf {
    output
        .join(metric.to_string())
        .join(nslc.to_string())
        .join(format!("daily_{resample}_{nslc}.csv"))
}

/// Median of every column per UTC day, labelled by midnight
pub fn daily_medians(table: &Table) -> Table {
    let mut daily = Table::new();
    for column in table.columns() {
        if let Some(series) = table.column(column) {
            daily.insert_series(column, &daily_median(&series));
        }
    }
    daily.drop_missing();
    daily
}

/// Concatenate the daily CSV files of one station into a single table and write it to
/// [combined_path].
///
/// Rows with missing values are dropped. Files are read in name order and when two rows share a
/// timestamp the later one is kept. The per-day medians of the result are written to
/// [daily_median_path].
pub fn combine(
    output: &Path,
    metric: Metric,
    nslc: &Nslc,
    resample: Interval,
) -> Result<Table, CombineError> {
    let directory = daily_directory(output, metric, nslc, resample);
    let mut files: Vec<PathBuf> = if directory.is_dir() {
        std::fs::read_dir(&directory)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "csv"))
            .collect()
    } else {
        vec![]
    };
    if files.is_empty() {
        return Err(CombineError::NoFiles(directory));
    }
    files.sort();

    let mut combined = Table::new();
    for file in files.iter() {
        let mut table = read_table(file)?;
        table.drop_missing();
        log::debug!("{nslc} :: {} rows from {}", table.len(), file.display());
        combined.merge_keep_last(table);
    }
    combined.drop_missing();

    let path = combined_path(output, metric, nslc, resample);
    write_table(&combined, &path)?;
    log::info!(
        "{nslc} :: Combined {} files ({} rows) into {}",
        files.len(),
        combined.len(),
        path.display()
    );

    let daily = daily_medians(&combined);
    let daily_path = daily_median_path(output, metric, nslc, resample);
    write_table(&daily, &daily_path)?;
    log::info!("{nslc} :: {} daily medians saved to {}", daily.len(), daily_path.display());
    Ok(combined)
}

/// Read a combined table written by [combine]
pub fn load_combined(
    output: &Path,
    metric: Metric,
    nslc: &Nslc,
    resample: Interval,
) -> Result<Table, CombineError> {
    let path = combined_path(output, metric, nslc, resample);
    if !path.exists() {
        return Err(CombineError::NoFiles(path));
    }
    Ok(read_table(&path)?)
}
