use std::path::PathBuf;
use std::sync::mpsc::Sender;
use time::Date;

use super::combine::combine;
use super::config::{Config, Metric};
use super::csv_table::save_daily;
use super::error::{CombineError, ProcessorError};
use super::nslc::Nslc;
use super::plot::plot;
use super::sds::Sds;
use super::worker_status::WorkerStatus;

/// Compute one metric for one station and day and save it.
fn process_station(
    config: &Config,
    metric: Metric,
    sds: &mut Sds,
    date: Date,
) -> Result<Option<PathBuf>, ProcessorError> {
    let stream = sds.get(date);
    let nslc = sds.nslc().clone();
    if stream.is_empty() {
        log::info!("{date} :: {nslc} :: No data, skipping");
        return Ok(None);
    }

    log::info!("{date} :: {nslc} :: Calculating {metric}");
    let table = match metric {
        Metric::Dsar => config.dsar().compute(&stream)?,
        Metric::Rsam => config.rsam().compute(&stream)?,
    };
    Ok(save_daily(
        &table,
        &config.output_path,
        metric,
        &nslc,
        config.resample,
    )?)
}

/// Process every station for a single date. A failing station is logged and does not stop the
/// others. Returns the number of files written.
pub fn process_date(config: &Config, metric: Metric, readers: &mut [Sds], date: Date) -> usize {
    let mut saved = 0;
    for sds in readers.iter_mut() {
        match process_station(config, metric, sds, date) {
            Ok(Some(_)) => saved += 1,
            Ok(None) => (),
            Err(e) => log::error!("{date} :: {} :: {e}", sds.nslc()),
        }
    }
    saved
}

/// One archive reader per configured station
pub fn create_readers(config: &Config) -> Result<Vec<Sds>, ProcessorError> {
    let mut readers = Vec::with_capacity(config.stations.len());
    for nslc in config.stations.iter() {
        readers.push(Sds::new(&config.sds_path, nslc.clone())?);
    }
    Ok(readers)
}

/// Process a subset of dates
pub fn process_subset(
    config: Config,
    metric: Metric,
    tx: Sender<WorkerStatus>,
    worker_id: usize,
    subset: Vec<Date>,
) -> Result<(), ProcessorError> {
    let mut readers = create_readers(&config)?;
    let total = subset.len();
    let mut saved = 0;
    for (idx, date) in subset.into_iter().enumerate() {
        log::info!("Processing {date}...");
        saved += process_date(&config, metric, &mut readers, date);
        tx.send(WorkerStatus::new(
            (idx + 1) as f32 / total as f32,
            date,
            worker_id,
            metric,
        ))?;
    }

    let (n_files, n_bytes) = readers
        .iter()
        .flat_map(|sds| sds.loaded_files())
        .fold((0, 0u64), |(n, bytes), file| (n + 1, bytes + file.size));
    log::info!(
        "Worker {worker_id} read {n_files} files ({}) and saved {saved} tables.",
        human_bytes::human_bytes(n_bytes as f64)
    );
    Ok(())
}

/// Divide the date range in to a set of subranges (per thread/worker)
pub fn create_subsets(config: &Config) -> Vec<Vec<Date>> {
    let mut subsets: Vec<Vec<Date>> = vec![Vec::new(); config.n_threads.max(1) as usize];
    let n_subsets = subsets.len();

    for (idx, date) in config.dates().into_iter().enumerate() {
        subsets[idx % n_subsets].push(date)
    }

    subsets
}

/// Combine the daily files of every station. Stations without daily files are skipped.
pub fn combine_all(config: &Config, metric: Metric) -> Result<Vec<Nslc>, ProcessorError> {
    let mut combined = vec![];
    for nslc in config.stations.iter() {
        match combine(&config.output_path, metric, nslc, config.resample) {
            Ok(_) => combined.push(nslc.clone()),
            Err(CombineError::NoFiles(dir)) => {
                log::warn!("{nslc} :: No {metric} files in {}, skipping", dir.display())
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(combined)
}

/// Plot the combined tables. DSAR gets one figure per station, RSAM one figure with a panel
/// per station. Stations without a combined table are logged and skipped.
pub fn plot_all(
    config: &Config,
    metric: Metric,
    stations: &[Nslc],
) -> Result<Vec<PathBuf>, ProcessorError> {
    let groups: Vec<&[Nslc]> = match metric {
        Metric::Dsar => stations.iter().map(std::slice::from_ref).collect(),
        Metric::Rsam => vec![stations],
    };
    let mut figures = vec![];
    for group in groups {
        if let Some(figure) = plot(
            &config.output_path,
            metric,
            group,
            config.resample,
            &config.plot,
        )? {
            figures.push(figure);
        }
    }
    Ok(figures)
}
