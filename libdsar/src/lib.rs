//! # dsar
//!
//! dsar computes seismic amplitude metrics for volcano monitoring, written in Rust. It reads
//! continuous seismometer recordings from a SeisComP Data Structure (SDS) archive of miniSEED
//! files and produces two families of time series:
//!
//! - RSAM (Real-time Seismic Amplitude Measurement): summary statistics (min, mean, max,
//! median, RMS) of the absolute amplitude over fixed windows, plus the mean amplitude in a set
//! of frequency bands and the frequency ratio `f_ratio = log2(VT / LP)`.
//! - DSAR (Displacement Seismic Amplitude Ratio): the ratio of the median displacement in a
//! low-frequency band to the median displacement in a high-frequency band, smoothed with
//! centred rolling medians.
//!
//! Results are written as one CSV file per station per day, combined into a single CSV file
//! per station, and plotted as SVG figures with eruption annotations.
//!
//! ## Installation
//!
//! The only method of install is from source.
//!
//! ### Rust
//!
//! If you have not used Rust before, you will most likely need to install the Rust tool
//! chain. See the [Rust docs](https://www.rust-lang.org/tools/install) for installation
//! instructions.
//!
//! ### Building & Install
//!
//! To build and install the CLI use `cargo install --path ./dsar_cli` from the top level
//! dsar repository. The binary is installed to your cargo install location (typically
//! `~/.cargo/bin/`) and can be removed with `cargo uninstall dsar_cli`.
//!
//! ## Usage
//!
//! ```text
//! dsar_cli new -p config.yml      # write a template configuration
//! dsar_cli dsar -p config.yml     # compute DSAR for every station and day, then combine
//! dsar_cli rsam -p config.yml     # compute RSAM for every station and day, then combine
//! dsar_cli combine -p config.yml --metric dsar
//! dsar_cli plot -p config.yml --metric rsam
//! ```
//!
//! ## Configuration
//!
//! - `sds_path`: Root of the SDS archive. Day files are expected at
//! `{sds_path}/{YYYY}/{NET}/{STA}/{CHA}.D/{NET}.{STA}.{LOC}.{CHA}.D.{YYYY}.{DDD}`
//! - `output_path`: Directory to which CSV files and figures are written
//! - `stations`: List of channels as `NET.STA.LOC.CHA`. The location code may be empty.
//! - `start_date`, `end_date`: Inclusive date range, `YYYY-MM-DD`
//! - `resample`: Window of the output series, e.g. `10min`, `1h`, `1d`
//! - `n_threads`: Number of parallel workers. Dates are dealt round-robin to the workers.
//! Must be at least 1.
//! - `dsar`: The two bands (`highpass <= band_low <= band_high`) and the rolling median windows
//! - `rsam`: Optional pre-filter band-pass, filter order and the named bands
//! - `plot`: Tick spacing in days, title, y limits, an optional Hodrick-Prescott trend
//! (`hp_lambda`), the RSAM column to plot and the eruptions to annotate
//!
//! The YAML format of a configuration file is as follows:
//!
//! ```yml
//! sds_path: /data/sds
//! output_path: /data/output
//! stations:
//! - VG.OJN.00.EHZ
//! start_date: 2025-01-01
//! end_date: 2025-01-31
//! resample: 10min
//! n_threads: 4
//! dsar:
//!   first_band: {name: LF, highpass: 0.1, band_low: 4.5, band_high: 8.0}
//!   second_band: {name: HF, highpass: 0.1, band_low: 8.0, band_high: 16.0}
//!   windows: [6h, 24h]
//! rsam:
//!   filter: null
//!   corners: 4
//!   bands:
//!   - {name: VLP, freqmin: 0.02, freqmax: 0.2}
//!   - {name: LP, freqmin: 0.5, freqmax: 4.0}
//!   - {name: VT, freqmin: 4.0, freqmax: 18.0}
//! plot:
//!   interval_day: 3
//!   title: null
//!   y_min: null
//!   y_max: null
//!   hp_lambda: null
//!   rsam_column: VT
//!   continuous_eruptions:
//!   - {start: 2025-01-10, end: 2025-01-12}
//!   single_eruptions: [2025-01-20]
//! ```
//!
//! The `dsar`, `rsam` and `plot` sections may be left out to use the defaults shown.
//!
//! ## Output
//!
//! ```text
//! output
//! |---- dsar
//! |    |---- VG.OJN.00.EHZ
//! |    |    |---- combined_10min_VG.OJN.00.EHZ.csv
//! |    |    |---- daily_10min_VG.OJN.00.EHZ.csv
//! |    |    |---- 10min
//! |    |    |    |---- VG.OJN.00.EHZ_2025-01-01.csv
//! |---- rsam
//! |    |---- ...
//! |---- figures
//! |    |---- dsar
//! |    |    |---- VG.OJN.00.EHZ
//! |    |    |    |---- VG.OJN.00.EHZ_10min_2025-01-01-2025-01-31.svg
//! |    |---- rsam
//! |    |    |---- stations
//! ```
//!
//! Every CSV file starts with a `datetime` column (`YYYY-MM-DD HH:MM:SS`, UTC, left edge of
//! the window). DSAR files hold the two band columns, `DSAR_<resample>` and one
//! `DSAR_<window>_median` column per smoothing window. RSAM files hold `min`, `mean`, `max`,
//! `median`, `rms`, one column per band and `f_ratio`. Missing values are empty cells.
//!
//! A log file (`dsar.log`) is written next to where the CLI is run.
pub mod combine;
pub mod config;
pub mod constants;
pub mod csv_table;
pub mod dsar;
pub mod error;
pub mod filter;
pub mod frequency_bands;
pub mod interval;
pub mod mseed_file;
pub mod mseed_record;
pub mod nslc;
pub mod plot;
pub mod process;
pub mod resample;
pub mod rsam;
pub mod sds;
pub mod smoothing;
pub mod table;
pub mod trace;
pub mod worker_status;
