use std::path::PathBuf;
use thiserror::Error;

use super::worker_status::WorkerStatus;

#[derive(Debug, Clone, Error)]
pub enum NslcError {
    #[error("NSLC {0:?} must have exactly four dot-separated fields (Network.Station.Location.Channel)")]
    WrongFieldCount(String),
    #[error("NSLC {0:?} has an empty station code")]
    EmptyStation(String),
    #[error("NSLC {0:?} has an empty channel code")]
    EmptyChannel(String),
}

#[derive(Debug, Clone, Error)]
pub enum IntervalError {
    #[error("Interval string is empty")]
    Empty,
    #[error("Interval {0:?} has an invalid count")]
    BadCount(String),
    #[error("Interval {0:?} has an unknown unit; expected s, min, h or d")]
    UnknownUnit(String),
    #[error("Interval {0:?} must be greater than zero")]
    NonPositive(String),
}

#[derive(Debug, Clone, Error)]
pub enum BandError {
    #[error("Band {name} must satisfy highpass <= band_low <= band_high; got {highpass}, {band_low}, {band_high}")]
    BadDsarOrder {
        name: String,
        highpass: f64,
        band_low: f64,
        band_high: f64,
    },
    #[error("Band {name} must satisfy freqmin < freqmax; got {freqmin}, {freqmax}")]
    BadRsamOrder {
        name: String,
        freqmin: f64,
        freqmax: f64,
    },
    #[error("Pre-filter must satisfy 0 < freqmin < freqmax; got {freqmin}, {freqmax}")]
    BadPreFilter { freqmin: f64, freqmax: f64 },
    #[error("Band {0} has a non-positive frequency")]
    NonPositive(String),
    #[error("Band name must not be empty")]
    EmptyName,
}

#[derive(Debug, Error)]
pub enum MseedError {
    #[error("miniSEED read failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("miniSEED record at byte {0} has an invalid fixed header")]
    InvalidHeader(usize),
    #[error("miniSEED record at byte {0} has no blockette 1000")]
    MissingBlockette1000(usize),
    #[error("miniSEED record at byte {offset} declares record length {length} which exceeds the {available} bytes left")]
    Truncated {
        offset: usize,
        length: usize,
        available: usize,
    },
    #[error("miniSEED record at byte {0} has a bad record length exponent {1}")]
    BadRecordLength(usize, u8),
    #[error("miniSEED record at byte {0} has an invalid start time")]
    BadStartTime(usize),
    #[error("miniSEED encoding {0} is not supported")]
    UnsupportedEncoding(u8),
    #[error("miniSEED data section holds {found} samples but the header declares {expected}")]
    SampleCountMismatch { expected: usize, found: usize },
    #[error("Steim frame contains an invalid difference code {0}")]
    BadSteimCode(u32),
}

#[derive(Debug, Clone, Error)]
pub enum FilterError {
    #[error("Selected high corner frequency {freq} Hz is above Nyquist ({nyquist} Hz)")]
    AboveNyquist { freq: f64, nyquist: f64 },
    #[error("Band-pass low corner {freqmin} Hz must be below the high corner {freqmax} Hz")]
    InvertedBand { freqmin: f64, freqmax: f64 },
    #[error("Filter frequency {0} Hz must be greater than zero")]
    NonPositiveFrequency(f64),
    #[error("Filter needs at least one corner; got {0}")]
    BadCorners(usize),
    #[error("Cannot filter a trace with sampling rate {0}")]
    BadSamplingRate(f64),
}

#[derive(Debug, Error)]
pub enum SdsError {
    #[error("SDS directory does not exist: {0:?}")]
    BadRootPath(PathBuf),
    #[error("SDS path is not a directory: {0:?}")]
    NotADirectory(PathBuf),
}

#[derive(Debug, Error)]
pub enum DsarError {
    #[error("DSAR failed due to filter error: {0}")]
    FilterError(#[from] FilterError),
    #[error("DSAR table is missing band column {0}")]
    MissingColumn(String),
}

#[derive(Debug, Error)]
pub enum CsvTableError {
    #[error("CSV table failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("CSV table failed due to CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("CSV file {0:?} has no datetime column")]
    MissingDatetimeColumn(PathBuf),
    #[error("CSV file has an unparseable timestamp {0:?}")]
    BadTimestamp(String),
    #[error("CSV file has an unparseable value {0:?}")]
    BadValue(String),
    #[error("Failed to format timestamp: {0}")]
    FormatError(#[from] time::error::Format),
}

#[derive(Debug, Error)]
pub enum CombineError {
    #[error("Combine found no CSV files in {0:?}")]
    NoFiles(PathBuf),
    #[error("Combine failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Combine failed due to CSV table error: {0}")]
    TableError(#[from] CsvTableError),
}

#[derive(Debug, Error)]
pub enum PlotError {
    #[error("Cannot plot {0}: the combined table is empty")]
    EmptyTable(String),
    #[error("Cannot plot {station}: column {column} is missing")]
    MissingColumn { station: String, column: String },
    #[error("Plot failed due to drawing error: {0}")]
    DrawingError(#[from] plotters::drawing::DrawingAreaErrorKind<std::io::Error>),
    #[error("Plot failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Plot failed due to combine error: {0}")]
    CombineError(#[from] CombineError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration as file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Config failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Config failed to parse YAML: {0}")]
    ParsingError(#[from] serde_yaml::Error),
    #[error("Config start date {start} is after end date {end}")]
    BadDateRange { start: time::Date, end: time::Date },
    #[error("Config must use at least one thread; got {0}")]
    BadThreadCount(i32),
    #[error("Config does not list any stations")]
    NoStations,
    #[error("Config has a bad frequency band: {0}")]
    BandError(#[from] BandError),
    #[error("Config has an unknown metric {0:?}; expected dsar or rsam")]
    UnknownMetric(String),
}

#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("Processor failed due to SDS error: {0}")]
    SdsError(#[from] SdsError),
    #[error("Processor failed due to DSAR error: {0}")]
    DsarError(#[from] DsarError),
    #[error("Processor failed due to filter error: {0}")]
    FilterError(#[from] FilterError),
    #[error("Processor failed due to CSV table error: {0}")]
    CsvTableError(#[from] CsvTableError),
    #[error("Processor failed due to Combine error: {0}")]
    CombineError(#[from] CombineError),
    #[error("Processor failed due to Plot error: {0}")]
    PlotError(#[from] PlotError),
    #[error("Processor failed due to Config error: {0}")]
    ConfigError(#[from] ConfigError),
    #[error("Processor failed due to Send error: {0}")]
    SendError(#[from] std::sync::mpsc::SendError<WorkerStatus>),
    #[error("Processor failed due to IO error: {0}")]
    IoError(#[from] std::io::Error),
}
