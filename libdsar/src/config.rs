use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use time::macros::date;
use time::Date;

use super::combine::combined_path;
use super::constants::{DEFAULT_CORNERS, FIGURES_DIRECTORY};
use super::csv_table::daily_directory;
use super::dsar::{default_windows, Dsar};
use super::error::ConfigError;
use super::frequency_bands::{DsarBand, RsamBand};
use super::interval::Interval;
use super::nslc::Nslc;
use super::rsam::{PreFilter, Rsam};

/// The amplitude metric being computed. Also the name of its output directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Dsar,
    Rsam,
}

impl Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dsar => write!(f, "dsar"),
            Self::Rsam => write!(f, "rsam"),
        }
    }
}

impl FromStr for Metric {
    type Err = ConfigError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "dsar" => Ok(Self::Dsar),
            "rsam" => Ok(Self::Rsam),
            _ => Err(ConfigError::UnknownMetric(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DsarConfig {
    pub first_band: DsarBand,
    pub second_band: DsarBand,
    pub windows: Vec<Interval>,
}

impl Default for DsarConfig {
    fn default() -> Self {
        Self {
            first_band: DsarBand::default_first(),
            second_band: DsarBand::default_second(),
            windows: default_windows(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RsamConfig {
    pub filter: Option<PreFilter>,
    pub corners: usize,
    pub bands: Vec<RsamBand>,
}

impl Default for RsamConfig {
    fn default() -> Self {
        Self {
            filter: None,
            corners: DEFAULT_CORNERS,
            bands: RsamBand::defaults(),
        }
    }
}

/// An eruption lasting from `start` to `end`, drawn as a shaded span
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContinuousEruption {
    pub start: Date,
    pub end: Date,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlotConfig {
    pub interval_day: u32,
    pub title: Option<String>,
    pub y_min: Option<f64>,
    pub y_max: Option<f64>,
    pub hp_lambda: Option<f64>,
    pub rsam_column: String,
    pub continuous_eruptions: Vec<ContinuousEruption>,
    pub single_eruptions: Vec<Date>,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            interval_day: 3,
            title: None,
            y_min: None,
            y_max: None,
            hp_lambda: None,
            rsam_column: String::from("VT"),
            continuous_eruptions: vec![],
            single_eruptions: vec![],
        }
    }
}

/// Structure representing the application configuration. Contains pathing and date range
/// information as well as the parameters of each metric.
/// Configs are seralizable and deserializable to YAML using serde and serde_yaml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub sds_path: PathBuf,
    pub output_path: PathBuf,
    pub stations: Vec<Nslc>,
    pub start_date: Date,
    pub end_date: Date,
    #[serde(default)]
    pub resample: Interval,
    pub n_threads: i32,
    #[serde(default)]
    pub dsar: DsarConfig,
    #[serde(default)]
    pub rsam: RsamConfig,
    #[serde(default)]
    pub plot: PlotConfig,
}

impl Default for Config {
    /// Generate a new Config object. Paths will be invalid
    fn default() -> Self {
        Self {
            sds_path: PathBuf::from("None"),
            output_path: PathBuf::from("None"),
            stations: vec![Nslc {
                network: String::from("VG"),
                station: String::from("OJN"),
                location: String::from("00"),
                channel: String::from("EHZ"),
            }],
            start_date: date!(2025 - 01 - 01),
            end_date: date!(2025 - 01 - 31),
            resample: Interval::default(),
            n_threads: 1,
            dsar: DsarConfig::default(),
            rsam: RsamConfig::default(),
            plot: PlotConfig::default(),
        }
    }
}

impl Config {
    /// Read the configuration in a YAML file
    /// Returns a Config if successful
    pub fn read_config_file(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            return Err(ConfigError::BadFilePath(config_path.to_path_buf()));
        }

        let yaml_str = std::fs::read_to_string(config_path)?;

        Ok(serde_yaml::from_str::<Self>(&yaml_str)?)
    }

    /// Check the parts of the configuration that serde cannot
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.start_date > self.end_date {
            return Err(ConfigError::BadDateRange {
                start: self.start_date,
                end: self.end_date,
            });
        }
        if !self.is_n_threads_valid() {
            return Err(ConfigError::BadThreadCount(self.n_threads));
        }
        if !self.sds_path.is_dir() {
            return Err(ConfigError::BadFilePath(self.sds_path.clone()));
        }
        if self.stations.is_empty() {
            return Err(ConfigError::NoStations);
        }
        // Configs built in code skip the serde band checks
        let DsarBand {
            name,
            highpass,
            band_low,
            band_high,
        } = &self.dsar.first_band;
        DsarBand::new(name, *highpass, *band_low, *band_high)?;
        let DsarBand {
            name,
            highpass,
            band_low,
            band_high,
        } = &self.dsar.second_band;
        DsarBand::new(name, *highpass, *band_low, *band_high)?;
        for band in self.rsam.bands.iter() {
            RsamBand::new(&band.name, band.freqmin, band.freqmax)?;
        }
        if let Some(PreFilter { freqmin, freqmax }) = self.rsam.filter {
            PreFilter::new(freqmin, freqmax)?;
        }
        Ok(())
    }

    /// Every date from start to end, inclusive
    pub fn dates(&self) -> Vec<Date> {
        let mut dates = vec![];
        let mut date = self.start_date;
        while date <= self.end_date {
            dates.push(date);
            match date.next_day() {
                Some(next) => date = next,
                None => break,
            }
        }
        dates
    }

    pub fn is_n_threads_valid(&self) -> bool {
        self.n_threads >= 1
    }

    pub fn dsar(&self) -> Dsar {
        Dsar::new(
            self.dsar.first_band.clone(),
            self.dsar.second_band.clone(),
            self.resample,
            self.dsar.windows.clone(),
        )
    }

    pub fn rsam(&self) -> Rsam {
        Rsam::new(
            self.resample,
            self.rsam.filter,
            self.rsam.corners,
            self.rsam.bands.clone(),
        )
    }

    /// Directory holding the daily CSV files of a station
    pub fn get_daily_directory(&self, metric: Metric, nslc: &Nslc) -> PathBuf {
        daily_directory(&self.output_path, metric, nslc, self.resample)
    }

    /// Path of the combined CSV file of a station
    pub fn get_combined_file_name(&self, metric: Metric, nslc: &Nslc) -> PathBuf {
        combined_path(&self.output_path, metric, nslc, self.resample)
    }

    pub fn get_figures_directory(&self, metric: Metric) -> PathBuf {
        self.output_path
            .join(FIGURES_DIRECTORY)
            .join(metric.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BandError;

    #[test]
    fn test_yaml_round_trip() {
        let config = Config::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        assert!(yaml.contains("2025-01-01"));
        assert!(yaml.contains("- VG.OJN.00.EHZ"));
        assert!(yaml.contains("resample: 10min"));
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.stations, config.stations);
        assert_eq!(parsed.dsar.first_band, config.dsar.first_band);
        assert_eq!(parsed.rsam.bands, config.rsam.bands);
        assert_eq!(parsed.plot.rsam_column, "VT");
    }

    #[test]
    fn test_minimal_yaml_uses_defaults() {
        let yaml = "sds_path: /data/sds\noutput_path: /data/out\nstations: [vg.ojn.00.ehz]\nstart_date: 2025-01-01\nend_date: 2025-01-03\nn_threads: 2\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.stations[0].to_string(), "VG.OJN.00.EHZ");
        assert_eq!(config.resample, Interval::minutes(10));
        assert_eq!(config.dsar.windows, default_windows());
        assert_eq!(config.dates().len(), 3);
        assert_eq!(
            config.get_combined_file_name(Metric::Dsar, &config.stations[0]),
            PathBuf::from("/data/out/dsar/VG.OJN.00.EHZ/combined_10min_VG.OJN.00.EHZ.csv")
        );
        assert_eq!(
            config.get_figures_directory(Metric::Rsam),
            PathBuf::from("/data/out/figures/rsam")
        );
    }

    #[test]
    fn test_bad_band_in_yaml() {
        let yaml = "sds_path: /data/sds\noutput_path: /data/out\nstations: [VG.OJN.00.EHZ]\nstart_date: 2025-01-01\nend_date: 2025-01-03\nn_threads: 2\ndsar:\n  first_band: {name: LF, highpass: 5.0, band_low: 4.5, band_high: 8.0}\n  second_band: {name: HF, highpass: 0.1, band_low: 8.0, band_high: 16.0}\n  windows: [6h]\n";
        assert!(serde_yaml::from_str::<Config>(yaml).is_err());
    }

    #[test]
    fn test_validate() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config {
            sds_path: dir.path().to_path_buf(),
            ..Default::default()
        };
        assert!(config.validate().is_ok());

        config.n_threads = 0;
        assert!(matches!(config.validate(), Err(ConfigError::BadThreadCount(0))));
        config.n_threads = 4;

        config.end_date = date!(2024 - 12 - 31);
        assert!(matches!(config.validate(), Err(ConfigError::BadDateRange { .. })));
        config.end_date = config.start_date;
        assert_eq!(config.dates(), vec![config.start_date]);

        config.rsam.filter = Some(PreFilter {
            freqmin: 8.0,
            freqmax: 1.0,
        });
        assert!(matches!(
            config.validate(),
            Err(ConfigError::BandError(BandError::BadPreFilter { .. }))
        ));
        config.rsam.filter = Some(PreFilter::new(1.0, 8.0).unwrap());
        assert!(config.validate().is_ok());

        config.stations.clear();
        assert!(matches!(config.validate(), Err(ConfigError::NoStations)));

        config.sds_path = dir.path().join("missing");
        assert!(matches!(config.validate(), Err(ConfigError::BadFilePath(_))));
    }

    #[test]
    fn test_metric_names() {
        assert_eq!(Metric::from_str("DSAR").unwrap(), Metric::Dsar);
        assert_eq!(Metric::Rsam.to_string(), "rsam");
        assert!(Metric::from_str("ssam").is_err());
    }
}
