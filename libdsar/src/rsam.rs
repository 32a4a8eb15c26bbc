use serde::{Deserialize, Serialize};

use super::constants::{DEFAULT_CORNERS, F_RATIO_COLUMN, F_RATIO_HIGH_BAND, F_RATIO_LOW_BAND};
use super::error::{BandError, FilterError};
use super::filter::Filter;
use super::frequency_bands::RsamBand;
use super::interval::Interval;
use super::resample::{resample, Aggregation};
use super::table::Table;
use super::trace::{Fill, Stream};

/// Statistics of the absolute amplitude written for every RSAM window, in column order
pub const RSAM_AGGREGATIONS: [Aggregation; 5] = [
    Aggregation::Min,
    Aggregation::Mean,
    Aggregation::Max,
    Aggregation::Median,
    Aggregation::Rms,
];

/// Band-pass applied to the whole trace before any statistic is taken
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPreFilter")]
pub struct PreFilter {
    pub freqmin: f64,
    pub freqmax: f64,
}

#[derive(Deserialize)]
struct RawPreFilter {
    freqmin: f64,
    freqmax: f64,
}

impl TryFrom<RawPreFilter> for PreFilter {
    type Error = BandError;
    fn try_from(raw: RawPreFilter) -> Result<Self, Self::Error> {
        Self::new(raw.freqmin, raw.freqmax)
    }
}

impl PreFilter {
    pub fn new(freqmin: f64, freqmax: f64) -> Result<Self, BandError> {
        if !(freqmin > 0.0 && freqmin < freqmax) {
            return Err(BandError::BadPreFilter { freqmin, freqmax });
        }
        Ok(Self { freqmin, freqmax })
    }
}

/// Real-time Seismic Amplitude Measurement calculator
#[derive(Debug, Clone)]
pub struct Rsam {
    pub resample: Interval,
    pub filter: Option<PreFilter>,
    pub corners: usize,
    pub bands: Vec<RsamBand>,
}

impl Default for Rsam {
    fn default() -> Self {
        Self {
            resample: Interval::default(),
            filter: None,
            corners: DEFAULT_CORNERS,
            bands: RsamBand::defaults(),
        }
    }
}

impl Rsam {
    pub fn new(
        resample: Interval,
        filter: Option<PreFilter>,
        corners: usize,
        bands: Vec<RsamBand>,
    ) -> Self {
        Self {
            resample,
            filter,
            corners,
            bands,
        }
    }

    /// Column names in output order
    pub fn columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = RSAM_AGGREGATIONS
            .iter()
            .map(|a| a.name().to_string())
            .collect();
        columns.extend(self.bands.iter().map(|b| b.name.clone()));
        if self.has_f_ratio() {
            columns.push(F_RATIO_COLUMN.to_string());
        }
        columns
    }

    fn has_f_ratio(&self) -> bool {
        self.bands.iter().any(|b| b.name == F_RATIO_LOW_BAND)
            && self.bands.iter().any(|b| b.name == F_RATIO_HIGH_BAND)
    }

    pub fn compute(&self, stream: &Stream) -> Result<Table, FilterError> {
        let mut stream = stream.clone();
        stream.merge(Fill::Zero);
        stream.detrend_demean();
        if let Some(pre) = self.filter {
            log::debug!("Pre-filtering {} - {} Hz", pre.freqmin, pre.freqmax);
            stream.filter(&Filter::bandpass(pre.freqmin, pre.freqmax).with_corners(self.corners))?;
        }

        let mut table = Table::with_columns(self.columns());
        for trace in stream.iter() {
            let amplitude = trace.abs_series();
            for aggregation in RSAM_AGGREGATIONS {
                let binned = resample(&amplitude, self.resample, aggregation);
                table.insert_series(aggregation.name(), &binned);
            }

            for band in self.bands.iter() {
                log::debug!("{} :: Calculating band {}", trace.id(), band.name);
                let mut filtered = trace.clone();
                filtered.filter(&Filter::bandpass(band.freqmin, band.freqmax).with_corners(self.corners))?;
                let binned = resample(&filtered.abs_series(), self.resample, Aggregation::Mean);
                table.insert_series(&band.name, &binned);
            }
        }

        if self.has_f_ratio() {
            if let (Some(low), Some(high)) = (
                table.column_values(F_RATIO_LOW_BAND),
                table.column_values(F_RATIO_HIGH_BAND),
            ) {
                let ratio: Vec<f64> = low
                    .iter()
                    .zip(high.iter())
                    .map(|(lp, vt)| {
                        let r = (vt / lp).log2();
                        if r.is_finite() {
                            r
                        } else {
                            f64::NAN
                        }
                    })
                    .collect();
                table.set_column(F_RATIO_COLUMN, &ratio);
            }
        }
        Ok(table)
    }
}
