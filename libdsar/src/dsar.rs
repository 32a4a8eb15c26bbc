use super::constants::{DEFAULT_CORNERS, DSAR_COLUMN_PREFIX};
use super::error::{DsarError, FilterError};
use super::filter::Filter;
use super::frequency_bands::DsarBand;
use super::interval::Interval;
use super::resample::{resample, Aggregation, TimeSeries};
use super::smoothing::rolling_median;
use super::table::Table;
use super::trace::{Fill, Stream};

/// Default smoothing windows for the DSAR ratio
pub fn default_windows() -> Vec<Interval> {
    vec![Interval::hours(6), Interval::hours(24)]
}

/// Displacement Seismic Amplitude Ratio calculator
#[derive(Debug, Clone)]
pub struct Dsar {
    pub first_band: DsarBand,
    pub second_band: DsarBand,
    pub resample: Interval,
    pub windows: Vec<Interval>,
    pub corners: usize,
}

impl Default for Dsar {
    fn default() -> Self {
        Self {
            first_band: DsarBand::default_first(),
            second_band: DsarBand::default_second(),
            resample: Interval::default(),
            windows: default_windows(),
            corners: DEFAULT_CORNERS,
        }
    }
}

impl Dsar {
    pub fn new(
        first_band: DsarBand,
        second_band: DsarBand,
        resample: Interval,
        windows: Vec<Interval>,
    ) -> Self {
        Self {
            first_band,
            second_band,
            resample,
            windows,
            corners: DEFAULT_CORNERS,
        }
    }

    /// Name of the ratio column, e.g. `DSAR_10min`
    pub fn ratio_column(&self) -> String {
        format!("{DSAR_COLUMN_PREFIX}_{}", self.resample)
    }

    /// Name of a smoothed ratio column, e.g. `DSAR_24h_median`
    pub fn window_column(window: Interval) -> String {
        format!("{DSAR_COLUMN_PREFIX}_{window}_median")
    }

    /// Displacement of a stream in one band. The input stream is left untouched.
    pub fn process(&self, stream: &Stream, band: &DsarBand) -> Result<Stream, FilterError> {
        let mut stream = stream.clone();
        stream.merge(Fill::Zero);
        stream.detrend_demean();
        stream.filter(&Filter::highpass(band.highpass).with_corners(self.corners))?;
        stream.integrate();
        stream.filter(&Filter::highpass(band.band_low).with_corners(self.corners))?;
        stream.filter(&Filter::lowpass(band.band_high).with_corners(self.corners))?;
        Ok(stream)
    }

    /// Median absolute displacement per resample window, one column per band
    pub fn band_table(&self, stream: &Stream) -> Result<Table, DsarError> {
        let mut table = Table::new();
        for band in [&self.first_band, &self.second_band] {
            log::debug!("Calculating band {}", band.name);
            let processed = self.process(stream, band)?;
            for trace in processed.iter() {
                let binned = resample(&trace.abs_series(), self.resample, Aggregation::Median);
                table.insert_series(&band.name, &binned);
            }
        }
        Ok(table)
    }

    /// Ratio of the first band over the second and its rolling medians.
    ///
    /// Rows with any missing value are dropped and remaining gaps are interpolated in time.
    pub fn calculate(&self, table: &Table) -> Result<Table, DsarError> {
        let first = table
            .column_values(&self.first_band.name)
            .ok_or_else(|| DsarError::MissingColumn(self.first_band.name.clone()))?;
        let second = table
            .column_values(&self.second_band.name)
            .ok_or_else(|| DsarError::MissingColumn(self.second_band.name.clone()))?;
        let times: Vec<i64> = table.timestamps().collect();

        let ratio: Vec<f64> = first
            .iter()
            .zip(second.iter())
            .map(|(a, b)| {
                let r = a / b;
                if r.is_finite() {
                    r
                } else {
                    f64::NAN
                }
            })
            .collect();

        let mut result = Table::new();
        result.insert_series(&self.first_band.name, &TimeSeries::new(times.clone(), first));
        result.set_column(&self.second_band.name, &second);
        result.set_column(&self.ratio_column(), &ratio);
        for window in self.windows.iter() {
            let smoothed = rolling_median(&times, &ratio, *window);
            result.set_column(&Self::window_column(*window), &smoothed);
        }

        result.drop_missing();
        result.interpolate_time();
        Ok(result)
    }

    /// Band table then ratio table for one stream
    pub fn compute(&self, stream: &Stream) -> Result<Table, DsarError> {
        let bands = self.band_table(stream)?;
        self.calculate(&bands)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interval::NANOS_PER_SECOND;
    use crate::nslc::Nslc;
    use crate::trace::Trace;
    use std::f64::consts::PI;
    use std::str::FromStr;

    fn band_table() -> Table {
        let step = 600 * NANOS_PER_SECOND;
        let times: Vec<i64> = (0..4).map(|i| i * step).collect();
        let mut table = Table::new();
        table.insert_series("LF", &TimeSeries::new(times.clone(), vec![2.0, 4.0, 6.0, 1.0]));
        table.insert_series("HF", &TimeSeries::new(times, vec![1.0, 2.0, 0.0, 1.0]));
        table
    }

    #[test]
    fn test_columns_and_ratio() {
        let dsar = Dsar::default();
        let out = dsar.calculate(&band_table()).unwrap();
        assert_eq!(
            out.columns(),
            ["LF", "HF", "DSAR_10min", "DSAR_6h_median", "DSAR_24h_median"]
        );
        // division by zero is dropped
        assert_eq!(out.len(), 3);
        assert_eq!(out.column_values("DSAR_10min").unwrap(), vec![2.0, 2.0, 1.0]);
        // every row lies within 6h of every other
        assert_eq!(out.column_values("DSAR_6h_median").unwrap(), vec![2.0, 2.0, 2.0]);
    }

    #[test]
    fn test_missing_band() {
        let dsar = Dsar::new(
            DsarBand::new("A", 0.1, 1.0, 2.0).unwrap(),
            DsarBand::default_second(),
            Interval::minutes(10),
            vec![],
        );
        assert!(matches!(
            dsar.calculate(&band_table()),
            Err(DsarError::MissingColumn(name)) if name == "A"
        ));
    }

    #[test]
    fn test_low_frequency_signal_has_high_ratio() {
        let rate = 50.0;
        let n = (3600.0 * rate) as usize;
        let data: Vec<f64> = (0..n)
            .map(|i| (2.0 * PI * 6.0 * i as f64 / rate).sin())
            .collect();
        let trace = Trace::new(Nslc::from_str("VG.OJN.00.EHZ").unwrap(), 0, rate, data);
        let stream = Stream::new(vec![trace.clone()]);

        let dsar = Dsar::default();
        let table = dsar.compute(&stream).unwrap();
        assert_eq!(table.len(), 6);
        let ratio = table.column_values("DSAR_10min").unwrap();
        assert!(ratio.iter().all(|r| *r > 1.0));

        // input is not modified by band processing
        assert_eq!(stream.traces[0], trace);
    }
}
