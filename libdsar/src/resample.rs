use super::interval::{floor_to_day, Interval};

/// A timestamped series of values, timestamps in nanoseconds since the epoch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeSeries {
    pub times: Vec<i64>,
    pub values: Vec<f64>,
}

impl TimeSeries {
    pub fn new(times: Vec<i64>, values: Vec<f64>) -> Self {
        Self { times, values }
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (i64, f64)> + '_ {
        self.times.iter().copied().zip(self.values.iter().copied())
    }
}

/// Statistic used to reduce the samples of a bin to one value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    Min,
    Max,
    Mean,
    Median,
    Rms,
    Std,
}

impl Aggregation {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Min => "min",
            Self::Max => "max",
            Self::Mean => "mean",
            Self::Median => "median",
            Self::Rms => "rms",
            Self::Std => "std",
        }
    }

    /// Reduce the values, ignoring NaN. Empty input gives NaN.
    pub fn apply(&self, values: &[f64]) -> f64 {
        let mut finite: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
        if finite.is_empty() {
            return f64::NAN;
        }
        let n = finite.len() as f64;
        match self {
            Self::Min => finite.iter().copied().fold(f64::INFINITY, f64::min),
            Self::Max => finite.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Self::Mean => finite.iter().sum::<f64>() / n,
            Self::Median => median(&mut finite),
            Self::Rms => (finite.iter().map(|v| v * v).sum::<f64>() / n).sqrt(),
            Self::Std => {
                if finite.len() < 2 {
                    return f64::NAN;
                }
                let mean = finite.iter().sum::<f64>() / n;
                let ss = finite.iter().map(|v| (v - mean).powi(2)).sum::<f64>();
                (ss / (n - 1.0)).sqrt()
            }
        }
    }
}

/// Median of NaN-free values. Reorders the slice.
pub fn median(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        0.5 * (values[mid - 1] + values[mid])
    } else {
        values[mid]
    }
}

/// Downsample a series into fixed windows.
///
/// Windows are aligned to midnight UTC of the day holding the earliest sample and labelled by
/// their left edge. Every window between the first and last populated one is emitted; windows
/// without samples hold NaN.
pub fn resample(series: &TimeSeries, interval: Interval, aggregation: Aggregation) -> TimeSeries {
    let first = match series.times.iter().min() {
        Some(t) => *t,
        None => return TimeSeries::default(),
    };
    let step = interval.as_nanos();
    let origin = floor_to_day(first);
    let bin_of = |t: i64| (t - origin).div_euclid(step);

    let first_bin = bin_of(first);
    let last_bin = series.times.iter().map(|t| bin_of(*t)).max().unwrap_or(first_bin);
    let n_bins = (last_bin - first_bin + 1) as usize;

    let mut bins: Vec<Vec<f64>> = vec![Vec::new(); n_bins];
    for (t, v) in series.iter() {
        bins[(bin_of(t) - first_bin) as usize].push(v);
    }

    let times = (first_bin..=last_bin).map(|b| origin + b * step).collect();
    let values = bins.iter().map(|bin| aggregation.apply(bin)).collect();
    TimeSeries { times, values }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interval::{date_to_nanos, NANOS_PER_SECOND};
    use time::macros::date;

    #[test]
    fn test_aggregations() {
        let values = [3.0, f64::NAN, -4.0, 1.0, 2.0];
        assert_eq!(Aggregation::Min.apply(&values), -4.0);
        assert_eq!(Aggregation::Max.apply(&values), 3.0);
        assert_eq!(Aggregation::Mean.apply(&values), 0.5);
        assert_eq!(Aggregation::Median.apply(&values), 1.5);
        assert!((Aggregation::Rms.apply(&values) - (30.0f64 / 4.0).sqrt()).abs() < 1e-12);
        let expected_std = ((2.5f64.powi(2) + 4.5f64.powi(2) + 0.25 + 2.25) / 3.0).sqrt();
        assert!((Aggregation::Std.apply(&values) - expected_std).abs() < 1e-12);
        assert!(Aggregation::Mean.apply(&[]).is_nan());
        assert!(Aggregation::Std.apply(&[1.0]).is_nan());
    }

    #[test]
    fn test_bins_align_to_midnight() {
        let midnight = date_to_nanos(date!(2025 - 03 - 01));
        let minute = 60 * NANOS_PER_SECOND;
        // 00:07, 00:09, 00:12 and 00:41
        let series = TimeSeries::new(
            vec![
                midnight + 7 * minute,
                midnight + 9 * minute,
                midnight + 12 * minute,
                midnight + 41 * minute,
            ],
            vec![1.0, 3.0, 5.0, 7.0],
        );
        let out = resample(&series, Interval::minutes(10), Aggregation::Median);
        assert_eq!(
            out.times,
            vec![
                midnight,
                midnight + 10 * minute,
                midnight + 20 * minute,
                midnight + 30 * minute,
                midnight + 40 * minute
            ]
        );
        assert_eq!(out.values[0], 2.0);
        assert_eq!(out.values[1], 5.0);
        assert!(out.values[2].is_nan());
        assert!(out.values[3].is_nan());
        assert_eq!(out.values[4], 7.0);
    }

    #[test]
    fn test_empty_series() {
        let out = resample(&TimeSeries::default(), Interval::hours(1), Aggregation::Max);
        assert!(out.is_empty());
    }
}
