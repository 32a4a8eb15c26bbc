use ndarray::{Array1, Array2};

use super::interval::Interval;
use super::resample::{median, resample, Aggregation, TimeSeries};

/// Centred rolling median over a time-based window.
///
/// The window around a sample at `t` covers `(t - w/2, t + w/2]`. NaN values are skipped and a
/// single valid value is enough to produce a result. `times` must be sorted.
pub fn rolling_median(times: &[i64], values: &[f64], window: Interval) -> Vec<f64> {
    let half = window.as_nanos() / 2;
    let mut out = Vec::with_capacity(times.len());
    let mut lo = 0;
    let mut hi = 0;
    let mut scratch: Vec<f64> = Vec::new();
    for t in times.iter() {
        while lo < times.len() && times[lo] <= t - half {
            lo += 1;
        }
        while hi < times.len() && times[hi] <= t + half {
            hi += 1;
        }
        scratch.clear();
        scratch.extend(values[lo..hi].iter().copied().filter(|v| !v.is_nan()));
        out.push(median(&mut scratch));
    }
    out
}

/// Hodrick-Prescott trend of an evenly spaced series.
///
/// Solves `(I + lambda * D'D) trend = values` where `D` is the second difference operator. The
/// system is symmetric pentadiagonal and is stored as bands `(i, i-2..=i+2)`.
pub fn hp_filter(values: &[f64], lambda: f64) -> Vec<f64> {
    let n = values.len();
    if n < 3 {
        return values.to_vec();
    }

    let mut bands = Array2::<f64>::zeros((n, 5));
    for i in 0..n {
        bands[[i, 2]] = 1.0;
    }
    let stencil = [1.0, -2.0, 1.0];
    for r in 0..n - 2 {
        for a in 0..3 {
            for b in 0..3 {
                bands[[r + a, 2 + b - a]] += lambda * stencil[a] * stencil[b];
            }
        }
    }
    let at = |i: usize, k: usize| 2 + k - i;

    let mut rhs = Array1::from_vec(values.to_vec());
    for i in 0..n {
        let pivot = bands[[i, 2]];
        for j in i + 1..(i + 3).min(n) {
            let factor = bands[[j, at(j, i)]] / pivot;
            if factor == 0.0 {
                continue;
            }
            for k in i..(i + 3).min(n) {
                bands[[j, at(j, k)]] -= factor * bands[[i, at(i, k)]];
            }
            rhs[j] -= factor * rhs[i];
        }
    }

    let mut trend = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut acc = rhs[i];
        for k in i + 1..(i + 3).min(n) {
            acc -= bands[[i, at(i, k)]] * trend[k];
        }
        trend[i] = acc / bands[[i, 2]];
    }
    trend.to_vec()
}

/// One median per UTC day
pub fn daily_median(series: &TimeSeries) -> TimeSeries {
    resample(series, Interval::days(1), Aggregation::Median)
}
