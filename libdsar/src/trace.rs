use time::PrimitiveDateTime;

use super::error::FilterError;
use super::filter::Filter;
use super::interval::{from_nanos, NANOS_PER_SECOND};
use super::nslc::Nslc;
use super::resample::TimeSeries;

/// How gaps between trace segments are filled when merging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fill {
    Zero,
    Interpolate,
}

/// A contiguous, evenly sampled waveform for one channel
#[derive(Debug, Clone, PartialEq)]
pub struct Trace {
    pub nslc: Nslc,
    pub start_ns: i64,
    pub sampling_rate: f64,
    pub data: Vec<f64>,
}

impl Trace {
    pub fn new(nslc: Nslc, start_ns: i64, sampling_rate: f64, data: Vec<f64>) -> Self {
        Self {
            nslc,
            start_ns,
            sampling_rate,
            data,
        }
    }

    pub fn id(&self) -> String {
        self.nslc.to_string()
    }

    /// Sample interval in seconds
    pub fn delta(&self) -> f64 {
        1.0 / self.sampling_rate
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn start(&self) -> PrimitiveDateTime {
        from_nanos(self.start_ns)
    }

    /// Time of sample `idx` in nanoseconds since the epoch
    pub fn time_ns(&self, idx: usize) -> i64 {
        self.start_ns + (idx as f64 * NANOS_PER_SECOND as f64 / self.sampling_rate).round() as i64
    }

    /// Time of the last sample
    pub fn end_ns(&self) -> i64 {
        self.time_ns(self.len().saturating_sub(1))
    }

    /// Duration covered by the samples in seconds
    pub fn duration(&self) -> f64 {
        self.len() as f64 * self.delta()
    }

    /// Remove the mean
    pub fn detrend_demean(&mut self) {
        if self.data.is_empty() {
            return;
        }
        let mean = self.data.iter().sum::<f64>() / self.data.len() as f64;
        self.data.iter_mut().for_each(|v| *v -= mean);
    }

    /// Cumulative trapezoidal integration, starting from zero
    pub fn integrate(&mut self) {
        let half_delta = 0.5 * self.delta();
        let mut previous = match self.data.first() {
            Some(v) => *v,
            None => return,
        };
        let mut total = 0.0;
        self.data[0] = 0.0;
        for v in self.data.iter_mut().skip(1) {
            let current = *v;
            total += (previous + current) * half_delta;
            previous = current;
            *v = total;
        }
    }

    pub fn filter(&mut self, filter: &Filter) -> Result<(), FilterError> {
        filter.apply(&mut self.data, self.sampling_rate)
    }

    /// Absolute amplitudes stamped with their sample times
    pub fn abs_series(&self) -> TimeSeries {
        TimeSeries {
            times: (0..self.len()).map(|idx| self.time_ns(idx)).collect(),
            values: self.data.iter().map(|v| v.abs()).collect(),
        }
    }

    /// Append a later segment of the same channel, filling any gap
    fn append(&mut self, other: Trace, fill: Fill) {
        let delta_ns = NANOS_PER_SECOND as f64 / self.sampling_rate;
        let offset = ((other.start_ns - self.start_ns) as f64 / delta_ns).round() as i64;
        let len = self.len() as i64;
        if offset >= len {
            let gap = (offset - len) as usize;
            if gap > 0 {
                let before = self.data.last().copied().unwrap_or(0.0);
                let after = other.data.first().copied().unwrap_or(before);
                match fill {
                    Fill::Zero => self.data.extend(std::iter::repeat(0.0).take(gap)),
                    Fill::Interpolate => {
                        let step = (after - before) / (gap + 1) as f64;
                        self.data
                            .extend((1..=gap).map(|k| before + step * k as f64));
                    }
                }
            }
            self.data.extend(other.data);
        } else {
            // Overlap: samples already held win
            let skip = (len - offset) as usize;
            self.data.extend(other.data.into_iter().skip(skip));
        }
    }
}

/// An ordered collection of traces, possibly several per channel
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stream {
    pub traces: Vec<Trace>,
}

impl Stream {
    pub fn new(traces: Vec<Trace>) -> Self {
        Self { traces }
    }

    pub fn count(&self) -> usize {
        self.traces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Trace> {
        self.traces.iter()
    }

    /// Keep only the traces of one channel
    pub fn select(self, nslc: &Nslc) -> Self {
        Self {
            traces: self
                .traces
                .into_iter()
                .filter(|t| &t.nslc == nslc)
                .collect(),
        }
    }

    /// Join all segments of the same channel into a single trace per channel.
    ///
    /// Segments with a different sampling rate than the first segment of their channel are
    /// kept as separate traces.
    pub fn merge(&mut self, fill: Fill) {
        let mut segments = std::mem::take(&mut self.traces);
        segments.retain(|t| !t.is_empty() && t.sampling_rate > 0.0);
        segments.sort_by(|a, b| a.nslc.cmp(&b.nslc).then(a.start_ns.cmp(&b.start_ns)));

        let mut merged: Vec<Trace> = vec![];
        for segment in segments {
            match merged.last_mut() {
                Some(current)
                    if current.nslc == segment.nslc
                        && (current.sampling_rate - segment.sampling_rate).abs()
                            < 1.0e-6 * current.sampling_rate =>
                {
                    current.append(segment, fill)
                }
                Some(current) if current.nslc == segment.nslc => {
                    log::warn!(
                        "{} has segments with different sampling rates ({} Hz, {} Hz); keeping them separate",
                        current.id(),
                        current.sampling_rate,
                        segment.sampling_rate
                    );
                    merged.push(segment)
                }
                _ => merged.push(segment),
            }
        }
        self.traces = merged;
    }

    pub fn detrend_demean(&mut self) {
        self.traces.iter_mut().for_each(|t| t.detrend_demean());
    }

    pub fn integrate(&mut self) {
        self.traces.iter_mut().for_each(|t| t.integrate());
    }

    pub fn filter(&mut self, filter: &Filter) -> Result<(), FilterError> {
        for trace in self.traces.iter_mut() {
            trace.filter(filter)?;
        }
        Ok(())
    }
}

impl IntoIterator for Stream {
    type Item = Trace;
    type IntoIter = std::vec::IntoIter<Trace>;
    fn into_iter(self) -> Self::IntoIter {
        self.traces.into_iter()
    }
}
