//! Butterworth IIR filters in second-order sections.
//!
//! Filters are designed the classic way: analog Butterworth prototype, frequency
//! transformation (low-pass, high-pass or band-pass) at pre-warped corner frequencies, and
//! the bilinear transform into the z-plane. The resulting poles are grouped into
//! second-order sections and applied causally in a single forward pass.
use num_complex::Complex64;
use std::f64::consts::PI;

use super::constants::DEFAULT_CORNERS;
use super::error::FilterError;

// Normalised sampling frequency used while designing (Nyquist = 1)
const DESIGN_FS: f64 = 2.0;
const CONJUGATE_TOLERANCE: f64 = 1.0e-12;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterKind {
    Highpass { freq: f64 },
    Lowpass { freq: f64 },
    Bandpass { freqmin: f64, freqmax: f64 },
}

/// A Butterworth filter of order `corners`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Filter {
    pub kind: FilterKind,
    pub corners: usize,
}

impl Filter {
    pub fn highpass(freq: f64) -> Self {
        Self {
            kind: FilterKind::Highpass { freq },
            corners: DEFAULT_CORNERS,
        }
    }

    pub fn lowpass(freq: f64) -> Self {
        Self {
            kind: FilterKind::Lowpass { freq },
            corners: DEFAULT_CORNERS,
        }
    }

    pub fn bandpass(freqmin: f64, freqmax: f64) -> Self {
        Self {
            kind: FilterKind::Bandpass { freqmin, freqmax },
            corners: DEFAULT_CORNERS,
        }
    }

    pub fn with_corners(mut self, corners: usize) -> Self {
        self.corners = corners;
        self
    }

    /// Design the second-order sections for a given sampling rate.
    ///
    /// Returns `None` when the filter would pass everything (a low-pass at or above Nyquist).
    pub fn design(&self, sampling_rate: f64) -> Result<Option<Sos>, FilterError> {
        if !(sampling_rate > 0.0) {
            return Err(FilterError::BadSamplingRate(sampling_rate));
        }
        if self.corners == 0 {
            return Err(FilterError::BadCorners(self.corners));
        }
        let nyquist = 0.5 * sampling_rate;
        match self.kind {
            FilterKind::Lowpass { freq } => {
                check_positive(freq)?;
                if freq >= nyquist {
                    log::warn!(
                        "Selected corner frequency {freq} Hz is above Nyquist ({nyquist} Hz). Setting Nyquist as high corner."
                    );
                    return Ok(None);
                }
                Ok(Some(Sos::lowpass(self.corners, freq / nyquist)))
            }
            FilterKind::Highpass { freq } => {
                check_positive(freq)?;
                // A corner exactly at Nyquist cannot be prewarped
                if freq >= nyquist {
                    return Err(FilterError::AboveNyquist { freq, nyquist });
                }
                Ok(Some(Sos::highpass(self.corners, freq / nyquist)))
            }
            FilterKind::Bandpass { freqmin, freqmax } => {
                check_positive(freqmin)?;
                check_positive(freqmax)?;
                if freqmin >= freqmax {
                    return Err(FilterError::InvertedBand { freqmin, freqmax });
                }
                let low = freqmin / nyquist;
                let high = freqmax / nyquist;
                if low >= 1.0 {
                    return Err(FilterError::AboveNyquist {
                        freq: freqmin,
                        nyquist,
                    });
                }
                if high - 1.0 > -1.0e-6 {
                    log::warn!(
                        "Selected high corner frequency {freqmax} Hz is above Nyquist ({nyquist} Hz). Applying a high-pass instead."
                    );
                    return Ok(Some(Sos::highpass(self.corners, low)));
                }
                Ok(Some(Sos::bandpass(self.corners, low, high)))
            }
        }
    }

    /// Filter the data in place
    pub fn apply(&self, data: &mut [f64], sampling_rate: f64) -> Result<(), FilterError> {
        if let Some(sos) = self.design(sampling_rate)? {
            sos.filter(data);
        }
        Ok(())
    }
}

fn check_positive(freq: f64) -> Result<(), FilterError> {
    if freq > 0.0 {
        Ok(())
    } else {
        Err(FilterError::NonPositiveFrequency(freq))
    }
}

/// Zeros, poles and gain of a transfer function
#[derive(Debug, Clone)]
struct Zpk {
    zeros: Vec<Complex64>,
    poles: Vec<Complex64>,
    gain: f64,
}

impl Zpk {
    /// Analog Butterworth prototype of order n with a cutoff of 1 rad/s
    fn butterworth_prototype(n: usize) -> Self {
        let poles = (0..n)
            .map(|k| {
                let m = -(n as f64) + 1.0 + 2.0 * k as f64;
                -Complex64::from_polar(1.0, PI * m / (2.0 * n as f64))
            })
            .collect();
        Self {
            zeros: vec![],
            poles,
            gain: 1.0,
        }
    }

    fn degree(&self) -> usize {
        self.poles.len() - self.zeros.len()
    }

    fn to_lowpass(self, wo: f64) -> Self {
        let degree = self.degree();
        Self {
            zeros: self.zeros.iter().map(|&z| z * wo).collect(),
            poles: self.poles.iter().map(|&p| p * wo).collect(),
            gain: self.gain * wo.powi(degree as i32),
        }
    }

    fn to_highpass(self, wo: f64) -> Self {
        let degree = self.degree();
        let num: Complex64 = self.zeros.iter().map(|&z| -z).product();
        let den: Complex64 = self.poles.iter().map(|&p| -p).product();
        let wo = Complex64::new(wo, 0.0);
        let mut zeros: Vec<Complex64> = self.zeros.iter().map(|&z| wo / z).collect();
        zeros.extend(std::iter::repeat(Complex64::new(0.0, 0.0)).take(degree));
        Self {
            zeros,
            poles: self.poles.iter().map(|&p| wo / p).collect(),
            gain: self.gain * (num / den).re,
        }
    }

    fn to_bandpass(self, wo: f64, bw: f64) -> Self {
        let degree = self.degree();
        let split = |values: &[Complex64]| -> Vec<Complex64> {
            let scaled: Vec<Complex64> = values.iter().map(|&v| v * (bw / 2.0)).collect();
            let mut out: Vec<Complex64> = Vec::with_capacity(2 * values.len());
            for &v in scaled.iter() {
                out.push(v + (v * v - wo * wo).sqrt());
            }
            for &v in scaled.iter() {
                out.push(v - (v * v - wo * wo).sqrt());
            }
            out
        };
        let mut zeros = split(&self.zeros);
        zeros.extend(std::iter::repeat(Complex64::new(0.0, 0.0)).take(degree));
        Self {
            zeros,
            poles: split(&self.poles),
            gain: self.gain * bw.powi(degree as i32),
        }
    }

    fn bilinear(self, fs: f64) -> Self {
        let degree = self.degree();
        let fs2 = Complex64::new(2.0 * fs, 0.0);
        let mut zeros: Vec<Complex64> = self
            .zeros
            .iter()
            .map(|&z| (fs2 + z) / (fs2 - z))
            .collect();
        zeros.extend(std::iter::repeat(Complex64::new(-1.0, 0.0)).take(degree));
        let num: Complex64 = self.zeros.iter().map(|&z| fs2 - z).product();
        let den: Complex64 = self.poles.iter().map(|&p| fs2 - p).product();
        Self {
            zeros,
            poles: self.poles.iter().map(|&p| (fs2 + p) / (fs2 - p)).collect(),
            gain: self.gain * (num / den).re,
        }
    }
}

fn prewarp(wn: f64) -> f64 {
    2.0 * DESIGN_FS * (PI * wn / DESIGN_FS).tan()
}

/// Cascade of second-order sections, each `[b0, b1, b2, a0, a1, a2]` with `a0 == 1`
#[derive(Debug, Clone, PartialEq)]
pub struct Sos {
    pub sections: Vec<[f64; 6]>,
}

impl Sos {
    /// Low-pass with normalised corner `wn` (fraction of Nyquist)
    pub fn lowpass(corners: usize, wn: f64) -> Self {
        let zpk = Zpk::butterworth_prototype(corners)
            .to_lowpass(prewarp(wn))
            .bilinear(DESIGN_FS);
        Self::from_zpk(zpk)
    }

    /// High-pass with normalised corner `wn` (fraction of Nyquist)
    pub fn highpass(corners: usize, wn: f64) -> Self {
        let zpk = Zpk::butterworth_prototype(corners)
            .to_highpass(prewarp(wn))
            .bilinear(DESIGN_FS);
        Self::from_zpk(zpk)
    }

    /// Band-pass with normalised corners `low` and `high` (fractions of Nyquist)
    pub fn bandpass(corners: usize, low: f64, high: f64) -> Self {
        let w1 = prewarp(low);
        let w2 = prewarp(high);
        let zpk = Zpk::butterworth_prototype(corners)
            .to_bandpass((w1 * w2).sqrt(), w2 - w1)
            .bilinear(DESIGN_FS);
        Self::from_zpk(zpk)
    }

    fn from_zpk(zpk: Zpk) -> Self {
        // Complex poles enter as conjugate pairs; keep the upper one of each pair
        let mut complex_poles: Vec<Complex64> = vec![];
        let mut real_poles: Vec<f64> = vec![];
        for p in zpk.poles.iter() {
            if p.im.abs() <= CONJUGATE_TOLERANCE * p.norm().max(1.0) {
                real_poles.push(p.re);
            } else if p.im > 0.0 {
                complex_poles.push(*p);
            }
        }

        let mut denominators: Vec<[f64; 3]> = complex_poles
            .iter()
            .map(|p| [1.0, -2.0 * p.re, p.norm_sqr()])
            .collect();
        for pair in real_poles.chunks(2) {
            match pair {
                [a, b] => denominators.push([1.0, -(a + b), a * b]),
                [a] => denominators.push([1.0, -a, 0.0]),
                _ => (),
            }
        }

        // Zeros of these designs are all real (+1, -1); alternate signs so band-pass
        // sections each get one of each
        let mut positive: Vec<f64> = vec![];
        let mut negative: Vec<f64> = vec![];
        for z in zpk.zeros.iter() {
            if z.re >= 0.0 {
                positive.push(z.re);
            } else {
                negative.push(z.re);
            }
        }
        let mut ordered: Vec<f64> = Vec::with_capacity(zpk.zeros.len());
        while !positive.is_empty() || !negative.is_empty() {
            if let Some(z) = positive.pop() {
                ordered.push(z);
            }
            if let Some(z) = negative.pop() {
                ordered.push(z);
            }
        }
        let mut numerators: Vec<[f64; 3]> = ordered
            .chunks(2)
            .map(|pair| match pair {
                [a, b] => [1.0, -(a + b), a * b],
                [a] => [1.0, -a, 0.0],
                _ => [1.0, 0.0, 0.0],
            })
            .collect();
        numerators.resize(denominators.len(), [1.0, 0.0, 0.0]);

        let mut sections: Vec<[f64; 6]> = numerators
            .iter()
            .zip(denominators.iter())
            .map(|(b, a)| [b[0], b[1], b[2], a[0], a[1], a[2]])
            .collect();
        if let Some(first) = sections.first_mut() {
            first[0] *= zpk.gain;
            first[1] *= zpk.gain;
            first[2] *= zpk.gain;
        }
        Self { sections }
    }

    /// Causal filtering in place (direct form II transposed, zero initial state)
    pub fn filter(&self, data: &mut [f64]) {
        for s in self.sections.iter() {
            let (b0, b1, b2, a1, a2) = (s[0], s[1], s[2], s[4], s[5]);
            let mut z0 = 0.0;
            let mut z1 = 0.0;
            for x in data.iter_mut() {
                let input = *x;
                let output = b0 * input + z0;
                z0 = b1 * input - a1 * output + z1;
                z1 = b2 * input - a2 * output;
                *x = output;
            }
        }
    }

    /// Magnitude of the frequency response at normalised frequency `wn` (fraction of Nyquist)
    pub fn gain_at(&self, wn: f64) -> f64 {
        let z = Complex64::from_polar(1.0, -PI * wn);
        let z2 = z * z;
        self.sections
            .iter()
            .map(|s| {
                let num = s[0] + s[1] * z + s[2] * z2;
                let den = s[3] + s[4] * z + s[5] * z2;
                (num / den).norm()
            })
            .product()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f64, sampling_rate: f64, n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| (2.0 * PI * freq * i as f64 / sampling_rate).sin())
            .collect()
    }

    fn rms(data: &[f64]) -> f64 {
        (data.iter().map(|v| v * v).sum::<f64>() / data.len() as f64).sqrt()
    }

    #[test]
    fn test_lowpass_response() {
        let sos = Sos::lowpass(4, 0.2);
        assert_eq!(sos.sections.len(), 2);
        assert!((sos.gain_at(0.0) - 1.0).abs() < 1e-9);
        // -3 dB at the corner
        assert!((sos.gain_at(0.2) - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-6);
        assert!(sos.gain_at(0.9) < 1e-3);
    }

    #[test]
    fn test_highpass_response() {
        let sos = Sos::highpass(4, 0.1);
        assert!((sos.gain_at(1.0) - 1.0).abs() < 1e-9);
        assert!((sos.gain_at(0.1) - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-6);
        assert!(sos.gain_at(0.001) < 1e-6);
    }

    #[test]
    fn test_odd_order_has_first_order_section() {
        let sos = Sos::lowpass(3, 0.3);
        assert_eq!(sos.sections.len(), 2);
        assert!((sos.gain_at(0.0) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_bandpass_response() {
        let sos = Sos::bandpass(4, 0.16, 0.32);
        assert_eq!(sos.sections.len(), 4);
        assert!((sos.gain_at(0.16) - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-6);
        assert!((sos.gain_at(0.32) - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-6);
        assert!(sos.gain_at(0.0) < 1e-9);
        assert!(sos.gain_at(1.0) < 1e-9);
        let centre = ((PI * 0.16 / 2.0).tan() * (PI * 0.32 / 2.0).tan()).sqrt().atan() * 2.0 / PI;
        assert!((sos.gain_at(centre) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_filtering_a_signal() {
        let fs = 100.0;
        let mut low = sine(1.0, fs, 4000);
        let mut high = sine(30.0, fs, 4000);
        let filter = Filter::lowpass(5.0);
        filter.apply(&mut low, fs).unwrap();
        filter.apply(&mut high, fs).unwrap();
        // skip the transient
        assert!((rms(&low[1000..]) - std::f64::consts::FRAC_1_SQRT_2).abs() < 0.01);
        assert!(rms(&high[1000..]) < 1e-3);
    }

    #[test]
    fn test_nyquist_handling() {
        let fs = 20.0;
        assert_eq!(Filter::lowpass(16.0).design(fs).unwrap(), None);
        assert!(matches!(
            Filter::highpass(16.0).design(fs),
            Err(FilterError::AboveNyquist { .. })
        ));
        // band-pass above Nyquist falls back to a high-pass at freqmin
        let fallback = Filter::bandpass(8.0, 16.0).design(fs).unwrap().unwrap();
        assert_eq!(fallback, Sos::highpass(4, 0.8));
        assert!(matches!(
            Filter::bandpass(12.0, 16.0).design(fs),
            Err(FilterError::AboveNyquist { .. })
        ));
        assert!(matches!(
            Filter::highpass(0.0).design(fs),
            Err(FilterError::NonPositiveFrequency(_))
        ));
        assert!(matches!(
            Filter::highpass(1.0).with_corners(0).design(fs),
            Err(FilterError::BadCorners(0))
        ));
    }

    #[test]
    fn test_corner_at_nyquist() {
        let fs = 20.0;
        assert!(matches!(
            Filter::highpass(10.0).design(fs),
            Err(FilterError::AboveNyquist { .. })
        ));
        assert!(matches!(
            Filter::bandpass(10.0, 12.0).design(fs),
            Err(FilterError::AboveNyquist { .. })
        ));
        assert_eq!(Filter::lowpass(10.0).design(fs).unwrap(), None);
        assert!(Filter::highpass(9.9).design(fs).unwrap().is_some());
    }

    #[test]
    fn test_inverted_bandpass() {
        assert!(matches!(
            Filter::bandpass(8.0, 1.0).design(20.0),
            Err(FilterError::InvertedBand { .. })
        ));
        assert!(matches!(
            Filter::bandpass(4.0, 4.0).design(20.0),
            Err(FilterError::InvertedBand { .. })
        ));
    }
}
