use serde::{Deserialize, Serialize};

use super::constants::{DEFAULT_FIRST_BAND, DEFAULT_RSAM_BANDS, DEFAULT_SECOND_BAND};
use super::error::BandError;

/// A DSAR frequency band: a high-pass applied before integration, then a band-pass
/// `[band_low, band_high]` on the displacement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawDsarBand")]
pub struct DsarBand {
    pub name: String,
    pub highpass: f64,
    pub band_low: f64,
    pub band_high: f64,
}

#[derive(Deserialize)]
struct RawDsarBand {
    name: String,
    highpass: f64,
    band_low: f64,
    band_high: f64,
}

impl TryFrom<RawDsarBand> for DsarBand {
    type Error = BandError;
    fn try_from(raw: RawDsarBand) -> Result<Self, Self::Error> {
        Self::new(&raw.name, raw.highpass, raw.band_low, raw.band_high)
    }
}

impl DsarBand {
    pub fn new(name: &str, highpass: f64, band_low: f64, band_high: f64) -> Result<Self, BandError> {
        if name.is_empty() {
            return Err(BandError::EmptyName);
        }
        if highpass <= 0.0 || band_low <= 0.0 || band_high <= 0.0 {
            return Err(BandError::NonPositive(name.to_string()));
        }
        if !(highpass <= band_low && band_low <= band_high) {
            return Err(BandError::BadDsarOrder {
                name: name.to_string(),
                highpass,
                band_low,
                band_high,
            });
        }
        Ok(Self {
            name: name.to_string(),
            highpass,
            band_low,
            band_high,
        })
    }

    pub fn default_first() -> Self {
        let (name, highpass, band_low, band_high) = DEFAULT_FIRST_BAND;
        Self {
            name: name.to_string(),
            highpass,
            band_low,
            band_high,
        }
    }

    pub fn default_second() -> Self {
        let (name, highpass, band_low, band_high) = DEFAULT_SECOND_BAND;
        Self {
            name: name.to_string(),
            highpass,
            band_low,
            band_high,
        }
    }
}

/// An RSAM frequency band, band-passed between `freqmin` and `freqmax`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawRsamBand")]
pub struct RsamBand {
    pub name: String,
    pub freqmin: f64,
    pub freqmax: f64,
}

#[derive(Deserialize)]
struct RawRsamBand {
    name: String,
    freqmin: f64,
    freqmax: f64,
}

impl TryFrom<RawRsamBand> for RsamBand {
    type Error = BandError;
    fn try_from(raw: RawRsamBand) -> Result<Self, Self::Error> {
        Self::new(&raw.name, raw.freqmin, raw.freqmax)
    }
}

impl RsamBand {
    pub fn new(name: &str, freqmin: f64, freqmax: f64) -> Result<Self, BandError> {
        if name.is_empty() {
            return Err(BandError::EmptyName);
        }
        if freqmin <= 0.0 || freqmax <= 0.0 {
            return Err(BandError::NonPositive(name.to_string()));
        }
        if freqmin >= freqmax {
            return Err(BandError::BadRsamOrder {
                name: name.to_string(),
                freqmin,
                freqmax,
            });
        }
        Ok(Self {
            name: name.to_string(),
            freqmin,
            freqmax,
        })
    }

    /// VLP, LP and VT
    pub fn defaults() -> Vec<Self> {
        DEFAULT_RSAM_BANDS
            .iter()
            .map(|(name, freqmin, freqmax)| Self {
                name: name.to_string(),
                freqmin: *freqmin,
                freqmax: *freqmax,
            })
            .collect()
    }
}
