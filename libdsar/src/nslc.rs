use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

use super::error::NslcError;

/// Nslc is the full seismic channel identifier: Network.Station.Location.Channel.
///
/// All codes are stored upper-cased. The location code may be empty (as in `VG.OJN..EHZ`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Nslc {
    pub network: String,
    pub station: String,
    pub location: String,
    pub channel: String,
}

impl Nslc {
    /// Construct a new Nslc, upper-casing every code
    pub fn new(
        network: &str,
        station: &str,
        location: &str,
        channel: &str,
    ) -> Result<Self, NslcError> {
        let nslc = Self {
            network: network.trim().to_uppercase(),
            station: station.trim().to_uppercase(),
            location: location.trim().to_uppercase(),
            channel: channel.trim().to_uppercase(),
        };
        if nslc.station.is_empty() {
            return Err(NslcError::EmptyStation(nslc.to_string()));
        }
        if nslc.channel.is_empty() {
            return Err(NslcError::EmptyChannel(nslc.to_string()));
        }
        Ok(nslc)
    }
}

impl FromStr for Nslc {
    type Err = NslcError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.split('.').collect();
        if fields.len() != 4 {
            return Err(NslcError::WrongFieldCount(s.to_string()));
        }
        Self::new(fields[0], fields[1], fields[2], fields[3])
    }
}

impl Display for Nslc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.network, self.station, self.location, self.channel
        )
    }
}

impl TryFrom<String> for Nslc {
    type Error = NslcError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_str(&value)
    }
}

impl From<Nslc> for String {
    fn from(value: Nslc) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let nslc = Nslc::from_str("vg.ojn.00.ehz").unwrap();
        assert_eq!(nslc.network, "VG");
        assert_eq!(nslc.station, "OJN");
        assert_eq!(nslc.location, "00");
        assert_eq!(nslc.channel, "EHZ");
        assert_eq!(nslc.to_string(), "VG.OJN.00.EHZ");
    }

    #[test]
    fn test_empty_location_allowed() {
        let nslc = Nslc::from_str("VG.OJN..EHZ").unwrap();
        assert_eq!(nslc.location, "");
        assert_eq!(nslc.to_string(), "VG.OJN..EHZ");
    }

    #[test]
    fn test_bad_identifiers() {
        assert!(matches!(
            Nslc::from_str("VG.OJN.EHZ"),
            Err(NslcError::WrongFieldCount(_))
        ));
        assert!(matches!(
            Nslc::from_str("VG..00.EHZ"),
            Err(NslcError::EmptyStation(_))
        ));
        assert!(matches!(
            Nslc::from_str("VG.OJN.00."),
            Err(NslcError::EmptyChannel(_))
        ));
    }

    #[test]
    fn test_yaml_as_string() {
        let nslc = Nslc::from_str("VG.RUA3.00.EHZ").unwrap();
        let yaml = serde_yaml::to_string(&nslc).unwrap();
        assert_eq!(yaml.trim(), "VG.RUA3.00.EHZ");
        let back: Nslc = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, nslc);
    }
}
