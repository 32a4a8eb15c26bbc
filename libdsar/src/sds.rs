use std::path::{Path, PathBuf};
use time::Date;

use super::error::SdsError;
use super::interval::from_nanos;
use super::mseed_file::read_mseed;
use super::nslc::Nslc;
use super::trace::{Fill, Stream};

/// A record of a file read from the archive
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedFile {
    pub date: Date,
    pub path: PathBuf,
    pub traces: usize,
    pub size: u64,
}

/// Reader for one channel of a SeisComP Data Structure archive:
/// `{root}/{YYYY}/{NET}/{STA}/{CHA}.D/{NET}.{STA}.{LOC}.{CHA}.D.{YYYY}.{DDD}`
#[derive(Debug, Clone)]
pub struct Sds {
    root: PathBuf,
    nslc: Nslc,
    loaded: Vec<LoadedFile>,
}

impl Sds {
    pub fn new(root: &Path, nslc: Nslc) -> Result<Self, SdsError> {
        if !root.exists() {
            return Err(SdsError::BadRootPath(root.to_path_buf()));
        }
        if !root.is_dir() {
            return Err(SdsError::NotADirectory(root.to_path_buf()));
        }
        Ok(Self {
            root: root.to_path_buf(),
            nslc,
            loaded: vec![],
        })
    }

    pub fn nslc(&self) -> &Nslc {
        &self.nslc
    }

    /// Path of the day file for `date`
    pub fn filepath(&self, date: Date) -> PathBuf {
        let year = date.year();
        let Nslc {
            network,
            station,
            location,
            channel,
        } = &self.nslc;
        self.root
            .join(format!("{year}"))
            .join(network)
            .join(station)
            .join(format!("{channel}.D"))
            .join(format!(
                "{network}.{station}.{location}.{channel}.D.{year}.{:03}",
                date.ordinal()
            ))
    }

    /// Load one day of data, merged into one trace per channel.
    ///
    /// Missing or unreadable files give an empty stream.
    pub fn get(&mut self, date: Date) -> Stream {
        let path = self.filepath(date);
        if !path.exists() {
            log::info!("{date} :: {} not found: {}", self.nslc, path.display());
            return Stream::default();
        }

        let mut stream = match read_mseed(&path) {
            Ok(stream) => stream.select(&self.nslc),
            Err(e) => {
                log::warn!("{date} :: Failed to read {}: {e}", path.display());
                return Stream::default();
            }
        };
        stream.merge(Fill::Interpolate);
        if stream.is_empty() {
            log::info!("{date} :: {} holds no data for {}", path.display(), self.nslc);
            return stream;
        }

        for trace in stream.iter() {
            log::info!(
                "{date} :: {} :: {} samples, {:.1} s at {} Hz",
                trace.id(),
                trace.len(),
                trace.duration(),
                trace.sampling_rate
            );
        }
        if let Some(first) = stream.iter().map(|t| t.start_ns).min() {
            let start_date = from_nanos(first).date();
            if start_date != date {
                log::warn!("{date} :: {} starts on {start_date}", self.nslc);
            }
        }

        let size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        log::debug!(
            "{date} :: Loaded {} ({})",
            path.display(),
            human_bytes::human_bytes(size as f64)
        );
        self.loaded.push(LoadedFile {
            date,
            path,
            traces: stream.count(),
            size,
        });
        stream
    }

    /// Files read so far
    pub fn loaded_files(&self) -> &[LoadedFile] {
        &self.loaded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mseed_record::tests::{build_record, int32_payload};
    use std::str::FromStr;
    use time::macros::{date, datetime};

    fn nslc() -> Nslc {
        Nslc::from_str("VG.OJN.00.EHZ").unwrap()
    }

    #[test]
    fn test_filepath() {
        let sds = Sds::new(Path::new("/"), nslc()).unwrap();
        assert_eq!(
            sds.filepath(date!(2025 - 02 - 03)),
            PathBuf::from("/2025/VG/OJN/EHZ.D/VG.OJN.00.EHZ.D.2025.034")
        );
    }

    #[test]
    fn test_bad_root() {
        assert!(matches!(
            Sds::new(Path::new("/no/such/archive"), nslc()),
            Err(SdsError::BadRootPath(_))
        ));
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(matches!(
            Sds::new(file.path(), nslc()),
            Err(SdsError::NotADirectory(_))
        ));
    }

    #[test]
    fn test_get_day() {
        let dir = tempfile::tempdir().unwrap();
        let mut sds = Sds::new(dir.path(), nslc()).unwrap();
        let day = date!(2025 - 01 - 15);
        assert!(sds.get(day).is_empty());

        let path = sds.filepath(day);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let mut bytes = build_record(
            ("VG", "OJN", "00", "EHZ"),
            datetime!(2025-01-15 00:00:00),
            1,
            3,
            &int32_payload(&[1, 2]),
            2,
            9,
        );
        // gap of two samples, filled by interpolation
        bytes.extend(build_record(
            ("VG", "OJN", "00", "EHZ"),
            datetime!(2025-01-15 00:00:04),
            1,
            3,
            &int32_payload(&[8]),
            1,
            9,
        ));
        std::fs::write(&path, bytes).unwrap();

        let stream = sds.get(day);
        assert_eq!(stream.count(), 1);
        assert_eq!(stream.traces[0].data, vec![1.0, 2.0, 4.0, 6.0, 8.0]);
        assert_eq!(sds.loaded_files().len(), 1);
        assert_eq!(sds.loaded_files()[0].size, 1024);
    }
}
