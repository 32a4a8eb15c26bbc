use fxhash::FxHashMap;
use std::path::Path;

use super::constants::FIXED_HEADER_SIZE;
use super::error::MseedError;
use super::mseed_record::{Encoding, MseedRecord};
use super::nslc::Nslc;
use super::trace::{Stream, Trace};

/// Decode every record in a miniSEED file into a Stream.
///
/// Records are grouped by channel and joined into one trace per contiguous run of records.
pub fn read_mseed(path: &Path) -> Result<Stream, MseedError> {
    let bytes = std::fs::read(path)?;
    let records = records_from_bytes(&bytes)?;
    Ok(assemble_stream(records))
}

/// Split a byte buffer into miniSEED records. Text and empty records are dropped.
pub fn records_from_bytes(bytes: &[u8]) -> Result<Vec<MseedRecord>, MseedError> {
    let mut records = vec![];
    let mut offset = 0;
    while offset < bytes.len() {
        let rest = &bytes[offset..];
        if rest.len() < FIXED_HEADER_SIZE || rest.iter().all(|b| *b == 0) {
            log::debug!("Ignoring {} trailing bytes", rest.len());
            break;
        }
        let record = MseedRecord::parse(rest, offset)?;
        offset += record.header.record_length;
        if record.header.encoding == Encoding::Text || record.samples.is_empty() {
            continue;
        }
        records.push(record);
    }
    Ok(records)
}

/// Join records into traces: same channel, same rate, and the next record starting within
/// half a sample of where the previous one ended.
fn assemble_stream(records: Vec<MseedRecord>) -> Stream {
    let mut by_channel: FxHashMap<Nslc, Vec<MseedRecord>> = FxHashMap::default();
    for record in records {
        by_channel
            .entry(record.header.nslc.clone())
            .or_default()
            .push(record);
    }

    let mut channels: Vec<(Nslc, Vec<MseedRecord>)> = by_channel.into_iter().collect();
    channels.sort_by(|a, b| a.0.cmp(&b.0));

    let mut traces = vec![];
    for (nslc, mut records) in channels {
        records.sort_by_key(|r| r.header.start_ns);
        let mut current: Option<(Trace, i64)> = None;
        for record in records {
            let rate = record.header.sample_rate;
            let next_start = record.next_start_ns();
            current = match current {
                Some((mut trace, expected))
                    if trace.sampling_rate == rate
                        && ((record.header.start_ns - expected).abs() as f64)
                            <= 0.5e9 / rate =>
                {
                    trace.data.extend(record.samples);
                    Some((trace, next_start))
                }
                previous => {
                    if let Some((trace, _)) = previous {
                        traces.push(trace);
                    }
                    Some((
                        Trace::new(nslc.clone(), record.header.start_ns, rate, record.samples),
                        next_start,
                    ))
                }
            };
        }
        if let Some((trace, _)) = current {
            traces.push(trace);
        }
    }
    Stream::new(traces)
}
