use byteorder::{BigEndian, ByteOrder, LittleEndian};
use time::{Date, PrimitiveDateTime, Time};

use super::constants::*;
use super::error::MseedError;
use super::interval::to_nanos;
use super::nslc::Nslc;

/// Data encodings from blockette 1000 that we know how to decode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Text,
    Int16,
    Int32,
    Float32,
    Float64,
    Steim1,
    Steim2,
}

impl TryFrom<u8> for Encoding {
    type Error = MseedError;
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Text),
            1 => Ok(Self::Int16),
            3 => Ok(Self::Int32),
            4 => Ok(Self::Float32),
            5 => Ok(Self::Float64),
            10 => Ok(Self::Steim1),
            11 => Ok(Self::Steim2),
            _ => Err(MseedError::UnsupportedEncoding(value)),
        }
    }
}

/// The parts of a miniSEED fixed header and blockettes needed to place samples in time
#[derive(Debug, Clone)]
pub struct RecordHeader {
    pub nslc: Nslc,
    pub quality: char,
    pub start_ns: i64,
    pub n_samples: usize,
    pub sample_rate: f64,
    pub encoding: Encoding,
    pub data_big_endian: bool,
    pub record_length: usize,
    pub data_offset: usize,
}

/// A single decoded miniSEED record
#[derive(Debug, Clone)]
pub struct MseedRecord {
    pub header: RecordHeader,
    pub samples: Vec<f64>,
}

impl MseedRecord {
    /// Parse the record that starts at the beginning of `buffer`.
    ///
    /// `offset` is the position of the record within its file and is only used for
    /// error reporting. The buffer may extend past the record; the record length is
    /// taken from blockette 1000.
    pub fn parse(buffer: &[u8], offset: usize) -> Result<Self, MseedError> {
        if buffer.len() < FIXED_HEADER_SIZE {
            return Err(MseedError::Truncated {
                offset,
                length: FIXED_HEADER_SIZE,
                available: buffer.len(),
            });
        }
        let header = if is_big_endian_header(buffer) {
            parse_header::<BigEndian>(buffer, offset)?
        } else {
            parse_header::<LittleEndian>(buffer, offset)?
        };
        if header.record_length > buffer.len() {
            return Err(MseedError::Truncated {
                offset,
                length: header.record_length,
                available: buffer.len(),
            });
        }
        if header.data_offset > header.record_length {
            return Err(MseedError::InvalidHeader(offset));
        }

        let data = &buffer[header.data_offset..header.record_length];
        let samples = if header.data_big_endian {
            decode_samples::<BigEndian>(data, header.encoding, header.n_samples)?
        } else {
            decode_samples::<LittleEndian>(data, header.encoding, header.n_samples)?
        };

        Ok(Self { header, samples })
    }

    /// Expected start time of the sample following the last one in this record
    pub fn next_start_ns(&self) -> i64 {
        self.header.start_ns
            + (self.samples.len() as f64 * 1.0e9 / self.header.sample_rate).round() as i64
    }
}

/// The header byte order is found by checking which interpretation of the BTIME year and
/// day-of-year is plausible
fn is_big_endian_header(buffer: &[u8]) -> bool {
    let year = BigEndian::read_u16(&buffer[20..22]);
    let day = BigEndian::read_u16(&buffer[22..24]);
    (1900..=2100).contains(&year) && (1..=366).contains(&day)
}

fn ascii_field(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).trim().to_string()
}

fn parse_header<B: ByteOrder>(buffer: &[u8], offset: usize) -> Result<RecordHeader, MseedError> {
    let quality = buffer[6];
    if !VALID_QUALITY_CODES.contains(&quality) {
        return Err(MseedError::InvalidHeader(offset));
    }

    let nslc = Nslc::new(
        &ascii_field(&buffer[18..20]),
        &ascii_field(&buffer[8..13]),
        &ascii_field(&buffer[13..15]),
        &ascii_field(&buffer[15..18]),
    )
    .map_err(|_| MseedError::InvalidHeader(offset))?;

    let year = B::read_u16(&buffer[20..22]);
    let day = B::read_u16(&buffer[22..24]);
    let hour = buffer[24];
    let minute = buffer[25];
    let second = buffer[26];
    let fraction = B::read_u16(&buffer[28..30]);
    let n_samples = B::read_u16(&buffer[30..32]) as usize;
    let rate_factor = B::read_i16(&buffer[32..34]);
    let rate_multiplier = B::read_i16(&buffer[34..36]);
    let activity_flags = buffer[36];
    let n_blockettes = buffer[39];
    let time_correction = B::read_i32(&buffer[40..44]);
    let data_offset = B::read_u16(&buffer[44..46]) as usize;
    let first_blockette = B::read_u16(&buffer[46..48]) as usize;

    let date = Date::from_ordinal_date(year as i32, day)
        .map_err(|_| MseedError::BadStartTime(offset))?;
    // Leap seconds (second == 60) are not representable; clamp onto the next minute
    let (second, leap) = if second >= 60 { (59, 1) } else { (second, 0) };
    let time =
        Time::from_hms(hour, minute, second).map_err(|_| MseedError::BadStartTime(offset))?;
    let mut start_ns = to_nanos(PrimitiveDateTime::new(date, time))
        + leap * crate::interval::NANOS_PER_SECOND
        + fraction as i64 * NANOS_PER_TEN_THOUSANDTH;
    if activity_flags & TIME_CORRECTION_APPLIED == 0 {
        start_ns += time_correction as i64 * NANOS_PER_TEN_THOUSANDTH;
    }

    let mut encoding: Option<u8> = None;
    let mut data_big_endian = true;
    let mut record_length: Option<usize> = None;

    let mut blockette_offset = first_blockette;
    let mut n_seen = 0;
    while blockette_offset != 0
        && blockette_offset + 4 <= buffer.len()
        && n_seen < n_blockettes.max(1) as usize * 2
    {
        let kind = B::read_u16(&buffer[blockette_offset..blockette_offset + 2]);
        let next = B::read_u16(&buffer[blockette_offset + 2..blockette_offset + 4]) as usize;
        match kind {
            BLOCKETTE_DATA_ONLY if blockette_offset + 8 <= buffer.len() => {
                encoding = Some(buffer[blockette_offset + 4]);
                data_big_endian = buffer[blockette_offset + 5] != 0;
                let exponent = buffer[blockette_offset + 6];
                if !(MIN_RECORD_EXPONENT..=MAX_RECORD_EXPONENT).contains(&exponent) {
                    return Err(MseedError::BadRecordLength(offset, exponent));
                }
                record_length = Some(1usize << exponent);
            }
            BLOCKETTE_DATA_EXTENSION if blockette_offset + 8 <= buffer.len() => {
                let microseconds = buffer[blockette_offset + 5] as i8;
                start_ns += microseconds as i64 * 1_000;
            }
            _ => (),
        }
        n_seen += 1;
        if next <= blockette_offset {
            break;
        }
        blockette_offset = next;
    }

    let (encoding, record_length) = match (encoding, record_length) {
        (Some(e), Some(l)) => (Encoding::try_from(e)?, l),
        _ => return Err(MseedError::MissingBlockette1000(offset)),
    };

    Ok(RecordHeader {
        nslc,
        quality: quality as char,
        start_ns,
        n_samples,
        sample_rate: sample_rate(rate_factor, rate_multiplier),
        encoding,
        data_big_endian,
        record_length,
        data_offset,
    })
}

/// Nominal sample rate from the SEED factor/multiplier pair
pub fn sample_rate(factor: i16, multiplier: i16) -> f64 {
    let f = factor as f64;
    let m = multiplier as f64;
    match (factor, multiplier) {
        (0, _) | (_, 0) => 0.0,
        (a, b) if a > 0 && b > 0 => f * m,
        (a, b) if a > 0 && b < 0 => -f / m,
        (a, b) if a < 0 && b > 0 => -m / f,
        _ => 1.0 / (f * m),
    }
}

fn decode_samples<B: ByteOrder>(
    data: &[u8],
    encoding: Encoding,
    n_samples: usize,
) -> Result<Vec<f64>, MseedError> {
    let samples: Vec<f64> = match encoding {
        Encoding::Text => return Ok(vec![]),
        Encoding::Int16 => fixed_width(data, n_samples, 2, |b| B::read_i16(b) as f64)?,
        Encoding::Int32 => fixed_width(data, n_samples, 4, |b| B::read_i32(b) as f64)?,
        Encoding::Float32 => fixed_width(data, n_samples, 4, |b| B::read_f32(b) as f64)?,
        Encoding::Float64 => fixed_width(data, n_samples, 8, B::read_f64)?,
        Encoding::Steim1 => decode_steim::<B>(data, n_samples, steim1_differences::<B>)?
            .into_iter()
            .map(|s| s as f64)
            .collect(),
        Encoding::Steim2 => decode_steim::<B>(data, n_samples, steim2_differences::<B>)?
            .into_iter()
            .map(|s| s as f64)
            .collect(),
    };
    Ok(samples)
}

fn fixed_width(
    data: &[u8],
    n_samples: usize,
    width: usize,
    read: impl Fn(&[u8]) -> f64,
) -> Result<Vec<f64>, MseedError> {
    let available = data.len() / width;
    if available < n_samples {
        return Err(MseedError::SampleCountMismatch {
            expected: n_samples,
            found: available,
        });
    }
    Ok(data
        .chunks_exact(width)
        .take(n_samples)
        .map(read)
        .collect())
}

fn sign_extend(value: u32, bits: u32) -> i32 {
    let shift = 32 - bits;
    ((value << shift) as i32) >> shift
}

/// Append the differences held in one Steim-1 data word
fn steim1_differences<B: ByteOrder>(
    code: u32,
    word: &[u8],
    diffs: &mut Vec<i32>,
) -> Result<(), MseedError> {
    match code {
        0 => (),
        1 => diffs.extend(word.iter().map(|b| *b as i8 as i32)),
        2 => {
            diffs.push(B::read_i16(&word[0..2]) as i32);
            diffs.push(B::read_i16(&word[2..4]) as i32);
        }
        _ => diffs.push(B::read_i32(word)),
    }
    Ok(())
}

/// Append the differences held in one Steim-2 data word
fn steim2_differences<B: ByteOrder>(
    code: u32,
    word: &[u8],
    diffs: &mut Vec<i32>,
) -> Result<(), MseedError> {
    let value = B::read_u32(word);
    let dnib = value >> 30;
    let unpack = |diffs: &mut Vec<i32>, count: u32, bits: u32| {
        let mask = (1u32 << bits) - 1;
        for i in (0..count).rev() {
            diffs.push(sign_extend((value >> (i * bits)) & mask, bits));
        }
    };
    match (code, dnib) {
        (0, _) => (),
        (1, _) => diffs.extend(word.iter().map(|b| *b as i8 as i32)),
        (2, 1) => unpack(diffs, 1, 30),
        (2, 2) => unpack(diffs, 2, 15),
        (2, 3) => unpack(diffs, 3, 10),
        (3, 0) => unpack(diffs, 5, 6),
        (3, 1) => unpack(diffs, 6, 5),
        (3, 2) => unpack(diffs, 7, 4),
        _ => return Err(MseedError::BadSteimCode((code << 2) | dnib)),
    }
    Ok(())
}

/// Walk the Steim frames collecting differences, then integrate them from the forward
/// integration constant.
fn decode_steim<B: ByteOrder>(
    data: &[u8],
    n_samples: usize,
    unpack: fn(u32, &[u8], &mut Vec<i32>) -> Result<(), MseedError>,
) -> Result<Vec<i32>, MseedError> {
    if n_samples == 0 {
        return Ok(vec![]);
    }
    let mut diffs: Vec<i32> = Vec::with_capacity(n_samples);
    let mut first: i32 = 0;
    let mut last: i32 = 0;

    'frames: for (frame_idx, frame) in data.chunks_exact(STEIM_FRAME_SIZE).enumerate() {
        let nibbles = B::read_u32(&frame[0..4]);
        let first_word = if frame_idx == 0 {
            first = B::read_i32(&frame[4..8]);
            last = B::read_i32(&frame[8..12]);
            3
        } else {
            1
        };
        for w in first_word..STEIM_WORDS_PER_FRAME {
            let code = (nibbles >> (30 - 2 * w as u32)) & 0b11;
            unpack(code, &frame[w * 4..w * 4 + 4], &mut diffs)?;
            if diffs.len() >= n_samples {
                break 'frames;
            }
        }
    }

    if diffs.len() < n_samples {
        return Err(MseedError::SampleCountMismatch {
            expected: n_samples,
            found: diffs.len(),
        });
    }

    // The first difference refers to the previous record and is ignored
    let mut samples = Vec::with_capacity(n_samples);
    samples.push(first);
    for diff in diffs.iter().take(n_samples).skip(1) {
        let previous = samples[samples.len() - 1];
        samples.push(previous.wrapping_add(*diff));
    }
    if samples[n_samples - 1] != last {
        log::warn!(
            "Steim reverse integration constant {} does not match last sample {}",
            last,
            samples[n_samples - 1]
        );
    }
    Ok(samples)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use byteorder::WriteBytesExt;
    use time::macros::datetime;

    /// Optional header fields for [build_record_with]
    #[derive(Default)]
    pub(crate) struct HeaderFields {
        pub activity_flags: u8,
        pub time_correction: i32,
        pub microseconds: Option<i8>,
    }

    /// Build a big-endian miniSEED record in memory for tests
    pub(crate) fn build_record(
        nslc: (&str, &str, &str, &str),
        start: PrimitiveDateTime,
        sample_rate: i16,
        encoding: u8,
        payload: &[u8],
        n_samples: u16,
        exponent: u8,
    ) -> Vec<u8> {
        build_record_with::<BigEndian>(
            nslc,
            start,
            sample_rate,
            encoding,
            payload,
            n_samples,
            exponent,
            HeaderFields::default(),
        )
    }

    /// Build a record in byte order `B`, with blockette 1001 when microseconds are given
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn build_record_with<B: ByteOrder>(
        nslc: (&str, &str, &str, &str),
        start: PrimitiveDateTime,
        sample_rate: i16,
        encoding: u8,
        payload: &[u8],
        n_samples: u16,
        exponent: u8,
        fields: HeaderFields,
    ) -> Vec<u8> {
        let length = 1usize << exponent;
        let mut rec: Vec<u8> = Vec::with_capacity(length);
        rec.extend_from_slice(b"000001D ");
        rec.extend_from_slice(format!("{:<5}", nslc.1).as_bytes());
        rec.extend_from_slice(format!("{:<2}", nslc.2).as_bytes());
        rec.extend_from_slice(format!("{:<3}", nslc.3).as_bytes());
        rec.extend_from_slice(format!("{:<2}", nslc.0).as_bytes());
        rec.write_u16::<B>(start.year() as u16).unwrap();
        rec.write_u16::<B>(start.ordinal()).unwrap();
        rec.push(start.hour());
        rec.push(start.minute());
        rec.push(start.second());
        rec.push(0);
        rec.write_u16::<B>((start.microsecond() / 100) as u16).unwrap();
        rec.write_u16::<B>(n_samples).unwrap();
        rec.write_i16::<B>(sample_rate).unwrap();
        rec.write_i16::<B>(1).unwrap();
        rec.push(fields.activity_flags);
        rec.push(0); // io
        rec.push(0); // quality
        rec.push(if fields.microseconds.is_some() { 2 } else { 1 });
        rec.write_i32::<B>(fields.time_correction).unwrap();
        rec.write_u16::<B>(64).unwrap(); // data offset
        rec.write_u16::<B>(48).unwrap(); // first blockette
        // Blockette 1000
        rec.write_u16::<B>(1000).unwrap();
        rec.write_u16::<B>(if fields.microseconds.is_some() { 56 } else { 0 })
            .unwrap();
        rec.push(encoding);
        rec.push(u8::from(B::read_u16(&[0, 1]) == 1));
        rec.push(exponent);
        rec.push(0);
        // Blockette 1001
        if let Some(microseconds) = fields.microseconds {
            rec.write_u16::<B>(1001).unwrap();
            rec.write_u16::<B>(0).unwrap();
            rec.push(100);
            rec.push(microseconds as u8);
            rec.push(0);
            rec.push(0);
        }
        rec.resize(64, 0);
        rec.extend_from_slice(payload);
        rec.resize(length, 0);
        rec
    }

    pub(crate) fn int32_payload(samples: &[i32]) -> Vec<u8> {
        let mut payload = Vec::new();
        for s in samples {
            payload.write_i32::<BigEndian>(*s).unwrap();
        }
        payload
    }

    #[test]
    fn test_sample_rate_factor_multiplier() {
        assert_eq!(sample_rate(100, 1), 100.0);
        assert_eq!(sample_rate(1, -10), 0.1);
        assert_eq!(sample_rate(-10, 1), 0.1);
        assert_eq!(sample_rate(-10, -10), 0.01);
        assert_eq!(sample_rate(0, 1), 0.0);
    }

    #[test]
    fn test_int32_record() {
        let start = datetime!(2025-01-15 00:00:00.5);
        let data = [1, -2, 3, 40_000, -50_000];
        let rec = build_record(
            ("VG", "OJN", "00", "EHZ"),
            start,
            100,
            3,
            &int32_payload(&data),
            5,
            9,
        );
        let record = MseedRecord::parse(&rec, 0).unwrap();
        assert_eq!(record.header.nslc.to_string(), "VG.OJN.00.EHZ");
        assert_eq!(record.header.sample_rate, 100.0);
        assert_eq!(record.header.record_length, 512);
        assert_eq!(record.header.start_ns, to_nanos(start));
        assert_eq!(record.samples, vec![1.0, -2.0, 3.0, 40_000.0, -50_000.0]);
        assert_eq!(record.next_start_ns(), to_nanos(start) + 50_000_000);
    }

    #[test]
    fn test_steim1_record() {
        // samples 10, 11, 9, 9, 300
        // diffs   (x), 1, -2, 0, 291
        let mut frame = vec![0u8; 64];
        // word 3: four 8-bit diffs [0(ignored), 1, -2, 0] code 01
        // word 4: one 32-bit diff 291 code 11
        let nibbles: u32 = (0b01 << (30 - 6)) | (0b11 << (30 - 8));
        BigEndian::write_u32(&mut frame[0..4], nibbles);
        BigEndian::write_i32(&mut frame[4..8], 10);
        BigEndian::write_i32(&mut frame[8..12], 300);
        frame[12] = 0;
        frame[13] = 1;
        frame[14] = (-2i8) as u8;
        frame[15] = 0;
        BigEndian::write_i32(&mut frame[16..20], 291);
        let rec = build_record(
            ("VG", "OJN", "00", "EHZ"),
            datetime!(2025-01-15 00:00:00),
            100,
            10,
            &frame,
            5,
            9,
        );
        let record = MseedRecord::parse(&rec, 0).unwrap();
        assert_eq!(record.samples, vec![10.0, 11.0, 9.0, 9.0, 300.0]);
    }

    #[test]
    fn test_steim2_record() {
        // samples 5, 6, 4, 4, 7, 1000
        let mut frame = vec![0u8; 64];
        // word 3: code 11 dnib 00 -> five 6-bit diffs [0, 1, -2, 0, 3]
        // word 4: code 10 dnib 01 -> one 30-bit diff 993
        let nibbles: u32 = (0b11 << (30 - 6)) | (0b10 << (30 - 8));
        BigEndian::write_u32(&mut frame[0..4], nibbles);
        BigEndian::write_i32(&mut frame[4..8], 5);
        BigEndian::write_i32(&mut frame[8..12], 1000);
        let six = |v: i32| (v as u32) & 0x3F;
        let word3: u32 =
            (six(0) << 24) | (six(1) << 18) | (six(-2) << 12) | (six(0) << 6) | six(3);
        BigEndian::write_u32(&mut frame[12..16], word3);
        let word4: u32 = (0b01 << 30) | 993;
        BigEndian::write_u32(&mut frame[16..20], word4);
        let rec = build_record(
            ("VG", "OJN", "00", "EHZ"),
            datetime!(2025-01-15 00:00:00),
            100,
            11,
            &frame,
            6,
            9,
        );
        let record = MseedRecord::parse(&rec, 0).unwrap();
        assert_eq!(record.samples, vec![5.0, 6.0, 4.0, 4.0, 7.0, 1000.0]);
    }

    #[test]
    fn test_little_endian_record() {
        let start = datetime!(2025-01-15 06:30:00);
        let mut payload = Vec::new();
        for v in [7i32, -8, 9] {
            payload.write_i32::<LittleEndian>(v).unwrap();
        }
        let rec = build_record_with::<LittleEndian>(
            ("VG", "OJN", "00", "EHZ"),
            start,
            50,
            3,
            &payload,
            3,
            9,
            HeaderFields::default(),
        );
        assert!(!is_big_endian_header(&rec));
        let record = MseedRecord::parse(&rec, 0).unwrap();
        assert!(!record.header.data_big_endian);
        assert_eq!(record.header.start_ns, to_nanos(start));
        assert_eq!(record.header.sample_rate, 50.0);
        assert_eq!(record.samples, vec![7.0, -8.0, 9.0]);
    }

    fn start_with(fields: HeaderFields) -> i64 {
        let rec = build_record_with::<BigEndian>(
            ("VG", "OJN", "00", "EHZ"),
            datetime!(2025-01-15 00:00:00.0012),
            100,
            3,
            &int32_payload(&[1]),
            1,
            9,
            fields,
        );
        MseedRecord::parse(&rec, 0).unwrap().header.start_ns
    }

    #[test]
    fn test_start_time_adjustments() {
        let base = to_nanos(datetime!(2025-01-15 00:00:00.0012));
        assert_eq!(start_with(HeaderFields::default()), base);

        // Blockette 1001 adds microseconds below the 0.1 ms BTIME resolution
        let micro = start_with(HeaderFields {
            microseconds: Some(-37),
            ..Default::default()
        });
        assert_eq!(micro, base - 37_000);

        // Time correction of 2.5 s in 0.0001 s units
        let corrected = start_with(HeaderFields {
            time_correction: 25_000,
            ..Default::default()
        });
        assert_eq!(corrected, base + 2_500_000_000);

        // Activity bit 1 says the correction is already in the start time
        let applied = start_with(HeaderFields {
            activity_flags: TIME_CORRECTION_APPLIED,
            time_correction: 25_000,
            ..Default::default()
        });
        assert_eq!(applied, base);
    }

    #[test]
    fn test_bad_records() {
        let rec = build_record(
            ("VG", "OJN", "00", "EHZ"),
            datetime!(2025-01-15 00:00:00),
            100,
            3,
            &int32_payload(&[1, 2]),
            2,
            9,
        );
        // Truncated buffer
        assert!(matches!(
            MseedRecord::parse(&rec[..256], 0),
            Err(MseedError::Truncated { .. })
        ));
        // Unknown encoding
        let mut bad = rec.clone();
        bad[52] = 42;
        assert!(matches!(
            MseedRecord::parse(&bad, 0),
            Err(MseedError::UnsupportedEncoding(42))
        ));
        // Garbage quality code
        let mut bad = rec;
        bad[6] = b'X';
        assert!(matches!(
            MseedRecord::parse(&bad, 0),
            Err(MseedError::InvalidHeader(0))
        ));
    }
}
