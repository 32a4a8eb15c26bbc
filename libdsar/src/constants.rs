// miniSEED v2
pub const FIXED_HEADER_SIZE: usize = 48;
pub const STEIM_FRAME_SIZE: usize = 64;
pub const STEIM_WORDS_PER_FRAME: usize = 16;
pub const BLOCKETTE_DATA_ONLY: u16 = 1000;
pub const BLOCKETTE_DATA_EXTENSION: u16 = 1001;
pub const MIN_RECORD_EXPONENT: u8 = 7; // 128 bytes
pub const MAX_RECORD_EXPONENT: u8 = 16; // 65536 bytes
pub const VALID_QUALITY_CODES: &[u8] = b"DRQM";
// Activity flag bit 1: time correction already applied to the start time
pub const TIME_CORRECTION_APPLIED: u8 = 0b0000_0010;
// BTIME fractional seconds are in units of 0.0001 s, time corrections too
pub const NANOS_PER_TEN_THOUSANDTH: i64 = 100_000;

// Filtering
pub const DEFAULT_CORNERS: usize = 4;

// DSAR
pub const DEFAULT_FIRST_BAND: (&str, f64, f64, f64) = ("LF", 0.1, 4.5, 8.0);
pub const DEFAULT_SECOND_BAND: (&str, f64, f64, f64) = ("HF", 0.1, 8.0, 16.0);
pub const DSAR_COLUMN_PREFIX: &str = "DSAR";

// RSAM
pub const DEFAULT_RSAM_BANDS: [(&str, f64, f64); 3] =
    [("VLP", 0.02, 0.2), ("LP", 0.5, 4.0), ("VT", 4.0, 18.0)];
pub const F_RATIO_COLUMN: &str = "f_ratio";
pub const F_RATIO_LOW_BAND: &str = "LP";
pub const F_RATIO_HIGH_BAND: &str = "VT";

// Output
pub const DATETIME_COLUMN: &str = "datetime";
pub const FIGURES_DIRECTORY: &str = "figures";
