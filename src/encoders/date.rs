//! Date Encoder implementation.
//!
//! The DateEncoder encodes up to 6 attributes of a timestamp value into an SDR,
//! concatenated in this order:
//! - season: portion of the year (day of year)
//! - day_of_week: day of week (Monday=0 through Sunday=6)
//! - weekend: boolean for weekend detection
//! - custom_days: custom day-of-week categories
//! - holiday: boolean for holiday detection with smooth transitions
//! - time_of_day: time within the day

use std::collections::HashSet;

use chrono::{Datelike, NaiveDate, NaiveDateTime, TimeDelta, Timelike, Weekday};
use serde::{Deserialize, Serialize};

use crate::encoders::base::check_dimensions;
use crate::encoders::date_format::DateParser;
use crate::encoders::scalar::{ScalarEncoder, ScalarEncoderParams};
use crate::encoders::{DecodedField, Encoder, FieldEncoder, FieldValue};
use crate::error::{Result, SensorError};
use crate::spec::{DateSubfields, FieldEncoding};
use crate::types::{Real, Sdr, UInt};

/// Registry key of [`DateEncoder`].
pub const DATE_KIND: &str = "DateEncoder";

/// Holiday specification.
///
/// Holidays can be either:
/// - Annual: repeats every year on the same month/day (e.g., Christmas: month=12, day=25)
/// - One-time: occurs on a specific year/month/day (e.g., year=2018, month=4, day=1)
///
/// Serialized as `[month, day]` or `[year, month, day]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<i32>", into = "Vec<i32>")]
pub struct Holiday {
    /// Year (None for annual holidays).
    pub year: Option<i32>,
    /// Month (1-12).
    pub month: u32,
    /// Day of month (1-31).
    pub day: u32,
}

impl Holiday {
    /// Creates an annual holiday (same date every year).
    pub fn annual(month: u32, day: u32) -> Self {
        Self {
            year: None,
            month,
            day,
        }
    }

    /// Creates a one-time holiday on a specific date.
    pub fn once(year: i32, month: u32, day: u32) -> Self {
        Self {
            year: Some(year),
            month,
            day,
        }
    }

    /// Dates this holiday falls on near `year`.
    fn dates_near(&self, year: i32) -> Vec<NaiveDate> {
        match self.year {
            Some(y) => NaiveDate::from_ymd_opt(y, self.month, self.day)
                .into_iter()
                .collect(),
            None => (year - 1..=year + 1)
                .filter_map(|y| NaiveDate::from_ymd_opt(y, self.month, self.day))
                .collect(),
        }
    }
}

impl TryFrom<Vec<i32>> for Holiday {
    type Error = String;

    fn try_from(parts: Vec<i32>) -> std::result::Result<Self, Self::Error> {
        let unsigned = |v: i32| u32::try_from(v).map_err(|_| format!("negative value {v}"));
        match parts.as_slice() {
            [m, d] => Ok(Holiday::annual(unsigned(*m)?, unsigned(*d)?)),
            [y, m, d] => Ok(Holiday::once(*y, unsigned(*m)?, unsigned(*d)?)),
            _ => Err(format!(
                "holiday must be [month, day] or [year, month, day], got {parts:?}"
            )),
        }
    }
}

impl From<Holiday> for Vec<i32> {
    fn from(h: Holiday) -> Self {
        let (m, d) = (h.month as i32, h.day as i32);
        match h.year {
            Some(y) => vec![y, m, d],
            None => vec![m, d],
        }
    }
}

/// Parses a day name by its first three letters.
fn parse_day(name: &str) -> Option<Weekday> {
    let lower = name.trim().to_lowercase();
    match lower.get(..3)? {
        "mon" => Some(Weekday::Mon),
        "tue" => Some(Weekday::Tue),
        "wed" => Some(Weekday::Wed),
        "thu" => Some(Weekday::Thu),
        "fri" => Some(Weekday::Fri),
        "sat" => Some(Weekday::Sat),
        "sun" => Some(Weekday::Sun),
        _ => None,
    }
}

/// Parameters for creating a Date Encoder.
///
/// Each attribute can be enabled by setting its width parameter > 0.
/// The total output size is the sum of all enabled attribute sizes.
#[derive(Debug, Clone)]
pub struct DateEncoderParams {
    /// Width (bits) for season encoding. 0 to disable.
    pub season_width: UInt,
    /// Radius for season buckets (days per season). Default: 91.5 (4 seasons/year).
    pub season_radius: Real,

    /// Width (bits) for day of week encoding. 0 to disable.
    pub day_of_week_width: UInt,
    /// Radius for day of week buckets. Default: 1.0 (every day is a bucket).
    pub day_of_week_radius: Real,

    /// Width (bits) for weekend encoding. 0 to disable.
    pub weekend_width: UInt,

    /// Width (bits) for holiday encoding. 0 to disable.
    pub holiday_width: UInt,
    /// List of holidays. Default: Christmas (Dec 25).
    pub holiday_dates: Vec<Holiday>,

    /// Width (bits) for time of day encoding. 0 to disable.
    pub time_of_day_width: UInt,
    /// Radius for time of day buckets (hours). Default: 4.0 (6 periods/day).
    pub time_of_day_radius: Real,

    /// Width (bits) for custom days encoding. 0 to disable.
    pub custom_width: UInt,
    /// Custom days specification. Each string can be a day name or comma-separated list.
    /// E.g., `["Monday", "Mon,Wed,Fri"]`.
    pub custom_days: Vec<String>,

    /// Literal format for [`FieldEncoder::parse`]. `None` tries the built-in formats.
    pub format_pattern: Option<String>,
}

impl Default for DateEncoderParams {
    fn default() -> Self {
        Self {
            season_width: 0,
            season_radius: 91.5,
            day_of_week_width: 0,
            day_of_week_radius: 1.0,
            weekend_width: 0,
            holiday_width: 0,
            holiday_dates: vec![Holiday::annual(12, 25)], // Christmas
            time_of_day_width: 0,
            time_of_day_radius: 4.0,
            custom_width: 0,
            custom_days: Vec::new(),
            format_pattern: None,
        }
    }
}

impl From<&DateSubfields> for DateEncoderParams {
    fn from(sub: &DateSubfields) -> Self {
        let mut params = Self::default();
        if let Some(s) = sub.season {
            params.season_width = s.width;
            params.season_radius = s.radius;
        }
        if let Some(s) = sub.day_of_week {
            params.day_of_week_width = s.width;
            params.day_of_week_radius = s.radius;
        }
        if let Some(s) = sub.weekend {
            params.weekend_width = s.width;
        }
        if let Some(s) = &sub.custom_days {
            params.custom_width = s.width;
            params.custom_days.clone_from(&s.days);
        }
        if let Some(s) = sub.holiday {
            params.holiday_width = s.width;
        }
        if let Some(h) = &sub.holidays {
            params.holiday_dates.clone_from(h);
        }
        if let Some(s) = sub.time_of_day {
            params.time_of_day_width = s.width;
            params.time_of_day_radius = s.radius;
        }
        params.format_pattern.clone_from(&sub.format_pattern);
        params
    }
}

/// Periodic sub-encoder over `[0, maximum)`.
fn periodic(maximum: Real, width: UInt, radius: Real) -> Result<ScalarEncoder> {
    ScalarEncoder::new(ScalarEncoderParams {
        minimum: 0.0,
        maximum,
        size: 0,
        active_bits: width,
        radius,
        resolution: 0.0,
        clip_input: false,
        periodic: true,
        category: false,
        forced: true,
    })
}

/// Two-state sub-encoder: blocks for 0 and 1.
fn binary(width: UInt) -> Result<ScalarEncoder> {
    ScalarEncoder::new(ScalarEncoderParams {
        minimum: 0.0,
        maximum: 1.0,
        size: width * 2,
        active_bits: width,
        radius: 0.0,
        resolution: 0.0,
        clip_input: false,
        periodic: false,
        category: true,
        forced: true,
    })
}

/// Encodes date/time values into SDR representations.
///
/// The DateEncoder can encode up to 6 different aspects of a timestamp:
/// - Season (time of year)
/// - Day of week
/// - Weekend flag
/// - Custom day categories
/// - Holiday flag (with smooth transitions)
/// - Time of day
///
/// Each aspect uses a ScalarEncoder internally, and the outputs are concatenated.
///
/// # Example
///
/// ```rust
/// use chrono::NaiveDate;
/// use mokosh_sensor::encoders::{DateEncoder, DateEncoderParams, Encoder};
///
/// let encoder = DateEncoder::new(DateEncoderParams {
///     season_width: 5,
///     day_of_week_width: 2,
///     ..Default::default()
/// }).unwrap();
///
/// let dt = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap().and_hms_opt(12, 0, 0).unwrap();
/// let sdr = encoder.encode_to_sdr(dt).unwrap();
/// assert_eq!(sdr.get_sum(), 7);
/// ```
#[derive(Debug, Clone)]
pub struct DateEncoder {
    /// Configuration parameters.
    params: DateEncoderParams,

    /// Season encoder (day of year).
    season_encoder: Option<ScalarEncoder>,

    /// Day of week encoder.
    day_of_week_encoder: Option<ScalarEncoder>,

    /// Weekend encoder (binary).
    weekend_encoder: Option<ScalarEncoder>,

    /// Custom days encoder (binary).
    custom_days_encoder: Option<ScalarEncoder>,

    /// Holiday encoder (continuous 0-2).
    holiday_encoder: Option<ScalarEncoder>,

    /// Time of day encoder (0-24 hours).
    time_of_day_encoder: Option<ScalarEncoder>,

    /// Days matched by the custom days encoder.
    custom_days_set: HashSet<Weekday>,

    /// Parses literal input.
    parser: DateParser,

    /// Total output size.
    total_size: UInt,

    /// Output dimensions.
    dimensions: Vec<UInt>,
}

impl DateEncoder {
    /// Creates a new Date Encoder.
    pub fn new(params: DateEncoderParams) -> Result<Self> {
        let season_encoder = (params.season_width > 0)
            .then(|| periodic(366.0, params.season_width, params.season_radius))
            .transpose()?;

        let day_of_week_encoder = (params.day_of_week_width > 0)
            .then(|| periodic(7.0, params.day_of_week_width, params.day_of_week_radius))
            .transpose()?;

        let weekend_encoder = (params.weekend_width > 0)
            .then(|| binary(params.weekend_width))
            .transpose()?;

        let mut custom_days_set = HashSet::new();
        let custom_days_encoder = if params.custom_width > 0 {
            if params.custom_days.is_empty() {
                return Err(SensorError::InvalidParameter {
                    name: "custom_days",
                    message: "custom_days list must not be empty when custom_width > 0"
                        .to_string(),
                });
            }
            for part in params.custom_days.iter().flat_map(|s| s.split(',')) {
                let day = parse_day(part).ok_or_else(|| SensorError::InvalidParameter {
                    name: "custom_days",
                    message: format!("Invalid day name: {}", part.trim()),
                })?;
                custom_days_set.insert(day);
            }
            Some(binary(params.custom_width)?)
        } else {
            None
        };

        let holiday_encoder = if params.holiday_width > 0 {
            for h in &params.holiday_dates {
                if !(1..=12).contains(&h.month) || !(1..=31).contains(&h.day) {
                    return Err(SensorError::InvalidParameter {
                        name: "holiday_dates",
                        message: format!("Invalid holiday date: {h:?}"),
                    });
                }
            }
            // Holiday radius is 1.0 day
            Some(periodic(2.0, params.holiday_width, 1.0)?)
        } else {
            None
        };

        let time_of_day_encoder = (params.time_of_day_width > 0)
            .then(|| periodic(24.0, params.time_of_day_width, params.time_of_day_radius))
            .transpose()?;

        let parser = DateParser::new(params.format_pattern.as_deref())?;

        let mut encoder = Self {
            params,
            season_encoder,
            day_of_week_encoder,
            weekend_encoder,
            custom_days_encoder,
            holiday_encoder,
            time_of_day_encoder,
            custom_days_set,
            parser,
            total_size: 0,
            dimensions: Vec::new(),
        };

        let total_size: UInt = encoder
            .sub_encoders()
            .map(|(_, e)| Encoder::size(e) as UInt)
            .sum();
        if total_size == 0 {
            return Err(SensorError::InvalidParameter {
                name: "params",
                message: "At least one encoder attribute must be enabled".to_string(),
            });
        }
        encoder.total_size = total_size;
        encoder.dimensions = vec![total_size];
        Ok(encoder)
    }

    /// Creates a Date Encoder from a merged field record's date sub-encoders.
    pub fn from_encoding(encoding: &FieldEncoding) -> Result<Self> {
        Self::new(DateEncoderParams::from(&encoding.date))
    }

    /// Returns the parameters.
    pub fn params(&self) -> &DateEncoderParams {
        &self.params
    }

    /// Returns the literal parser.
    pub fn parser(&self) -> &DateParser {
        &self.parser
    }

    /// Enabled sub-encoders with their names, in output order.
    fn sub_encoders(&self) -> impl Iterator<Item = (&'static str, &ScalarEncoder)> {
        [
            ("season", self.season_encoder.as_ref()),
            ("dayOfWeek", self.day_of_week_encoder.as_ref()),
            ("weekend", self.weekend_encoder.as_ref()),
            ("customDays", self.custom_days_encoder.as_ref()),
            ("holiday", self.holiday_encoder.as_ref()),
            ("timeOfDay", self.time_of_day_encoder.as_ref()),
        ]
        .into_iter()
        .filter_map(|(name, e)| e.map(|e| (name, e)))
    }

    /// Checks if a datetime is a weekend.
    ///
    /// Weekend is defined as: Friday evening (after 6pm), Saturday, and Sunday.
    fn is_weekend(dt: &NaiveDateTime) -> bool {
        match dt.weekday() {
            Weekday::Sat | Weekday::Sun => true,
            Weekday::Fri => dt.hour() >= 18,
            _ => false,
        }
    }

    /// Computes the holiday value for a datetime.
    ///
    /// Returns:
    /// - 0.0: Not a holiday
    /// - 0.0-1.0: Day before holiday (ramping up)
    /// - 1.0: On the holiday
    /// - 1.0-2.0: Day after holiday (ramping down)
    fn compute_holiday_value(&self, dt: &NaiveDateTime) -> Real {
        let day = TimeDelta::days(1);
        let day_secs = day.num_seconds() as Real;

        for holiday in self.params.holiday_dates.iter().flat_map(|h| h.dates_near(dt.year())) {
            let start = holiday.and_time(chrono::NaiveTime::MIN);
            let diff = *dt - start;

            if diff >= TimeDelta::zero() {
                if diff < day {
                    return 1.0;
                } else if diff < day * 2 {
                    return 1.0 + (diff - day).num_seconds() as Real / day_secs;
                }
            } else if -diff < day {
                return 1.0 - (-diff).num_seconds() as Real / day_secs;
            }
        }

        0.0
    }

    /// Value fed to each sub-encoder, in output order.
    fn sub_values(&self, dt: &NaiveDateTime) -> [(bool, Real); 6] {
        let time_of_day =
            dt.hour() as Real + dt.minute() as Real / 60.0 + dt.second() as Real / 3600.0;
        let flag = |b: bool| if b { 1.0 } else { 0.0 };
        [
            (self.season_encoder.is_some(), dt.ordinal0() as Real),
            (
                self.day_of_week_encoder.is_some(),
                dt.weekday().num_days_from_monday() as Real,
            ),
            (self.weekend_encoder.is_some(), flag(Self::is_weekend(dt))),
            (
                self.custom_days_encoder.is_some(),
                flag(self.custom_days_set.contains(&dt.weekday())),
            ),
            (
                self.holiday_encoder.is_some(),
                if self.holiday_encoder.is_some() {
                    self.compute_holiday_value(dt)
                } else {
                    0.0
                },
            ),
            (self.time_of_day_encoder.is_some(), time_of_day),
        ]
    }

    /// Encodes a date/time into an SDR.
    pub fn encode_datetime(&self, dt: &NaiveDateTime, output: &mut Sdr) -> Result<()> {
        check_dimensions(&self.dimensions, output)?;

        let values = self
            .sub_values(dt)
            .into_iter()
            .filter(|(enabled, _)| *enabled)
            .map(|(_, v)| v);

        let mut all_bits: Vec<UInt> = Vec::new();
        let mut offset: UInt = 0;
        for ((_, encoder), value) in self.sub_encoders().zip(values) {
            let sdr = encoder.encode_to_sdr(value)?;
            all_bits.extend(sdr.get_sparse().into_iter().map(|bit| bit + offset));
            offset += Encoder::size(encoder) as UInt;
        }

        all_bits.sort_unstable();
        output.set_sparse_unchecked(all_bits);
        Ok(())
    }
}

impl Encoder<NaiveDateTime> for DateEncoder {
    fn dimensions(&self) -> &[UInt] {
        &self.dimensions
    }

    fn size(&self) -> usize {
        self.total_size as usize
    }

    fn encode(&self, value: NaiveDateTime, output: &mut Sdr) -> Result<()> {
        self.encode_datetime(&value, output)
    }
}

/// Convenience implementation for encoding Unix timestamps (seconds, UTC).
impl Encoder<i64> for DateEncoder {
    fn dimensions(&self) -> &[UInt] {
        &self.dimensions
    }

    fn size(&self) -> usize {
        self.total_size as usize
    }

    fn encode(&self, value: i64, output: &mut Sdr) -> Result<()> {
        let dt = chrono::DateTime::from_timestamp(value, 0)
            .ok_or_else(|| SensorError::InvalidInput(format!("timestamp {value} out of range")))?;
        self.encode_datetime(&dt.naive_utc(), output)
    }
}

impl FieldEncoder for DateEncoder {
    fn kind(&self) -> &'static str {
        DATE_KIND
    }

    fn width(&self) -> usize {
        self.total_size as usize
    }

    fn active_bits(&self) -> usize {
        self.sub_encoders()
            .map(|(_, e)| e.active_bits() as usize)
            .sum()
    }

    fn parse(&self, text: &str) -> Result<FieldValue> {
        self.parser.parse(text).map(FieldValue::DateTime)
    }

    fn encode_value(&self, value: &FieldValue, output: &mut Sdr) -> Result<()> {
        match value {
            FieldValue::DateTime(dt) => self.encode_datetime(dt, output),
            other => Err(SensorError::TypeMismatch {
                expected: "datetime",
                actual: other.type_name(),
            }),
        }
    }

    fn decode(&self, encoded: &Sdr) -> Result<DecodedField> {
        check_dimensions(&self.dimensions, encoded)?;

        let mut parts = Vec::new();
        let mut offset: UInt = 0;
        for (name, encoder) in self.sub_encoders() {
            let width = Encoder::size(encoder) as UInt;
            let slice = encoded.slice(offset, width);
            if slice.get_sum() > 0 {
                let decoded = FieldEncoder::decode(encoder, &slice)?;
                parts.push(format!("{name} {}", decoded.description));
            }
            offset += width;
        }

        Ok(DecodedField {
            value: None,
            description: parts.join(", "),
        })
    }
}
