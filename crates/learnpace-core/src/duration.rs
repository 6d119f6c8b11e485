//! Exact watch-time arithmetic.
//!
//! [`WatchTime`] is a non-negative span stored as whole microseconds. Sums
//! and integer multiples are exact; division by a day count rounds half to
//! even at the microsecond, which is the only place precision is lost.
//!
//! Durations arrive from the video platform as ISO-8601 strings
//! (`PT1H2M3S`), so the type parses and prints that format and uses it as
//! its serialized form.

use std::fmt;
use std::iter::Sum;
use std::num::NonZeroU32;
use std::ops::{Add, AddAssign, Mul};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ValidationError;

const MICROS_PER_SEC: u64 = 1_000_000;
const SECS_PER_MINUTE: u64 = 60;
const SECS_PER_HOUR: u64 = 3_600;
const SECS_PER_DAY: u64 = 86_400;

/// A non-negative span of watch time with microsecond resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WatchTime {
    micros: u64,
}

impl WatchTime {
    pub const ZERO: WatchTime = WatchTime { micros: 0 };

    pub const fn from_micros(micros: u64) -> Self {
        Self { micros }
    }

    pub const fn from_secs(secs: u64) -> Self {
        Self {
            micros: secs * MICROS_PER_SEC,
        }
    }

    pub const fn from_minutes(minutes: u64) -> Self {
        Self::from_secs(minutes * SECS_PER_MINUTE)
    }

    pub const fn from_hours(hours: u64) -> Self {
        Self::from_secs(hours * SECS_PER_HOUR)
    }

    pub const fn as_micros(self) -> u64 {
        self.micros
    }

    /// Whole seconds, dropping any sub-second remainder.
    pub const fn whole_secs(self) -> u64 {
        self.micros / MICROS_PER_SEC
    }

    /// Seconds as a float, for percentage math only.
    pub fn as_secs_f64(self) -> f64 {
        self.micros as f64 / MICROS_PER_SEC as f64
    }

    pub const fn is_zero(self) -> bool {
        self.micros == 0
    }

    pub fn checked_add(self, other: WatchTime) -> Option<WatchTime> {
        self.micros.checked_add(other.micros).map(Self::from_micros)
    }

    pub fn saturating_sub(self, other: WatchTime) -> WatchTime {
        Self::from_micros(self.micros.saturating_sub(other.micros))
    }

    /// Average per unit: `self / divisor`, rounded half to even.
    pub fn div_round(self, divisor: NonZeroU32) -> WatchTime {
        let d = u64::from(divisor.get());
        let q = self.micros / d;
        let r = self.micros % d;
        let twice = r * 2;
        let rounded = if twice > d || (twice == d && q % 2 == 1) {
            q + 1
        } else {
            q
        };
        Self::from_micros(rounded)
    }

    /// Scale by a non-negative real factor, rounded half to even.
    ///
    /// # Errors
    /// Returns an error if `factor` is negative, NaN or infinite.
    pub fn mul_f64(self, factor: f64) -> Result<WatchTime, ValidationError> {
        if !factor.is_finite() || factor < 0.0 {
            return Err(ValidationError::invalid_value(
                "factor",
                format!("expected a finite non-negative number, got {factor}"),
            ));
        }
        let scaled = (self.micros as f64 * factor).round_ties_even();
        if scaled > u64::MAX as f64 {
            return Err(ValidationError::invalid_value("factor", "result overflows"));
        }
        Ok(Self::from_micros(scaled as u64))
    }

    /// Convert a signed chrono span, rejecting negatives.
    ///
    /// # Errors
    /// Returns an error if `delta` is negative or exceeds the representable range.
    pub fn try_from_chrono(delta: chrono::TimeDelta) -> Result<WatchTime, ValidationError> {
        let micros = delta.num_microseconds().ok_or_else(|| ValidationError::InvalidDuration {
            input: delta.to_string(),
            message: "out of range".into(),
        })?;
        u64::try_from(micros)
            .map(Self::from_micros)
            .map_err(|_| ValidationError::InvalidDuration {
                input: delta.to_string(),
                message: "duration must not be negative".into(),
            })
    }

    pub fn to_chrono(self) -> chrono::TimeDelta {
        chrono::TimeDelta::microseconds(i64::try_from(self.micros).unwrap_or(i64::MAX))
    }

    /// Short human form, `"{h}h {m}m"`.
    pub fn human(self) -> String {
        let secs = self.whole_secs();
        format!("{}h {}m", secs / SECS_PER_HOUR, (secs % SECS_PER_HOUR) / SECS_PER_MINUTE)
    }

    /// Parse an ISO-8601 duration such as `PT1H2M3S`, `P1DT30M` or `PT4.5S`.
    ///
    /// Year and month designators are rejected because they have no fixed length.
    ///
    /// # Errors
    /// Returns [`ValidationError::InvalidDuration`] for malformed input.
    pub fn parse_iso8601(input: &str) -> Result<WatchTime, ValidationError> {
        let invalid = |message: &str| ValidationError::InvalidDuration {
            input: input.to_string(),
            message: message.to_string(),
        };

        let rest = input
            .trim()
            .strip_prefix('P')
            .ok_or_else(|| invalid("must start with 'P'"))?;
        if rest.is_empty() {
            return Err(invalid("no components"));
        }

        let (date_part, time_part) = match rest.split_once('T') {
            Some((_, "")) => return Err(invalid("empty time section after 'T'")),
            Some((date, time)) => (date, time),
            None => (rest, ""),
        };

        let mut micros: u64 = 0;
        let mut add = |value: u64| -> Result<(), ValidationError> {
            micros = micros
                .checked_add(value)
                .ok_or_else(|| invalid("duration overflows"))?;
            Ok(())
        };

        let mut last_rank = 0;
        for (number, unit) in components(date_part).map_err(|m| invalid(m))? {
            let (rank, unit_secs) = match unit {
                'W' => (1, 7 * SECS_PER_DAY),
                'D' => (2, SECS_PER_DAY),
                'Y' | 'M' => return Err(invalid("years and months are not supported")),
                _ => return Err(invalid("unknown date designator")),
            };
            if rank <= last_rank {
                return Err(invalid("designators out of order"));
            }
            last_rank = rank;
            let n: u64 = number.parse().map_err(|_| invalid("bad number"))?;
            add(n
                .checked_mul(unit_secs * MICROS_PER_SEC)
                .ok_or_else(|| invalid("duration overflows"))?)?;
        }

        for (number, unit) in components(time_part).map_err(|m| invalid(m))? {
            let (rank, unit_secs) = match unit {
                'H' => (3, SECS_PER_HOUR),
                'M' => (4, SECS_PER_MINUTE),
                'S' => (5, 1),
                _ => return Err(invalid("unknown time designator")),
            };
            if rank <= last_rank {
                return Err(invalid("designators out of order"));
            }
            last_rank = rank;
            if unit == 'S' {
                add(parse_seconds(number).ok_or_else(|| invalid("bad seconds value"))?)?;
            } else {
                let n: u64 = number.parse().map_err(|_| invalid("bad number"))?;
                add(n
                    .checked_mul(unit_secs * MICROS_PER_SEC)
                    .ok_or_else(|| invalid("duration overflows"))?)?;
            }
        }

        Ok(Self::from_micros(micros))
    }

    /// Estimate a playlist total from a sample of its videos: the sample
    /// average times the full count. Returns `None` for an empty sample.
    pub fn estimate_total(sample: &[WatchTime], total_count: u32) -> Option<WatchTime> {
        let len = u32::try_from(sample.len()).ok().and_then(NonZeroU32::new)?;
        let avg = sample.iter().sum::<WatchTime>().div_round(len);
        Some(avg * total_count)
    }
}

/// Split `"1H30M"` into `[("1", 'H'), ("30", 'M')]`.
fn components(part: &str) -> Result<Vec<(&str, char)>, &'static str> {
    let mut out = Vec::new();
    let mut start = 0;
    for (i, c) in part.char_indices() {
        if c.is_ascii_alphabetic() {
            if i == start {
                return Err("designator without a number");
            }
            out.push((&part[start..i], c));
            start = i + c.len_utf8();
        }
    }
    if start != part.len() {
        return Err("number without a designator");
    }
    Ok(out)
}

/// Seconds with an optional fraction; digits past microseconds are dropped.
fn parse_seconds(number: &str) -> Option<u64> {
    let (whole, frac) = match number.split_once('.') {
        Some((w, f)) => (w, f),
        None => (number, ""),
    };
    if whole.is_empty() || !frac.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let whole: u64 = whole.parse().ok()?;
    let mut frac_micros: u64 = 0;
    for (i, c) in frac.chars().take(6).enumerate() {
        frac_micros += u64::from(c.to_digit(10)?) * 10u64.pow(5 - i as u32);
    }
    whole.checked_mul(MICROS_PER_SEC)?.checked_add(frac_micros)
}

impl Add for WatchTime {
    type Output = WatchTime;

    fn add(self, rhs: WatchTime) -> WatchTime {
        Self::from_micros(self.micros.saturating_add(rhs.micros))
    }
}

impl AddAssign for WatchTime {
    fn add_assign(&mut self, rhs: WatchTime) {
        *self = *self + rhs;
    }
}

impl Mul<u32> for WatchTime {
    type Output = WatchTime;

    fn mul(self, rhs: u32) -> WatchTime {
        Self::from_micros(self.micros.saturating_mul(u64::from(rhs)))
    }
}

impl Sum for WatchTime {
    fn sum<I: Iterator<Item = WatchTime>>(iter: I) -> WatchTime {
        iter.fold(WatchTime::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a WatchTime> for WatchTime {
    fn sum<I: Iterator<Item = &'a WatchTime>>(iter: I) -> WatchTime {
        iter.copied().sum()
    }
}

impl fmt::Display for WatchTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.whole_secs();
        let sub = self.micros % MICROS_PER_SEC;
        let (h, m, s) = (
            secs / SECS_PER_HOUR,
            (secs % SECS_PER_HOUR) / SECS_PER_MINUTE,
            secs % SECS_PER_MINUTE,
        );

        f.write_str("PT")?;
        if h > 0 {
            write!(f, "{h}H")?;
        }
        if m > 0 {
            write!(f, "{m}M")?;
        }
        if sub > 0 {
            let frac = format!("{sub:06}");
            write!(f, "{s}.{}S", frac.trim_end_matches('0'))?;
        } else if s > 0 || (h == 0 && m == 0) {
            write!(f, "{s}S")?;
        }
        Ok(())
    }
}

impl FromStr for WatchTime {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_iso8601(s)
    }
}

impl Serialize for WatchTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for WatchTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
