use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::str::FromStr;

/// A percentage with two fixed fractional digits, stored as hundredths.
///
/// Mirrors the `DECIMAL(5,2)` columns used for milestone weights and project
/// progress. Sums are exact, so weighted progress never needs rounding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Percent(u32);

impl Percent {
    pub const ZERO: Percent = Percent(0);
    pub const HUNDRED: Percent = Percent(10_000);

    pub const fn from_hundredths(hundredths: u32) -> Self {
        Percent(hundredths)
    }

    pub const fn whole(percent: u32) -> Self {
        Percent(percent.saturating_mul(100))
    }

    pub fn hundredths(&self) -> u32 {
        self.0
    }

    pub fn as_f64(&self) -> f64 {
        f64::from(self.0) / 100.0
    }

    pub fn saturating_add(self, other: Percent) -> Percent {
        Percent(self.0.saturating_add(other.0))
    }

    pub fn saturating_sub(self, other: Percent) -> Percent {
        Percent(self.0.saturating_sub(other.0))
    }

    /// Clamp into `[0, 100]`. The lower bound holds by construction.
    pub fn clamped(self) -> Percent {
        self.min(Percent::HUNDRED)
    }

    pub fn is_valid_weight(&self) -> bool {
        *self <= Percent::HUNDRED
    }

    /// Convert from a floating point value, rounding to the nearest hundredth.
    pub fn from_f64(value: f64) -> Result<Percent, String> {
        if !value.is_finite() {
            return Err(format!("{value} is not a finite percentage"));
        }
        if value < 0.0 {
            return Err(format!("{value} is negative"));
        }
        let hundredths = (value * 100.0).round();
        if hundredths > f64::from(u32::MAX) {
            return Err(format!("{value} is out of range"));
        }
        Ok(Percent(hundredths as u32))
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl FromStr for Percent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().trim_end_matches('%');
        let (whole, fraction) = s.split_once('.').unwrap_or((s, ""));
        let digits_only = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if whole.is_empty() || fraction.len() > 2 || !digits_only(whole) || !digits_only(fraction) {
            return Err(format!("'{s}' is not a percentage with at most two decimals"));
        }
        let whole: u32 = whole
            .parse()
            .map_err(|_| format!("'{s}' is not a valid percentage"))?;
        let fraction: u32 = if fraction.is_empty() {
            0
        } else {
            let digits: u32 = fraction
                .parse()
                .map_err(|_| format!("'{s}' is not a valid percentage"))?;
            if fraction.len() == 1 {
                digits * 10
            } else {
                digits
            }
        };
        whole
            .checked_mul(100)
            .and_then(|w| w.checked_add(fraction))
            .map(Percent)
            .ok_or_else(|| format!("'{s}' is out of range"))
    }
}

impl Sum for Percent {
    fn sum<I: Iterator<Item = Percent>>(iter: I) -> Self {
        iter.fold(Percent::ZERO, Percent::saturating_add)
    }
}

impl<'a> Sum<&'a Percent> for Percent {
    fn sum<I: Iterator<Item = &'a Percent>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl Serialize for Percent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}

impl<'de> Deserialize<'de> for Percent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Percent::from_f64(value).map_err(serde::de::Error::custom)
    }
}
