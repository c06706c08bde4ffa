//! Value types shared by every habit record.

use chrono::Duration;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// Sequential habit identifier. Assigned by the ledger, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HabitId(pub u64);

impl fmt::Display for HabitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for HabitId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(HabitId)
            .map_err(|e| ValidationError::InvalidValue {
                field: "habit_id".into(),
                message: e.to_string(),
            })
    }
}

/// Account address: `0x` followed by 40 hex digits, stored lowercase so
/// comparisons are case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    pub const HEX_LEN: usize = 40;

    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        let invalid = |message: &str| ValidationError::InvalidAddress {
            value: value.to_string(),
            message: message.to_string(),
        };

        let trimmed = value.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .ok_or_else(|| invalid("missing 0x prefix"))?;
        if digits.len() != Self::HEX_LEN {
            return Err(invalid("expected 40 hex digits"));
        }
        hex::decode(digits).map_err(|e| invalid(&e.to_string()))?;

        Ok(Self(format!("0x{}", digits.to_ascii_lowercase())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Address {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Address {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.0
    }
}

/// Escrowed value in the smallest indivisible unit.
///
/// Serialized as a decimal string: serde's buffered formats (tagged enums,
/// flatten) cannot carry 128-bit integers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(pub u128);

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct AmountVisitor;

        impl Visitor<'_> for AmountVisitor {
            type Value = Amount;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a non-negative integer or a decimal string")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Amount, E> {
                v.parse().map_err(E::custom)
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Amount, E> {
                Ok(Amount(u128::from(v)))
            }
        }

        deserializer.deserialize_any(AmountVisitor)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Amount {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u128>()
            .map(Amount)
            .map_err(|e| ValidationError::InvalidValue {
                field: "amount".into(),
                message: e.to_string(),
            })
    }
}

/// Length of one period, in whole seconds. Always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct Timeframe(u64);

impl Timeframe {
    pub const DAY: Timeframe = Timeframe(24 * 60 * 60);
    pub const WEEK: Timeframe = Timeframe(7 * 24 * 60 * 60);
    pub const MONTH: Timeframe = Timeframe(30 * 24 * 60 * 60);
    pub const YEAR: Timeframe = Timeframe(365 * 24 * 60 * 60);

    // chrono durations are bounded by i64 milliseconds.
    const MAX_SECS: u64 = (i64::MAX / 1000) as u64;

    pub fn from_secs(secs: u64) -> Result<Self, ValidationError> {
        if secs == 0 {
            return Err(ValidationError::InvalidTimeframe {
                value: secs.to_string(),
                message: "timeframe must be greater than zero".into(),
            });
        }
        if secs > Self::MAX_SECS {
            return Err(ValidationError::InvalidTimeframe {
                value: secs.to_string(),
                message: "timeframe is too large".into(),
            });
        }
        Ok(Self(secs))
    }

    pub fn as_secs(&self) -> u64 {
        self.0
    }

    pub fn as_duration(&self) -> Duration {
        Duration::seconds(self.0 as i64)
    }

    /// Preset name for the well-known lengths, if any.
    pub fn preset_name(&self) -> Option<&'static str> {
        match *self {
            Self::DAY => Some("day"),
            Self::WEEK => Some("week"),
            Self::MONTH => Some("month"),
            Self::YEAR => Some("year"),
            _ => None,
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.preset_name() {
            Some(name) => f.write_str(name),
            None => write!(f, "{}s", self.0),
        }
    }
}

impl FromStr for Timeframe {
    type Err = ValidationError;

    /// Accepts `day`, `week`, `month`, `year`, or a number of seconds.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" | "daily" => Ok(Self::DAY),
            "week" | "weekly" => Ok(Self::WEEK),
            "month" | "monthly" => Ok(Self::MONTH),
            "year" | "yearly" => Ok(Self::YEAR),
            other => {
                let secs = other.trim_end_matches('s').parse::<u64>().map_err(|_| {
                    ValidationError::InvalidTimeframe {
                        value: s.to_string(),
                        message: "expected day, week, month, year or seconds".into(),
                    }
                })?;
                Self::from_secs(secs)
            }
        }
    }
}

impl TryFrom<u64> for Timeframe {
    type Error = ValidationError;

    fn try_from(secs: u64) -> Result<Self, Self::Error> {
        Self::from_secs(secs)
    }
}

impl From<Timeframe> for u64 {
    fn from(timeframe: Timeframe) -> Self {
        timeframe.0
    }
}
