//! Logical simulation time.

use std::fmt::Display;
use std::str::FromStr;

use crate::BusError;

const NS_PER_SEC: i64 = 1_000_000_000;

/// Logical time as integer nanoseconds, so repeated step addition stays exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Time(i64);

impl Time {
    pub const ZERO: Time = Time(0);
    /// Smallest representable positive time
    pub const EPSILON: Time = Time(1);
    /// Sentinel granted after the bus terminated so step loops drain
    pub const MAX: Time = Time(i64::MAX);

    pub fn from_secs_f64(secs: f64) -> Self {
        if secs >= i64::MAX as f64 / NS_PER_SEC as f64 {
            return Time::MAX;
        }
        Time((secs * NS_PER_SEC as f64).round() as i64)
    }

    pub fn from_nanos(nanos: i64) -> Self {
        Time(nanos)
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.0 as f64 / NS_PER_SEC as f64
    }

    pub fn as_nanos(&self) -> i64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl std::ops::Add for Time {
    type Output = Time;

    fn add(self, rhs: Time) -> Time {
        Time(self.0.saturating_add(rhs.0))
    }
}

impl std::ops::Sub for Time {
    type Output = Time;

    fn sub(self, rhs: Time) -> Time {
        Time(self.0.saturating_sub(rhs.0))
    }
}

impl std::ops::AddAssign for Time {
    fn add_assign(&mut self, rhs: Time) {
        *self = *self + rhs;
    }
}

impl From<f64> for Time {
    fn from(secs: f64) -> Self {
        Time::from_secs_f64(secs)
    }
}

impl Display for Time {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_secs_f64())
    }
}

impl FromStr for Time {
    type Err = BusError;

    /// Parse a time value with an optional unit suffix: `ns`, `us`, `ms`, `s`, `sec`, `min`.
    /// A bare number is seconds.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let split = s
            .char_indices()
            .find(|(_, c)| c.is_ascii_alphabetic())
            .map(|(i, _)| i)
            .unwrap_or(s.len());
        let (value, unit) = s.split_at(split);
        let value: f64 = value
            .trim()
            .parse()
            .map_err(|_| BusError::InvalidTime(s.to_owned()))?;
        let scale = match unit.trim() {
            "" | "s" | "sec" | "seconds" => 1.0,
            "ms" => 1e-3,
            "us" => 1e-6,
            "ns" => 1e-9,
            "min" | "minutes" => 60.0,
            _ => return Err(BusError::InvalidTime(s.to_owned())),
        };
        Ok(Time::from_secs_f64(value * scale))
    }
}

/// Time-valued bus properties a federate carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeProperty {
    /// Minimum spacing of time grants; the driver writes its effective step here
    Period,
    /// Time at which the federation stops granting
    StopTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_arithmetic() {
        let step = Time::from_secs_f64(0.1);
        let mut t = Time::ZERO;
        for _ in 0..10 {
            t += step;
        }
        assert_eq!(t, Time::from_secs_f64(1.0));
        assert!(Time::MAX > Time::from_secs_f64(1e12));
    }

    #[test]
    fn test_time_parsing() {
        assert_eq!("10s".parse::<Time>().unwrap(), Time::from_secs_f64(10.0));
        assert_eq!("0.5".parse::<Time>().unwrap(), Time::from_secs_f64(0.5));
        assert_eq!("250ms".parse::<Time>().unwrap(), Time::from_secs_f64(0.25));
        assert_eq!("2min".parse::<Time>().unwrap(), Time::from_secs_f64(120.0));
        assert_eq!("5us".parse::<Time>().unwrap(), Time::from_nanos(5_000));
        assert!("abc".parse::<Time>().is_err());
        assert!("10fortnights".parse::<Time>().is_err());
    }
}
