//! Target temperature given on the command line.

use std::fmt;
use std::str::FromStr;
use waittemp_core::SensorError;

/// Temperature every core must reach, in whole degrees Celsius.
///
/// Parsed from a string of ASCII digits only: no sign, no decimal point,
/// no whitespace. Values too large for `u64` saturate, which every
/// reading satisfies.
///
/// # Examples
///
/// ```rust
/// use waittemp_coretemp::TargetTemperature;
///
/// let target: TargetTemperature = "045".parse()?;
/// assert_eq!(target.celsius(), 45);
/// assert!("-5".parse::<TargetTemperature>().is_err());
/// # Ok::<(), waittemp_core::SensorError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TargetTemperature(u64);

impl TargetTemperature {
    #[must_use]
    pub const fn new(celsius: u64) -> Self {
        Self(celsius)
    }

    #[must_use]
    pub const fn celsius(self) -> u64 {
        self.0
    }

    /// Whether a reading in degrees Celsius is at or below the target.
    #[must_use]
    pub fn allows(self, celsius: i64) -> bool {
        u64::try_from(celsius).map_or(true, |celsius| celsius <= self.0)
    }
}

impl FromStr for TargetTemperature {
    type Err = SensorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(SensorError::missing_argument(
                "target temperature must not be empty",
            ));
        }
        if !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(SensorError::invalid_argument(
                "target temperature must contain only the digits 0-9",
                s,
            ));
        }

        // Only overflow can fail past the digit check.
        Ok(Self(s.parse().unwrap_or(u64::MAX)))
    }
}

impl fmt::Display for TargetTemperature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02} °C", self.0)
    }
}
