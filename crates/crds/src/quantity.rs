//! Resource quantities
//!
//! Kubernetes-style quantity strings ("4", "500m", "16Gi", "1.5T", "2e3")
//! held as an exact count of nano-units so that sums and comparisons never
//! lose precision. Equality and ordering compare values only; the suffix
//! family (decimal or binary) is kept for display.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::iter::Sum;
use std::ops::Add;
use std::str::FromStr;
use thiserror::Error;

const NANOS_PER_UNIT: i128 = 1_000_000_000;

const DECIMAL_SUFFIXES: [(&str, u32); 6] = [
    ("E", 18),
    ("P", 15),
    ("T", 12),
    ("G", 9),
    ("M", 6),
    ("k", 3),
];

const BINARY_SUFFIXES: [(&str, u32); 6] = [
    ("Ei", 6),
    ("Pi", 5),
    ("Ti", 4),
    ("Gi", 3),
    ("Mi", 2),
    ("Ki", 1),
];

/// Error returned when a quantity string cannot be parsed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QuantityError {
    /// Input was empty or only whitespace
    #[error("quantity is empty")]
    Empty,

    /// Numeric part is missing or malformed
    #[error("invalid quantity number in {0:?}")]
    InvalidNumber(String),

    /// Unknown unit suffix
    #[error("unknown quantity suffix {suffix:?} in {input:?}")]
    InvalidSuffix {
        /// The full input
        input: String,
        /// The suffix that was not recognised
        suffix: String,
    },

    /// Value does not fit the internal representation
    #[error("quantity {0:?} is out of range")]
    Overflow(String),
}

/// Which suffix family a quantity is rendered with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QuantityFormat {
    /// Powers of 1000 (`k`, `M`, `G`, ...) and milli/micro/nano units
    #[default]
    DecimalSI,
    /// Powers of 1024 (`Ki`, `Mi`, `Gi`, ...)
    BinarySI,
}

/// An exact, arbitrary-suffix resource quantity.
#[derive(Debug, Clone, Copy, Default)]
pub struct Quantity {
    nanos: i128,
    format: QuantityFormat,
}

impl Quantity {
    /// Quantity holding a whole number of units, e.g. a node count.
    pub fn from_count(count: u64) -> Self {
        Self {
            nanos: i128::from(count) * NANOS_PER_UNIT,
            format: QuantityFormat::DecimalSI,
        }
    }

    /// Value in nano-units.
    pub fn as_nanos(&self) -> i128 {
        self.nanos
    }

    /// Suffix family used when rendering.
    pub fn format(&self) -> QuantityFormat {
        self.format
    }

    /// True if the value is exactly zero.
    pub fn is_zero(&self) -> bool {
        self.nanos == 0
    }
}

impl PartialEq for Quantity {
    fn eq(&self, other: &Self) -> bool {
        self.nanos == other.nanos
    }
}

impl Eq for Quantity {}

impl Hash for Quantity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.nanos.hash(state);
    }
}

impl PartialOrd for Quantity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Quantity {
    fn cmp(&self, other: &Self) -> Ordering {
        self.nanos.cmp(&other.nanos)
    }
}

impl Add for Quantity {
    type Output = Quantity;

    /// Saturating add. Mixed suffix families render as decimal, so the result
    /// does not depend on operand order.
    fn add(self, rhs: Self) -> Self::Output {
        let format = if self.format == rhs.format {
            self.format
        } else {
            QuantityFormat::DecimalSI
        };
        Quantity {
            nanos: self.nanos.saturating_add(rhs.nanos),
            format,
        }
    }
}

impl Sum for Quantity {
    fn sum<I: Iterator<Item = Quantity>>(iter: I) -> Self {
        iter.reduce(Add::add).unwrap_or_default()
    }
}

impl<'a> Sum<&'a Quantity> for Quantity {
    fn sum<I: Iterator<Item = &'a Quantity>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl FromStr for Quantity {
    type Err = QuantityError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(QuantityError::Empty);
        }

        let (negative, unsigned) = match trimmed.as_bytes()[0] {
            b'-' => (true, &trimmed[1..]),
            b'+' => (false, &trimmed[1..]),
            _ => (false, trimmed),
        };

        let number_end = unsigned
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(unsigned.len());
        let (number, suffix) = unsigned.split_at(number_end);

        let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
        if (whole.is_empty() && fraction.is_empty()) || fraction.contains('.') {
            return Err(QuantityError::InvalidNumber(input.to_string()));
        }

        let digits = format!("{whole}{fraction}");
        let digits = digits.trim_start_matches('0');
        let overflow = || QuantityError::Overflow(input.to_string());
        let mantissa: i128 = if digits.is_empty() {
            0
        } else {
            digits.parse().map_err(|_| overflow())?
        };

        let fraction_len = i32::try_from(fraction.len()).map_err(|_| overflow())?;
        let (format, binary_power, decimal_exponent) = parse_suffix(input, suffix)?;
        let exponent = decimal_exponent
            .checked_sub(fraction_len)
            .and_then(|e| e.checked_add(9))
            .ok_or_else(overflow)?;

        let mut nanos = mantissa
            .checked_mul(1024_i128.pow(binary_power))
            .ok_or_else(overflow)?;
        if exponent >= 0 {
            let scale = 10_i128
                .checked_pow(exponent.unsigned_abs())
                .ok_or_else(overflow)?;
            nanos = nanos.checked_mul(scale).ok_or_else(overflow)?;
        } else {
            // Precision below one nano-unit is dropped.
            nanos = 10_i128
                .checked_pow(exponent.unsigned_abs())
                .map_or(0, |scale| nanos / scale);
        }

        Ok(Quantity {
            nanos: if negative { -nanos } else { nanos },
            format,
        })
    }
}

/// Returns (format, power of 1024, power of 10) for a suffix.
fn parse_suffix(input: &str, suffix: &str) -> Result<(QuantityFormat, u32, i32), QuantityError> {
    let decimal = |exponent: i32| Ok((QuantityFormat::DecimalSI, 0, exponent));
    match suffix {
        "" => decimal(0),
        "n" => decimal(-9),
        "u" => decimal(-6),
        "m" => decimal(-3),
        "k" => decimal(3),
        "M" => decimal(6),
        "G" => decimal(9),
        "T" => decimal(12),
        "P" => decimal(15),
        "E" => decimal(18),
        _ => {
            if let Some((_, power)) = BINARY_SUFFIXES.iter().find(|(s, _)| *s == suffix) {
                return Ok((QuantityFormat::BinarySI, *power, 0));
            }
            let invalid = || QuantityError::InvalidSuffix {
                input: input.to_string(),
                suffix: suffix.to_string(),
            };
            let exponent = suffix
                .strip_prefix('e')
                .or_else(|| suffix.strip_prefix('E'))
                .ok_or_else(invalid)?;
            exponent.parse::<i32>().map_or_else(|_| Err(invalid()), decimal)
        }
    }
}

impl fmt::Display for Quantity {
    /// Canonical form: the largest suffix that represents the value exactly.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nanos == 0 {
            return f.write_str("0");
        }
        if self.nanos < 0 {
            f.write_str("-")?;
        }
        let abs = self.nanos.unsigned_abs();
        let per_unit = NANOS_PER_UNIT.unsigned_abs();

        if abs % per_unit != 0 {
            return if abs % 1_000_000 == 0 {
                write!(f, "{}m", abs / 1_000_000)
            } else if abs % 1_000 == 0 {
                write!(f, "{}u", abs / 1_000)
            } else {
                write!(f, "{abs}n")
            };
        }

        let units = abs / per_unit;
        if self.format == QuantityFormat::BinarySI {
            for (suffix, power) in BINARY_SUFFIXES {
                let scale = 1024_u128.pow(power);
                if units % scale == 0 {
                    return write!(f, "{}{suffix}", units / scale);
                }
            }
        }
        for (suffix, exponent) in DECIMAL_SUFFIXES {
            let scale = 10_u128.pow(exponent);
            if units % scale == 0 {
                return write!(f, "{}{suffix}", units / scale);
            }
        }
        write!(f, "{units}")
    }
}

impl Serialize for Quantity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct QuantityVisitor;

        impl Visitor<'_> for QuantityVisitor {
            type Value = Quantity;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a quantity string or number")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Quantity, E> {
                v.parse().map_err(E::custom)
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Quantity, E> {
                Ok(Quantity::from_count(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Quantity, E> {
                v.to_string().parse().map_err(E::custom)
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Quantity, E> {
                v.to_string().parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(QuantityVisitor)
    }
}
