//! Epoch handling: revocation epochs are calendar days, written as
//! `YYYY-MM-DD` labels off-chain and as days-since-1970 on chain.

use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

pub const MIN_YEAR: i32 = 1970;
pub const MAX_YEAR: i32 = 2100;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("epoch label {0:?} is neither an ISO date nor a non-negative day count")]
    Unparseable(String),

    #[error("epoch year {year} is outside the supported range [{MIN_YEAR}, {MAX_YEAR}]")]
    YearOutOfRange { year: i32 },

    #[error("epoch day count {days} lies beyond the year-{MAX_YEAR} horizon")]
    DayCountOutOfRange { days: u64 },
}

/// Days since `1970-01-01`, the on-chain epoch representation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct EpochDays(pub u64);

impl fmt::Display for EpochDays {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn unix_epoch() -> NaiveDate {
    // Constant known-good date; failure here means a broken calendar impl.
    NaiveDate::from_ymd_opt(1970, 1, 1).expect("1970-01-01 is a valid date")
}

fn days_since_epoch(date: NaiveDate) -> u64 {
    date.signed_duration_since(unix_epoch()).num_days() as u64
}

/// Largest representable epoch: the last day of [`MAX_YEAR`].
pub fn max_epoch_days() -> EpochDays {
    let horizon = NaiveDate::from_ymd_opt(MAX_YEAR, 12, 31).expect("horizon is a valid date");
    EpochDays(days_since_epoch(horizon))
}

/// Parses an epoch label: an ISO `YYYY-MM-DD` date within
/// `[MIN_YEAR, MAX_YEAR]`, or a bare non-negative day count within the same
/// horizon. Anything else is rejected; no normalisation is applied.
pub fn parse_epoch_label(label: &str) -> Result<EpochDays, Error> {
    if let Ok(date) = NaiveDate::parse_from_str(label, "%Y-%m-%d") {
        let year = date.year();
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err(Error::YearOutOfRange { year });
        }
        return Ok(EpochDays(days_since_epoch(date)));
    }

    let days: u64 = label
        .parse()
        .map_err(|_| Error::Unparseable(label.to_string()))?;
    if days > max_epoch_days().0 {
        return Err(Error::DayCountOutOfRange { days });
    }
    Ok(EpochDays(days))
}
