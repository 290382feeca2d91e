//! Account expiration dates.
//!
//! Expiration dates are plain calendar dates with no time-of-day component.
//! The only accepted text form is `YYYY-MM-DD`; each component is parsed as an
//! integer on its own and the combination must exist on the calendar.

use core::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing an [`ExpirationDate`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DateError {
    /// The input is not made of exactly three `-`-separated parts.
    #[error("expected a date formatted as YYYY-MM-DD, got '{0}'")]
    Format(String),
    /// One of the components is not an integer.
    #[error("the {component} in '{input}' is not a number")]
    NotANumber {
        /// Which component failed (`year`, `month` or `day`).
        component: &'static str,
        /// The full input.
        input: String,
    },
    /// The components do not form a real calendar date.
    #[error("'{0}' is not a valid calendar date")]
    OutOfRange(String),
}

/// The last day an account may be used.
///
/// ## Examples
///
/// ```
/// use espf_core::ExpirationDate;
///
/// assert!(ExpirationDate::parse("2030-12-31").is_ok());
///
/// assert!(ExpirationDate::parse("2030/12/31").is_err()); // wrong separator
/// assert!(ExpirationDate::parse("2023-02-29").is_err()); // not a leap year
/// assert!(ExpirationDate::parse("2030-13-01").is_err()); // no 13th month
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExpirationDate(NaiveDate);

impl ExpirationDate {
    /// Earliest accepted year.
    pub const MIN_YEAR: i32 = 1;
    /// Latest accepted year.
    pub const MAX_YEAR: i32 = 9999;

    /// Parse a `YYYY-MM-DD` date.
    ///
    /// # Errors
    ///
    /// Returns [`DateError::Format`] if the input does not have three parts,
    /// [`DateError::NotANumber`] if a part is not an integer, and
    /// [`DateError::OutOfRange`] if the date does not exist.
    pub fn parse(s: &str) -> Result<Self, DateError> {
        let mut parts = s.split('-');
        let (Some(year), Some(month), Some(day), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(DateError::Format(s.to_owned()));
        };

        let year: i32 = parse_component(year, "year", s)?;
        let month: u32 = parse_component(month, "month", s)?;
        let day: u32 = parse_component(day, "day", s)?;

        if !(Self::MIN_YEAR..=Self::MAX_YEAR).contains(&year) {
            return Err(DateError::OutOfRange(s.to_owned()));
        }

        NaiveDate::from_ymd_opt(year, month, day)
            .map(Self)
            .ok_or_else(|| DateError::OutOfRange(s.to_owned()))
    }

    /// Wrap an already validated calendar date.
    #[must_use]
    pub const fn from_naive(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Get the underlying calendar date.
    #[must_use]
    pub const fn as_naive(&self) -> NaiveDate {
        self.0
    }
}

fn parse_component<T: std::str::FromStr>(
    part: &str,
    component: &'static str,
    input: &str,
) -> Result<T, DateError> {
    part.parse().map_err(|_| DateError::NotANumber {
        component,
        input: input.to_owned(),
    })
}

impl fmt::Display for ExpirationDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl std::str::FromStr for ExpirationDate {
    type Err = DateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<NaiveDate> for ExpirationDate {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

impl From<ExpirationDate> for NaiveDate {
    fn from(date: ExpirationDate) -> Self {
        date.0
    }
}

#[cfg(feature = "postgres")]
impl ::sqlx::Type<::sqlx::Postgres> for ExpirationDate {
    fn type_info() -> ::sqlx::postgres::PgTypeInfo {
        <NaiveDate as ::sqlx::Type<::sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &::sqlx::postgres::PgTypeInfo) -> bool {
        <NaiveDate as ::sqlx::Type<::sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> ::sqlx::Decode<'r, ::sqlx::Postgres> for ExpirationDate {
    fn decode(
        value: ::sqlx::postgres::PgValueRef<'r>,
    ) -> Result<Self, ::sqlx::error::BoxDynError> {
        let date = <NaiveDate as ::sqlx::Decode<::sqlx::Postgres>>::decode(value)?;
        Ok(Self(date))
    }
}

#[cfg(feature = "postgres")]
impl ::sqlx::Encode<'_, ::sqlx::Postgres> for ExpirationDate {
    fn encode_by_ref(
        &self,
        buf: &mut ::sqlx::postgres::PgArgumentBuffer,
    ) -> Result<::sqlx::encode::IsNull, ::sqlx::error::BoxDynError> {
        <NaiveDate as ::sqlx::Encode<::sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}
