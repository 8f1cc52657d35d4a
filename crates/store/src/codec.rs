//! Column encodings shared by the row types
//!
//! Money is stored as TEXT (exact decimal string) and timestamps as
//! fixed-width RFC 3339 TEXT so lexical order equals time order.

use crate::error::{StoreError, StoreResult};
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;
use taskpay_core::Amount;

/// Current time at the precision the store keeps
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

pub fn fmt_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_ts(value: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|_| StoreError::InvalidTimestamp(value.to_string()))
}

pub fn parse_opt_ts(value: Option<&str>) -> StoreResult<Option<DateTime<Utc>>> {
    value.map(parse_ts).transpose()
}

pub fn parse_decimal(value: &str) -> StoreResult<Decimal> {
    Decimal::from_str(value).map_err(|_| StoreError::InvalidDecimal(value.to_string()))
}

pub fn parse_amount(value: &str) -> StoreResult<Amount> {
    Amount::new(parse_decimal(value)?).map_err(|e| StoreError::InvalidDecimal(e.to_string()))
}

pub fn parse_enum<T: FromStr>(field: &str, value: &str) -> StoreResult<T> {
    T::from_str(value).map_err(|_| StoreError::invalid_enum(field, value))
}
