//! # Ticket Numbers
//!
//! Business-day math and the `YYYYMMDD-NNNN` ticket format.
//!
//! ## How a Ticket Number Is Derived
//! ```text
//!   now (UTC) ──► business_day(now, store offset) ──► 2026-10-19
//!                                                         │
//!                      day_bounds_utc(2026-10-19, offset) │
//!                                                         ▼
//!             [2026-10-19T03:00Z, 2026-10-20T03:00Z)   (offset -03:00)
//!                                                         │
//!              count sales of the tenant in that range ◄──┘  (inside the sale scope)
//!                                                         │
//!                                                         ▼
//!                              format_ticket_number(day, count + 1)
//!                                                         │
//!                                                         ▼
//!                                                 "20261019-0004"
//! ```
//!
//! The counting itself needs the database and lives in tendero-db; everything
//! here is pure.
//!
//! The sequence is zero-padded to four digits. A tenant selling more than
//! 9999 times in one day gets wider numbers (`20261019-10000`). These still
//! parse, but they no longer sort after `20261019-9999` as plain text.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::error::ValidationError;

/// Local calendar day of `instant` for a store at `offset`.
pub fn business_day(instant: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    instant.with_timezone(&offset).date_naive()
}

/// Half-open UTC range `[start, end)` covering the local calendar `day`.
///
/// ## Example
/// ```rust
/// use chrono::{FixedOffset, NaiveDate};
/// use tendero_core::ticket::day_bounds_utc;
///
/// let day = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
/// let offset = FixedOffset::west_opt(3 * 3600).unwrap();
/// let (start, end) = day_bounds_utc(day, offset);
/// assert_eq!(start.to_rfc3339(), "2026-10-19T03:00:00+00:00");
/// assert_eq!(end.to_rfc3339(), "2026-10-20T03:00:00+00:00");
/// ```
pub fn day_bounds_utc(day: NaiveDate, offset: FixedOffset) -> (DateTime<Utc>, DateTime<Utc>) {
    let local_midnight = day.and_time(NaiveTime::MIN);
    let utc_midnight = local_midnight - Duration::seconds(i64::from(offset.local_minus_utc()));
    let start = Utc.from_utc_datetime(&utc_midnight);
    (start, start + Duration::days(1))
}

/// Formats a ticket number for `day` and 1-based `sequence`.
///
/// ## Example
/// ```rust
/// use chrono::NaiveDate;
/// use tendero_core::ticket::format_ticket_number;
///
/// let day = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
/// assert_eq!(format_ticket_number(day, 1), "20260105-0001");
/// assert_eq!(format_ticket_number(day, 42), "20260105-0042");
/// ```
pub fn format_ticket_number(day: NaiveDate, sequence: i64) -> String {
    format!("{}-{:04}", day.format("%Y%m%d"), sequence)
}

/// Splits a ticket number into its day and sequence.
pub fn parse_ticket_number(ticket: &str) -> Result<(NaiveDate, i64), ValidationError> {
    let invalid = || ValidationError::InvalidFormat {
        field: "ticket_number".to_string(),
        reason: "expected YYYYMMDD-NNNN".to_string(),
    };

    let (date_part, seq_part) = ticket.split_once('-').ok_or_else(invalid)?;
    if date_part.len() != 8 || seq_part.len() < 4 || !seq_part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let day = NaiveDate::parse_from_str(date_part, "%Y%m%d").map_err(|_| invalid())?;
    let sequence: i64 = seq_part.parse().map_err(|_| invalid())?;
    if sequence < 1 {
        return Err(invalid());
    }

    Ok((day, sequence))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_business_day_respects_offset() {
        let offset = FixedOffset::west_opt(3 * 3600).unwrap();
        // 01:30 UTC is still the previous evening in UTC-3.
        assert_eq!(
            business_day(utc("2026-10-20T01:30:00Z"), offset),
            NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
        );
        assert_eq!(
            business_day(utc("2026-10-20T03:00:00Z"), offset),
            NaiveDate::from_ymd_opt(2026, 10, 20).unwrap()
        );
    }

    #[test]
    fn test_day_bounds_utc_zero_offset() {
        let day = NaiveDate::from_ymd_opt(2026, 12, 31).unwrap();
        let (start, end) = day_bounds_utc(day, FixedOffset::east_opt(0).unwrap());
        assert_eq!(start, utc("2026-12-31T00:00:00Z"));
        assert_eq!(end, utc("2027-01-01T00:00:00Z"));
    }

    #[test]
    fn test_day_bounds_contain_business_day_instants() {
        let offset = FixedOffset::east_opt(5 * 3600 + 1800).unwrap();
        let now = utc("2026-10-19T20:00:00Z");
        let (start, end) = day_bounds_utc(business_day(now, offset), offset);
        assert!(start <= now && now < end);
        assert_eq!(end - start, Duration::days(1));
    }

    #[test]
    fn test_format_and_parse() {
        let day = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        assert_eq!(format_ticket_number(day, 7), "20261019-0007");
        assert_eq!(format_ticket_number(day, 10000), "20261019-10000");

        assert_eq!(parse_ticket_number("20261019-0007").unwrap(), (day, 7));
        assert_eq!(parse_ticket_number("20261019-10000").unwrap(), (day, 10000));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(parse_ticket_number("").is_err());
        assert!(parse_ticket_number("20261019").is_err());
        assert!(parse_ticket_number("20261019-07").is_err());
        assert!(parse_ticket_number("20261319-0001").is_err());
        assert!(parse_ticket_number("20261019-0000").is_err());
        assert!(parse_ticket_number("20261019-00a1").is_err());
    }
}
