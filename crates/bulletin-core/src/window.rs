//! Calendar dates and day windows.
//!
//! Day boundaries are always computed in an explicit fixed UTC offset
//! (the digest timezone), never the host's local time.

use anyhow::Result;
use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};

use crate::error::BulletinError;

/// Parse a canonical `YYYY-MM-DD` date.
///
/// Non-canonical spellings such as `2024-3-5` are rejected so that a summary
/// is never cached under two keys for the same day.
pub fn parse_date_iso(date_iso: &str) -> Result<NaiveDate> {
    let date = NaiveDate::parse_from_str(date_iso, "%Y-%m-%d")
        .map_err(|_| BulletinError::InvalidDate(date_iso.to_string()))?;
    if date.format("%Y-%m-%d").to_string() != date_iso {
        return Err(BulletinError::InvalidDate(date_iso.to_string()).into());
    }
    Ok(date)
}

/// Parse a UTC offset: `Z`, `UTC`, `+HH:MM`, `-HH:MM`, `+HHMM` or `+HH`.
pub fn parse_utc_offset(s: &str) -> Result<FixedOffset> {
    let invalid = || BulletinError::InvalidOffset(s.to_string());
    let trimmed = s.trim();
    if trimmed.eq_ignore_ascii_case("z") || trimmed.eq_ignore_ascii_case("utc") {
        return Ok(FixedOffset::east_opt(0).ok_or_else(invalid)?);
    }

    let (sign, rest) = if let Some(rest) = trimmed.strip_prefix('+') {
        (1, rest)
    } else if let Some(rest) = trimmed.strip_prefix('-') {
        (-1, rest)
    } else {
        return Err(invalid().into());
    };
    if !rest.is_ascii() {
        return Err(invalid().into());
    }
    // Accepted bodies: `HH`, `HHMM`, or `HH:MM` (two digits each side).
    let (hh, mm) = match (rest.len(), rest.split_once(':')) {
        (5, Some((hh, mm))) if hh.len() == 2 => (hh, mm),
        (4, None) => rest.split_at(2),
        (2, None) => (rest, "00"),
        _ => return Err(invalid().into()),
    };
    if !hh.bytes().chain(mm.bytes()).all(|b| b.is_ascii_digit()) {
        return Err(invalid().into());
    }
    let hours: i32 = hh.parse()?;
    let minutes: i32 = mm.parse()?;
    if hours > 14 || minutes > 59 {
        return Err(invalid().into());
    }
    Ok(FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)?)
}

/// Inclusive `[start, end]` bounds of one calendar day, as UTC instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DayWindow {
    /// `00:00:00.000` through `23:59:59.999` of `date` in `offset`.
    pub fn for_date(date: NaiveDate, offset: FixedOffset) -> Result<Self> {
        let invalid = || BulletinError::InvalidDate(date.to_string());
        let start = date.and_hms_milli_opt(0, 0, 0, 0).ok_or_else(invalid)?;
        let end = date.and_hms_milli_opt(23, 59, 59, 999).ok_or_else(invalid)?;
        let start = offset
            .from_local_datetime(&start)
            .single()
            .ok_or_else(invalid)?;
        let end = offset
            .from_local_datetime(&end)
            .single()
            .ok_or_else(invalid)?;
        Ok(Self {
            start: start.with_timezone(&Utc),
            end: end.with_timezone(&Utc),
        })
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts <= self.end
    }
}

/// Today's date in the digest timezone, as `YYYY-MM-DD`.
pub fn today_iso(now: DateTime<Utc>, offset: FixedOffset) -> String {
    now.with_timezone(&offset).format("%Y-%m-%d").to_string()
}
