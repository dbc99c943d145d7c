//! Listing date parsing.
//!
//! Sources print deadlines in several locale formats. Everything here is
//! best-effort: text that does not look like a date yields `None`.

use std::sync::LazyLock;

use chrono::{Datelike, Days, NaiveDate};
use regex::Regex;

/// `2025-03-05`, `2025.3.5`, `2025/03/05`, `2025년 3월 5일`.
static FULL_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{4})\s*(?:[-./]|년)\s*(\d{1,2})\s*(?:[-./]|월)\s*(\d{1,2})\s*일?")
        .expect("valid regex")
});

/// Year-less `05.31` or `05/31`, only where it reads as a deadline: at the
/// start of the text or after `~`/`마감`, and followed by nothing but an
/// optional weekday, time, or `마감`/`까지`. Keeps `1.5 억` and `3/4 분기` out.
static MONTH_DAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:^|~|마감)\s*(\d{1,2})[./](\d{1,2})\.?\s*(?:\([^)]*\))?\s*(?:\d{1,2}:\d{2})?\s*(?:마감|까지)?\s*(?:~|$)",
    )
    .expect("valid regex")
});

/// `D-day`.
static D_DAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bD\s*-\s*day\b").expect("valid regex"));

/// `D-7` (days left) or `D+3` (days since).
static D_OFFSET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bD\s*([-+])\s*(\d{1,4})\b").expect("valid regex"));

/// Start and end of a listing's date text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

/// Parse a single date, resolving relative forms against `today`.
pub fn parse_date(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    let full = full_dates(text);
    if let Some((first, _)) = full.first() {
        return Some(*first);
    }
    relative_date(text, today)
}

/// Parse date text that may hold a range.
///
/// Two or more full dates give `start` = first and `end` = last. A full
/// date followed by a year-less one (`2025.04.01 ~ 04.30`) is a range too,
/// with the end rolled into the next year if it would precede the start.
/// Any other single date, relative or not, sets only `end`.
pub fn parse_date_range(text: &str, today: NaiveDate) -> DateRange {
    let full = full_dates(text);
    match full.as_slice() {
        [] => DateRange {
            start: None,
            end: relative_date(text, today),
        },
        [(only, tail)] => match month_day_after(&text[*tail..], *only) {
            Some(end) => DateRange {
                start: Some(*only),
                end: Some(end),
            },
            None => DateRange {
                start: None,
                end: Some(*only),
            },
        },
        [(first, _), .., (last, _)] => DateRange {
            start: Some(*first),
            end: Some(*last),
        },
    }
}

/// Valid full dates with the byte offset where each match ends.
fn full_dates(text: &str) -> Vec<(NaiveDate, usize)> {
    FULL_DATE
        .captures_iter(text)
        .filter_map(|caps| {
            let year = caps[1].parse().ok()?;
            let month = caps[2].parse().ok()?;
            let day = caps[3].parse().ok()?;
            let end = caps.get(0)?.end();
            NaiveDate::from_ymd_opt(year, month, day).map(|date| (date, end))
        })
        .collect()
}

fn month_day(text: &str, year: i32) -> Option<NaiveDate> {
    let caps = MONTH_DAY.captures(text)?;
    let month = caps[1].parse().ok()?;
    let day = caps[2].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Year-less end of a range that opened on `start`.
fn month_day_after(tail: &str, start: NaiveDate) -> Option<NaiveDate> {
    let end = month_day(tail, start.year())?;
    if end >= start {
        Some(end)
    } else {
        month_day(tail, start.year() + 1)
    }
}

fn relative_date(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    if D_DAY.is_match(text) {
        return Some(today);
    }

    if let Some(caps) = D_OFFSET.captures(text) {
        let days = Days::new(caps[2].parse().ok()?);
        return match &caps[1] {
            "-" => today.checked_add_days(days),
            _ => today.checked_sub_days(days),
        };
    }

    month_day(text, today.year())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn today() -> NaiveDate {
        ymd(2025, 3, 1)
    }

    #[test]
    fn dotted_date_without_padding() {
        assert_eq!(parse_date("2025.3.5", today()), Some(ymd(2025, 3, 5)));
    }

    #[test]
    fn non_date_token_is_none() {
        assert_eq!(parse_date("상시", today()), None);
        assert_eq!(parse_date("채용시 마감", today()), None);
        assert_eq!(parse_date("", today()), None);
    }

    #[test]
    fn absolute_formats() {
        assert_eq!(parse_date("2025-04-30", today()), Some(ymd(2025, 4, 30)));
        assert_eq!(parse_date("2025/04/30", today()), Some(ymd(2025, 4, 30)));
        assert_eq!(parse_date("2025년 4월 1일", today()), Some(ymd(2025, 4, 1)));
        assert_eq!(parse_date("~ 2025.05.31(토)", today()), Some(ymd(2025, 5, 31)));
    }

    #[test]
    fn impossible_calendar_date_is_none() {
        assert_eq!(parse_date("2025.02.30", today()), None);
    }

    #[test]
    fn relative_forms_resolve_against_crawl_date() {
        assert_eq!(parse_date("D-7", today()), Some(ymd(2025, 3, 8)));
        assert_eq!(parse_date("D-day", today()), Some(today()));
        assert_eq!(parse_date("마감 D+3", today()), Some(ymd(2025, 2, 26)));
        assert_eq!(parse_date("~05.31", today()), Some(ymd(2025, 5, 31)));
        assert_eq!(parse_date("05.31(토) 18:00 마감", today()), Some(ymd(2025, 5, 31)));
        assert_eq!(parse_date("마감 6/15", today()), Some(ymd(2025, 6, 15)));
    }

    #[test]
    fn numbers_that_are_not_dates() {
        assert_eq!(parse_date("1.5 억", today()), None);
        assert_eq!(parse_date("3/4 분기", today()), None);
        assert_eq!(parse_date("총상금 1.5억 원", today()), None);
        assert_eq!(parse_date_range("연봉 3.5 이상", today()), DateRange::default());
    }

    #[test]
    fn range_sets_start_and_end() {
        let range = parse_date_range("2025-04-01 ~ 2025-04-30", today());
        assert_eq!(range.start, Some(ymd(2025, 4, 1)));
        assert_eq!(range.end, Some(ymd(2025, 4, 30)));

        let short_end = parse_date_range("2025.04.01 ~ 04.30", today());
        assert_eq!(short_end.start, Some(ymd(2025, 4, 1)));
        assert_eq!(short_end.end, Some(ymd(2025, 4, 30)));

        let over_new_year = parse_date_range("2025.12.20 ~ 01.10", today());
        assert_eq!(over_new_year.start, Some(ymd(2025, 12, 20)));
        assert_eq!(over_new_year.end, Some(ymd(2026, 1, 10)));

        let deadline_only = parse_date_range("~ 2025.05.31(토)", today());
        assert_eq!(deadline_only.start, None);
        assert_eq!(deadline_only.end, Some(ymd(2025, 5, 31)));

        let single = parse_date_range("D-7", today());
        assert_eq!(single.start, None);
        assert_eq!(single.end, Some(ymd(2025, 3, 8)));
    }
}
