use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Utc, Weekday};

pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

/// Calendar day of `ts` on the institution's wall clock.
pub fn local_date(ts: &DateTime<Utc>, offset: &FixedOffset) -> NaiveDate {
    ts.with_timezone(offset).date_naive()
}

pub fn is_weekday(d: NaiveDate) -> bool {
    !matches!(d.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Every Monday–Friday in `[start, end]`.
pub fn weekdays_between(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut out = Vec::new();
    let mut d = start;

    while d <= end {
        if is_weekday(d) {
            out.push(d);
        }
        match d.succ_opt() {
            Some(next) => d = next,
            None => break,
        }
    }

    out
}

/// Dates matching a period filter: "YYYY-MM-DD", "YYYY-MM" or "YYYY".
pub fn in_period(d: NaiveDate, period: &str) -> bool {
    let p = period.trim();
    if let Some(day) = parse_date(p) {
        return d == day;
    }
    if let Some((y, m)) = p.split_once('-')
        && let (Ok(y), Ok(m)) = (y.parse::<i32>(), m.parse::<u32>())
    {
        return d.year() == y && d.month() == m;
    }
    if let Ok(y) = p.parse::<i32>() {
        return d.year() == y;
    }
    false
}
