//! Time string parsing, dispatched by length prefix so a well-formed input
//! tries exactly one format before succeeding — the source this gateway
//! replaces retried several formats twice by accident (see DESIGN.md); here
//! every candidate is attempted at most once, in the prescribed priority
//! order: `YYYY-MM-DD[ HH:MM:SS[.fff]]`, `YYYY/MM/DD[...]`, RFC 3339,
//! `YYYYMMDD`, `HH:MM[:SS]`, a Chinese `年月日` form, then the RFC 2822
//! fallback. A pure integer is interpreted as seconds since the epoch.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

pub fn parse_time(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(secs) = s.parse::<i64>() {
        return DateTime::from_timestamp(secs, 0).map(|dt| dt.naive_utc());
    }

    if let Some(dt) = parse_date_prefixed(s, '-') {
        return Some(dt);
    }
    if let Some(dt) = parse_date_prefixed(s, '/') {
        return Some(dt);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    if s.len() == 8 && s.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(d) = NaiveDate::parse_from_str(s, "%Y%m%d") {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    if s.contains(':') && !s.contains('-') && !s.contains('/') {
        if let Some(t) = parse_time_only(s) {
            let today = chrono::Utc::now().date_naive();
            return Some(NaiveDateTime::new(today, t));
        }
    }
    if s.contains('年') {
        if let Some(dt) = parse_chinese(s) {
            return Some(dt);
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.naive_utc());
    }
    None
}

fn parse_date_prefixed(s: &str, sep: char) -> Option<NaiveDateTime> {
    let date_fmt = format!("%Y{sep}%m{sep}%d");
    if s.len() == 10 {
        return NaiveDate::parse_from_str(s, &date_fmt)
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0));
    }
    if s.len() >= 19 {
        let datetime_fmt = format!("%Y{sep}%m{sep}%d %H:%M:%S");
        if let Ok(dt) = NaiveDateTime::parse_from_str(&s[..19], &datetime_fmt) {
            if s.len() > 19 && s.as_bytes()[19] == b'.' {
                let frac_fmt = format!("%Y{sep}%m{sep}%d %H:%M:%S%.f");
                return NaiveDateTime::parse_from_str(s, &frac_fmt).ok().or(Some(dt));
            }
            return Some(dt);
        }
    }
    None
}

fn parse_time_only(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .ok()
}

/// `2024年01月02日[ 15:04:05]`
fn parse_chinese(s: &str) -> Option<NaiveDateTime> {
    let year_end = s.find('年')?;
    let month_end = s.find('月')?;
    let day_end = s.find('日')?;
    if !(year_end < month_end && month_end < day_end) {
        return None;
    }
    let year: i32 = s[..year_end].trim().parse().ok()?;
    let month: u32 = s[year_end + '年'.len_utf8()..month_end].trim().parse().ok()?;
    let day: u32 = s[month_end + '月'.len_utf8()..day_end].trim().parse().ok()?;
    let date = NaiveDate::from_ymd_opt(year, month, day)?;

    let rest = s[day_end + '日'.len_utf8()..].trim();
    if rest.is_empty() {
        return date.and_hms_opt(0, 0, 0);
    }
    let time = parse_time_only(rest)?;
    Some(NaiveDateTime::new(date, time))
}
