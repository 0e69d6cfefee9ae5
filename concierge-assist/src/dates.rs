//! Spoken date phrases ("tomorrow", "next week", "January 26") to calendar dates.

use chrono::{Datelike, Duration, NaiveDate};

const MONTHS: &[(&str, u32)] = &[
    ("january", 1), ("jan", 1), ("enero", 1),
    ("february", 2), ("feb", 2), ("febrero", 2),
    ("march", 3), ("mar", 3), ("marzo", 3),
    ("april", 4), ("apr", 4), ("abril", 4),
    ("may", 5), ("mayo", 5),
    ("june", 6), ("jun", 6), ("junio", 6),
    ("july", 7), ("jul", 7), ("julio", 7),
    ("august", 8), ("aug", 8), ("agosto", 8),
    ("september", 9), ("sep", 9), ("sept", 9), ("septiembre", 9),
    ("october", 10), ("oct", 10), ("octubre", 10),
    ("november", 11), ("nov", 11), ("noviembre", 11),
    ("december", 12), ("dec", 12), ("diciembre", 12),
];

/// Resolves a date phrase relative to `today`. Returns `None` when the phrase
/// is not understood; callers default to tomorrow.
pub fn parse_date_phrase(phrase: &str, today: NaiveDate) -> Option<NaiveDate> {
    let text = phrase.trim().to_lowercase();
    if text.is_empty() {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(&text, "%Y-%m-%d") {
        return Some(date);
    }
    // ISO timestamps: keep the date part
    if let Some((day, _)) = text.split_once('t') {
        if let Ok(date) = NaiveDate::parse_from_str(day, "%Y-%m-%d") {
            return Some(date);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(&text, "%m/%d/%Y") {
        return Some(date);
    }

    if text.contains("tomorrow") || text.contains("mañana") || text.contains("manana") {
        return Some(today + Duration::days(1));
    }
    if text == "today" || text == "hoy" {
        return Some(today);
    }
    if text.contains("next week") || text.contains("próxima semana") || text.contains("semana que viene") {
        return Some(today + Duration::weeks(1));
    }

    if let Some(date) = month_day(&text, today) {
        return Some(date);
    }

    // "next Tuesday" and friends: a week out
    if text.starts_with("next ") || text.contains("próximo") {
        return Some(today + Duration::weeks(1));
    }

    None
}

/// "January 26", "Jan 26th, 2027", "26 de enero".
fn month_day(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    let words: Vec<&str> = text
        .split(|c: char| c.is_whitespace() || c == ',' || c == '.')
        .filter(|w| !w.is_empty() && *w != "de" && *w != "of" && *w != "the")
        .collect();

    let month_at = words.iter().position(|w| MONTHS.iter().any(|(name, _)| name == w))?;
    let month = MONTHS.iter().find(|(name, _)| *name == words[month_at]).map(|(_, m)| *m)?;

    let numbers: Vec<i32> = words
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != month_at)
        .filter_map(|(_, w)| {
            let digits = w.trim_end_matches(|c: char| c.is_alphabetic());
            digits.parse::<i32>().ok()
        })
        .collect();

    let day = numbers.iter().copied().find(|n| (1..=31).contains(n))? as u32;
    let explicit_year = numbers.iter().copied().find(|n| *n >= 1000);

    match explicit_year {
        Some(year) => NaiveDate::from_ymd_opt(year, month, day),
        None => {
            let this_year = NaiveDate::from_ymd_opt(today.year(), month, day)?;
            // A date already behind us means next year's
            if this_year < today {
                NaiveDate::from_ymd_opt(today.year() + 1, month, day)
            } else {
                Some(this_year)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 10).unwrap()
    }

    #[test]
    fn test_relative_phrases() {
        assert_eq!(parse_date_phrase("tomorrow", today()), NaiveDate::from_ymd_opt(2026, 3, 11));
        assert_eq!(parse_date_phrase("Mañana", today()), NaiveDate::from_ymd_opt(2026, 3, 11));
        assert_eq!(parse_date_phrase("next week", today()), NaiveDate::from_ymd_opt(2026, 3, 17));
        assert_eq!(parse_date_phrase("next Tuesday", today()), NaiveDate::from_ymd_opt(2026, 3, 17));
        assert_eq!(parse_date_phrase("today", today()), Some(today()));
    }

    #[test]
    fn test_absolute_dates() {
        assert_eq!(parse_date_phrase("2026-01-26", today()), NaiveDate::from_ymd_opt(2026, 1, 26));
        assert_eq!(
            parse_date_phrase("2026-04-02T14:00:00Z", today()),
            NaiveDate::from_ymd_opt(2026, 4, 2)
        );
        assert_eq!(parse_date_phrase("March 26", today()), NaiveDate::from_ymd_opt(2026, 3, 26));
        assert_eq!(parse_date_phrase("26 de marzo", today()), NaiveDate::from_ymd_opt(2026, 3, 26));
    }

    #[test]
    fn test_past_month_day_rolls_to_next_year() {
        assert_eq!(parse_date_phrase("January 26th", today()), NaiveDate::from_ymd_opt(2027, 1, 26));
        assert_eq!(
            parse_date_phrase("Jan 26, 2026", today()),
            NaiveDate::from_ymd_opt(2026, 1, 26)
        );
    }

    #[test]
    fn test_unknown_phrase() {
        assert_eq!(parse_date_phrase("whenever works", today()), None);
        assert_eq!(parse_date_phrase("", today()), None);
    }
}
