//! How dates and times are read back to passengers.

use chrono::{DateTime, Datelike, Utc};
use concierge_core::models::Language;

const MESES: [&str; 12] = [
    "enero", "febrero", "marzo", "abril", "mayo", "junio",
    "julio", "agosto", "septiembre", "octubre", "noviembre", "diciembre",
];

/// "January 26"
pub fn month_day(at: DateTime<Utc>) -> String {
    at.format("%B %d").to_string()
}

/// "09:30 AM"
pub fn clock(at: DateTime<Utc>) -> String {
    at.format("%I:%M %p").to_string()
}

/// "January 26 at 09:30 AM"
pub fn month_day_at(at: DateTime<Utc>) -> String {
    at.format("%B %d at %I:%M %p").to_string()
}

/// Long form used in emails.
pub fn long_datetime(at: DateTime<Utc>, language: Language) -> String {
    match language {
        Language::Es => format!(
            "{} de {} de {} a las {}",
            at.day(),
            MESES[at.month0() as usize],
            at.year(),
            clock(at)
        ),
        Language::En => at.format("%B %d, %Y at %I:%M %p").to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_formats() {
        let at = Utc.with_ymd_and_hms(2026, 1, 6, 14, 5, 0).unwrap();
        assert_eq!(month_day(at), "January 06");
        assert_eq!(clock(at), "02:05 PM");
        assert_eq!(month_day_at(at), "January 06 at 02:05 PM");
        assert_eq!(long_datetime(at, Language::En), "January 06, 2026 at 02:05 PM");
        assert_eq!(long_datetime(at, Language::Es), "6 de enero de 2026 a las 02:05 PM");
    }
}
