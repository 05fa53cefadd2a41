use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

pub fn current_time() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}

/// Human-readable date used in email bodies, e.g. "2026-09-12".
pub fn format_date(date: &OffsetDateTime) -> String {
    date.format(&Rfc3339)
        .map(|formatted| formatted.split('T').next().unwrap_or_default().to_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn dates_format_without_time_of_day() {
        let date = datetime!(2026-09-12 19:30 UTC);
        assert_eq!(format_date(&date), "2026-09-12");
    }
}
