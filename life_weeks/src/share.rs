use crate::Stats;

pub const SHARE_TITLE: &str = "Life in Weeks";
pub const SHARE_URL: &str = "lifeinweeks-azure.vercel.app";

/// Integer with comma thousands separators, e.g. `4,160`.
pub fn format_count(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Percentage with one decimal, ties rounded away from zero (`1.25` -> `1.3`).
pub fn format_percent(value: f64) -> String {
    format!("{:.1}", (value * 10.0).round() / 10.0)
}

/// Plain-text summary handed to the platform share sheet or the clipboard.
pub fn share_text(stats: &Stats) -> String {
    format!(
        "I've lived {} of my ~{} weeks ({}%).\n\n{} weeks remaining.\n{} more summers.\n\nVisualize yours → {}",
        format_count(stats.weeks_lived),
        format_count(stats.total_weeks),
        format_percent(stats.percent_lived),
        format_count(stats.weeks_remaining),
        stats.summers_left,
        SHARE_URL,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{compute_stats, LifeConfig};
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn counts_are_grouped() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(4160), "4,160");
        assert_eq!(format_count(1_234_567), "1,234,567");
        assert_eq!(format_count(-1500), "-1,500");
    }

    #[test]
    fn percent_ties_round_up() {
        assert_eq!(format_percent(1.25), "1.3");
        assert_eq!(format_percent(6.25), "6.3");
        assert_eq!(format_percent(37.5), "37.5");
        assert_eq!(format_percent(0.0), "0.0");
        assert_eq!(format_percent(100.0), "100.0");
    }

    #[test]
    fn share_text_rounds_odd_years_up() {
        let config = LifeConfig::default();
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let one_year = share_text(&compute_stats(now - Duration::weeks(52), now, &config));
        assert!(one_year.starts_with("I've lived 52 of my ~4,160 weeks (1.3%)."));
        let five_years = share_text(&compute_stats(now - Duration::weeks(260), now, &config));
        assert!(five_years.contains("(6.3%)"));
    }

    #[test]
    fn share_text_embeds_stats() {
        let config = LifeConfig::default();
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let stats = compute_stats(now - Duration::weeks(1560), now, &config);
        let text = share_text(&stats);
        assert_eq!(
            text,
            "I've lived 1,560 of my ~4,160 weeks (37.5%).\n\n2,600 weeks remaining.\n50 more summers.\n\nVisualize yours → lifeinweeks-azure.vercel.app"
        );
    }
}
