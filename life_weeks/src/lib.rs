//! Life-in-weeks model: counts elapsed weeks since birth, classifies every
//! week of an expected lifespan into a life phase, and derives the summary
//! statistics shown next to the grid.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod grid;
pub mod preview;
pub mod share;

pub use grid::{
    classify_week, describe_week, legend, CellFill, CellState, GridLayout, LegendEntry, WeekCell,
    WeekGrid,
};
pub use preview::{PreviewCell, PreviewGrid};
pub use share::{format_count, format_percent, share_text, SHARE_TITLE, SHARE_URL};

/// Fixed number of grid columns per year of life.
pub const WEEKS_PER_YEAR: i64 = 52;
pub const DEFAULT_LIFE_EXPECTANCY_YEARS: u32 = 80;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LifeError {
    #[error("invalid date '{0}': expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("birth date {date} outside allowed range {min}..={max}")]
    BirthDateOutOfRange {
        date: NaiveDate,
        min: NaiveDate,
        max: NaiveDate,
    },
    #[error("invalid color token '{0}': expected #RRGGBB")]
    InvalidColor(String),
    #[error("invalid phase table: {0}")]
    InvalidPhaseTable(String),
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("failed to parse configuration: {0}")]
    ConfigParse(String),
}

/// An opaque RGB display token, written as `#RRGGBB`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn parse_hex(token: &str) -> Result<Self, LifeError> {
        let invalid = || LifeError::InvalidColor(token.to_string());
        let hex = token.trim().strip_prefix('#').ok_or_else(invalid)?;
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(invalid());
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16).map_err(|_| invalid())
        };
        Ok(Self::rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }

    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl TryFrom<String> for Color {
    type Error = LifeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Color::parse_hex(&value)
    }
}

impl From<Color> for String {
    fn from(value: Color) -> Self {
        value.to_hex()
    }
}

/// Marker for the "you are here" cell.
pub const HIGHLIGHT_COLOR: Color = Color::rgb(0xEF, 0x44, 0x44);
/// Fill for weeks not yet lived.
pub const UNLIVED_COLOR: Color = Color::rgb(0xE5, 0xE7, 0xEB);
pub const UNLIVED_OPACITY: f64 = 0.3;
/// Substitute text color when a phase color would vanish against the page.
pub const MUTED_TEXT_COLOR: Color = Color::rgb(0x6B, 0x72, 0x80);

/// A named life stage covering every age below `max_age_years` not already
/// claimed by an earlier phase.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    pub name: String,
    pub max_age_years: f64,
    pub color: Color,
    #[serde(default)]
    pub label: String,
}

impl Phase {
    pub fn new(name: &str, max_age_years: f64, color: Color, label: &str) -> Self {
        Self {
            name: name.to_string(),
            max_age_years,
            color,
            label: label.to_string(),
        }
    }
}

pub fn default_phases() -> Vec<Phase> {
    vec![
        Phase::new("Childhood", 5.0, Color::rgb(0xFD, 0xE6, 0x8A), "👶"),
        Phase::new("School", 12.0, Color::rgb(0xA7, 0xF3, 0xD0), "📚"),
        Phase::new("Teenager", 18.0, Color::rgb(0x93, 0xC5, 0xFD), "🎒"),
        Phase::new("Young Adult", 25.0, Color::rgb(0xC4, 0xB5, 0xFD), "🎓"),
        Phase::new("Building", 35.0, Color::rgb(0xF9, 0xA8, 0xD4), "🏗️"),
        Phase::new("Prime", 50.0, Color::rgb(0xFC, 0xA5, 0xA5), "⚡"),
        Phase::new("Wisdom", 65.0, Color::rgb(0xFD, 0xBA, 0x74), "🧠"),
        Phase::new("Legacy", 80.0, Color::rgb(0xD1, 0xD5, 0xDB), "🌅"),
        Phase::new("Bonus", 100.0, Color::rgb(0xE5, 0xE7, 0xEB), "✨"),
    ]
}

/// Immutable model configuration: expected lifespan and the ordered phase
/// table. The table is validated on construction and is never empty.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawLifeConfig")]
pub struct LifeConfig {
    life_expectancy_years: u32,
    phases: Vec<Phase>,
}

#[derive(Deserialize)]
#[serde(default)]
struct RawLifeConfig {
    life_expectancy_years: u32,
    phases: Vec<Phase>,
}

impl Default for RawLifeConfig {
    fn default() -> Self {
        Self {
            life_expectancy_years: DEFAULT_LIFE_EXPECTANCY_YEARS,
            phases: default_phases(),
        }
    }
}

impl TryFrom<RawLifeConfig> for LifeConfig {
    type Error = LifeError;

    fn try_from(raw: RawLifeConfig) -> Result<Self, Self::Error> {
        LifeConfig::new(raw.life_expectancy_years, raw.phases)
    }
}

impl Default for LifeConfig {
    fn default() -> Self {
        Self {
            life_expectancy_years: DEFAULT_LIFE_EXPECTANCY_YEARS,
            phases: default_phases(),
        }
    }
}

impl LifeConfig {
    pub fn new(life_expectancy_years: u32, phases: Vec<Phase>) -> Result<Self, LifeError> {
        if life_expectancy_years == 0 {
            return Err(LifeError::InvalidParameter(
                "life expectancy must be at least one year".into(),
            ));
        }
        validate_phases(&phases)?;
        Ok(Self {
            life_expectancy_years,
            phases,
        })
    }

    /// Default phase table with a different lifespan.
    pub fn with_life_expectancy(life_expectancy_years: u32) -> Result<Self, LifeError> {
        Self::new(life_expectancy_years, default_phases())
    }

    /// Parse and validate a JSON configuration; absent keys take defaults.
    pub fn from_json(text: &str) -> Result<Self, LifeError> {
        serde_json::from_str(text).map_err(|e| LifeError::ConfigParse(e.to_string()))
    }

    pub fn life_expectancy_years(&self) -> u32 {
        self.life_expectancy_years
    }

    pub fn total_weeks(&self) -> i64 {
        i64::from(self.life_expectancy_years) * WEEKS_PER_YEAR
    }

    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    /// Phase for a week index: the first phase whose boundary lies above the
    /// age at that week, falling back to the last phase for any later age.
    pub fn phase_for(&self, week_index: i64) -> &Phase {
        let age_years = week_index as f64 / WEEKS_PER_YEAR as f64;
        self.phases
            .iter()
            .find(|phase| age_years < phase.max_age_years)
            .unwrap_or_else(|| self.catch_all())
    }

    fn catch_all(&self) -> &Phase {
        // non-empty by construction
        &self.phases[self.phases.len() - 1]
    }
}

fn validate_phases(phases: &[Phase]) -> Result<(), LifeError> {
    if phases.is_empty() {
        return Err(LifeError::InvalidPhaseTable("no phases defined".into()));
    }
    let mut previous: Option<&Phase> = None;
    for phase in phases {
        if phase.name.trim().is_empty() {
            return Err(LifeError::InvalidPhaseTable("phase without a name".into()));
        }
        if !phase.max_age_years.is_finite() || phase.max_age_years <= 0.0 {
            return Err(LifeError::InvalidPhaseTable(format!(
                "phase '{}' has a non-positive or non-finite boundary",
                phase.name
            )));
        }
        if let Some(prev) = previous {
            if phase.max_age_years <= prev.max_age_years {
                return Err(LifeError::InvalidPhaseTable(format!(
                    "boundary of '{}' ({}) must exceed boundary of '{}' ({})",
                    phase.name, phase.max_age_years, prev.name, prev.max_age_years
                )));
            }
        }
        previous = Some(phase);
    }
    Ok(())
}

/// Whole 7-day periods elapsed between `birth` and `now`, floored. A birth
/// after `now` yields a negative count.
pub fn weeks_since_birth(birth: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let elapsed = now - birth;
    // num_weeks truncates toward zero
    let weeks = elapsed.num_weeks();
    if elapsed < TimeDelta::weeks(weeks) {
        weeks - 1
    } else {
        weeks
    }
}

pub fn weeks_since_birth_now(birth: DateTime<Utc>) -> i64 {
    weeks_since_birth(birth, Utc::now())
}

/// A date-picker value is taken as midnight UTC of that day.
pub fn birth_instant(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

pub fn parse_birth_date(text: &str) -> Result<NaiveDate, LifeError> {
    NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
        .map_err(|_| LifeError::InvalidDate(text.to_string()))
}

/// Earliest birth date accepted by the input controls.
pub fn earliest_birth_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1924, 1, 1).unwrap_or(NaiveDate::MIN)
}

/// Range check applied by input controls, not by the model itself.
pub fn check_birth_date(date: NaiveDate, today: NaiveDate) -> Result<NaiveDate, LifeError> {
    let min = earliest_birth_date();
    if date < min || date > today {
        return Err(LifeError::BirthDateOutOfRange {
            date,
            min,
            max: today,
        });
    }
    Ok(date)
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    /// Raw elapsed weeks; negative when the birth date lies in the future.
    pub weeks_lived: i64,
    pub weeks_remaining: i64,
    pub percent_lived: f64,
    pub current_age_years: f64,
    pub current_phase_name: String,
    pub years_remaining: f64,
    pub summers_left: u32,
    pub christmases_left: u32,
    pub total_weeks: i64,
    pub life_expectancy_years: u32,
}

impl Stats {
    /// Past the configured life expectancy.
    pub fn is_bonus_time(&self) -> bool {
        self.current_age_years > f64::from(self.life_expectancy_years)
    }

    pub fn current_phase<'a>(&self, config: &'a LifeConfig) -> &'a Phase {
        config.phase_for(self.weeks_lived)
    }

    pub fn phase_display_color(&self, config: &LifeConfig) -> Color {
        let color = self.current_phase(config).color;
        if color == UNLIVED_COLOR {
            MUTED_TEXT_COLOR
        } else {
            color
        }
    }
}

/// Derive the summary statistics for a birth instant at a given "now".
///
/// `weeks_lived` is deliberately left unclamped so that a future birth date
/// marks no cell as lived; every other field is clamped to its range.
pub fn compute_stats(birth: DateTime<Utc>, now: DateTime<Utc>, config: &LifeConfig) -> Stats {
    let total_weeks = config.total_weeks();
    let weeks_lived = weeks_since_birth(birth, now);
    let weeks_remaining = (total_weeks - weeks_lived).max(0);
    let percent_lived = if total_weeks > 0 {
        (weeks_lived as f64 / total_weeks as f64 * 100.0).clamp(0.0, 100.0)
    } else {
        0.0
    };
    let current_age_years = weeks_lived as f64 / WEEKS_PER_YEAR as f64;
    let years_remaining =
        (f64::from(config.life_expectancy_years()) - current_age_years).max(0.0);
    let whole_years_left = years_remaining.floor() as u32;

    Stats {
        weeks_lived,
        weeks_remaining,
        percent_lived,
        current_age_years,
        current_phase_name: config.phase_for(weeks_lived).name.clone(),
        years_remaining,
        summers_left: whole_years_left,
        christmases_left: whole_years_left,
        total_weeks,
        life_expectancy_years: config.life_expectancy_years(),
    }
}

pub fn compute_stats_now(birth: DateTime<Utc>, config: &LifeConfig) -> Stats {
    compute_stats(birth, Utc::now(), config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn weeks_since_birth_floors_partial_weeks() {
        let now = fixed_now();
        assert_eq!(weeks_since_birth(now, now), 0);
        assert_eq!(weeks_since_birth(now - Duration::days(6), now), 0);
        assert_eq!(weeks_since_birth(now - Duration::days(7), now), 1);
        assert_eq!(weeks_since_birth(now - Duration::days(20), now), 2);
    }

    #[test]
    fn weeks_since_birth_non_negative_for_past_births() {
        let now = fixed_now();
        for days in [0_i64, 1, 364, 365 * 30, 365 * 99 + 17, 40_000] {
            assert!(weeks_since_birth(now - Duration::days(days), now) >= 0);
        }
    }

    #[test]
    fn future_birth_gives_negative_weeks() {
        let now = fixed_now();
        assert_eq!(weeks_since_birth(now + Duration::hours(1), now), -1);
        assert_eq!(weeks_since_birth(now + Duration::days(14), now), -2);
    }

    #[test]
    fn sub_millisecond_offsets_still_floor() {
        let now = fixed_now();
        assert_eq!(weeks_since_birth(now + Duration::microseconds(500), now), -1);
        assert_eq!(weeks_since_birth(now + Duration::nanoseconds(1), now), -1);
        assert_eq!(weeks_since_birth(now - Duration::nanoseconds(1), now), 0);
        let just_short = now - Duration::weeks(3) + Duration::nanoseconds(1);
        assert_eq!(weeks_since_birth(just_short, now), 2);
    }

    #[test]
    fn phase_boundaries_are_strict() {
        let config = LifeConfig::default();
        let first = config.phase_for(0);
        assert_eq!(first.name, "Childhood");
        assert_eq!(first.max_age_years, 5.0);
        assert_eq!(config.phase_for(5 * 52 - 1).name, "Childhood");
        assert_eq!(config.phase_for(5 * 52).name, "School");
    }

    #[test]
    fn phase_for_is_total() {
        let config = LifeConfig::default();
        assert_eq!(config.phase_for(-500).name, "Childhood");
        assert_eq!(config.phase_for(100 * 52).name, "Bonus");
        assert_eq!(config.phase_for(i64::MAX).name, "Bonus");
    }

    #[test]
    fn phase_for_never_regresses() {
        let config = LifeConfig::default();
        let mut last_boundary = f64::MIN;
        for index in 0..(100 * 52) {
            let boundary = config.phase_for(index).max_age_years;
            assert!(boundary >= last_boundary, "regressed at week {index}");
            last_boundary = boundary;
        }
    }

    #[test]
    fn stats_at_full_lifespan() {
        let config = LifeConfig::default();
        let now = fixed_now();
        let birth = now - Duration::weeks(80 * 52);
        let stats = compute_stats(birth, now, &config);
        assert_eq!(stats.weeks_lived, 4160);
        assert_eq!(stats.weeks_remaining, 0);
        assert_eq!(stats.percent_lived, 100.0);
        assert_eq!(stats.summers_left, 0);
        assert!(!stats.is_bonus_time());
    }

    #[test]
    fn stats_for_birth_today() {
        let config = LifeConfig::default();
        let now = fixed_now();
        let stats = compute_stats(now, now, &config);
        assert_eq!(stats.weeks_lived, 0);
        assert_eq!(stats.percent_lived, 0.0);
        assert_eq!(stats.current_phase_name, config.phases()[0].name);
        assert_eq!(stats.weeks_remaining, 4160);
        assert_eq!(stats.summers_left, 80);
        assert_eq!(stats.christmases_left, 80);
    }

    #[test]
    fn remaining_and_lived_sum_to_total_in_range() {
        let config = LifeConfig::default();
        let now = fixed_now();
        for weeks in [0_i64, 1, 520, 2080, 4159, 4160] {
            let stats = compute_stats(now - Duration::weeks(weeks), now, &config);
            assert_eq!(stats.weeks_lived, weeks);
            assert_eq!(stats.weeks_lived + stats.weeks_remaining, config.total_weeks());
        }
        let stats = compute_stats(now - Duration::weeks(5000), now, &config);
        assert_eq!(stats.weeks_remaining, 0);
    }

    #[test]
    fn percent_is_clamped_for_extreme_inputs() {
        let config = LifeConfig::default();
        let now = fixed_now();
        let ancient = compute_stats(now - Duration::weeks(1_000_000), now, &config);
        assert_eq!(ancient.percent_lived, 100.0);
        assert!(ancient.is_bonus_time());
        assert_eq!(ancient.years_remaining, 0.0);
        assert_eq!(ancient.current_phase_name, "Bonus");

        let unborn = compute_stats(now + Duration::weeks(10), now, &config);
        assert_eq!(unborn.percent_lived, 0.0);
        assert_eq!(unborn.weeks_lived, -10);
        assert_eq!(unborn.weeks_remaining, 4170);
    }

    #[test]
    fn stats_are_idempotent() {
        let config = LifeConfig::default();
        let now = fixed_now();
        let birth = Utc.with_ymd_and_hms(1990, 3, 4, 0, 0, 0).unwrap();
        assert_eq!(
            compute_stats(birth, now, &config),
            compute_stats(birth, now, &config)
        );
    }

    #[test]
    fn phase_display_color_avoids_unlived_gray() {
        let config = LifeConfig::default();
        let now = fixed_now();
        let late = compute_stats(now - Duration::weeks(85 * 52), now, &config);
        assert_eq!(late.current_phase_name, "Bonus");
        assert_eq!(late.phase_display_color(&config), MUTED_TEXT_COLOR);
        let young = compute_stats(now - Duration::weeks(52), now, &config);
        assert_eq!(young.phase_display_color(&config), Color::rgb(0xFD, 0xE6, 0x8A));
    }

    #[test]
    fn color_tokens_round_trip_through_text() {
        let color = Color::parse_hex("#ef4444").unwrap();
        assert_eq!(color, HIGHLIGHT_COLOR);
        assert_eq!(color.to_hex(), "#EF4444");
        assert!(Color::parse_hex("EF4444").is_err());
        assert!(Color::parse_hex("#EF44").is_err());
        assert!(Color::parse_hex("#GG4444").is_err());
    }

    #[test]
    fn config_rejects_unordered_or_empty_phases() {
        let red = Color::rgb(255, 0, 0);
        assert!(LifeConfig::new(80, Vec::new()).is_err());
        assert!(LifeConfig::new(0, default_phases()).is_err());
        let unordered = vec![Phase::new("A", 10.0, red, ""), Phase::new("B", 10.0, red, "")];
        assert!(matches!(
            LifeConfig::new(80, unordered),
            Err(LifeError::InvalidPhaseTable(_))
        ));
        let infinite = vec![Phase::new("A", f64::INFINITY, red, "")];
        assert!(LifeConfig::new(80, infinite).is_err());
    }

    #[test]
    fn config_from_json_fills_defaults() {
        let config = LifeConfig::from_json(r#"{ "life_expectancy_years": 90 }"#).unwrap();
        assert_eq!(config.total_weeks(), 90 * 52);
        assert_eq!(config.phases().len(), 9);

        let custom = LifeConfig::from_json(
            r##"{ "phases": [
                { "name": "Early", "max_age_years": 30, "color": "#112233" },
                { "name": "Late", "max_age_years": 120, "color": "#445566" }
            ] }"##,
        )
        .unwrap();
        assert_eq!(custom.life_expectancy_years(), 80);
        assert_eq!(custom.phase_for(40 * 52).name, "Late");

        let bad = LifeConfig::from_json(
            r##"{ "phases": [{ "name": "X", "max_age_years": 5, "color": "red" }] }"##,
        );
        assert!(matches!(bad, Err(LifeError::ConfigParse(_))));
    }

    #[test]
    fn birth_dates_parse_and_range_check() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let date = parse_birth_date("1990-01-31").unwrap();
        assert_eq!(check_birth_date(date, today).unwrap(), date);
        assert!(parse_birth_date("31/01/1990").is_err());
        let too_old = NaiveDate::from_ymd_opt(1923, 12, 31).unwrap();
        assert!(check_birth_date(too_old, today).is_err());
        let tomorrow = NaiveDate::from_ymd_opt(2024, 6, 16).unwrap();
        assert!(check_birth_date(tomorrow, today).is_err());
        assert_eq!(
            birth_instant(date),
            Utc.with_ymd_and_hms(1990, 1, 31, 0, 0, 0).unwrap()
        );
    }
}
