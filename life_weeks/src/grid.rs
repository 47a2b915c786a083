//! Per-week cell classification and the grid geometry shared by every
//! renderer (bitmap, SVG, canvas, DOM).

use serde::{Deserialize, Serialize};

use crate::{
    Color, LifeConfig, Phase, Stats, HIGHLIGHT_COLOR, UNLIVED_COLOR, UNLIVED_OPACITY,
    WEEKS_PER_YEAR,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellState {
    Lived,
    Current,
    Unlived,
}

impl CellState {
    pub fn as_str(self) -> &'static str {
        match self {
            CellState::Lived => "lived",
            CellState::Current => "current",
            CellState::Unlived => "unlived",
        }
    }
}

/// Classify a week index against the raw weeks-lived count. A negative
/// count marks nothing as lived and nothing as current.
pub fn classify_week(index: i64, weeks_lived: i64) -> CellState {
    if index == weeks_lived {
        CellState::Current
    } else if index < weeks_lived {
        CellState::Lived
    } else {
        CellState::Unlived
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CellFill {
    pub color: Color,
    pub opacity: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct WeekCell<'a> {
    pub index: i64,
    pub year: i64,
    pub week_in_year: i64,
    pub state: CellState,
    pub phase: &'a Phase,
}

impl WeekCell<'_> {
    pub fn fill(&self) -> CellFill {
        match self.state {
            CellState::Current => CellFill {
                color: HIGHLIGHT_COLOR,
                opacity: 1.0,
            },
            CellState::Lived => CellFill {
                color: self.phase.color,
                opacity: 1.0,
            },
            CellState::Unlived => CellFill {
                color: UNLIVED_COLOR,
                opacity: UNLIVED_OPACITY,
            },
        }
    }
}

/// Every week of the configured lifespan, classified against one
/// weeks-lived value.
#[derive(Clone, Copy, Debug)]
pub struct WeekGrid<'a> {
    config: &'a LifeConfig,
    weeks_lived: i64,
}

impl<'a> WeekGrid<'a> {
    pub fn new(config: &'a LifeConfig, weeks_lived: i64) -> Self {
        Self {
            config,
            weeks_lived,
        }
    }

    pub fn from_stats(config: &'a LifeConfig, stats: &Stats) -> Self {
        Self::new(config, stats.weeks_lived)
    }

    pub fn weeks_lived(&self) -> i64 {
        self.weeks_lived
    }

    pub fn years(&self) -> i64 {
        i64::from(self.config.life_expectancy_years())
    }

    pub fn len(&self) -> i64 {
        self.config.total_weeks()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn cell(&self, index: i64) -> WeekCell<'a> {
        WeekCell {
            index,
            year: index.div_euclid(WEEKS_PER_YEAR),
            week_in_year: index.rem_euclid(WEEKS_PER_YEAR),
            state: classify_week(index, self.weeks_lived),
            phase: self.config.phase_for(index),
        }
    }

    /// Cells in row-major order: year by year, week by week.
    pub fn cells(&self) -> impl Iterator<Item = WeekCell<'a>> + 'a {
        let grid = *self;
        (0..grid.len()).map(move |index| grid.cell(index))
    }

    /// Index of the "you are here" cell when it falls inside the grid.
    pub fn current_index(&self) -> Option<i64> {
        (0..self.len())
            .contains(&self.weeks_lived)
            .then_some(self.weeks_lived)
    }

    pub fn lived_count(&self) -> i64 {
        self.weeks_lived.clamp(0, self.len())
    }
}

/// Pixel geometry of the week grid: one row per year, one column per week,
/// a gutter on the left for year labels.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridLayout {
    pub dot: f64,
    pub gap: f64,
    pub label_width: f64,
    pub label_every_years: i64,
}

impl Default for GridLayout {
    fn default() -> Self {
        Self {
            dot: 6.0,
            gap: 1.0,
            label_width: 28.0,
            label_every_years: 5,
        }
    }
}

impl GridLayout {
    pub fn scaled(&self, factor: f64) -> Self {
        let factor = if factor.is_finite() && factor > 0.0 {
            factor
        } else {
            1.0
        };
        Self {
            dot: self.dot * factor,
            gap: self.gap * factor,
            label_width: self.label_width * factor,
            label_every_years: self.label_every_years,
        }
    }

    pub fn cell_pitch(&self) -> f64 {
        self.dot + self.gap
    }

    pub fn width(&self) -> f64 {
        self.label_width + WEEKS_PER_YEAR as f64 * self.cell_pitch()
    }

    pub fn height(&self, config: &LifeConfig) -> f64 {
        f64::from(config.life_expectancy_years()) * self.cell_pitch()
    }

    /// Upper-left corner of a cell.
    pub fn cell_origin(&self, cell: &WeekCell<'_>) -> (f64, f64) {
        (
            self.label_width + cell.week_in_year as f64 * self.cell_pitch(),
            cell.year as f64 * self.cell_pitch(),
        )
    }

    /// Rectangle `(x0, y0, x1, y1)` to fill for a cell; the current cell
    /// grows by one gap on every side.
    pub fn cell_rect(&self, cell: &WeekCell<'_>) -> (f64, f64, f64, f64) {
        let (x, y) = self.cell_origin(cell);
        if cell.state == CellState::Current {
            (
                x - self.gap,
                y - self.gap,
                x + self.dot + self.gap,
                y + self.dot + self.gap,
            )
        } else {
            (x, y, x + self.dot, y + self.dot)
        }
    }

    /// Right-aligned year labels as `(year, x, baseline_y)`.
    pub fn year_labels(&self, config: &LifeConfig) -> Vec<(i64, f64, f64)> {
        let every = self.label_every_years.max(1);
        (0..i64::from(config.life_expectancy_years()))
            .filter(|year| year % every == 0)
            .map(|year| {
                (
                    year,
                    self.label_width - 4.0,
                    year as f64 * self.cell_pitch() + self.dot,
                )
            })
            .collect()
    }

    /// Map a point in grid coordinates back to the week under it.
    pub fn hit_test(&self, config: &LifeConfig, x: f64, y: f64) -> Option<i64> {
        if !x.is_finite() || !y.is_finite() {
            return None;
        }
        let week = ((x - self.label_width) / self.cell_pitch()).floor() as i64;
        let year = (y / self.cell_pitch()).floor() as i64;
        if !(0..WEEKS_PER_YEAR).contains(&week)
            || !(0..i64::from(config.life_expectancy_years())).contains(&year)
        {
            return None;
        }
        Some(year * WEEKS_PER_YEAR + week)
    }
}

/// Tooltip text for a hovered week.
pub fn describe_week(config: &LifeConfig, index: i64, weeks_lived: i64) -> String {
    let mut text = format!(
        "Year {}, Week {} - {}",
        index.div_euclid(WEEKS_PER_YEAR),
        index.rem_euclid(WEEKS_PER_YEAR) + 1,
        config.phase_for(index).name
    );
    match classify_week(index, weeks_lived) {
        CellState::Lived => text.push_str(" (lived)"),
        CellState::Current => text.push_str(" <- YOU ARE HERE"),
        CellState::Unlived => {}
    }
    text
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LegendEntry {
    pub name: String,
    pub color: Color,
}

/// Phases reachable within the configured lifespan, then the marker entry.
pub fn legend(config: &LifeConfig) -> Vec<LegendEntry> {
    let limit = f64::from(config.life_expectancy_years());
    config
        .phases()
        .iter()
        .filter(|phase| phase.max_age_years <= limit)
        .map(|phase| LegendEntry {
            name: phase.name.clone(),
            color: phase.color,
        })
        .chain(std::iter::once(LegendEntry {
            name: "You are here".to_string(),
            color: HIGHLIGHT_COLOR,
        }))
        .collect()
}
