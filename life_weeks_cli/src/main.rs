use std::fs;
use std::fs::File;
use std::io::{self, Write};
use std::panic;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{ArgAction, Args, Parser, Subcommand, ValueHint};
use life_weeks::preview::{
    PreviewGrid, PREVIEW_BACKGROUND, PREVIEW_CAPTION_COLOR, PREVIEW_HEIGHT, PREVIEW_TITLE_COLOR,
    PREVIEW_WIDTH,
};
use life_weeks::{
    birth_instant, check_birth_date, compute_stats, describe_week, format_count, format_percent,
    legend, parse_birth_date, share_text, GridLayout, LifeConfig, Stats, WeekGrid,
};
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::{FontDesc, FontFamily, FontStyle};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Your life as a grid of weeks", long_about = None)]
struct Cli {
    /// Optional JSON model configuration (life expectancy, phase table)
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(long, global = true, action = ArgAction::SetTrue)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print weeks lived, weeks remaining and the current life phase
    Stats(StatsArgs),
    /// Print the shareable text summary
    Share(BirthArgs),
    /// Describe a single week of the grid
    Week(WeekArgs),
    /// Render the week grid as PNG/SVG and/or write the per-week CSV
    Grid(GridArgs),
    /// Render the static link-preview image
    Preview(PreviewArgs),
}

#[derive(Args, Debug)]
struct BirthArgs {
    /// Birth date (YYYY-MM-DD)
    #[arg(long)]
    born: String,

    /// Reference instant (RFC 3339); defaults to the current time
    #[arg(long)]
    now: Option<String>,

    /// Accept birth dates outside 1924-01-01..=today
    #[arg(long, action = ArgAction::SetTrue)]
    unchecked: bool,
}

#[derive(Args, Debug)]
struct StatsArgs {
    #[command(flatten)]
    birth: BirthArgs,

    /// Emit JSON instead of a text summary
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,
}

#[derive(Args, Debug)]
struct WeekArgs {
    #[command(flatten)]
    birth: BirthArgs,

    /// Zero-based week index
    #[arg(long, allow_negative_numbers = true)]
    index: i64,
}

#[derive(Args, Debug)]
struct GridArgs {
    #[command(flatten)]
    birth: BirthArgs,

    /// Output PNG path
    #[arg(short, long, default_value = "life_grid.png", value_hint = ValueHint::FilePath)]
    output: PathBuf,

    /// Output SVG path
    #[arg(long, value_hint = ValueHint::FilePath)]
    svg: Option<PathBuf>,

    /// Per-week classification CSV (`-` for stdout)
    #[arg(long, value_hint = ValueHint::FilePath)]
    csv: Option<PathBuf>,

    /// Disable image generation
    #[arg(long, action = ArgAction::SetTrue)]
    no_plot: bool,

    /// Skip year labels and the legend (shapes only)
    #[arg(long, action = ArgAction::SetTrue)]
    no_labels: bool,

    /// Pixel scale factor applied to the grid geometry
    #[arg(long, default_value_t = 2.0)]
    scale: f64,
}

#[derive(Args, Debug)]
struct PreviewArgs {
    /// Output PNG path
    #[arg(short, long, default_value = "og.png", value_hint = ValueHint::FilePath)]
    output: PathBuf,

    /// Output SVG path
    #[arg(long, value_hint = ValueHint::FilePath)]
    svg: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug)]
enum ChartKind {
    Png,
    Svg,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Command::Stats(args) => handle_stats(&config, args),
        Command::Share(args) => handle_share(&config, args),
        Command::Week(args) => handle_week(&config, args),
        Command::Grid(args) => handle_grid(&config, args),
        Command::Preview(args) => handle_preview(args),
    }
}

fn load_config(path: Option<&Path>) -> Result<LifeConfig> {
    let Some(path) = path else {
        return Ok(LifeConfig::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config = LifeConfig::from_json(&text)
        .with_context(|| format!("invalid config {}", path.display()))?;
    debug!(
        "Loaded config {}: {} years, {} phases",
        path.display(),
        config.life_expectancy_years(),
        config.phases().len()
    );
    Ok(config)
}

fn resolve_now(now: Option<&str>) -> Result<DateTime<Utc>> {
    match now {
        Some(text) => Ok(DateTime::parse_from_rfc3339(text)
            .with_context(|| format!("invalid --now '{}': expected RFC 3339", text))?
            .with_timezone(&Utc)),
        None => Ok(Utc::now()),
    }
}

fn resolve_birth(args: &BirthArgs, now: DateTime<Utc>) -> Result<NaiveDate> {
    let date = parse_birth_date(&args.born)?;
    if args.unchecked {
        return Ok(date);
    }
    check_birth_date(date, now.date_naive()).context("pass --unchecked to compute anyway")
}

fn stats_for(config: &LifeConfig, args: &BirthArgs) -> Result<Stats> {
    let now = resolve_now(args.now.as_deref())?;
    let born = resolve_birth(args, now)?;
    let stats = compute_stats(birth_instant(born), now, config);
    if stats.weeks_lived < 0 {
        warn!("Birth date {} lies after {}; no week is marked lived", born, now);
    }
    Ok(stats)
}

fn handle_stats(config: &LifeConfig, args: StatsArgs) -> Result<()> {
    let stats = stats_for(config, &args.birth)?;
    let mut stdout = io::stdout().lock();
    if args.json {
        serde_json::to_writer_pretty(&mut stdout, &stats)?;
        writeln!(stdout)?;
    } else {
        write_stats_summary(&mut stdout, &stats)?;
    }
    Ok(())
}

fn write_stats_summary<W: Write>(out: &mut W, stats: &Stats) -> Result<()> {
    writeln!(
        out,
        "Weeks lived:      {} of {} ({}%)",
        format_count(stats.weeks_lived),
        format_count(stats.total_weeks),
        format_percent(stats.percent_lived)
    )?;
    writeln!(out, "Weeks remaining:  {}", format_count(stats.weeks_remaining))?;
    writeln!(out, "Current age:      {:.1} years", stats.current_age_years)?;
    writeln!(out, "Current phase:    {}", stats.current_phase_name)?;
    writeln!(out, "Summers left:     {}", stats.summers_left)?;
    writeln!(out, "Christmases left: {}", stats.christmases_left)?;
    if stats.is_bonus_time() {
        writeln!(
            out,
            "You're in bonus time: past the {}-year life expectancy.",
            stats.life_expectancy_years
        )?;
    }
    Ok(())
}

fn handle_share(config: &LifeConfig, args: BirthArgs) -> Result<()> {
    let stats = stats_for(config, &args)?;
    println!("{}", share_text(&stats));
    Ok(())
}

fn handle_week(config: &LifeConfig, args: WeekArgs) -> Result<()> {
    if !(0..config.total_weeks()).contains(&args.index) {
        return Err(anyhow!(
            "week index {} outside 0..{}",
            args.index,
            config.total_weeks()
        ));
    }
    let stats = stats_for(config, &args.birth)?;
    println!("{}", describe_week(config, args.index, stats.weeks_lived));
    Ok(())
}

fn handle_grid(config: &LifeConfig, args: GridArgs) -> Result<()> {
    if !args.scale.is_finite() || args.scale <= 0.0 || args.scale > MAX_SCALE {
        return Err(anyhow!("--scale must be in (0, {MAX_SCALE}]"));
    }
    let stats = stats_for(config, &args.birth)?;
    let grid = WeekGrid::from_stats(config, &stats);
    info!(
        "Weeks lived: {} of {} ({}%), phase {}",
        stats.weeks_lived,
        stats.total_weeks,
        format_percent(stats.percent_lived),
        stats.current_phase_name
    );

    if let Some(path) = args.csv.as_ref() {
        let t_csv = Instant::now();
        if path.as_os_str() == "-" {
            write_cells_csv(&grid, io::stdout().lock())?;
        } else {
            let file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            write_cells_csv(&grid, file)?;
            info!("Wrote week CSV: {}", path.display());
        }
        debug!("CSV stage: {:.1} ms", t_csv.elapsed().as_secs_f64() * 1000.0);
    }

    if args.no_plot {
        return Ok(());
    }

    let opts = GridRenderOptions {
        layout: GridLayout::default().scaled(args.scale),
        labels: !args.no_labels,
    };
    let mut targets = vec![(args.output.as_path(), ChartKind::Png)];
    if let Some(path) = args.svg.as_deref() {
        targets.push((path, ChartKind::Svg));
    }
    for (path, kind) in targets {
        let t_plot = Instant::now();
        match render_guard(|| render_grid(config, &stats, path, kind, &opts)) {
            Ok(()) => info!("Wrote grid: {}", path.display()),
            Err(err) => warn!("Skipping grid render ({}): {}", path.display(), err),
        }
        debug!("Plot stage: {:.1} ms", t_plot.elapsed().as_secs_f64() * 1000.0);
    }
    Ok(())
}

fn handle_preview(args: PreviewArgs) -> Result<()> {
    let preview = PreviewGrid::default();
    let mut targets = vec![(args.output.as_path(), ChartKind::Png)];
    if let Some(path) = args.svg.as_deref() {
        targets.push((path, ChartKind::Svg));
    }
    for (path, kind) in targets {
        match render_guard(|| render_preview(&preview, path, kind)) {
            Ok(()) => info!("Wrote preview: {}", path.display()),
            Err(err) => warn!("Skipping preview render ({}): {}", path.display(), err),
        }
    }
    Ok(())
}

fn write_cells_csv<W: Write>(grid: &WeekGrid<'_>, sink: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(sink);
    writer.write_record(["index", "year", "week", "state", "phase", "color", "opacity"])?;
    for cell in grid.cells() {
        let fill = cell.fill();
        writer.write_record([
            cell.index.to_string(),
            cell.year.to_string(),
            (cell.week_in_year + 1).to_string(),
            cell.state.as_str().to_string(),
            cell.phase.name.clone(),
            fill.color.to_hex(),
            format!("{:.1}", fill.opacity),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

#[derive(Clone, Debug)]
struct GridRenderOptions {
    layout: GridLayout,
    labels: bool,
}

/// Run a render closure, turning both errors and backend panics (font
/// loading inside plotters can panic) into a message.
fn render_guard<F>(render: F) -> Result<(), String>
where
    F: FnOnce() -> Result<()>,
{
    panic::catch_unwind(panic::AssertUnwindSafe(render))
        .map_err(|_| "plotting backend panicked".to_string())?
        .map_err(|err| format!("plotting error: {:#}", err))
}

fn rgb(color: life_weeks::Color) -> RGBColor {
    RGBColor(color.r, color.g, color.b)
}

const LABEL_COLOR: RGBColor = RGBColor(0xD1, 0xD5, 0xDB);
const CAPTION_COLOR: RGBColor = RGBColor(0x6B, 0x72, 0x80);
const GRID_MARGIN: f64 = 16.0;
/// Upper bound for `--scale`; the bitmap grows with its square.
const MAX_SCALE: f64 = 16.0;
const LEGEND_HEIGHT: f64 = 28.0;

fn grid_canvas_size(config: &LifeConfig, opts: &GridRenderOptions) -> (u32, u32) {
    let legend = if opts.labels { LEGEND_HEIGHT } else { 0.0 };
    let scale = opts.layout.cell_pitch() / GridLayout::default().cell_pitch();
    (
        (opts.layout.width() + 2.0 * GRID_MARGIN * scale).ceil() as u32,
        (opts.layout.height(config) + 2.0 * GRID_MARGIN * scale + legend * scale).ceil() as u32,
    )
}

fn render_grid(
    config: &LifeConfig,
    stats: &Stats,
    path: &Path,
    kind: ChartKind,
    opts: &GridRenderOptions,
) -> Result<()> {
    let size = grid_canvas_size(config, opts);
    match kind {
        ChartKind::Png => {
            let root = BitMapBackend::new(path, size).into_drawing_area();
            draw_grid(root, config, stats, opts)
        }
        ChartKind::Svg => {
            let root = SVGBackend::new(path, size).into_drawing_area();
            draw_grid(root, config, stats, opts)
        }
    }
}

fn draw_grid<DB>(
    root: DrawingArea<DB, plotters::coord::Shift>,
    config: &LifeConfig,
    stats: &Stats,
    opts: &GridRenderOptions,
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;
    let layout = &opts.layout;
    let scale = layout.cell_pitch() / GridLayout::default().cell_pitch();
    let margin = GRID_MARGIN * scale;
    let px = |v: f64| (v + margin).round() as i32;

    if opts.labels {
        let label_font = FontDesc::new(FontFamily::Monospace, 9.0 * scale, FontStyle::Normal)
            .color(&LABEL_COLOR)
            .pos(Pos::new(HPos::Right, VPos::Bottom));
        for (year, x, y) in layout.year_labels(config) {
            root.draw(&Text::new(year.to_string(), (px(x), px(y)), label_font.clone()))?;
        }
    }

    let grid = WeekGrid::from_stats(config, stats);
    for cell in grid.cells() {
        let fill = cell.fill();
        let (x0, y0, x1, y1) = layout.cell_rect(&cell);
        root.draw(&Rectangle::new(
            [(px(x0), px(y0)), (px(x1), px(y1))],
            rgb(fill.color).mix(fill.opacity).filled(),
        ))?;
    }

    if opts.labels {
        draw_legend(&root, config, layout.height(config) + margin * 2.0, scale)?;
    }

    root.present()?;
    Ok(())
}

fn draw_legend<DB>(
    root: &DrawingArea<DB, plotters::coord::Shift>,
    config: &LifeConfig,
    top: f64,
    scale: f64,
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let swatch = (6.0 * scale).round() as i32;
    let font = FontDesc::new(FontFamily::SansSerif, 8.0 * scale, FontStyle::Normal)
        .color(&CAPTION_COLOR)
        .pos(Pos::new(HPos::Left, VPos::Center));
    let mut x = (GRID_MARGIN * scale).round() as i32;
    let y = top.round() as i32;
    for entry in legend(config) {
        root.draw(&Rectangle::new(
            [(x, y - swatch / 2), (x + swatch, y + swatch / 2)],
            rgb(entry.color).filled(),
        ))?;
        x += swatch + (3.0 * scale).round() as i32;
        root.draw(&Text::new(entry.name.clone(), (x, y), font.clone()))?;
        let (w, _) = root.estimate_text_size(&entry.name, &font)?;
        x += w as i32 + (8.0 * scale).round() as i32;
    }
    Ok(())
}

fn render_preview(preview: &PreviewGrid, path: &Path, kind: ChartKind) -> Result<()> {
    let size = (PREVIEW_WIDTH, PREVIEW_HEIGHT);
    match kind {
        ChartKind::Png => draw_preview(BitMapBackend::new(path, size).into_drawing_area(), preview),
        ChartKind::Svg => draw_preview(SVGBackend::new(path, size).into_drawing_area(), preview),
    }
}

fn draw_preview<DB>(root: DrawingArea<DB, plotters::coord::Shift>, preview: &PreviewGrid) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&rgb(PREVIEW_BACKGROUND))?;
    let center_x = (PREVIEW_WIDTH / 2) as i32;
    let top_center = Pos::new(HPos::Center, VPos::Top);

    let title_font = FontDesc::new(FontFamily::SansSerif, preview.title_size, FontStyle::Bold)
        .color(&rgb(PREVIEW_TITLE_COLOR))
        .pos(top_center);
    root.draw(&Text::new(
        preview.title,
        (center_x, preview.title_y().round() as i32),
        title_font,
    ))?;

    let caption = rgb(PREVIEW_CAPTION_COLOR);
    let subtitle_font = FontDesc::new(FontFamily::SansSerif, preview.subtitle_size, FontStyle::Normal)
        .color(&caption)
        .pos(top_center);
    root.draw(&Text::new(
        preview.subtitle,
        (center_x, preview.subtitle_y().round() as i32),
        subtitle_font,
    ))?;

    let size = preview.cell.round() as i32;
    for cell in preview.cells() {
        let (x, y) = (cell.x.round() as i32, cell.y.round() as i32);
        root.draw(&Rectangle::new(
            [(x, y), (x + size, y + size)],
            rgb(cell.fill.color).mix(cell.fill.opacity).filled(),
        ))?;
    }

    let footer_font = FontDesc::new(FontFamily::SansSerif, preview.footer_size, FontStyle::Normal)
        .color(&caption)
        .pos(top_center);
    root.draw(&Text::new(
        preview.footer,
        (center_x, preview.footer_y().round() as i32),
        footer_font,
    ))?;

    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn birth(born: &str, now: &str) -> BirthArgs {
        BirthArgs {
            born: born.to_string(),
            now: Some(now.to_string()),
            unchecked: false,
        }
    }

    #[test]
    fn parses_grid_subcommand() {
        let cli = Cli::try_parse_from([
            "life-weeks",
            "grid",
            "--born",
            "1990-05-01",
            "--svg",
            "out.svg",
            "--no-plot",
            "--verbose",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Command::Grid(args) => {
                assert_eq!(args.birth.born, "1990-05-01");
                assert_eq!(args.svg, Some(PathBuf::from("out.svg")));
                assert_eq!(args.output, PathBuf::from("life_grid.png"));
                assert!(args.no_plot);
                assert_eq!(args.scale, 2.0);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn stats_require_birth_date() {
        assert!(Cli::try_parse_from(["life-weeks", "stats"]).is_err());
    }

    #[test]
    fn range_check_applies_unless_unchecked() {
        let config = LifeConfig::default();
        let mut args = birth("2030-01-01", "2024-06-01T00:00:00Z");
        assert!(stats_for(&config, &args).is_err());
        args.unchecked = true;
        let stats = stats_for(&config, &args).unwrap();
        assert!(stats.weeks_lived < 0);
        assert_eq!(stats.percent_lived, 0.0);
    }

    #[test]
    fn stats_use_reference_instant() {
        let config = LifeConfig::default();
        let stats = stats_for(&config, &birth("2000-01-01", "2000-01-15T00:00:00Z")).unwrap();
        assert_eq!(stats.weeks_lived, 2);
        assert!(resolve_now(Some("yesterday")).is_err());
    }

    #[test]
    fn summary_mentions_bonus_time() {
        let config = LifeConfig::default();
        let args = birth("1924-01-01", "2024-06-01T00:00:00Z");
        let stats = stats_for(&config, &args).unwrap();
        let mut out = Vec::new();
        write_stats_summary(&mut out, &stats).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Current phase:    Bonus"));
        assert!(text.contains("bonus time"));
    }

    #[test]
    fn summary_rounds_percent_ties_up() {
        let config = LifeConfig::default();
        let stats = stats_for(&config, &birth("2023-01-02", "2024-01-01T00:00:00Z")).unwrap();
        assert_eq!(stats.weeks_lived, 52);
        let mut out = Vec::new();
        write_stats_summary(&mut out, &stats).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("Weeks lived:      52 of 4,160 (1.3%)"));
    }

    #[test]
    fn grid_scale_is_bounded() {
        let config = LifeConfig::default();
        for scale in ["100", "16.5", "0"] {
            let cli = Cli::try_parse_from([
                "life-weeks",
                "grid",
                "--born",
                "1990-05-01",
                "--no-plot",
                "--scale",
                scale,
            ])
            .unwrap();
            let Command::Grid(args) = cli.command else {
                panic!("expected grid command");
            };
            assert!(handle_grid(&config, args).is_err(), "scale {scale} accepted");
        }
    }

    #[test]
    fn csv_lists_every_week() {
        let config = LifeConfig::default();
        let grid = WeekGrid::new(&config, 2);
        let mut out = Vec::new();
        write_cells_csv(&grid, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 4160 + 1);
        assert_eq!(lines[0], "index,year,week,state,phase,color,opacity");
        assert_eq!(lines[1], "0,0,1,lived,Childhood,#FDE68A,1.0");
        assert_eq!(lines[3], "2,0,3,current,Childhood,#EF4444,1.0");
        assert_eq!(lines[4], "3,0,4,unlived,Childhood,#E5E7EB,0.3");
    }

    #[test]
    fn config_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("life.json");
        fs::write(&path, r#"{ "life_expectancy_years": 90 }"#).unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.total_weeks(), 4680);
        fs::write(&path, r#"{ "phases": [] }"#).unwrap();
        assert!(load_config(Some(&path)).is_err());
        assert!(load_config(Some(&dir.path().join("missing.json"))).is_err());
    }

    #[test]
    fn example_config_is_valid() {
        let config = LifeConfig::from_json(include_str!("../life.example.json")).unwrap();
        assert_eq!(config.life_expectancy_years(), 85);
        assert_eq!(config.phase_for(30 * 52).name, "Career");
    }

    #[test]
    fn svg_grid_without_labels_renders_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grid.svg");
        let config = LifeConfig::default();
        let stats = stats_for(&config, &birth("1990-01-01", "2024-01-01T00:00:00Z")).unwrap();
        let opts = GridRenderOptions {
            layout: GridLayout::default(),
            labels: false,
        };
        render_grid(&config, &stats, &path, ChartKind::Svg, &opts).unwrap();
        let svg = fs::read_to_string(&path).unwrap();
        assert!(svg.contains("<rect"));
        assert!(svg.contains("#EF4444") || svg.contains("#ef4444"));
    }
}
