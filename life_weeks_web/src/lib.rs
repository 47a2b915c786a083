use std::time::Duration;

use chrono::Utc;
use leptos::*;
use life_weeks::{
    birth_instant, compute_stats_now, describe_week, earliest_birth_date, format_count,
    format_percent, legend, parse_birth_date, share_text, CellFill, CellState, GridLayout,
    LifeConfig, Stats, WeekGrid, SHARE_TITLE, WEEKS_PER_YEAR,
};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;

const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
const APP_COMMIT: &str = env!("GIT_COMMIT_HASH");

const PROGRESS_GRADIENT: &str =
    "linear-gradient(90deg, #FDE68A, #A7F3D0, #93C5FD, #C4B5FD, #F9A8D4, #FCA5A5)";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Renderer {
    Canvas,
    Dom,
}

impl Renderer {
    fn from_value(value: &str) -> Self {
        match value {
            "dom" => Renderer::Dom,
            _ => Renderer::Canvas,
        }
    }
}

fn css_rgba(fill: CellFill) -> String {
    format!(
        "rgba({}, {}, {}, {})",
        fill.color.r, fill.color.g, fill.color.b, fill.opacity
    )
}

fn stats_for_input(config: &LifeConfig, value: &str) -> Option<Stats> {
    if value.is_empty() {
        return None;
    }
    let date = parse_birth_date(value).ok()?;
    Some(compute_stats_now(birth_instant(date), config))
}

fn set_js(target: &JsValue, key: &str, value: &JsValue) {
    js_sys::Reflect::set(target, &JsValue::from_str(key), value).ok();
}

fn js_method(target: &JsValue, name: &str) -> Option<js_sys::Function> {
    js_sys::Reflect::get(target, &JsValue::from_str(name))
        .ok()
        .and_then(|v| v.dyn_into::<js_sys::Function>().ok())
}

async fn await_promise(value: JsValue) -> Result<JsValue, JsValue> {
    match value.dyn_into::<js_sys::Promise>() {
        Ok(promise) => JsFuture::from(promise).await,
        Err(other) => Ok(other),
    }
}

/// Hand the summary to the platform share sheet, or copy it when sharing
/// is unavailable. Failures are dropped: a dismissed share sheet is not an
/// error worth surfacing.
async fn share_or_copy(text: String) {
    let Some(window) = web_sys::window() else {
        return;
    };
    let navigator: JsValue = window.navigator().into();

    if let Some(share) = js_method(&navigator, "share") {
        let data = js_sys::Object::new();
        set_js(&data, "title", &JsValue::from_str(SHARE_TITLE));
        set_js(&data, "text", &JsValue::from_str(&text));
        if let Ok(pending) = share.call1(&navigator, &data) {
            let _ = await_promise(pending).await;
        }
        return;
    }

    let clipboard = js_sys::Reflect::get(&navigator, &JsValue::from_str("clipboard"))
        .unwrap_or(JsValue::UNDEFINED);
    if let Some(write_text) = js_method(&clipboard, "writeText") {
        if let Ok(pending) = write_text.call1(&clipboard, &JsValue::from_str(&text)) {
            let _ = await_promise(pending).await;
        }
    }
}

fn draw_canvas(
    canvas: &web_sys::HtmlCanvasElement,
    config: &LifeConfig,
    layout: &GridLayout,
    weeks_lived: i64,
) {
    let Some(ctx) = canvas
        .get_context("2d")
        .ok()
        .flatten()
        .and_then(|ctx| ctx.dyn_into::<web_sys::CanvasRenderingContext2d>().ok())
    else {
        return;
    };
    let dpr = web_sys::window()
        .map(|w| w.device_pixel_ratio())
        .filter(|r| *r > 0.0)
        .unwrap_or(1.0);
    let (width, height) = (layout.width(), layout.height(config));
    canvas.set_width((width * dpr).round() as u32);
    canvas.set_height((height * dpr).round() as u32);
    // resizing resets the transform
    ctx.scale(dpr, dpr).ok();
    ctx.clear_rect(0.0, 0.0, width, height);

    let ctx_js: &JsValue = ctx.as_ref();
    ctx.set_font("9px monospace");
    ctx.set_text_align("right");
    set_js(ctx_js, "fillStyle", &JsValue::from_str("#D1D5DB"));
    for (year, x, y) in layout.year_labels(config) {
        ctx.fill_text(&year.to_string(), x, y).ok();
    }

    for cell in WeekGrid::new(config, weeks_lived).cells() {
        let fill = cell.fill();
        let (x0, y0, x1, y1) = layout.cell_rect(&cell);
        ctx.set_global_alpha(fill.opacity);
        set_js(ctx_js, "fillStyle", &JsValue::from_str(&fill.color.to_hex()));
        ctx.fill_rect(x0, y0, x1 - x0, y1 - y0);
    }
    ctx.set_global_alpha(1.0);
}

fn canvas_week_at(
    canvas: &web_sys::HtmlCanvasElement,
    config: &LifeConfig,
    layout: &GridLayout,
    client_x: f64,
    client_y: f64,
) -> Option<i64> {
    let rect = canvas.get_bounding_client_rect();
    if rect.width() <= 0.0 || rect.height() <= 0.0 {
        return None;
    }
    let scale_x = layout.width() / rect.width();
    let scale_y = layout.height(config) / rect.height();
    layout.hit_test(
        config,
        (client_x - rect.left()) * scale_x,
        (client_y - rect.top()) * scale_y,
    )
}

#[component]
fn CanvasGrid(
    config: StoredValue<LifeConfig>,
    weeks_lived: i64,
    on_hover: WriteSignal<Option<i64>>,
) -> impl IntoView {
    let canvas_ref = create_node_ref::<html::Canvas>();
    let layout = GridLayout::default();
    let (width, height) = config.with_value(|c| (layout.width(), layout.height(c)));

    create_effect(move |_| {
        if let Some(canvas) = canvas_ref.get() {
            config.with_value(|c| draw_canvas(&canvas, c, &layout, weeks_lived));
        }
    });

    let week_at = move |x: f64, y: f64| -> Option<i64> {
        let canvas = canvas_ref.get_untracked()?;
        config.with_value(|c| canvas_week_at(&canvas, c, &layout, x, y))
    };

    view! {
        <div class="overflow-x-auto">
            <canvas
                node_ref=canvas_ref
                class="cursor-crosshair"
                style=format!("width:{width}px;height:{height}px")
                on:mousemove=move |ev| on_hover.set(week_at(ev.client_x() as f64, ev.client_y() as f64))
                on:click=move |ev| on_hover.set(week_at(ev.client_x() as f64, ev.client_y() as f64))
                on:mouseleave=move |_| on_hover.set(None)
                on:touchstart=move |ev| {
                    if let Some(touch) = ev.touches().get(0) {
                        on_hover.set(week_at(touch.client_x() as f64, touch.client_y() as f64));
                    }
                }
            />
        </div>
    }
}

#[component]
fn DomGrid(
    config: StoredValue<LifeConfig>,
    weeks_lived: i64,
    on_hover: WriteSignal<Option<i64>>,
) -> impl IntoView {
    let layout = GridLayout::default();
    let years = config.with_value(|c| i64::from(c.life_expectancy_years()));
    let rows = (0..years)
        .map(|year| {
            let label = if year % layout.label_every_years == 0 {
                year.to_string()
            } else {
                String::new()
            };
            let cells = config.with_value(|c| {
                let grid = WeekGrid::new(c, weeks_lived);
                (year * WEEKS_PER_YEAR..(year + 1) * WEEKS_PER_YEAR)
                    .map(|index| {
                        let cell = grid.cell(index);
                        let current = cell.state == CellState::Current;
                        let size = if current { layout.dot + 2.0 * layout.gap } else { layout.dot };
                        let margin = if current { -layout.gap } else { 0.0 };
                        let style = format!(
                            "width:{size}px;height:{size}px;margin:{margin}px;background:{};flex:none",
                            css_rgba(cell.fill())
                        );
                        view! {
                            <div style=style on:mouseenter=move |_| on_hover.set(Some(index))></div>
                        }
                    })
                    .collect_view()
            });
            view! {
                <div style=format!("display:flex;gap:{}px;height:{}px;align-items:center", layout.gap, layout.cell_pitch())>
                    <span style=format!("width:{}px;font:9px monospace;color:#D1D5DB;text-align:right;padding-right:4px;flex:none", layout.label_width - 4.0)>{label}</span>
                    {cells}
                </div>
            }
        })
        .collect_view();

    view! {
        <div class="overflow-x-auto" on:mouseleave=move |_| on_hover.set(None)>{rows}</div>
    }
}

#[component]
pub fn App() -> impl IntoView {
    let config = store_value(LifeConfig::default());
    let (birthday, set_birthday) = create_signal(String::new());
    let (show_grid, set_show_grid) = create_signal(false);
    let (hovered_week, set_hovered_week) = create_signal(Option::<i64>::None);
    let (animation_done, set_animation_done) = create_signal(false);
    let (renderer, set_renderer) = create_signal(Renderer::Canvas);

    let stats = create_memo(move |_| {
        let value = birthday.get();
        config.with_value(|c| stats_for_input(c, &value))
    });

    let today = Utc::now().date_naive().format("%Y-%m-%d").to_string();
    let earliest = earliest_birth_date().format("%Y-%m-%d").to_string();

    let on_start = move |_| {
        if birthday.get_untracked().is_empty() {
            return;
        }
        set_show_grid.set(true);
        // let the grid paint before the progress bar animates
        set_timeout(move || set_animation_done.set(true), Duration::from_millis(100));
    };

    let on_share = move |_| {
        if let Some(current) = stats.get_untracked() {
            spawn_local(share_or_copy(share_text(&current)));
        }
    };

    let on_reset = move |_| {
        set_show_grid.set(false);
        set_animation_done.set(false);
        set_hovered_week.set(None);
        set_birthday.set(String::new());
    };

    let total_weeks = config.with_value(|c| c.total_weeks());
    let life_expectancy = config.with_value(|c| c.life_expectancy_years());

    let landing = move || {
        view! {
            <div class="landing">
                <h1>"Life in Weeks"</h1>
                <p class="subtitle">
                    "Your entire life, visualized as a grid of tiny boxes. Each box is one week. "
                    {format_count(total_weeks)}
                    " total. How many have you used?"
                </p>
                <label class="note">"When were you born?"</label>
                <input
                    type="date"
                    min=earliest.clone()
                    max=today.clone()
                    prop:value=move || birthday.get()
                    on:input=move |ev| set_birthday.set(event_target_value(&ev))
                />
                <button class="btn" on:click=on_start disabled=move || birthday.get().is_empty()>
                    "Show My Life"
                </button>
                <p class="note">"Your birthday never leaves your browser. No tracking. No storage."</p>
            </div>
        }
    };

    let grid_view = move |current: Stats| {
        let lived = current.weeks_lived;
        let remaining = format_count(current.weeks_remaining);
        let phase_color = config.with_value(|c| current.phase_display_color(c));
        let phase_name = current.current_phase_name.clone();
        let legend_entries = config.with_value(legend);
        let percent = current.percent_lived;
        let summers_left = current.summers_left;
        let bonus_time = current.is_bonus_time();
        view! {
            <div class="grid-view">
                <header>
                    <div>
                        <h2>"Life in Weeks"</h2>
                        <p class="note">
                            {format!("{}% lived · {} weeks remaining", format_percent(percent), remaining)}
                        </p>
                    </div>
                    <button class="btn" on:click=on_share>"Share"</button>
                    <button class="btn secondary" on:click=on_reset>"Reset"</button>
                </header>
                <section class="stats">
                    <div class="card"><b>{format_count(lived)}</b><span>"weeks lived"</span></div>
                    <div class="card"><b>{remaining.clone()}</b><span>"weeks remaining"</span></div>
                    <div class="card"><b class="red">{summers_left}</b><span>"summers left"</span></div>
                    <div class="card">
                        <b style=format!("color:{}", phase_color.to_hex())>{phase_name}</b>
                        <span>"current phase"</span>
                    </div>
                </section>
                <section class="progress">
                    <div class="track">
                        <div
                            class="bar"
                            style=move || format!(
                                "width:{}%;background:{};transition:width 1s ease-out",
                                if animation_done.get() { percent } else { 0.0 },
                                PROGRESS_GRADIENT
                            )
                        ></div>
                    </div>
                    <div class="scale">
                        <span>"Born"</span>
                        <span>{format!("{}%", format_percent(percent))}</span>
                        <span>{format!("{} years", life_expectancy)}</span>
                    </div>
                </section>
                <section class="legend">
                    {legend_entries
                        .into_iter()
                        .map(|entry| view! {
                            <span class="legend-entry">
                                <i style=format!("background:{}", entry.color.to_hex())></i>
                                {entry.name}
                            </span>
                        })
                        .collect_view()}
                </section>
                <section class="control-row">
                    <label class="note">"Renderer:"</label>
                    <select on:change=move |ev| set_renderer.set(Renderer::from_value(&event_target_value(&ev)))>
                        <option value="canvas" selected=move || renderer.get() == Renderer::Canvas>"Canvas"</option>
                        <option value="dom" selected=move || renderer.get() == Renderer::Dom>"DOM"</option>
                    </select>
                </section>
                <section class="grid">
                    {move || match renderer.get() {
                        Renderer::Canvas => view! { <CanvasGrid config=config weeks_lived=lived on_hover=set_hovered_week/> }.into_view(),
                        Renderer::Dom => view! { <DomGrid config=config weeks_lived=lived on_hover=set_hovered_week/> }.into_view(),
                    }}
                </section>
                {move || hovered_week.get().map(|week| {
                    let text = config.with_value(|c| describe_week(c, week, lived));
                    view! { <div class="tooltip">{text}</div> }
                })}
                <Show when=move || bonus_time>
                    <div class="bonus">
                        <p>"✨ You're in bonus time"</p>
                        <p class="note">"You've lived beyond the average life expectancy. Every week from here is a gift."</p>
                    </div>
                </Show>
                <blockquote>"“The trouble is, you think you have time.”"</blockquote>
                <p class="note">"— attributed to Buddha"</p>
                <button class="btn" on:click=on_share>"📤 Share Your Life Grid"</button>
                <footer class="note">
                    <p>{format!("Based on an average life expectancy of {} years.", life_expectancy)}</p>
                    <p>"Your birthday never leaves your browser."</p>
                    <p>{"Web version "}{APP_VERSION}{" ("}{APP_COMMIT}{")"}</p>
                </footer>
            </div>
        }
    };

    view! {
        <main>
            {move || match (show_grid.get(), stats.get()) {
                (true, Some(current)) => grid_view(current).into_view(),
                _ => landing().into_view(),
            }}
        </main>
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen::prelude::wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    leptos::mount_to_body(|| view! { <App/> });
}
