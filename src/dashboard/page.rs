// src/dashboard/page.rs
//! Server-side rendering of the dashboard page and its price chart.

use chrono::NaiveDate;
use std::fmt::Write;

use crate::schema::UNITS;
use crate::table::{PriceFilter, PricePoint, PriceTable};

pub const TITLE: &str = "UK Banana Analytics";
pub const CHART_TITLE: &str = "Average Price of Bananas";
const DESCRIPTION: &str = "Average wholesale prices of bananas by country of origin. \
The prices are national averages of the most usual prices charged for bananas at \
wholesale markets in Birmingham and London.";

const LINE_COLOUR: &str = "#F9A602";
const WIDTH: f64 = 800.0;
const HEIGHT: f64 = 320.0;
const MARGIN_LEFT: f64 = 90.0;
const MARGIN_RIGHT: f64 = 20.0;
const MARGIN_TOP: f64 = 20.0;
const MARGIN_BOTTOM: f64 = 40.0;
const Y_TICKS: usize = 5;

const STYLE: &str = r#"
body { margin: 0; font-family: "Lato", sans-serif; background-color: #F7F7F7; }
.header { background-color: #222222; height: 256px; display: flex; flex-direction: column; justify-content: center; }
.header-emoji { font-size: 48px; margin: 0 auto; text-align: center; }
.header-title { color: #FFFFFF; font-size: 48px; font-weight: bold; text-align: center; margin: 0 auto; }
.header-description { color: #CFCFCF; margin: 4px auto; text-align: center; max-width: 384px; }
.wrapper { margin-right: auto; margin-left: auto; max-width: 1024px; padding: 0 10px; margin-top: 32px; }
.card { margin-bottom: 24px; box-shadow: 0 4px 6px 0 rgba(0, 0, 0, 0.18); background: #FFFFFF; padding: 12px; }
.menu { height: 112px; width: 912px; display: flex; justify-content: space-evenly; padding-top: 24px; margin: -80px auto 0 auto; background-color: #FFFFFF; box-shadow: 0 4px 6px 0 rgba(0, 0, 0, 0.18); }
.menu-title { margin-bottom: 6px; font-weight: bold; color: #079A82; }
.chart-title { font-size: 17px; margin: 0 0 8px 24px; }
"#;

/// `all_bananas` → `All Bananas`, `costa_rica` → `Costa Rica`.
pub fn titleize(s: &str) -> String {
    s.split(|c: char| c == '_' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// The full page for the current selection.
pub fn render(table: &PriceTable, filter: &PriceFilter, points: &[PricePoint]) -> String {
    let (min, max) = table
        .date_bounds()
        .unwrap_or((filter.start, filter.end));

    let mut options = String::new();
    for origin in table.origins() {
        let selected = if origin == filter.origin { " selected" } else { "" };
        let _ = write!(
            options,
            r#"<option value="{}"{}>{}</option>"#,
            escape(&origin),
            selected,
            escape(&titleize(&origin))
        );
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title}</title>
<link href="https://fonts.googleapis.com/css2?family=Lato:wght@400;700&display=swap" rel="stylesheet">
<style>{style}</style>
</head>
<body>
<div class="header">
<p class="header-emoji">🍌</p>
<h1 class="header-title">{title}</h1>
<p class="header-description">{description}</p>
</div>
<form class="menu" method="get" action="/">
<div>
<div class="menu-title">Origin</div>
<select id="origin-filter" name="origin" onchange="this.form.submit()">{options}</select>
</div>
<div>
<div class="menu-title">Date Range</div>
<input id="start-date" type="date" name="start_date" min="{min}" max="{max}" value="{start}" onchange="this.form.submit()">
<input id="end-date" type="date" name="end_date" min="{min}" max="{max}" value="{end}" onchange="this.form.submit()">
</div>
<noscript><button type="submit">Update</button></noscript>
</form>
<div class="wrapper">
<div class="card" id="price-chart">
<p class="chart-title">{chart_title}</p>
{chart}
</div>
</div>
</body>
</html>
"#,
        title = TITLE,
        style = STYLE,
        description = DESCRIPTION,
        options = options,
        min = iso(min),
        max = iso(max),
        start = iso(filter.start),
        end = iso(filter.end),
        chart_title = CHART_TITLE,
        chart = chart_svg(points),
    )
}

fn iso(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Line chart of `points` as inline SVG.
pub fn chart_svg(points: &[PricePoint]) -> String {
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return format!(
            r#"<svg viewBox="0 0 {WIDTH} {HEIGHT}" role="img"><text x="{}" y="{}" text-anchor="middle">No prices for this selection</text></svg>"#,
            WIDTH / 2.0,
            HEIGHT / 2.0
        );
    };

    let plot_w = WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
    let plot_h = HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;

    let span_days = (last.date - first.date).num_days() as f64;
    let x = |date: NaiveDate| {
        if span_days == 0.0 {
            MARGIN_LEFT + plot_w / 2.0
        } else {
            MARGIN_LEFT + plot_w * (date - first.date).num_days() as f64 / span_days
        }
    };

    let (mut lo, mut hi) = points.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
        (lo.min(p.price), hi.max(p.price))
    });
    if hi - lo < 1e-9 {
        lo -= 0.05;
        hi += 0.05;
    }
    let y = |price: f64| MARGIN_TOP + plot_h * (hi - price) / (hi - lo);

    let mut svg = String::new();
    let _ = write!(
        svg,
        r#"<svg viewBox="0 0 {WIDTH} {HEIGHT}" role="img" aria-label="{CHART_TITLE}">"#
    );

    for i in 0..Y_TICKS {
        let value = lo + (hi - lo) * i as f64 / (Y_TICKS - 1) as f64;
        let ty = y(value);
        let _ = write!(
            svg,
            r##"<line x1="{MARGIN_LEFT}" x2="{}" y1="{ty:.1}" y2="{ty:.1}" stroke="#E5E5E5"/><text x="{}" y="{:.1}" text-anchor="end" font-size="12">{UNITS} {value:.2}</text>"##,
            WIDTH - MARGIN_RIGHT,
            MARGIN_LEFT - 6.0,
            ty + 4.0,
        );
    }

    let path: Vec<String> = points
        .iter()
        .map(|p| format!("{:.1},{:.1}", x(p.date), y(p.price)))
        .collect();
    let _ = write!(
        svg,
        r#"<polyline fill="none" stroke="{LINE_COLOUR}" stroke-width="2" points="{}"/>"#,
        path.join(" ")
    );

    for p in points {
        let _ = write!(
            svg,
            r#"<circle cx="{:.1}" cy="{:.1}" r="3" fill="{LINE_COLOUR}"><title>{UNITS} {:.2} ({})</title></circle>"#,
            x(p.date),
            y(p.price),
            p.price,
            p.date.format("%d %b %Y"),
        );
    }

    let label_y = HEIGHT - MARGIN_BOTTOM / 3.0;
    let _ = write!(
        svg,
        r#"<text x="{MARGIN_LEFT}" y="{label_y:.1}" font-size="12">{}</text><text x="{}" y="{label_y:.1}" text-anchor="end" font-size="12">{}</text></svg>"#,
        first.date.format("%d %b %Y"),
        WIDTH - MARGIN_RIGHT,
        last.date.format("%d %b %Y"),
    );
    svg
}
