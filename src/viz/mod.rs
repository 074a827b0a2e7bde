//! Visualization: render one dashboard chart to **SVG** or **PNG**.
//!
//! - Single series line with point markers (Office palette)
//! - Locale-aware tick labels (`30,000` vs `30.000`)
//! - Large magnitudes scaled to millions/billions unless the axis is a percentage
//!
//! Plotters' `ab_glyph` text path does not discover OS fonts, so a TrueType
//! file is registered once per process (see [`ensure_font_registered`]).

pub mod util;

use crate::dashboard::{ChartPanel, Panel};
use anyhow::{Context, Result, anyhow};
use log::debug;
use num_format::Locale;

use plotters::backend::DrawingBackend;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::series::LineSeries;
use plotters::style::{FontFamily, FontStyle};

use plotters_bitmap::BitMapBackend;
use plotters_svg::SVGBackend;

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use util::{
    SERIES_COLOR, choose_axis_scale, compute_left_label_area_px, is_percentage_like, map_locale,
};

/// Environment variable naming a TrueType font to use for chart text.
pub const FONT_ENV: &str = "ENVDASH_FONT";

const FONT_CANDIDATES: [&str; 7] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu-sans-fonts/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

static REGISTERED_FONT: OnceLock<PathBuf> = OnceLock::new();

/// First usable font: the explicit path, then `ENVDASH_FONT`, then well-known locations.
pub fn locate_font(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = explicit {
        return Some(p.to_path_buf());
    }
    if let Ok(p) = std::env::var(FONT_ENV) {
        if !p.trim().is_empty() {
            return Some(PathBuf::from(p));
        }
    }
    FONT_CANDIDATES
        .iter()
        .map(PathBuf::from)
        .find(|p| p.is_file())
}

/// Register a "sans-serif" font for the `ab_glyph` text path. Only the first
/// successful call has an effect.
pub fn ensure_font_registered(explicit: Option<&Path>) -> Result<()> {
    if REGISTERED_FONT.get().is_some() {
        return Ok(());
    }
    let path = locate_font(explicit)
        .ok_or_else(|| anyhow!("no TrueType font found; pass --font or set {}", FONT_ENV))?;
    let bytes = std::fs::read(&path).with_context(|| format!("read font {}", path.display()))?;
    // plotters keeps a reference for the rest of the process
    let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
    plotters::style::register_font("sans-serif", FontStyle::Normal, bytes)
        .map_err(|_| anyhow!("invalid font {}", path.display()))?;
    debug!("registered chart font {}", path.display());
    let _ = REGISTERED_FONT.set(path);
    Ok(())
}

/// Render `panel` to `out_path` (`.svg` → SVG, anything else → PNG).
///
/// Fails when the panel is missing, when the selection has no numeric points,
/// or when no font can be registered.
pub fn plot_chart<P: AsRef<Path>>(
    panel: &ChartPanel,
    out_path: P,
    width: u32,
    height: u32,
    locale_tag: &str,
    font: Option<&Path>,
) -> Result<()> {
    let series = match &panel.body {
        Panel::Ready(series) => series,
        Panel::Missing(msg) => return Err(anyhow!("{}", msg)),
    };
    let points = series.points();
    if points.is_empty() {
        return Err(anyhow!("no data to plot for {}", panel.title));
    }
    ensure_font_registered(font)?;

    let out_path = out_path.as_ref();
    let path_string = out_path.to_string_lossy().into_owned();
    let (num_locale, dec_sep) = map_locale(locale_tag);

    if out_path.extension().and_then(|s| s.to_str()) == Some("svg") {
        let root = SVGBackend::new(path_string.as_str(), (width, height)).into_drawing_area();
        draw_chart(root, &panel.title, panel.y_label, &points, num_locale, dec_sep)?;
    } else {
        let root = BitMapBackend::new(path_string.as_str(), (width, height)).into_drawing_area();
        draw_chart(root, &panel.title, panel.y_label, &points, num_locale, dec_sep)?;
    }
    Ok(())
}

/// Draw a single year/value series to any Plotters backend.
fn draw_chart<DB>(
    root: DrawingArea<DB, Shift>,
    title: &str,
    y_label: &str,
    points: &[(i32, f64)],
    num_locale: &Locale,
    dec_sep: char,
) -> Result<()>
where
    DB: DrawingBackend,
{
    const MARGIN: u32 = 16;

    let (mut min_year, mut max_year) = (points[0].0, points[points.len() - 1].0);
    if min_year == max_year {
        min_year -= 1;
        max_year += 1;
    }
    let (mut min_val, mut max_val) = (
        points.iter().map(|p| p.1).fold(f64::INFINITY, f64::min),
        points.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max),
    );
    if (max_val - min_val).abs() < f64::EPSILON {
        min_val -= 1.0;
        max_val += 1.0;
    }

    let max_abs = min_val.abs().max(max_val.abs());
    let (yscale, scale_word) = if is_percentage_like(y_label) {
        (1.0, "")
    } else {
        choose_axis_scale(max_abs)
    };
    let y_axis_title = if scale_word.is_empty() {
        y_label.to_string()
    } else {
        format!("{y_label} ({scale_word})")
    };

    let x_label_fmt = |x: &f64| (x.round() as i32).to_string();
    let y_label_fmt = |v: &f64| util::format_tick(*v, num_locale, dec_sep);
    let x_label_count = ((max_year - min_year + 1) as usize).min(12);
    let y_label_count = 10usize;
    let left_label_width_px = compute_left_label_area_px(
        min_val / yscale,
        max_val / yscale,
        y_label_count,
        12,
        num_locale,
        dec_sep,
    );

    root.fill(&WHITE).map_err(|e| anyhow!("{:?}", e))?;

    let mut chart = ChartBuilder::on(&root)
        .margin(MARGIN)
        .caption(title, (FontFamily::SansSerif, 22))
        .set_label_area_size(LabelAreaPosition::Left, left_label_width_px)
        .set_label_area_size(LabelAreaPosition::Bottom, 48)
        .build_cartesian_2d(
            min_year as f64..max_year as f64,
            (min_val / yscale)..(max_val / yscale),
        )
        .map_err(|e| anyhow!("{:?}", e))?;

    chart
        .configure_mesh()
        .x_desc("Year")
        .y_desc(y_axis_title)
        .x_labels(x_label_count)
        .y_labels(y_label_count)
        .x_label_formatter(&x_label_fmt)
        .y_label_formatter(&y_label_fmt)
        .light_line_style(BLACK.mix(0.06))
        .label_style((FontFamily::SansSerif, 12))
        .axis_desc_style((FontFamily::SansSerif, 16))
        .draw()
        .map_err(|e| anyhow!("{:?}", e))?;

    let color = SERIES_COLOR.to_rgba();
    let scaled: Vec<(f64, f64)> = points
        .iter()
        .map(|(x, y)| (*x as f64, *y / yscale))
        .collect();

    let style = ShapeStyle {
        color,
        filled: false,
        stroke_width: 2,
    };
    chart
        .draw_series(LineSeries::new(scaled.clone(), style))
        .map_err(|e| anyhow!("{:?}", e))?;
    chart
        .draw_series(
            scaled
                .iter()
                .map(|(x, y)| Circle::new((*x, *y), 3, color.filled())),
        )
        .map_err(|e| anyhow!("{:?}", e))?;

    root.present().map_err(|e| anyhow!("{:?}", e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreadable_font_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let bogus = dir.path().join("bogus.ttf");
        std::fs::write(&bogus, b"definitely not a font").unwrap();
        let err = ensure_font_registered(Some(bogus.as_path())).unwrap_err();
        assert!(err.to_string().starts_with("invalid font"));
        assert!(REGISTERED_FONT.get().is_none());
    }

    #[test]
    fn explicit_font_path_wins() {
        let p = Path::new("/tmp/some.ttf");
        assert_eq!(locate_font(Some(p)), Some(p.to_path_buf()));
    }
}
