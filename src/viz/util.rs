//! Utility functions for chart rendering: series colour, scaling, locale mapping, label sizing.

use num_format::Locale;
use plotters::prelude::*;

/// Series colour for single-line charts (Office blue, #4472C4).
pub const SERIES_COLOR: RGBColor = RGBColor(68, 114, 196);

/// Pick a single Y-axis scale and its human label based on the overall magnitude.
/// Returns (scale, label), e.g. (1e6, "millions").
pub fn choose_axis_scale(max_abs: f64) -> (f64, &'static str) {
    if max_abs >= 1.0e12 {
        (1.0e12, "trillions")
    } else if max_abs >= 1.0e9 {
        (1.0e9, "billions")
    } else if max_abs >= 1.0e6 {
        (1.0e6, "millions")
    } else {
        (1.0, "")
    }
}

/// Heuristic: treat percent-like axis labels as non-scalable.
pub fn is_percentage_like(label: &str) -> bool {
    let u = label.to_ascii_lowercase();
    u.contains('%') || u.contains("percent") || u.contains("per cent")
}

/// Map a user-provided locale tag to a `num_format::Locale` and its decimal separator char.
///
/// Supported tags (case-insensitive): `en`, `us`, `en_US`, `de`, `de_DE`, `german`,
/// `fr`, `es`, `it`, `pt`, `nl`. Defaults to English.
pub fn map_locale(tag: &str) -> (&'static Locale, char) {
    match tag.to_lowercase().as_str() {
        "de" | "de_de" | "german" => (&Locale::de, ','),
        "fr" | "fr_fr" => (&Locale::fr, ','),
        "es" | "es_es" => (&Locale::es, ','),
        "it" | "it_it" => (&Locale::it, ','),
        "pt" | "pt_pt" | "pt_br" => (&Locale::pt, ','),
        "nl" | "nl_nl" => (&Locale::nl, ','),
        _ => (&Locale::en, '.'), // default
    }
}

/// Format a tick value: thousands separators above 1000, otherwise up to two
/// decimals using the locale's decimal separator.
pub fn format_tick(v: f64, locale: &Locale, dec_sep: char) -> String {
    use num_format::ToFormattedString;
    let a = v.abs();
    if a >= 1000.0 {
        return (v.round() as i64).to_formatted_string(locale);
    }
    let prec = if a >= 100.0 {
        0
    } else if a >= 10.0 {
        1
    } else {
        2
    };
    let s = format!("{:.*}", prec, v);
    if dec_sep == '.' {
        s
    } else {
        s.replace('.', &dec_sep.to_string())
    }
}

/// Heuristic: estimate pixel width of text (Plotters has no built-in text measuring).
pub fn estimate_text_width_px(text: &str, font_px: u32) -> u32 {
    ((text.chars().count() as f32) * (font_px as f32) * 0.60).ceil() as u32
}

/// Compute a tight left label area width for the Y axis (in pixels),
/// based on the formatted tick labels that will appear.
pub fn compute_left_label_area_px(
    ymin_scaled: f64,
    ymax_scaled: f64,
    ticks: usize,
    font_px: u32,
    locale: &Locale,
    dec_sep: char,
) -> u32 {
    let mut max_px = 0u32;
    for i in 0..=ticks {
        let t = if ticks == 0 {
            0.0
        } else {
            i as f64 / ticks as f64
        };
        let v = ymin_scaled + (ymax_scaled - ymin_scaled) * t;
        let s = format_tick(v, locale, dec_sep);
        max_px = max_px.max(estimate_text_width_px(&s, font_px));
    }

    // Add padding for tick marks & a little breathing room.
    let with_padding = max_px.saturating_add(18);
    with_padding.clamp(48, 140)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticks_use_locale() {
        let (de_loc, sep) = map_locale("de");
        assert_eq!(format_tick(2.5, de_loc, sep), "2,50");
        assert_eq!(format_tick(12345.0, de_loc, sep), "12.345");
        let (en_loc, sep) = map_locale("en");
        assert_eq!(format_tick(12345.0, en_loc, sep), "12,345");
        assert_eq!(format_tick(150.4, en_loc, sep), "150");
    }

    #[test]
    fn percentages_are_detected() {
        assert!(is_percentage_like("GDP growth (%)"));
        assert!(!is_percentage_like("Energy use (per capita)"));
    }

    #[test]
    fn label_area_is_clamped() {
        let (en_loc, sep) = map_locale("en");
        let w = compute_left_label_area_px(0.0, 1.0, 10, 12, en_loc, sep);
        assert!((48..=140).contains(&w));
    }
}
