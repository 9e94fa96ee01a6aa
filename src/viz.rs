use crate::models::{Metric, Observation};
use anyhow::{Result, anyhow};
use chrono::NaiveDate;
use num_format::{Locale, ToFormattedString};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters_bitmap::BitMapBackend;
use plotters_svg::SVGBackend;
use std::path::Path;

/// Microsoft Office (2013+) chart series palette.
/// Order: Blue, Orange, Gray, Gold, Light Blue, Green, Dark Blue, Dark Orange, Dark Gray, Brownish Gold.
const OFFICE10: [RGBColor; 10] = [
    RGBColor(68, 114, 196),  // blue      (#4472C4)
    RGBColor(237, 125, 49),  // orange    (#ED7D31)
    RGBColor(165, 165, 165), // gray      (#A5A5A5)
    RGBColor(255, 192, 0),   // gold      (#FFC000)
    RGBColor(91, 155, 213),  // light blue(#5B9BD5)
    RGBColor(112, 173, 71),  // green     (#70AD47)
    RGBColor(38, 68, 120),   // dark blue (#264478)
    RGBColor(158, 72, 14),   // dark org. (#9E480E)
    RGBColor(99, 99, 99),    // dark gray (#636363)
    RGBColor(153, 115, 0),   // brownish  (#997300)
];

/// Get a color from the Office palette.
#[inline]
fn office_color(idx: usize) -> RGBAColor {
    OFFICE10[idx % OFFICE10.len()].to_rgba()
}

/// Map a user-provided locale tag to a num-format Locale.
/// Supported tags (case-insensitive): "en", "us", "en_US", "de", "de_DE", "german", "fr", "es", "it", "pt", "nl"
fn map_locale(tag: &str) -> &'static Locale {
    match tag.to_lowercase().as_str() {
        "de" | "de_de" | "german" => &Locale::de,
        "fr" | "fr_fr" => &Locale::fr,
        "es" | "es_es" => &Locale::es,
        "it" | "it_it" => &Locale::it,
        "pt" | "pt_pt" | "pt_br" => &Locale::pt,
        "nl" | "nl_nl" => &Locale::nl,
        _ => &Locale::en,
    }
}

/// Months since year 0 for a `YYYY-MM` period; gives charts a linear x axis.
fn month_serial(period: &str) -> Option<i32> {
    let date = NaiveDate::parse_from_str(&format!("{period}-01"), "%Y-%m-%d").ok()?;
    use chrono::Datelike;
    Some(date.year() * 12 + date.month0() as i32)
}

fn serial_label(serial: i32) -> String {
    let year = serial.div_euclid(12);
    let month = serial.rem_euclid(12) + 1;
    format!("{year:04}-{month:02}")
}

/// Generate a multi-series line chart of one metric, one series per
/// (state, sector), with the default locale "en".
pub fn plot_lines<P: AsRef<Path>>(
    points: &[Observation],
    metric: Metric,
    out_path: P,
    width: u32,
    height: u32,
) -> Result<()> {
    plot_lines_locale(points, metric, out_path, width, height, "en")
}

/// Same as `plot_lines` but with a locale tag for label formatting (e.g., "en" or "de").
pub fn plot_lines_locale<P: AsRef<Path>>(
    points: &[Observation],
    metric: Metric,
    out_path: P,
    width: u32,
    height: u32,
    locale_tag: &str,
) -> Result<()> {
    if points.is_empty() {
        return Err(anyhow!("no data to plot"));
    }

    let out_path = out_path.as_ref();
    let path_string = out_path.to_string_lossy().into_owned();

    let serials: Vec<i32> = points
        .iter()
        .filter_map(|p| month_serial(&p.period))
        .collect();
    let (mut min_x, mut max_x) = (
        *serials
            .iter()
            .min()
            .ok_or_else(|| anyhow!("no valid periods"))?,
        *serials
            .iter()
            .max()
            .ok_or_else(|| anyhow!("no valid periods"))?,
    );
    if min_x == max_x {
        min_x -= 1;
        max_x += 1;
    }

    let values: Vec<f64> = points.iter().filter_map(|p| metric.value_of(p)).collect();
    if values.is_empty() {
        return Err(anyhow!("no numeric values to plot"));
    }
    let (mut min_val, mut max_val) = (
        values.iter().cloned().fold(f64::INFINITY, f64::min),
        values.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
    );
    if (max_val - min_val).abs() < f64::EPSILON {
        min_val -= 1.0;
        max_val += 1.0;
    }

    let num_locale = map_locale(locale_tag);

    if out_path.extension().and_then(|s| s.to_str()) == Some("svg") {
        let root = SVGBackend::new(path_string.as_str(), (width, height)).into_drawing_area();
        draw_chart(root, points, metric, min_x, max_x, min_val, max_val, num_locale)?;
    } else {
        let root = BitMapBackend::new(path_string.as_str(), (width, height)).into_drawing_area();
        draw_chart(root, points, metric, min_x, max_x, min_val, max_val, num_locale)?;
    }

    Ok(())
}

/// Helper that draws to any Plotters backend.
#[allow(clippy::too_many_arguments)]
fn draw_chart<DB>(
    root: DrawingArea<DB, Shift>,
    points: &[Observation],
    metric: Metric,
    min_x: i32,
    max_x: i32,
    min_val: f64,
    max_val: f64,
    num_locale: &Locale,
) -> Result<()>
where
    DB: DrawingBackend,
{
    root.fill(&WHITE).map_err(|e| anyhow!("{:?}", e))?;

    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .caption(
            format!("{} by State and Sector", metric.label()),
            ("sans-serif", 24),
        )
        .set_label_area_size(LabelAreaPosition::Left, 80)
        .set_label_area_size(LabelAreaPosition::Bottom, 44)
        .build_cartesian_2d(min_x..max_x, min_val..max_val)
        .map_err(|e| anyhow!("{:?}", e))?;

    // Axis label formatters: Y uses locale thousands separators; X maps the
    // month serial back to YYYY-MM.
    let y_label_fmt = |v: &f64| {
        let n = (*v).round() as i64;
        n.to_formatted_string(num_locale)
    };
    let x_label_fmt = |s: &i32| serial_label(*s);

    // Limit label counts to avoid overlap
    let x_label_count = ((max_x - min_x + 1) as usize).min(12);
    let y_label_count = 10usize;

    chart
        .configure_mesh()
        .x_desc("Period")
        .y_desc(metric.label())
        .x_labels(x_label_count)
        .y_labels(y_label_count)
        .x_label_formatter(&x_label_fmt)
        .y_label_formatter(&y_label_fmt)
        .label_style(("sans-serif", 14))
        .axis_desc_style(("sans-serif", 16))
        .draw()
        .map_err(|e| anyhow!("{:?}", e))?;

    use std::collections::BTreeMap;
    let mut groups: BTreeMap<(String, String), Vec<(i32, f64)>> = BTreeMap::new();
    for p in points {
        if let (Some(x), Some(v)) = (month_serial(&p.period), metric.value_of(p)) {
            groups
                .entry((p.state_id.clone(), p.sector_id.clone()))
                .or_default()
                .push((x, v));
        }
    }
    for series in groups.values_mut() {
        series.sort_by_key(|(x, _)| *x);
    }

    // Distinct color per series, thicker strokes
    for (idx, ((state, sector), series)) in groups.iter().enumerate() {
        let color = office_color(idx);

        let style = ShapeStyle {
            color: color.clone(),
            filled: false,
            stroke_width: 2,
        };

        chart
            .draw_series(LineSeries::new(series.clone(), style))
            .map_err(|e| anyhow!("{:?}", e))?
            .label(format!("{} • {}", state, sector))
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 24, y)], color.clone()));
    }

    chart
        .configure_series_labels()
        .border_style(&BLACK)
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(&WHITE.mix(0.85))
        .label_font(("sans-serif", 14))
        .draw()
        .map_err(|e| anyhow!("{:?}", e))?;

    root.present().map_err(|e| anyhow!("{:?}", e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_serial_round_trips() {
        let s = month_serial("2023-07").unwrap();
        assert_eq!(serial_label(s), "2023-07");
        assert_eq!(month_serial("2023-08").unwrap(), s + 1);
        assert!(month_serial("2023-13").is_none());
    }
}
