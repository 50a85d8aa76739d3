use crate::config::PipelineConfig;
use crate::eda_statistics::{Aggregates, CorrelationMatrix};
use crate::models::{
    DecileTrend, MortalityAlcohol, StatusCount, StatusTrend, YearTrend, COUNTRY, DEVELOPED,
    DEVELOPING, LIFE_EXPECTANCY, YEAR,
};
use crate::table::Table;
use itertools::{Itertools, MinMaxResult};
use log::{info, warn};
use plotters::prelude::*;
use std::collections::BTreeMap;
use std::error::Error;
use std::ops::Range;
use std::path::Path;

type ChartResult = Result<(), Box<dyn Error>>;

const SIZE: (u32, u32) = (1280, 720);

/// Finite min..max of the values widened by 10% on each side.
pub(crate) fn padded_range(values: impl IntoIterator<Item = f64>) -> Option<Range<f64>> {
    let (min, max) = match values.into_iter().filter(|v| v.is_finite()).minmax() {
        MinMaxResult::NoElements => return None,
        MinMaxResult::OneElement(v) => (v, v),
        MinMaxResult::MinMax(min, max) => (min, max),
    };
    let pad = if max > min { (max - min) * 0.1 } else { 1.0 };
    Some((min - pad)..(max + pad))
}

/// Bar axis from zero up to 20% above the tallest finite value.
pub(crate) fn bar_range(values: impl IntoIterator<Item = f64>) -> Option<Range<f64>> {
    let max = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold(f64::NEG_INFINITY, f64::max);
    if max.is_finite() && max > 0.0 {
        Some(0.0..max * 1.2)
    } else {
        None
    }
}

fn year_range(years: impl IntoIterator<Item = i64>) -> Option<Range<i32>> {
    let years: Vec<i64> = years.into_iter().collect();
    let min = *years.iter().min()?;
    let max = *years.iter().max()?;
    Some(min as i32..max as i32 + 1)
}

fn draw_global_trend(rows: &[YearTrend], output: &Path) -> ChartResult {
    let points: Vec<(i32, f64)> = rows
        .iter()
        .filter_map(|r| Some((r.year as i32, r.life_expectancy?)))
        .collect();
    let (Some(x_range), Some(y_range)) = (
        year_range(points.iter().map(|p| i64::from(p.0))),
        padded_range(points.iter().map(|p| p.1)),
    ) else {
        return Err("no life expectancy values to plot".into());
    };

    let root = BitMapBackend::new(output, SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Global Life Expectancy per Year", ("sans-serif", 40))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range, y_range)?;

    chart
        .configure_mesh()
        .x_desc("Year")
        .y_desc("Life expectancy")
        .axis_desc_style(("sans-serif", 20))
        .label_style(("sans-serif", 15))
        .draw()?;

    chart.draw_series(LineSeries::new(points.iter().copied(), BLUE.stroke_width(2)))?;
    chart.draw_series(points.iter().map(|&p| Circle::new(p, 4, BLUE.filled())))?;

    root.present()?;
    Ok(())
}

fn draw_status_trend(rows: &[StatusTrend], output: &Path) -> ChartResult {
    let series = |status: &str| -> Vec<(i32, f64)> {
        rows.iter()
            .filter(|r| r.status == status)
            .filter_map(|r| Some((r.year as i32, r.life_expectancy?)))
            .collect()
    };
    let developed = series(DEVELOPED);
    let developing = series(DEVELOPING);
    let all = || developed.iter().chain(developing.iter());

    let (Some(x_range), Some(y_range)) = (
        year_range(all().map(|p| i64::from(p.0))),
        padded_range(all().map(|p| p.1)),
    ) else {
        return Err("no status trend values to plot".into());
    };

    let root = BitMapBackend::new(output, SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Developed vs Developing Life Expectancy per Year", ("sans-serif", 40))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range, y_range)?;

    chart
        .configure_mesh()
        .y_desc("Life expectancy")
        .x_desc("Years")
        .axis_desc_style(("sans-serif", 20))
        .label_style(("sans-serif", 15))
        .draw()?;

    chart
        .draw_series(LineSeries::new(developed.iter().copied(), &RED))?
        .label(DEVELOPED)
        .legend(|(x, y)| PathElement::new([(x, y), (x + 20, y)], &RED));

    chart
        .draw_series(LineSeries::new(developing.iter().copied(), &BLUE))?
        .label(DEVELOPING)
        .legend(|(x, y)| PathElement::new([(x, y), (x + 20, y)], &BLUE));

    chart
        .configure_series_labels()
        .background_style(&WHITE)
        .border_style(&BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

fn draw_status_counts(rows: &[StatusCount], output: &Path) -> ChartResult {
    let mut by_year: BTreeMap<i64, (usize, usize)> = BTreeMap::new();
    for row in rows {
        let entry = by_year.entry(row.year).or_default();
        match row.status.as_str() {
            DEVELOPED => entry.0 = row.countries,
            DEVELOPING => entry.1 = row.countries,
            _ => {}
        }
    }
    let years: Vec<i64> = by_year.keys().copied().collect();
    let counts: Vec<(usize, usize)> = by_year.values().copied().collect();

    let Some(y_range) = bar_range(counts.iter().flat_map(|&(a, b)| [a as f64, b as f64])) else {
        return Err("no country counts to plot".into());
    };

    let root = BitMapBackend::new(output, SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Countries per Status and Year", ("sans-serif", 40))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(0..(years.len() as i32 * 2), y_range)?;

    chart
        .configure_mesh()
        .x_labels(years.len())
        .y_desc("Countries")
        .x_desc("Years")
        .axis_desc_style(("sans-serif", 20))
        .label_style(("sans-serif", 15))
        .x_label_formatter(&|x| {
            years
                .get((*x as usize) / 2)
                .map(|y| y.to_string())
                .unwrap_or_default()
        })
        .draw()?;

    let developed_style = RGBColor(190, 86, 131).filled();
    let developing_style = RGBColor(110, 48, 75).filled();

    chart
        .draw_series(counts.iter().enumerate().map(|(i, &(developed, _))| {
            Rectangle::new(
                [(i as i32 * 2, 0.0), (i as i32 * 2 + 1, developed as f64)],
                developed_style,
            )
        }))?
        .label(DEVELOPED)
        .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], developed_style));

    chart
        .draw_series(counts.iter().enumerate().map(|(i, &(_, developing))| {
            Rectangle::new(
                [(i as i32 * 2 + 1, 0.0), (i as i32 * 2 + 2, developing as f64)],
                developing_style,
            )
        }))?
        .label(DEVELOPING)
        .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], developing_style));

    chart
        .configure_series_labels()
        .label_font(("sans-serif", 15))
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

fn draw_mortality_vs_alcohol(rows: &[MortalityAlcohol], output: &Path) -> ChartResult {
    let points: Vec<(f64, f64)> = rows
        .iter()
        .filter_map(|r| Some((r.alcohol?, r.adult_mortality?)))
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .collect();
    let (Some(x_range), Some(y_range)) = (
        padded_range(points.iter().map(|p| p.0)),
        padded_range(points.iter().map(|p| p.1)),
    ) else {
        return Err("no mortality/alcohol pairs to plot".into());
    };

    let root = BitMapBackend::new(output, (1024, 768)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Adult Mortality vs Alcohol (country means)", ("sans-serif", 30))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range, y_range)?;

    chart
        .configure_mesh()
        .x_desc("Alcohol")
        .y_desc("Adult Mortality")
        .draw()?;

    chart.draw_series(
        points
            .iter()
            .map(|&(x, y)| Circle::new((x, y), 4, BLUE.mix(0.6).filled())),
    )?;

    root.present()?;
    Ok(())
}

fn draw_gdp_decile_trend(rows: &[DecileTrend], output: &Path) -> ChartResult {
    let bars: Vec<(i32, f64)> = rows
        .iter()
        .filter_map(|r| Some((r.decile as i32, r.life_expectancy?)))
        .collect();
    let Some(y_range) = bar_range(bars.iter().map(|b| b.1)) else {
        return Err("no decile means to plot".into());
    };
    let buckets = bars.iter().map(|b| b.0 + 1).max().unwrap_or(1);

    let root = BitMapBackend::new(output, SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Life Expectancy by GDP Decile", ("sans-serif", 40))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(0..buckets, y_range)?;

    chart
        .configure_mesh()
        .x_labels(buckets as usize)
        .x_desc("GDP decile")
        .y_desc("Life expectancy")
        .axis_desc_style(("sans-serif", 20))
        .label_style(("sans-serif", 15))
        .draw()?;

    chart.draw_series(bars.iter().map(|&(decile, mean)| {
        Rectangle::new([(decile, 0.0), (decile + 1, mean)], GREEN.mix(0.7).filled())
    }))?;

    root.present()?;
    Ok(())
}

fn draw_correlation_heatmap(matrix: &CorrelationMatrix, output: &Path) -> ChartResult {
    let cols = matrix.columns.len();
    if cols == 0 {
        return Err("no columns to correlate".into());
    }

    let root = BitMapBackend::new(output, (1024, 1024)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Feature Correlation Heatmap", ("sans-serif", 30))
        .margin(5)
        .x_label_area_size(120)
        .y_label_area_size(220)
        .build_cartesian_2d(0..cols as u32, 0..cols as u32)?;

    let label = |i: usize| matrix.columns.get(i).cloned().unwrap_or_default();
    chart
        .configure_mesh()
        .disable_mesh()
        .x_labels(cols)
        .y_labels(cols)
        .label_style(("sans-serif", 13))
        .x_label_formatter(&|x| label(*x as usize))
        .y_label_formatter(&|y| label(cols - 1 - (*y as usize).min(cols - 1)))
        .draw()?;

    for i in 0..cols {
        for j in 0..cols {
            let value = matrix.values[(i, j)];
            let color = if value.is_nan() {
                RGBColor(200, 200, 200)
            } else if value >= 0.0 {
                RGBColor(255, (255.0 * (1.0 - value)) as u8, (255.0 * (1.0 - value)) as u8)
            } else {
                RGBColor((255.0 * (1.0 + value)) as u8, (255.0 * (1.0 + value)) as u8, 255)
            };
            chart.draw_series(std::iter::once(Rectangle::new(
                [
                    (j as u32, cols as u32 - i as u32 - 1),
                    ((j + 1) as u32, cols as u32 - i as u32),
                ],
                color.filled(),
            )))?;
        }
    }

    root.present()?;
    Ok(())
}

// Life expectancy per year for each selected country
fn draw_selected_countries(table: &Table, countries: &[String], output: &Path) -> ChartResult {
    let selection = table.filter_countries(countries);
    let (Some(names), Some(years), Some(life)) = (
        selection.text(COUNTRY),
        selection.numeric(YEAR),
        selection.numeric(LIFE_EXPECTANCY),
    ) else {
        return Err("selection lacks country, year or life expectancy".into());
    };

    let mut series: BTreeMap<&str, Vec<(i32, f64)>> = BTreeMap::new();
    for ((name, year), value) in names.iter().zip(years).zip(life) {
        if let (Some(name), Some(year), Some(value)) = (name.as_deref(), year, value) {
            if year.is_finite() && value.is_finite() {
                series.entry(name).or_default().push((*year as i32, *value));
            }
        }
    }
    for points in series.values_mut() {
        points.sort_by_key(|p| p.0);
    }

    let all = || series.values().flatten();
    let (Some(x_range), Some(y_range)) = (
        year_range(all().map(|p| i64::from(p.0))),
        padded_range(all().map(|p| p.1)),
    ) else {
        return Err("no values for the selected countries".into());
    };

    let root = BitMapBackend::new(output, SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Life Expectancy of Selected Countries", ("sans-serif", 40))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range, y_range)?;

    chart
        .configure_mesh()
        .x_desc("Year")
        .y_desc("Life expectancy")
        .axis_desc_style(("sans-serif", 20))
        .label_style(("sans-serif", 15))
        .draw()?;

    for (idx, (name, points)) in series.iter().enumerate() {
        let color = Palette99::pick(idx).to_rgba();
        chart
            .draw_series(LineSeries::new(points.iter().copied(), color.stroke_width(2)))?
            .label(*name)
            .legend(move |(x, y)| PathElement::new([(x, y), (x + 20, y)], &color));
    }

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

/// Draws every chart into the configured directory. A failing chart is logged and skipped.
pub(crate) fn render_all(aggregates: &Aggregates, table: &Table, config: &PipelineConfig) -> usize {
    let results: Vec<(&str, ChartResult)> = vec![
        (
            "global_trend.png",
            draw_global_trend(&aggregates.global_trend, &config.chart_path("global_trend.png")),
        ),
        (
            "status_trend.png",
            draw_status_trend(&aggregates.status_trend, &config.chart_path("status_trend.png")),
        ),
        (
            "status_counts.png",
            draw_status_counts(&aggregates.status_counts, &config.chart_path("status_counts.png")),
        ),
        (
            "mortality_vs_alcohol.png",
            draw_mortality_vs_alcohol(
                &aggregates.mortality_vs_alcohol,
                &config.chart_path("mortality_vs_alcohol.png"),
            ),
        ),
        (
            "gdp_decile_trend.png",
            draw_gdp_decile_trend(
                &aggregates.gdp_decile_trend,
                &config.chart_path("gdp_decile_trend.png"),
            ),
        ),
        (
            "correlation_heatmap.png",
            draw_correlation_heatmap(
                &aggregates.correlation,
                &config.chart_path("correlation_heatmap.png"),
            ),
        ),
        (
            "selected_countries.png",
            draw_selected_countries(
                table,
                &config.selected_countries,
                &config.chart_path("selected_countries.png"),
            ),
        ),
    ];

    let mut rendered = 0;
    for (name, result) in results {
        match result {
            Ok(()) => {
                info!("Chart saved to {}", config.chart_path(name).display());
                rendered += 1;
            }
            Err(err) => warn!("Skipped chart {}: {}", name, err),
        }
    }
    rendered
}
