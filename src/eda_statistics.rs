use crate::features::DECILE_COUNT;
use crate::models::{
    DecileTrend, MortalityAlcohol, StatusCount, StatusTrend, YearTrend, ADULT_MORTALITY, ALCOHOL,
    CORRELATION_COLUMNS, COUNTRY, GDP_DECILE, LIFE_EXPECTANCY, STATUS, YEAR,
};
use crate::table::Table;
use itertools::Itertools;
use log::warn;
use ndarray::{Array1, Array2, ArrayView1};
use ordered_float::OrderedFloat;
use statrs::statistics::{Data, Distribution, Median};
use std::collections::{BTreeMap, HashSet};

/// Mean of the values, `None` when empty.
pub(crate) fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Data::new(values.to_vec()).mean()
}

/// Sample standard deviation, `None` with fewer than two values.
pub(crate) fn std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    Data::new(values.to_vec()).std_dev()
}

pub(crate) fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(Data::new(values.to_vec()).median())
}

pub(crate) fn sorted(values: &[f64]) -> Vec<f64> {
    values
        .iter()
        .copied()
        .sorted_by_key(|v| OrderedFloat(*v))
        .collect()
}

/// Quantile of already sorted values with linear interpolation between ranks.
/// The result stays within its two neighbours, so increasing `q` never decreases it.
pub(crate) fn quantile(sorted_values: &[f64], q: f64) -> Option<f64> {
    let n = sorted_values.len();
    if n == 0 {
        return None;
    }
    if n == 1 {
        return Some(sorted_values[0]);
    }

    let rank = q.clamp(0.0, 1.0) * (n - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = (rank.ceil() as usize).min(n - 1);
    let frac = rank - lower as f64;

    let (a, b) = (sorted_values[lower], sorted_values[upper]);
    if lower == upper || a == b {
        Some(a)
    } else {
        Some((a + (b - a) * frac).clamp(a, b))
    }
}

/// Present, finite values of a column.
pub(crate) fn finite_values(values: &[Option<f64>]) -> Vec<f64> {
    values
        .iter()
        .flatten()
        .copied()
        .filter(|v| v.is_finite())
        .collect()
}

// Helper function to calculate correlation
pub(crate) fn calculate_correlation(x: &ArrayView1<f64>, y: &ArrayView1<f64>) -> Option<f64> {
    if x.len() != y.len() {
        return None;
    }
    let x_mean = x.mean()?;
    let y_mean = y.mean()?;
    let numerator = x
        .iter()
        .zip(y.iter())
        .map(|(&xi, &yi)| (xi - x_mean) * (yi - y_mean))
        .sum::<f64>();
    let denominator_x = x.iter().map(|&xi| (xi - x_mean).powi(2)).sum::<f64>().sqrt();
    let denominator_y = y.iter().map(|&yi| (yi - y_mean).powi(2)).sum::<f64>().sqrt();
    if denominator_x > 0.0 && denominator_y > 0.0 {
        Some(numerator / (denominator_x * denominator_y))
    } else {
        None
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CorrelationMatrix {
    pub(crate) columns: Vec<String>,
    pub(crate) values: Array2<f64>,
}

impl CorrelationMatrix {
    pub(crate) fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == a)?;
        let j = self.columns.iter().position(|c| c == b)?;
        Some(self.values[(i, j)])
    }
}

/// The six summary views handed to the rendering layer.
#[derive(Debug, Clone)]
pub(crate) struct Aggregates {
    pub(crate) global_trend: Vec<YearTrend>,
    pub(crate) status_trend: Vec<StatusTrend>,
    pub(crate) status_counts: Vec<StatusCount>,
    pub(crate) mortality_vs_alcohol: Vec<MortalityAlcohol>,
    pub(crate) gdp_decile_trend: Vec<DecileTrend>,
    pub(crate) correlation: CorrelationMatrix,
}

pub(crate) fn aggregate(table: &Table) -> Aggregates {
    Aggregates {
        global_trend: global_trend(table),
        status_trend: status_trend(table),
        status_counts: status_counts(table),
        mortality_vs_alcohol: mortality_vs_alcohol(table),
        gdp_decile_trend: gdp_decile_trend(table),
        correlation: correlation_matrix(table),
    }
}

fn year_key(year: Option<f64>) -> Option<i64> {
    year.filter(|y| y.is_finite()).map(|y| y.round() as i64)
}

// Bucket indices are stored as whole numbers in a numeric column.
fn decile_key(decile: Option<f64>) -> Option<usize> {
    decile
        .filter(|d| d.fract() == 0.0 && (0.0..DECILE_COUNT as f64).contains(d))
        .map(|d| d as usize)
}

fn push_finite(bucket: &mut Vec<f64>, value: Option<f64>) {
    if let Some(v) = value.filter(|v| v.is_finite()) {
        bucket.push(v);
    }
}

// Average life expectancy per year
pub(crate) fn global_trend(table: &Table) -> Vec<YearTrend> {
    let (Some(years), Some(life)) = (table.numeric(YEAR), table.numeric(LIFE_EXPECTANCY)) else {
        warn!("globalTrend needs numeric {:?} and {:?}", YEAR, LIFE_EXPECTANCY);
        return Vec::new();
    };

    let mut groups: BTreeMap<i64, Vec<f64>> = BTreeMap::new();
    for (&year, &value) in years.iter().zip(life) {
        if let Some(year) = year_key(year) {
            push_finite(groups.entry(year).or_default(), value);
        }
    }

    groups
        .into_iter()
        .map(|(year, values)| YearTrend {
            year,
            life_expectancy: mean(&values),
        })
        .collect()
}

// Average life expectancy developing vs developed countries, per year
pub(crate) fn status_trend(table: &Table) -> Vec<StatusTrend> {
    let (Some(years), Some(status), Some(life)) = (
        table.numeric(YEAR),
        table.text(STATUS),
        table.numeric(LIFE_EXPECTANCY),
    ) else {
        warn!("statusTrend needs {:?}, {:?} and {:?}", YEAR, STATUS, LIFE_EXPECTANCY);
        return Vec::new();
    };

    let mut groups: BTreeMap<(i64, &str), Vec<f64>> = BTreeMap::new();
    for ((&year, status), &value) in years.iter().zip(status).zip(life) {
        if let (Some(year), Some(status)) = (year_key(year), status.as_deref()) {
            push_finite(groups.entry((year, status)).or_default(), value);
        }
    }

    groups
        .into_iter()
        .map(|((year, status), values)| StatusTrend {
            year,
            status: status.to_string(),
            life_expectancy: mean(&values),
        })
        .collect()
}

// Number of distinct countries per year and status
pub(crate) fn status_counts(table: &Table) -> Vec<StatusCount> {
    let (Some(years), Some(status), Some(countries)) = (
        table.numeric(YEAR),
        table.text(STATUS),
        table.text(COUNTRY),
    ) else {
        warn!("statusCounts needs {:?}, {:?} and {:?}", YEAR, STATUS, COUNTRY);
        return Vec::new();
    };

    let mut groups: BTreeMap<(i64, &str), HashSet<&str>> = BTreeMap::new();
    for ((&year, status), country) in years.iter().zip(status).zip(countries) {
        if let (Some(year), Some(status)) = (year_key(year), status.as_deref()) {
            let bucket = groups.entry((year, status)).or_default();
            if let Some(country) = country.as_deref() {
                bucket.insert(country);
            }
        }
    }

    groups
        .into_iter()
        .map(|((year, status), countries)| StatusCount {
            year,
            status: status.to_string(),
            countries: countries.len(),
        })
        .collect()
}

pub(crate) fn mortality_vs_alcohol(table: &Table) -> Vec<MortalityAlcohol> {
    let (Some(countries), Some(mortality), Some(alcohol)) = (
        table.text(COUNTRY),
        table.numeric(ADULT_MORTALITY),
        table.numeric(ALCOHOL),
    ) else {
        warn!(
            "mortalityVsAlcohol needs {:?}, {:?} and {:?}",
            COUNTRY, ADULT_MORTALITY, ALCOHOL
        );
        return Vec::new();
    };

    let mut groups: BTreeMap<&str, (Vec<f64>, Vec<f64>)> = BTreeMap::new();
    for ((country, &m), &a) in countries.iter().zip(mortality).zip(alcohol) {
        if let Some(country) = country.as_deref() {
            let (ms, als) = groups.entry(country).or_default();
            push_finite(ms, m);
            push_finite(als, a);
        }
    }

    groups
        .into_iter()
        .map(|(country, (ms, als))| MortalityAlcohol {
            country: country.to_string(),
            adult_mortality: mean(&ms),
            alcohol: mean(&als),
        })
        .collect()
}

// Mean life expectancy per GDP decile; the decile column carries the bin boundaries
pub(crate) fn gdp_decile_trend(table: &Table) -> Vec<DecileTrend> {
    let (Some(deciles), Some(life)) = (table.numeric(GDP_DECILE), table.numeric(LIFE_EXPECTANCY))
    else {
        warn!("gdpDecileTrend needs {:?} and {:?}", GDP_DECILE, LIFE_EXPECTANCY);
        return Vec::new();
    };

    let mut groups: BTreeMap<usize, Vec<f64>> = BTreeMap::new();
    for (&decile, &value) in deciles.iter().zip(life) {
        match decile_key(decile) {
            Some(decile) => push_finite(groups.entry(decile).or_default(), value),
            None if decile.is_some() => warn!("Ignoring invalid decile {:?}", decile),
            None => {}
        }
    }

    groups
        .into_iter()
        .map(|(decile, values)| DecileTrend {
            decile,
            life_expectancy: mean(&values),
        })
        .collect()
}

/// Pairwise Pearson correlation over the rows where both columns are finite.
pub(crate) fn correlation_matrix(table: &Table) -> CorrelationMatrix {
    let included: Vec<(&str, &[Option<f64>])> = CORRELATION_COLUMNS
        .iter()
        .filter_map(|&name| match table.numeric(name) {
            Some(values) => Some((name, values)),
            None => {
                warn!("Column {:?} is not available for correlation", name);
                None
            }
        })
        .collect();

    let n = included.len();
    let mut values = Array2::from_elem((n, n), f64::NAN);
    for i in 0..n {
        values[(i, i)] = 1.0;
        for j in (i + 1)..n {
            let (x, y): (Vec<f64>, Vec<f64>) = included[i]
                .1
                .iter()
                .zip(included[j].1)
                .filter_map(|(a, b)| match (a, b) {
                    (Some(a), Some(b)) if a.is_finite() && b.is_finite() => Some((*a, *b)),
                    _ => None,
                })
                .unzip();
            let x = Array1::from_vec(x);
            let y = Array1::from_vec(y);
            let r = calculate_correlation(&x.view(), &y.view()).unwrap_or(f64::NAN);
            values[(i, j)] = r;
            values[(j, i)] = r;
        }
    }

    CorrelationMatrix {
        columns: included.iter().map(|(name, _)| name.to_string()).collect(),
        values,
    }
}
