use crate::eda_statistics::{finite_values, quantile, sorted};
use crate::error::{ComputationWarning, PipelineError};
use crate::models::{
    ADULT_MORTALITY, ALCOHOL, COUNTRY, GDP, GDP_DECILE, HEALTH_EXPENDITURE_PER_CAPITA,
    LIFE_EXPECTANCY, LIFE_EXPECTANCY_DIFFERENCE, MORTALITY_ALCOHOL_INDEX, POPULATION,
    TOTAL_EXPENDITURE,
};
use crate::table::{Column, Table};
use itertools::{Itertools, MinMaxResult};
use log::{debug, info, warn};
use std::collections::{BTreeSet, HashMap};

pub(crate) const DECILE_COUNT: usize = 10;

#[derive(Debug, Clone)]
pub(crate) struct Derived {
    pub(crate) table: Table,
    pub(crate) warnings: Vec<ComputationWarning>,
}

/// Adds the derived columns to a copy of the cleaned table. Row order and count are kept.
pub(crate) fn derive_features(cleaned: &Table) -> Result<Derived, PipelineError> {
    let mut table = cleaned.clone();
    let mut warnings = Vec::new();

    match (cleaned.text(COUNTRY), cleaned.numeric(LIFE_EXPECTANCY)) {
        (Some(countries), Some(life)) => table.set_column(Column::numeric(
            LIFE_EXPECTANCY_DIFFERENCE,
            life_expectancy_difference(countries, life),
        ))?,
        _ => warn!("Skipping {:?}: missing source columns", LIFE_EXPECTANCY_DIFFERENCE),
    }

    match (cleaned.numeric(ADULT_MORTALITY), cleaned.numeric(ALCOHOL)) {
        (Some(mortality), Some(alcohol)) => table.set_column(Column::numeric(
            MORTALITY_ALCOHOL_INDEX,
            mortality_alcohol_index(mortality, alcohol),
        ))?,
        _ => warn!("Skipping {:?}: missing source columns", MORTALITY_ALCOHOL_INDEX),
    }

    match (cleaned.numeric(TOTAL_EXPENDITURE), cleaned.numeric(POPULATION)) {
        (Some(expenditure), Some(population)) => {
            let values = health_expenditure_per_capita(expenditure, population);
            let rows: Vec<usize> = values
                .iter()
                .enumerate()
                .filter(|(_, v)| v.is_some_and(|v| !v.is_finite()))
                .map(|(i, _)| i)
                .collect();
            if !rows.is_empty() {
                let warning = ComputationWarning {
                    column: HEALTH_EXPENDITURE_PER_CAPITA.to_string(),
                    rows,
                };
                warnings.push(warning);
            }
            table.set_column(Column::numeric(HEALTH_EXPENDITURE_PER_CAPITA, values))?;
        }
        _ => warn!("Skipping {:?}: missing source columns", HEALTH_EXPENDITURE_PER_CAPITA),
    }

    match cleaned.numeric(GDP) {
        Some(gdp) => table.set_column(Column::numeric(GDP_DECILE, gdp_deciles(gdp)))?,
        None => warn!("Skipping {:?}: missing source column", GDP_DECILE),
    }

    info!(
        "Derived table has {} rows x {} columns",
        table.row_count(),
        table.columns().len()
    );
    Ok(Derived { table, warnings })
}

/// Per-country range (max - min) of life expectancy, repeated on every row of that country.
pub(crate) fn life_expectancy_difference(
    countries: &[Option<String>],
    life: &[Option<f64>],
) -> Vec<Option<f64>> {
    let mut by_country: HashMap<&str, Vec<f64>> = HashMap::new();
    for (country, value) in countries.iter().zip(life) {
        if let Some(country) = country.as_deref() {
            let bucket = by_country.entry(country).or_default();
            if let Some(v) = value.filter(|v| v.is_finite()) {
                bucket.push(v);
            }
        }
    }

    let ranges: HashMap<&str, f64> = by_country
        .into_iter()
        .filter_map(|(country, values)| match values.iter().minmax() {
            MinMaxResult::NoElements => None,
            MinMaxResult::OneElement(_) => Some((country, 0.0)),
            MinMaxResult::MinMax(min, max) => Some((country, max - min)),
        })
        .collect();

    countries
        .iter()
        .map(|c| c.as_deref().and_then(|c| ranges.get(c).copied()))
        .collect()
}

pub(crate) fn mortality_alcohol_index(
    mortality: &[Option<f64>],
    alcohol: &[Option<f64>],
) -> Vec<Option<f64>> {
    mortality
        .iter()
        .zip(alcohol)
        .map(|(m, a)| Some((*m)? * (*a)?))
        .collect()
}

/// Total expenditure per million inhabitants. A missing or zero population yields a
/// non-finite value, which is kept as is.
pub(crate) fn health_expenditure_per_capita(
    expenditure: &[Option<f64>],
    population: &[Option<f64>],
) -> Vec<Option<f64>> {
    expenditure
        .iter()
        .zip(population)
        .map(|(&e, &p)| {
            let e = e?;
            Some(match p {
                Some(p) => e / (p / 1_000_000.0),
                None => f64::NAN,
            })
        })
        .collect()
}

/// Equal-frequency bin edges over the present, finite values. Duplicate edges are dropped.
pub(crate) fn decile_edges(values: &[Option<f64>]) -> Vec<f64> {
    let sorted_values = sorted(&finite_values(values));
    let mut edges: Vec<f64> = (0..=DECILE_COUNT)
        .filter_map(|i| quantile(&sorted_values, i as f64 / DECILE_COUNT as f64))
        .collect();
    debug_assert!(edges.windows(2).all(|w| w[0] <= w[1]));
    edges.dedup();
    edges
}

/// Index of the bin holding `value`: the first bin whose upper edge is >= value.
/// The lowest edge belongs to bin 0.
pub(crate) fn bucket_index(edges: &[f64], value: f64) -> Option<usize> {
    let (&lowest, &highest) = (edges.first()?, edges.last()?);
    if !value.is_finite() || value < lowest || value > highest {
        return None;
    }
    if edges.len() == 1 {
        return Some(0);
    }
    Some(edges[1..].partition_point(|&edge| edge < value))
}

/// Sorted distinct present, finite values.
fn distinct_values(values: &[Option<f64>]) -> Vec<f64> {
    let mut distinct = sorted(&finite_values(values));
    distinct.dedup();
    distinct
}

/// Bucket from the rank of `value` among the distinct values, spread over all deciles.
fn rank_bucket(distinct: &[f64], value: f64) -> Option<usize> {
    let rank = distinct.binary_search_by(|d| d.total_cmp(&value)).ok()?;
    Some(rank * DECILE_COUNT / distinct.len())
}

/// Decile of every GDP value. Quantile edges are used unless ties leave fewer than
/// `DECILE_COUNT` non-empty bins with at least as many distinct values, in which case
/// the distinct values are ranked into deciles. Equal values always share a bucket.
pub(crate) fn gdp_deciles(gdp: &[Option<f64>]) -> Vec<Option<f64>> {
    let edges = decile_edges(gdp);
    debug!("GDP decile edges: {:?}", edges);
    let mut buckets: Vec<Option<usize>> = gdp
        .iter()
        .map(|v| v.and_then(|v| bucket_index(&edges, v)))
        .collect();

    let distinct = distinct_values(gdp);
    let used: BTreeSet<usize> = buckets.iter().flatten().copied().collect();
    if distinct.len() >= DECILE_COUNT && used.len() < DECILE_COUNT {
        info!(
            "GDP quantile edges fill {} of {} deciles; ranking {} distinct values instead",
            used.len(),
            DECILE_COUNT,
            distinct.len()
        );
        buckets = gdp
            .iter()
            .map(|v| v.filter(|v| v.is_finite()).and_then(|v| rank_bucket(&distinct, v)))
            .collect();
    }

    buckets.into_iter().map(|b| b.map(|b| b as f64)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clean::clean_table;
    use crate::load_clean::read_table;

    fn nums(values: &[f64]) -> Vec<Option<f64>> {
        values.iter().map(|&v| Some(v)).collect()
    }

    fn countries(values: &[&str]) -> Vec<Option<String>> {
        values.iter().map(|v| Some(v.to_string())).collect()
    }

    #[test]
    fn life_expectancy_difference_is_constant_per_country() {
        let names = countries(&["Afghanistan", "Afghanistan", "Afghanistan", "Albania"]);
        let life = nums(&[58.8, 59.2, 59.5, 77.0]);
        let diff = life_expectancy_difference(&names, &life);
        for value in &diff[..3] {
            assert!((value.unwrap() - 0.7).abs() < 1e-9);
        }
        assert_eq!(diff[3], Some(0.0));
    }

    #[test]
    fn life_expectancy_difference_ignores_missing_values() {
        let mut names = countries(&["A", "A", "B"]);
        names.push(None);
        let life = vec![Some(50.0), None, None, Some(70.0)];
        let diff = life_expectancy_difference(&names, &life);
        assert_eq!(diff, vec![Some(0.0), Some(0.0), None, None]);
    }

    #[test]
    fn mortality_alcohol_index_is_row_wise_product() {
        let index = mortality_alcohol_index(
            &[Some(263.0), None, Some(10.0)],
            &[Some(0.01), Some(1.0), Some(2.0)],
        );
        assert!((index[0].unwrap() - 2.63).abs() < 1e-9);
        assert_eq!(index[1], None);
        assert_eq!(index[2], Some(20.0));
    }

    #[test]
    fn per_capita_expenditure_propagates_non_finite_values() {
        let values = health_expenditure_per_capita(
            &[Some(8.0), Some(8.0), Some(0.0), Some(8.0), None],
            &[Some(2_000_000.0), Some(0.0), Some(0.0), None, Some(1.0)],
        );
        assert_eq!(values[0], Some(4.0));
        assert_eq!(values[1], Some(f64::INFINITY));
        assert!(values[2].unwrap().is_nan());
        assert!(values[3].unwrap().is_nan());
        assert_eq!(values[4], None);
    }

    #[test]
    fn ten_distinct_values_fill_ten_buckets() {
        let gdp = nums(&(1..=20).map(f64::from).collect::<Vec<_>>());
        let deciles = gdp_deciles(&gdp);
        let mut counts = [0usize; DECILE_COUNT];
        for d in deciles.iter().flatten() {
            counts[*d as usize] += 1;
        }
        assert_eq!(counts, [2; DECILE_COUNT]);
        assert_eq!(deciles[0], Some(0.0));
        assert_eq!(deciles[19], Some(9.0));
    }

    #[test]
    fn few_distinct_values_give_fewer_buckets() {
        let gdp = nums(&[1.0, 1.0, 1.0, 1.0, 1.0, 2.0, 2.0, 2.0, 2.0, 2.0]);
        let deciles = gdp_deciles(&gdp);
        assert_eq!(deciles[0], Some(0.0));
        assert_eq!(deciles[9], Some(1.0));
        assert_eq!(decile_edges(&[Some(3.0), Some(3.0)]), vec![3.0]);
        assert_eq!(gdp_deciles(&[Some(3.0), None]), vec![Some(0.0), None]);
    }

    #[test]
    fn tied_values_do_not_create_extra_edges() {
        let gdp = nums(&[3.0, 3.0, 3.0, 7.0, 7.0, 7.0, 7.0]);
        let edges = decile_edges(&gdp);
        assert!(edges.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(edges.first(), Some(&3.0));
        assert_eq!(edges.last(), Some(&7.0));
        let deciles = gdp_deciles(&gdp);
        assert!(deciles[..3].iter().all(|d| *d == deciles[0]));
        assert!(deciles[3..].iter().all(|d| *d == deciles[3]));
        assert!(deciles[0] < deciles[3]);
    }

    #[test]
    fn skewed_column_still_fills_ten_buckets() {
        // 91 rows at the bottom value and one row each for 2..=10
        let mut values = vec![1.0; 91];
        values.extend((2..=10).map(f64::from));
        let gdp = nums(&values);
        let deciles = gdp_deciles(&gdp);

        let used: BTreeSet<usize> = deciles.iter().flatten().map(|&d| d as usize).collect();
        assert_eq!(used, (0..DECILE_COUNT).collect::<BTreeSet<_>>());
        assert!(deciles[..91].iter().all(|d| *d == Some(0.0)));
        assert_eq!(deciles[91], Some(1.0));
        assert_eq!(deciles[99], Some(9.0));
        // ordered by value
        assert!(deciles
            .windows(2)
            .all(|w| w[0].unwrap() <= w[1].unwrap()));
    }

    #[test]
    fn derive_features_keeps_rows_and_reports_non_finite() {
        let table = Table::from_columns(vec![
            Column::text("Country", countries(&["A", "A", "B"])),
            Column::numeric("Life expectancy", nums(&[60.0, 62.0, 70.0])),
            Column::numeric("Adult Mortality", nums(&[100.0, 200.0, 50.0])),
            Column::numeric("Alcohol", nums(&[1.0, 2.0, 3.0])),
            Column::numeric("Total expenditure", nums(&[5.0, 6.0, 7.0])),
            Column::numeric("Population", vec![Some(1_000_000.0), Some(0.0), None]),
            Column::numeric("GDP", nums(&[100.0, 200.0, 300.0])),
        ])
        .unwrap();

        let derived = derive_features(&table).unwrap();
        assert_eq!(derived.table.row_count(), 3);
        assert_eq!(derived.table.columns().len(), 11);
        assert_eq!(
            derived.table.numeric(LIFE_EXPECTANCY_DIFFERENCE).unwrap(),
            &[Some(2.0), Some(2.0), Some(0.0)]
        );
        assert_eq!(
            derived.table.numeric(MORTALITY_ALCOHOL_INDEX).unwrap(),
            &[Some(100.0), Some(400.0), Some(150.0)]
        );
        assert_eq!(derived.warnings.len(), 1);
        assert_eq!(derived.warnings[0].rows, vec![1, 2]);
        assert_eq!(
            derived.table.numeric(GDP_DECILE).unwrap(),
            &[Some(0.0), Some(4.0), Some(9.0)]
        );
        // the cleaned input is left as it was
        assert_eq!(table.columns().len(), 7);
    }

    #[test]
    fn loaded_rows_survive_cleaning_and_derivation() {
        let csv = "Country,Year,Status,Life expectancy ,Adult Mortality, Alcohol,\
                   Total expenditure,Population,GDP\n\
                   Afghanistan,2015,Developing,65.0,263,0.01,8.16,33736494,584.25\n\
                   Afghanistan,2014,Developing,59.9,271,0.01,8.18,327582,612.69\n\
                   Albania,2015,Developing,77.8,74,4.6,6.0,28873,3954.23\n\
                   Albania,2014,Developing,,8,4.51,5.88,288914,4575.76\n";
        let raw = read_table(csv.as_bytes()).unwrap();
        assert!(raw.numeric("Life expectancy ").is_some());

        let cleaned = clean_table(&raw);
        assert_eq!(cleaned.table.row_count(), raw.row_count());
        // 1 of 4 missing is 25%: median of 59.9, 65.0, 77.8
        assert_eq!(cleaned.table.numeric(LIFE_EXPECTANCY).unwrap()[3], Some(65.0));
        assert!(cleaned.table.numeric(ALCOHOL).is_some());

        let derived = derive_features(&cleaned.table).unwrap();
        assert_eq!(derived.table.row_count(), 4);
        let diff = derived.table.numeric(LIFE_EXPECTANCY_DIFFERENCE).unwrap();
        assert!((diff[0].unwrap() - 5.1).abs() < 1e-9);
        assert!((diff[3].unwrap() - 12.8).abs() < 1e-9);
        assert!(derived.table.numeric(MORTALITY_ALCOHOL_INDEX).is_some());
        assert!(derived.table.numeric(HEALTH_EXPENDITURE_PER_CAPITA).is_some());
        assert_eq!(
            derived.table.numeric(GDP_DECILE).unwrap(),
            &[Some(0.0), Some(3.0), Some(6.0), Some(9.0)]
        );
        assert!(derived.warnings.is_empty());
    }
}
