use crate::eda_statistics::{mean, median};
use crate::table::{ColumnData, Table};
use log::{debug, info};
use std::fmt;

/// Highest missing percentage (inclusive) imputed with the column mean.
pub(crate) const MEAN_IMPUTATION_MAX_PCT: f64 = 1.2;
/// Highest missing percentage (inclusive) imputed with the column median.
pub(crate) const MEDIAN_IMPUTATION_MAX_PCT: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Imputation {
    Untouched,
    Mean(f64),
    Median(f64),
    SkippedHighMissing,
    NonNumeric,
}

impl fmt::Display for Imputation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Imputation::Untouched => f.write_str("untouched"),
            Imputation::Mean(v) => write!(f, "mean ({:.4})", v),
            Imputation::Median(v) => write!(f, "median ({:.4})", v),
            Imputation::SkippedHighMissing => f.write_str("skipped (missing > 50%)"),
            Imputation::NonNumeric => f.write_str("non-numeric"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct MissingReport {
    pub(crate) column: String,
    pub(crate) missing: usize,
    pub(crate) missing_pct: f64,
    pub(crate) imputation: Imputation,
}

#[derive(Debug, Clone)]
pub(crate) struct CleanedTable {
    pub(crate) table: Table,
    pub(crate) report: Vec<MissingReport>,
}

/// Missing share of a column as a percentage, rounded to one decimal place.
pub(crate) fn missing_pct(missing: usize, rows: usize) -> f64 {
    if rows == 0 {
        return 0.0;
    }
    (missing as f64 / rows as f64 * 1000.0).round() / 10.0
}

pub(crate) fn strip_label(label: &str) -> String {
    label.trim().to_string()
}

// Step 1: copy, Step 2: normalize labels, Step 3-4: measure and impute
pub(crate) fn clean_table(raw: &Table) -> CleanedTable {
    let mut table = raw.clone();
    let rows = table.row_count();
    let mut report = Vec::with_capacity(table.columns().len());

    for column in table.columns_mut() {
        column.name = strip_label(&column.name);

        let missing = column.data.missing_count();
        let pct = missing_pct(missing, rows);
        debug!("Column {:?}: {} missing ({}%)", column.name, missing, pct);

        let imputation = match &mut column.data {
            ColumnData::Text(_) => Imputation::NonNumeric,
            ColumnData::Numeric(values) => impute(values, pct),
        };

        if let Imputation::Mean(_) | Imputation::Median(_) = imputation {
            info!(
                "Imputed {} missing value(s) in {:?} with {}",
                missing, column.name, imputation
            );
        }

        report.push(MissingReport {
            column: column.name.clone(),
            missing,
            missing_pct: pct,
            imputation,
        });
    }

    CleanedTable { table, report }
}

fn impute(values: &mut [Option<f64>], pct: f64) -> Imputation {
    if pct == 0.0 {
        return Imputation::Untouched;
    }
    if pct > MEDIAN_IMPUTATION_MAX_PCT {
        return Imputation::SkippedHighMissing;
    }

    let present: Vec<f64> = values.iter().flatten().copied().collect();
    let (fill, imputation) = if pct <= MEAN_IMPUTATION_MAX_PCT {
        match mean(&present) {
            Some(m) => (m, Imputation::Mean(m)),
            None => return Imputation::Untouched,
        }
    } else {
        match median(&present) {
            Some(m) => (m, Imputation::Median(m)),
            None => return Imputation::Untouched,
        }
    };

    for value in values.iter_mut().filter(|v| v.is_none()) {
        *value = Some(fill);
    }
    imputation
}
