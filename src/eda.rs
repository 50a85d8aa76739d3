use crate::clean::MissingReport;
use crate::eda_statistics::{
    finite_values, mean, quantile, sorted, std_dev, Aggregates, CorrelationMatrix,
};
use crate::error::PipelineError;
use crate::models::ColumnSummary;
use crate::table::{ColumnData, Table};
use csv::WriterBuilder;
use serde::Serialize;
use std::io::Write;

/// Descriptive statistics for every numeric column, over finite present values.
pub(crate) fn describe(table: &Table) -> Vec<ColumnSummary> {
    table
        .columns()
        .iter()
        .filter_map(|column| match &column.data {
            ColumnData::Numeric(values) => Some((column.name.as_str(), values)),
            ColumnData::Text(_) => None,
        })
        .map(|(name, values)| {
            let values = finite_values(values);
            let sorted_values = sorted(&values);
            ColumnSummary {
                column: name.to_string(),
                count: values.len(),
                mean: mean(&values),
                std: std_dev(&values),
                min: sorted_values.first().copied(),
                p25: quantile(&sorted_values, 0.25),
                median: quantile(&sorted_values, 0.5),
                p75: quantile(&sorted_values, 0.75),
                max: sorted_values.last().copied(),
            }
        })
        .collect()
}

fn write_section<W: Write, T: Serialize>(
    out: &mut W,
    title: &str,
    rows: &[T],
) -> Result<(), PipelineError> {
    writeln!(out, "--{}--", title)?;
    let mut writer = WriterBuilder::new().has_headers(true).from_writer(&mut *out);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    drop(writer);
    writeln!(out)?;
    Ok(())
}

fn write_table<W: Write>(out: &mut W, title: &str, table: &Table) -> Result<(), PipelineError> {
    writeln!(out, "--{}--", title)?;
    let mut writer = WriterBuilder::new().from_writer(&mut *out);
    writer.write_record(table.column_names())?;
    for row in table.rows() {
        writer.write_record(row.iter().map(|value| value.to_string()))?;
    }
    writer.flush()?;
    drop(writer);
    writeln!(out)?;
    Ok(())
}

fn write_correlation<W: Write>(
    out: &mut W,
    matrix: &CorrelationMatrix,
) -> Result<(), PipelineError> {
    writeln!(out, "--correlation matrix--")?;
    let mut writer = WriterBuilder::new().from_writer(&mut *out);
    writer.write_record(std::iter::once("").chain(matrix.columns.iter().map(String::as_str)))?;
    for (name, row) in matrix.columns.iter().zip(matrix.values.rows()) {
        writer.write_record(
            std::iter::once(name.clone()).chain(row.iter().map(|r| format!("{:.4}", r))),
        )?;
    }
    writer.flush()?;
    drop(writer);
    writeln!(out)?;
    Ok(())
}

#[derive(Serialize)]
struct MissingRow<'a> {
    column: &'a str,
    missing: usize,
    missing_pct: f64,
    imputation: String,
}

/// head / columns / info, as inspected before cleaning.
pub(crate) fn print_overview<W: Write>(
    out: &mut W,
    table: &Table,
    preview_rows: usize,
) -> Result<(), PipelineError> {
    write_table(out, "head", &table.head(preview_rows))?;
    write_section(out, "info", &table.column_info())?;
    Ok(())
}

pub(crate) fn print_missing_report<W: Write>(
    out: &mut W,
    report: &[MissingReport],
) -> Result<(), PipelineError> {
    let rows: Vec<MissingRow<'_>> = report
        .iter()
        .map(|r| MissingRow {
            column: &r.column,
            missing: r.missing,
            missing_pct: r.missing_pct,
            imputation: r.imputation.to_string(),
        })
        .collect();
    write_section(out, "missing values (%)", &rows)
}

pub(crate) fn print_describe<W: Write>(out: &mut W, table: &Table) -> Result<(), PipelineError> {
    write_section(out, "describe", &describe(table))
}

pub(crate) fn print_aggregates<W: Write>(
    out: &mut W,
    aggregates: &Aggregates,
) -> Result<(), PipelineError> {
    write_section(out, "global trend", &aggregates.global_trend)?;
    write_section(out, "status trend", &aggregates.status_trend)?;
    write_section(out, "status counts", &aggregates.status_counts)?;
    write_section(out, "mortality vs alcohol", &aggregates.mortality_vs_alcohol)?;
    write_section(out, "gdp decile trend", &aggregates.gdp_decile_trend)?;
    write_correlation(out, &aggregates.correlation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clean::clean_table;
    use crate::eda_statistics::aggregate;
    use crate::table::Column;

    fn sample() -> Table {
        Table::from_columns(vec![
            Column::text(
                "Country",
                vec![Some("Afghanistan".to_string()), Some("Albania".to_string()), None],
            ),
            Column::numeric("Year", vec![Some(2000.0), Some(2000.0), Some(2001.0)]),
            Column::numeric("Life expectancy", vec![Some(1.0), Some(2.0), Some(4.0)]),
        ])
        .unwrap()
    }

    #[test]
    fn describe_covers_numeric_columns_only() {
        let summary = describe(&sample());
        assert_eq!(summary.len(), 2);
        let life = &summary[1];
        assert_eq!(life.column, "Life expectancy");
        assert_eq!(life.count, 3);
        assert_eq!(life.min, Some(1.0));
        assert_eq!(life.median, Some(2.0));
        assert_eq!(life.p25, Some(1.5));
        assert_eq!(life.p75, Some(3.0));
        assert_eq!(life.max, Some(4.0));
    }

    #[test]
    fn overview_prints_head_and_info() {
        let mut out = Vec::new();
        print_overview(&mut out, &sample(), 2).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("--head--\nCountry,Year,Life expectancy\nAfghanistan,2000,1\n"));
        assert!(!text.contains("2001"));
        assert!(text.contains("--info--\ncolumn,kind,non_null\nCountry,text,2\n"));
    }

    #[test]
    fn missing_report_lists_every_column() {
        let cleaned = clean_table(&sample());
        let mut out = Vec::new();
        print_missing_report(&mut out, &cleaned.report).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Country,1,33.3,non-numeric"));
        assert!(text.contains("Year,0,0.0,untouched"));
    }

    #[test]
    fn aggregates_print_as_csv_sections() {
        let mut out = Vec::new();
        print_aggregates(&mut out, &aggregate(&sample())).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("--global trend--\nYear,Life expectancy\n2000,1.5\n2001,4.0\n"));
        assert!(text
            .contains("--correlation matrix--\n,Life expectancy\nLife expectancy,1.0000\n"));
    }
}
