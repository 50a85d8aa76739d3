use crate::error::PipelineError;
use crate::models::{ColumnInfo, Value, COUNTRY};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ColumnData {
    Numeric(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
}

impl ColumnData {
    pub(crate) fn len(&self) -> usize {
        match self {
            ColumnData::Numeric(values) => values.len(),
            ColumnData::Text(values) => values.len(),
        }
    }

    pub(crate) fn missing_count(&self) -> usize {
        match self {
            ColumnData::Numeric(values) => values.iter().filter(|v| v.is_none()).count(),
            ColumnData::Text(values) => values.iter().filter(|v| v.is_none()).count(),
        }
    }

    fn take(&self, indices: &[usize]) -> ColumnData {
        match self {
            ColumnData::Numeric(values) => {
                ColumnData::Numeric(indices.iter().map(|&i| values[i]).collect())
            }
            ColumnData::Text(values) => {
                ColumnData::Text(indices.iter().map(|&i| values[i].clone()).collect())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Column {
    pub(crate) name: String,
    pub(crate) data: ColumnData,
}

impl Column {
    pub(crate) fn numeric(name: &str, values: Vec<Option<f64>>) -> Self {
        Self {
            name: name.to_string(),
            data: ColumnData::Numeric(values),
        }
    }

    pub(crate) fn text(name: &str, values: Vec<Option<String>>) -> Self {
        Self {
            name: name.to_string(),
            data: ColumnData::Text(values),
        }
    }

    pub(crate) fn is_numeric(&self) -> bool {
        matches!(self.data, ColumnData::Numeric(_))
    }
}

/// Column-major record table. Column order and row order are those of the input.
#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) struct Table {
    columns: Vec<Column>,
    row_count: usize,
}

impl Table {
    pub(crate) fn from_columns(columns: Vec<Column>) -> Result<Self, PipelineError> {
        let row_count = columns.first().map(|c| c.data.len()).unwrap_or(0);
        for column in &columns {
            if column.data.len() != row_count {
                return Err(PipelineError::ColumnLength {
                    name: column.name.clone(),
                    expected: row_count,
                    actual: column.data.len(),
                });
            }
        }
        Ok(Self { columns, row_count })
    }

    pub(crate) fn row_count(&self) -> usize {
        self.row_count
    }

    pub(crate) fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub(crate) fn columns_mut(&mut self) -> &mut [Column] {
        &mut self.columns
    }

    pub(crate) fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub(crate) fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Values of a numeric column, or `None` if the column is absent or text.
    pub(crate) fn numeric(&self, name: &str) -> Option<&[Option<f64>]> {
        match self.column(name).map(|c| &c.data) {
            Some(ColumnData::Numeric(values)) => Some(values),
            _ => None,
        }
    }

    pub(crate) fn text(&self, name: &str) -> Option<&[Option<String>]> {
        match self.column(name).map(|c| &c.data) {
            Some(ColumnData::Text(values)) => Some(values),
            _ => None,
        }
    }

    /// Appends a column, replacing any existing column of the same name in place.
    pub(crate) fn set_column(&mut self, column: Column) -> Result<(), PipelineError> {
        if !self.columns.is_empty() && column.data.len() != self.row_count {
            return Err(PipelineError::ColumnLength {
                name: column.name,
                expected: self.row_count,
                actual: column.data.len(),
            });
        }
        if self.columns.is_empty() {
            self.row_count = column.data.len();
        }
        match self.columns.iter_mut().find(|c| c.name == column.name) {
            Some(existing) => *existing = column,
            None => self.columns.push(column),
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn value(&self, row: usize, name: &str) -> Option<Value<'_>> {
        let column = self.column(name)?;
        Some(cell(column, row))
    }

    pub(crate) fn rows(&self) -> impl Iterator<Item = Vec<Value<'_>>> + '_ {
        (0..self.row_count).map(move |row| self.columns.iter().map(|c| cell(c, row)).collect())
    }

    pub(crate) fn take_rows(&self, indices: &[usize]) -> Table {
        Table {
            columns: self
                .columns
                .iter()
                .map(|c| Column {
                    name: c.name.clone(),
                    data: c.data.take(indices),
                })
                .collect(),
            row_count: indices.len(),
        }
    }

    pub(crate) fn head(&self, n: usize) -> Table {
        let indices: Vec<usize> = (0..n.min(self.row_count)).collect();
        self.take_rows(&indices)
    }

    /// Rows whose `Country` is in `countries`. An empty selection keeps every row.
    pub(crate) fn filter_countries(&self, countries: &[String]) -> Table {
        if countries.is_empty() {
            return self.clone();
        }
        let selected: HashSet<&str> = countries.iter().map(String::as_str).collect();
        let indices: Vec<usize> = match self.text(COUNTRY) {
            Some(values) => values
                .iter()
                .enumerate()
                .filter(|(_, c)| c.as_deref().is_some_and(|c| selected.contains(c)))
                .map(|(i, _)| i)
                .collect(),
            None => Vec::new(),
        };
        self.take_rows(&indices)
    }

    pub(crate) fn column_info(&self) -> Vec<ColumnInfo> {
        self.columns
            .iter()
            .map(|c| ColumnInfo {
                column: c.name.clone(),
                kind: if c.is_numeric() { "numeric" } else { "text" },
                non_null: self.row_count - c.data.missing_count(),
            })
            .collect()
    }
}

fn cell(column: &Column, row: usize) -> Value<'_> {
    match &column.data {
        ColumnData::Numeric(values) => values[row].map_or(Value::Missing, Value::Number),
        ColumnData::Text(values) => values[row]
            .as_deref()
            .map_or(Value::Missing, Value::Text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::from_columns(vec![
            Column::text(
                "Country",
                vec![
                    Some("Afghanistan".to_string()),
                    Some("Albania".to_string()),
                    Some("Afghanistan".to_string()),
                ],
            ),
            Column::numeric("Year", vec![Some(2000.0), Some(2000.0), Some(2001.0)]),
            Column::numeric("GDP", vec![Some(1.5), None, Some(2.5)]),
        ])
        .unwrap()
    }

    #[test]
    fn rejects_columns_of_unequal_length() {
        let err = Table::from_columns(vec![
            Column::numeric("a", vec![Some(1.0), Some(2.0)]),
            Column::numeric("b", vec![Some(1.0)]),
        ])
        .unwrap_err();
        assert!(matches!(err, PipelineError::ColumnLength { expected: 2, actual: 1, .. }));
    }

    #[test]
    fn set_column_replaces_existing_column_in_place() {
        let mut table = sample();
        table
            .set_column(Column::numeric("Year", vec![Some(1.0), Some(2.0), Some(3.0)]))
            .unwrap();
        assert_eq!(table.column_names(), vec!["Country", "Year", "GDP"]);
        assert_eq!(table.value(2, "Year"), Some(Value::Number(3.0)));

        let err = table.set_column(Column::numeric("short", vec![Some(1.0)]));
        assert!(err.is_err());
    }

    #[test]
    fn filter_countries_keeps_selected_rows_in_order() {
        let table = sample();
        let filtered = table.filter_countries(&["Afghanistan".to_string(), "Nowhere".to_string()]);
        assert_eq!(filtered.row_count(), 2);
        assert_eq!(
            filtered.numeric("Year").unwrap(),
            &[Some(2000.0), Some(2001.0)]
        );
        assert_eq!(table.filter_countries(&[]), table);
    }

    #[test]
    fn column_info_counts_present_cells() {
        let info = sample().column_info();
        assert_eq!(info[0].kind, "text");
        assert_eq!(info[2].kind, "numeric");
        assert_eq!(info[2].non_null, 2);
    }

    #[test]
    fn rows_yield_cells_in_column_order() {
        let table = sample();
        let rows: Vec<Vec<Value<'_>>> = table.rows().collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1][0], Value::Text("Albania"));
        assert_eq!(rows[1][2], Value::Missing);
        assert_eq!(table.head(1).row_count(), 1);
        assert_eq!(table.head(10).row_count(), 3);
    }
}
