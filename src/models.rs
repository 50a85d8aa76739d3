use serde::Serialize;
use std::fmt;

pub(crate) const COUNTRY: &str = "Country";
pub(crate) const YEAR: &str = "Year";
pub(crate) const STATUS: &str = "Status";
pub(crate) const LIFE_EXPECTANCY: &str = "Life expectancy";
pub(crate) const ADULT_MORTALITY: &str = "Adult Mortality";
pub(crate) const ALCOHOL: &str = "Alcohol";
pub(crate) const GDP: &str = "GDP";
pub(crate) const POPULATION: &str = "Population";
pub(crate) const TOTAL_EXPENDITURE: &str = "Total expenditure";
pub(crate) const SCHOOLING: &str = "Schooling";

// Derived columns
pub(crate) const LIFE_EXPECTANCY_DIFFERENCE: &str = "Life Expectancy Difference";
pub(crate) const MORTALITY_ALCOHOL_INDEX: &str = "Mortality Alcohol Index";
pub(crate) const HEALTH_EXPENDITURE_PER_CAPITA: &str = "Health Expenditure Per Capita";
pub(crate) const GDP_DECILE: &str = "GDP Decile";

pub(crate) const DEVELOPED: &str = "Developed";
pub(crate) const DEVELOPING: &str = "Developing";

/// Columns included in the correlation matrix, in display order.
pub(crate) const CORRELATION_COLUMNS: [&str; 7] = [
    LIFE_EXPECTANCY,
    ADULT_MORTALITY,
    ALCOHOL,
    MORTALITY_ALCOHOL_INDEX,
    GDP,
    SCHOOLING,
    HEALTH_EXPENDITURE_PER_CAPITA,
];

/// A borrowed view of one table cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Value<'a> {
    Missing,
    Number(f64),
    Text(&'a str),
}

impl fmt::Display for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Missing => Ok(()),
            Value::Number(v) => write!(f, "{}", v),
            Value::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct YearTrend {
    #[serde(rename = "Year")]
    pub(crate) year: i64,
    #[serde(rename = "Life expectancy")]
    pub(crate) life_expectancy: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct StatusTrend {
    #[serde(rename = "Year")]
    pub(crate) year: i64,
    #[serde(rename = "Status")]
    pub(crate) status: String,
    #[serde(rename = "Life expectancy")]
    pub(crate) life_expectancy: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct StatusCount {
    #[serde(rename = "Year")]
    pub(crate) year: i64,
    #[serde(rename = "Status")]
    pub(crate) status: String,
    #[serde(rename = "Country")]
    pub(crate) countries: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct MortalityAlcohol {
    #[serde(rename = "Country")]
    pub(crate) country: String,
    #[serde(rename = "Adult Mortality")]
    pub(crate) adult_mortality: Option<f64>,
    #[serde(rename = "Alcohol")]
    pub(crate) alcohol: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct DecileTrend {
    #[serde(rename = "GDP Decile")]
    pub(crate) decile: usize,
    #[serde(rename = "Life expectancy")]
    pub(crate) life_expectancy: Option<f64>,
}

/// Descriptive statistics of one numeric column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct ColumnSummary {
    pub(crate) column: String,
    pub(crate) count: usize,
    pub(crate) mean: Option<f64>,
    pub(crate) std: Option<f64>,
    pub(crate) min: Option<f64>,
    #[serde(rename = "25%")]
    pub(crate) p25: Option<f64>,
    #[serde(rename = "50%")]
    pub(crate) median: Option<f64>,
    #[serde(rename = "75%")]
    pub(crate) p75: Option<f64>,
    pub(crate) max: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct ColumnInfo {
    pub(crate) column: String,
    pub(crate) kind: &'static str,
    pub(crate) non_null: usize,
}
