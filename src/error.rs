use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("input file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("parse error at line {line}: {message}")]
    Parse { line: u64, message: String },

    #[error("column `{name}` has {actual} values, table has {expected} rows")]
    ColumnLength {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Non-finite values produced while deriving a column. Reported, never raised.
#[derive(Debug, Clone, PartialEq)]
pub struct ComputationWarning {
    pub column: String,
    pub rows: Vec<usize>,
}

impl fmt::Display for ComputationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "`{}` is non-finite in {} row(s)",
            self.column,
            self.rows.len()
        )
    }
}
