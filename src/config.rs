use std::path::PathBuf;

/// Where the pipeline reads from and writes its charts to.
#[derive(Debug, Clone)]
pub(crate) struct PipelineConfig {
    pub(crate) input_path: PathBuf,
    pub(crate) chart_dir: PathBuf,
    /// Countries shown in the per-country chart. Empty means all countries.
    pub(crate) selected_countries: Vec<String>,
    pub(crate) preview_rows: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from("db").join("Life-Expectancy-Data.csv"),
            chart_dir: PathBuf::from("charts"),
            selected_countries: vec!["Afghanistan".to_string(), "Albania".to_string()],
            preview_rows: 5,
        }
    }
}

impl PipelineConfig {
    pub(crate) fn chart_path(&self, file_name: &str) -> PathBuf {
        self.chart_dir.join(file_name)
    }
}
