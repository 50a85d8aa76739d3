mod charts;
mod clean;
mod config;
mod eda;
mod eda_statistics;
mod error;
mod features;
mod load_clean;
mod models;
mod table;

use clean::clean_table;
use config::PipelineConfig;
use eda_statistics::aggregate;
use env_logger::Env;
use features::derive_features;
use load_clean::load_table;
use log::{info, warn};
use std::error::Error;
use std::fs;
use std::io;

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = PipelineConfig::default();
    let mut out = io::stdout().lock();

    // Load
    let raw = load_table(&config.input_path)?;
    eda::print_overview(&mut out, &raw, config.preview_rows)?;

    // Clean (raw table stays untouched)
    let cleaned = clean_table(&raw);
    eda::print_missing_report(&mut out, &cleaned.report)?;

    // Derive
    let derived = derive_features(&cleaned.table)?;
    for warning in &derived.warnings {
        warn!("Computation warning: {}", warning);
    }
    eda::print_describe(&mut out, &derived.table)?;

    // Aggregate
    let aggregates = aggregate(&derived.table);
    eda::print_aggregates(&mut out, &aggregates)?;
    if let Some(r) = aggregates
        .correlation
        .get(models::LIFE_EXPECTANCY, models::SCHOOLING)
    {
        info!("Correlation between Life expectancy and Schooling: {:.2}", r);
    }

    // Render
    fs::create_dir_all(&config.chart_dir)?;
    let rendered = charts::render_all(&aggregates, &derived.table, &config);
    info!(
        "Rendered {} chart(s) into {}",
        rendered,
        config.chart_dir.display()
    );

    Ok(())
}
