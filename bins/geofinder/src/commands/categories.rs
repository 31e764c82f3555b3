//! List known categories

use crate::output::{print_json, OutputFormat};
use anyhow::Result;
use geofinder_locator::{seed, ProximityEngine};

pub fn run(engine: &ProximityEngine, format: OutputFormat) -> Result<()> {
    let categories = engine.categories();

    if format == OutputFormat::Json {
        return print_json(&categories);
    }

    for category in categories {
        println!("  {} ({} seeded)", category, seed::rows_for(category).len());
    }
    Ok(())
}
