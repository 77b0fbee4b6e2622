//! Plan subcommand implementation.

use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;

use chload::output::write_plan;
use chload::{plan_table, CsvBatchReader, Error, OutputFormat, Result};
use log::warn;

use super::load::open_input;
use super::{PlanFormat, SourceArgs};

/// Run the plan subcommand
pub fn run(source: &SourceArgs, format: PlanFormat, output_path: Option<&PathBuf>) -> Result<()> {
    let config = source.to_config()?;
    let reader = CsvBatchReader::new(open_input(&source.file)?, config.csv.clone())?;

    let plan = match plan_table(reader, &config)? {
        Some(plan) => plan,
        None => {
            warn!(
                "{} has no data rows; there is nothing to plan",
                source.file.display()
            );
            return Ok(());
        }
    };

    // Set up output
    let mut output: Box<dyn Write> = match output_path {
        Some(path) => {
            let file = File::create(path).map_err(|e| {
                Error::Configuration(format!(
                    "cannot create output file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
            Box::new(file)
        }
        None => Box::new(io::stdout()),
    };

    let format = match format {
        PlanFormat::Ddl => OutputFormat::Ddl,
        PlanFormat::Json => OutputFormat::Json,
    };
    write_plan(&plan, format, &mut output)?;
    output.flush()?;
    Ok(())
}
