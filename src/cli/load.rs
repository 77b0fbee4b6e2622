//! Load subcommand implementation.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use chload::{
    CsvBatchReader, Error, HttpStore, LoadConfig, LoadPipeline, LoadSummary, MemoryStore, Result,
    Store,
};
use indicatif::{ProgressBar, ProgressStyle};

use super::{ConnectionArgs, SourceArgs};

/// Run the load subcommand
pub fn run(source: &SourceArgs, connection: &ConnectionArgs, dry_run: bool, quiet: bool) -> Result<()> {
    let config = source.to_config()?;
    let reader = CsvBatchReader::new(open_input(&source.file)?, config.csv.clone())?;

    let progress = spinner(quiet);
    let result = if dry_run {
        let mut store = MemoryStore::new();
        let result = load(config, &mut store, reader, &progress);
        if result.is_ok() && !quiet {
            progress.suspend(|| report_dry_run(&store));
        }
        result
    } else {
        let store = HttpStore::connect(connection.to_store_config()).map_err(|e| {
            Error::Configuration(format!("cannot set up ClickHouse client: {}", e))
        })?;
        load(config, store, reader, &progress)
    };
    progress.finish_and_clear();

    let summary = result?;
    if !quiet {
        eprintln!(
            "Loaded {} row(s) into {} in {} batch(es) ({:.2?}){}",
            summary.rows,
            summary.table,
            summary.batches,
            summary.elapsed,
            if dry_run { " [dry run]" } else { "" }
        );
    }
    Ok(())
}

pub(crate) fn open_input(path: &Path) -> Result<BufReader<File>> {
    let file = File::open(path).map_err(|e| {
        Error::Configuration(format!(
            "cannot open input file '{}': {}",
            path.display(),
            e
        ))
    })?;
    Ok(BufReader::new(file))
}

fn load<S: Store, R: Read>(
    config: LoadConfig,
    store: S,
    reader: CsvBatchReader<R>,
    progress: &ProgressBar,
) -> Result<LoadSummary> {
    let mut pipeline = LoadPipeline::new(config, store).with_observer(|report| {
        progress.inc(report.rows as u64);
        progress.set_message(format!("batch {}", report.index));
    });
    pipeline.run(reader)
}

fn spinner(quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {pos} rows | {msg} | {elapsed}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message("reading");
    pb
}

fn report_dry_run(store: &MemoryStore) {
    eprintln!("Dry run, statements that would be executed:");
    for statement in store.statements() {
        eprintln!("  {};", statement);
    }
    for table in store.tables() {
        eprintln!("  {} row(s) would be inserted into {}", store.row_count(table), table);
    }
}
