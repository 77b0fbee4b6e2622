//! Load driver.
//!
//! A [`LoadPipeline`] walks the batches of one source file:
//!
//! ```text
//! Init --first batch--> SchemaReady --> Streaming --input exhausted--> Done
//!   \                                       |
//!    `-----------------------------------> Failed
//! ```
//!
//! The first batch fixes the [`TablePlan`] (identifiers, dtypes, types and
//! schema) and triggers drop-then-create on the store. Every batch,
//! including the first, is then coerced against that plan and inserted.
//! The first error ends the run; batches already inserted stay inserted.

use std::fmt;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use serde::Serialize;

use crate::batch::Batch;
use crate::coerce::{sniff_batch, Coercer};
use crate::config::LoadConfig;
use crate::error::{Error, Result};
use crate::schema::builder::build_table_schema;
use crate::schema::identifiers::{normalize_identifiers, resolve_identifier};
use crate::schema::mapper::build_type_map;
use crate::schema::types::{DtypeMap, IdentifierMap, TableSchema, TypeMap};
use crate::store::Store;

/// Where a [`LoadPipeline`] is in its run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Init,
    SchemaReady,
    Streaming,
    Done,
    Failed,
}

impl fmt::Display for LoadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoadState::Init => "init",
            LoadState::SchemaReady => "schema-ready",
            LoadState::Streaming => "streaming",
            LoadState::Done => "done",
            LoadState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Everything fixed by the first batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TablePlan {
    pub identifiers: IdentifierMap,
    pub dtypes: DtypeMap,
    pub types: TypeMap,
    pub schema: TableSchema,
}

impl TablePlan {
    /// Derive the plan from a first batch whose timestamps were already
    /// sniffed. Performs no I/O, so every failure here happens before the
    /// store is touched.
    pub fn from_first_batch(batch: &Batch, config: &LoadConfig) -> Result<Self> {
        config.validate()?;

        let labels = batch.labels();
        let identifiers = normalize_identifiers(&labels);

        let primary_key = resolve_identifier(&identifiers, &config.primary_key)
            .ok_or_else(|| {
                Error::Configuration(format!(
                    "primary key '{}' not found among columns: {}",
                    config.primary_key,
                    identifiers.values().cloned().collect::<Vec<_>>().join(", ")
                ))
            })?
            .to_string();

        let dtypes: DtypeMap = batch
            .dtypes()
            .into_iter()
            .zip(identifiers.values())
            .map(|((_, dtype), identifier)| (identifier.clone(), dtype.normalized()))
            .collect();

        let types = build_type_map(&dtypes, &config.type_overrides)?;
        let columns: Vec<String> = identifiers.values().cloned().collect();
        let schema = build_table_schema(&config.table, &columns, &primary_key, &types)?;

        Ok(Self {
            identifiers,
            dtypes,
            types,
            schema,
        })
    }

    pub fn coercer(&self) -> Coercer<'_> {
        Coercer::new(&self.identifiers, &self.dtypes)
    }
}

/// Timing of one processed batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchReport {
    pub index: usize,
    pub rows: usize,
    pub read: Duration,
    pub coerce: Duration,
    pub insert: Duration,
}

/// Result of a finished load.
#[derive(Debug, Clone)]
pub struct LoadSummary {
    pub table: String,
    pub batches: usize,
    pub rows: usize,
    pub elapsed: Duration,
    /// `None` when the input had no data rows.
    pub plan: Option<TablePlan>,
}

type Observer<'a> = Box<dyn FnMut(&BatchReport) + 'a>;

/// Drives one load against one store.
pub struct LoadPipeline<'a, S: Store> {
    config: LoadConfig,
    store: S,
    state: LoadState,
    plan: Option<TablePlan>,
    batches: usize,
    rows: usize,
    observer: Option<Observer<'a>>,
}

impl<'a, S: Store> LoadPipeline<'a, S> {
    pub fn new(config: LoadConfig, store: S) -> Self {
        Self {
            config,
            store,
            state: LoadState::Init,
            plan: None,
            batches: 0,
            rows: 0,
            observer: None,
        }
    }

    /// Call `observer` after every inserted batch.
    pub fn with_observer(mut self, observer: impl FnMut(&BatchReport) + 'a) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn plan(&self) -> Option<&TablePlan> {
        self.plan.as_ref()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Consume every batch and load it.
    ///
    /// On error the pipeline is left in [`LoadState::Failed`]; whatever was
    /// inserted before the failing batch stays in the store.
    pub fn run<I>(&mut self, batches: I) -> Result<LoadSummary>
    where
        I: IntoIterator<Item = Result<Batch>>,
    {
        if self.state != LoadState::Init {
            return Err(Error::Configuration(format!(
                "pipeline for {} already ran (state {})",
                self.config.table, self.state
            )));
        }

        let started = Instant::now();
        info!(
            "Loading {} into table {} on {}",
            self.config
                .source
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "<batches>".to_string()),
            self.config.table,
            self.store.describe()
        );

        if let Err(e) = self.drive(batches.into_iter()) {
            return Err(self.fail(e));
        }

        let elapsed = started.elapsed();
        self.state = LoadState::Done;
        info!(
            "Loaded {} row(s) in {} batch(es) into {} in {:.2?}",
            self.rows, self.batches, self.config.table, elapsed
        );

        Ok(LoadSummary {
            table: self.config.table.clone(),
            batches: self.batches,
            rows: self.rows,
            elapsed,
            plan: self.plan.clone(),
        })
    }

    fn drive<I>(&mut self, mut batches: I) -> Result<()>
    where
        I: Iterator<Item = Result<Batch>>,
    {
        self.config.validate()?;

        let mut read_started = Instant::now();
        let mut first = match batches.next() {
            Some(item) => item?,
            None => {
                warn!(
                    "Input has no data rows; table {} was not touched",
                    self.config.table
                );
                return Ok(());
            }
        };
        first.index = 0;
        let read = read_started.elapsed();

        sniff_batch(&mut first);
        let plan = TablePlan::from_first_batch(&first, &self.config)?;
        self.create_table(&plan.schema)?;
        self.state = LoadState::SchemaReady;
        self.plan = Some(plan.clone());

        self.stream(&plan, first, read)?;

        read_started = Instant::now();
        for (offset, item) in batches.enumerate() {
            let mut batch = item?;
            batch.index = offset + 1;
            let read = read_started.elapsed();
            sniff_batch(&mut batch);
            self.stream(&plan, batch, read)?;
            read_started = Instant::now();
        }
        Ok(())
    }

    /// Coerce and insert one sniffed batch.
    fn stream(&mut self, plan: &TablePlan, batch: Batch, read: Duration) -> Result<()> {
        let index = batch.index;
        let coerce_started = Instant::now();
        let batch = plan.coercer().coerce_sniffed(batch)?;
        let coerce = coerce_started.elapsed();
        self.state = LoadState::Streaming;

        let rows = batch.row_count();
        let columns = plan.schema.column_names();
        let records = batch.into_rows();

        let insert_started = Instant::now();
        self.store
            .insert(&plan.schema.table, &columns, &records)
            .map_err(|source| Error::Insertion {
                batch: index,
                source,
            })?;
        let insert = insert_started.elapsed();

        self.batches += 1;
        self.rows += rows;

        let report = BatchReport {
            index,
            rows,
            read,
            coerce,
            insert,
        };
        info!(
            "Batch {}: {} row(s); read {:.2?}, coerce {:.2?}, insert {:.2?}",
            report.index, report.rows, report.read, report.coerce, report.insert
        );
        if let Some(observer) = self.observer.as_mut() {
            observer(&report);
        }
        Ok(())
    }

    fn create_table(&mut self, schema: &TableSchema) -> Result<()> {
        warn!(
            "Replacing table {}: any existing data in it is dropped",
            schema.table
        );
        for statement in [&schema.drop_statement, &schema.create_statement] {
            debug!("Executing: {}", statement);
            self.store
                .execute(statement)
                .map_err(|source| Error::SchemaCreation {
                    statement: statement.clone(),
                    source,
                })?;
        }
        info!(
            "Created table {} with {} column(s), primary key {}",
            schema.table,
            schema.columns.len(),
            schema.primary_key
        );
        Ok(())
    }

    fn fail(&mut self, error: Error) -> Error {
        warn!(
            "Load of {} failed in state {} after {} batch(es), {} row(s) committed",
            self.config.table, self.state, self.batches, self.rows
        );
        self.state = LoadState::Failed;
        error
    }
}

/// Read only as far as the first batch and derive the plan, without any
/// store access.
pub fn plan_table<I>(batches: I, config: &LoadConfig) -> Result<Option<TablePlan>>
where
    I: IntoIterator<Item = Result<Batch>>,
{
    match batches.into_iter().next() {
        Some(batch) => {
            let mut batch = batch?;
            sniff_batch(&mut batch);
            TablePlan::from_first_batch(&batch, config).map(Some)
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{Column, Value};
    use crate::inference::typed_column;
    use crate::schema::types::Dtype;
    use crate::store::MemoryStore;

    fn batch(columns: &[(&str, &[Option<&str>])]) -> Batch {
        Batch::new(
            0,
            columns
                .iter()
                .map(|(name, cells)| {
                    typed_column(name, cells.iter().map(|c| c.map(str::to_string)).collect())
                })
                .collect(),
        )
    }

    #[test]
    fn test_plan_from_first_batch() {
        let mut first = batch(&[
            ("Id", &[Some("1"), Some("2")]),
            ("Score", &[Some("1.5"), None]),
            ("When", &[Some("2024-01-01 00:00:00"), None]),
            ("Note", &[None, Some("x")]),
        ]);
        sniff_batch(&mut first);
        let plan = TablePlan::from_first_batch(&first, &LoadConfig::new("t", "Id")).unwrap();

        assert_eq!(plan.schema.primary_key, "id");
        assert_eq!(plan.dtypes["id"], Dtype::Int64);
        assert_eq!(plan.dtypes["score"], Dtype::Float64);
        assert_eq!(plan.dtypes["when"], Dtype::DateTime);
        assert_eq!(plan.dtypes["note"], Dtype::Str);
        assert_eq!(plan.types["when"], "DateTime");
        assert_eq!(plan.types["note"], "String");
    }

    #[test]
    fn test_plan_unknown_primary_key() {
        let first = batch(&[("Id", &[Some("1")])]);
        let err = TablePlan::from_first_batch(&first, &LoadConfig::new("t", "missing")).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_state_transitions() {
        let mut pipeline = LoadPipeline::new(LoadConfig::new("t", "id"), MemoryStore::new());
        assert_eq!(pipeline.state(), LoadState::Init);

        let summary = pipeline
            .run(vec![Ok(batch(&[("id", &[Some("1")])]))])
            .unwrap();
        assert_eq!(pipeline.state(), LoadState::Done);
        assert_eq!(summary.batches, 1);
        assert_eq!(pipeline.store().row_count("t"), 1);
        assert!(pipeline.plan().is_some());
    }

    #[test]
    fn test_pipeline_runs_once() {
        let mut pipeline = LoadPipeline::new(LoadConfig::new("t", "id"), MemoryStore::new());
        pipeline.run(Vec::new()).unwrap();
        assert!(pipeline.run(Vec::new()).unwrap_err().is_configuration());
    }

    #[test]
    fn test_empty_input_does_not_touch_store() {
        let mut pipeline = LoadPipeline::new(LoadConfig::new("t", "id"), MemoryStore::new());
        let summary = pipeline.run(Vec::new()).unwrap();
        assert_eq!(summary.rows, 0);
        assert!(summary.plan.is_none());
        assert!(pipeline.store().statements().is_empty());
    }

    #[test]
    fn test_schema_creation_failure() {
        let store = MemoryStore::new().fail_statement_at(1);
        let mut pipeline = LoadPipeline::new(LoadConfig::new("t", "id"), store);
        let err = pipeline
            .run(vec![Ok(batch(&[("id", &[Some("1")])]))])
            .unwrap_err();
        assert!(matches!(err, Error::SchemaCreation { .. }));
        assert_eq!(pipeline.state(), LoadState::Failed);
        assert_eq!(pipeline.store().insert_calls(), 0);
    }

    #[test]
    fn test_insertion_failure_keeps_earlier_batches() {
        let store = MemoryStore::new().fail_insert_at(1);
        let mut pipeline = LoadPipeline::new(LoadConfig::new("t", "id"), store);
        let batches = vec![
            Ok(batch(&[("id", &[Some("1")])])),
            Ok(batch(&[("id", &[Some("2")])])),
            Ok(batch(&[("id", &[Some("3")])])),
        ];
        let err = pipeline.run(batches).unwrap_err();
        assert!(matches!(err, Error::Insertion { batch: 1, .. }));
        assert_eq!(pipeline.state(), LoadState::Failed);
        assert_eq!(pipeline.store().row_count("t"), 1);
        assert_eq!(pipeline.store().insert_calls(), 2);
    }

    #[test]
    fn test_reader_error_aborts() {
        let mut pipeline = LoadPipeline::new(LoadConfig::new("t", "id"), MemoryStore::new());
        let batches = vec![
            Ok(batch(&[("id", &[Some("1")])])),
            Err(Error::Read {
                batch: 1,
                message: "bad quote".to_string(),
            }),
        ];
        let err = pipeline.run(batches).unwrap_err();
        assert_eq!(err.batch(), Some(1));
        assert_eq!(pipeline.store().row_count("t"), 1);
    }

    #[test]
    fn test_observer_sees_every_batch() {
        let mut seen = Vec::new();
        {
            let mut pipeline = LoadPipeline::new(LoadConfig::new("t", "id"), MemoryStore::new())
                .with_observer(|report| seen.push((report.index, report.rows)));
            pipeline
                .run(vec![
                    Ok(batch(&[("id", &[Some("1"), Some("2")])])),
                    Ok(batch(&[("id", &[Some("3")])])),
                ])
                .unwrap();
        }
        assert_eq!(seen, vec![(0, 2), (1, 1)]);
    }

    #[test]
    fn test_rows_are_typed_in_store() {
        let mut pipeline = LoadPipeline::new(LoadConfig::new("t", "id"), MemoryStore::new());
        pipeline
            .run(vec![Ok(Batch::new(
                0,
                vec![
                    Column::new("id", Dtype::Int64, vec![Value::Int(1), Value::Int(2)]),
                    Column::new("v", Dtype::Float64, vec![Value::Null, Value::Float(0.5)]),
                ],
            ))])
            .unwrap();
        let rows = &pipeline.store().table("t").unwrap().rows;
        assert_eq!(rows[0]["v"], Value::Float(0.0));
        assert_eq!(rows[1]["v"], Value::Float(0.5));
    }

    #[test]
    fn test_plan_table_reads_first_batch_only() {
        let config = LoadConfig::new("t", "id");
        let batches = vec![
            Ok(batch(&[("id", &[Some("1")])])),
            Err(Error::Read {
                batch: 1,
                message: "never reached".to_string(),
            }),
        ];
        let plan = plan_table(batches, &config).unwrap().unwrap();
        assert_eq!(plan.schema.columns.len(), 1);
        assert!(plan_table(Vec::new(), &config).unwrap().is_none());
    }
}
