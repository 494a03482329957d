//! Loading delimited files into tables.
//!
//! Each file is read twice: the first pass infers the schema, the second
//! renders and executes one `INSERT` per row. Statement failures are not
//! caught here; they propagate with the table and line attached and leave the
//! table partially populated until the caller commits or discards.

use std::path::Path;

use anyhow::{Context, Result, anyhow};
use log::{debug, info};

use crate::{
    config::LoadConfig,
    interrupt::Interrupt,
    io_utils::InputFormat,
    schema::{self, InferredSchema},
    statement::{CreateTable, Insert},
    store::StatementExecutor,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub table: String,
    pub columns: usize,
    pub rows_read: usize,
    pub rows_affected: usize,
    /// Rows where every cell was a null marker.
    pub rows_skipped: usize,
    /// False when the table already existed and the file was skipped.
    pub created: bool,
}

impl LoadReport {
    fn new(table: &str, columns: usize) -> Self {
        Self {
            table: table.to_string(),
            columns,
            rows_read: 0,
            rows_affected: 0,
            rows_skipped: 0,
            created: true,
        }
    }
}

/// Table name for a file: its base name with the last extension removed.
pub fn table_name_for(path: &Path) -> Result<String> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .map(str::to_string)
        .ok_or_else(|| anyhow!("Cannot derive a table name from {path:?}"))
}

pub struct BulkLoader<'a, E> {
    executor: &'a E,
    config: &'a LoadConfig,
    format: InputFormat,
    interrupt: &'a Interrupt,
}

impl<'a, E: StatementExecutor> BulkLoader<'a, E> {
    pub fn new(executor: &'a E, config: &'a LoadConfig, interrupt: &'a Interrupt) -> Result<Self> {
        Ok(Self {
            executor,
            config,
            format: config.input_format()?,
            interrupt,
        })
    }

    /// Reads input with `format` instead of the one derived from the config.
    pub fn with_format(mut self, format: InputFormat) -> Self {
        self.format = format;
        self
    }

    /// Loads every configured file in order, committing after each one.
    pub fn load_all(&self) -> Result<Vec<LoadReport>> {
        let paths = self.config.input_paths();
        if paths.is_empty() {
            return Err(anyhow!("No input files configured"));
        }
        let mut reports = Vec::with_capacity(paths.len());
        for path in &paths {
            info!("Adding file {} to database ...", path.display());
            let report = self
                .load_file(path)
                .with_context(|| format!("Loading {path:?}"))?;
            self.executor
                .commit()
                .with_context(|| format!("Committing table '{}'", report.table))?;
            reports.push(report);
        }
        Ok(reports)
    }

    pub fn infer(&self, path: &Path, table: &str) -> Result<InferredSchema> {
        let schema = schema::infer_schema(path, &self.format, &self.config.null_markers, self.interrupt)?;
        match self.config.key_columns.get(table) {
            Some(key) => schema.with_key_column(key),
            None => Ok(schema),
        }
    }

    pub fn load_file(&self, path: &Path) -> Result<LoadReport> {
        let table = table_name_for(path)?;
        if self.config.skip_existing_tables && self.executor.table_exists(&table)? {
            info!("Table {table} already exists, skipping {}", path.display());
            let mut report = LoadReport::new(&table, 0);
            report.created = false;
            return Ok(report);
        }

        let schema = self.infer(path, &table)?;
        let create = CreateTable::from_schema(&table, &schema, self.config.text_threshold);
        debug!("{create}");
        self.executor
            .execute(&create.to_string())
            .with_context(|| format!("Creating table '{table}'"))?;
        info!("Created table {table} with {} column(s)", schema.columns.len());

        let mut report = LoadReport::new(&table, schema.columns.len());
        let mut reader = self.format.open(path)?;
        while let Some(row) = reader.next_row()? {
            self.interrupt.check()?;
            report.rows_read += 1;
            let Some(insert) = Insert::from_row(&table, &schema, &row, &self.config.null_markers)
            else {
                debug!("Skipping line {} of {}: no non-null values", reader.line(), path.display());
                report.rows_skipped += 1;
                continue;
            };
            report.rows_affected += self
                .executor
                .execute(&insert.to_string())
                .with_context(|| format!("Inserting line {} into '{table}'", reader.line()))?;
            if self.config.progress_interval > 0
                && report.rows_read % self.config.progress_interval == 0
            {
                info!("{} rows affected so far ...", report.rows_affected);
            }
        }
        info!("Added {} rows to table {table}", report.rows_affected);
        Ok(report)
    }
}
