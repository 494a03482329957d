//! Cross-catalog integration.
//!
//! Every source catalog is streamed as `(id, title, year)` and each record is
//! looked up in the join index. A match becomes one row of the integrated
//! table; a record without a match is dropped silently. When the reference
//! catalog holds several entries for the same title and year, whichever row
//! the store returns first is used.

use anyhow::{Context, Result};
use log::{debug, info};

use crate::{
    config::{IntegrationConfig, SourceCatalog},
    interrupt::Interrupt,
    join_index::{IndexBuild, JoinIndex, JoinIndexBuilder, JoinIndexEntry},
    statement::{ColumnKind, CreateTable, Insert, Literal, quote_identifier},
    store::{Record, RowSource, StatementExecutor},
};

const TITLE_COLUMN: &str = "title";
const YEAR_COLUMN: &str = "year";
const REFERENCE_ID_COLUMN: &str = "reference_id";
const SOURCE_COLUMN: &str = "source";
const SOURCE_ID_COLUMN: &str = "source_id";
const RATING_COLUMN: &str = "rating";

/// A source record matched against the reference catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedRecord {
    pub title: String,
    pub year: i64,
    pub reference_id: String,
    pub source: String,
    pub source_id: String,
    pub rating: Option<f64>,
}

impl MergedRecord {
    pub fn new(record: SourceRecord, entry: JoinIndexEntry, source: &str) -> Self {
        Self {
            title: record.title,
            year: record.year,
            reference_id: entry.id,
            source: source.to_string(),
            source_id: record.id,
            rating: entry.rating,
        }
    }

    pub fn insert_statement(&self, table: &str) -> Insert {
        Insert::new(table)
            .value(TITLE_COLUMN, Literal::text(self.title.as_str()))
            .value(YEAR_COLUMN, Literal::number(self.year))
            .value(REFERENCE_ID_COLUMN, Literal::text(self.reference_id.as_str()))
            .value(SOURCE_COLUMN, Literal::text(self.source.as_str()))
            .value(SOURCE_ID_COLUMN, Literal::text(self.source_id.as_str()))
            .value(
                RATING_COLUMN,
                self.rating.map_or(Literal::Null, Literal::number),
            )
    }
}

/// `(id, title, year)` as read from a source catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRecord {
    pub id: String,
    pub title: String,
    pub year: i64,
}

impl SourceRecord {
    /// `None` when the title is missing or the year is not an integer.
    pub fn from_record(record: &Record) -> Option<Self> {
        let [id, title, year] = record.as_slice() else {
            return None;
        };
        Some(Self {
            id: id.as_text().unwrap_or_default(),
            title: title.as_text()?,
            year: year.as_integer()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogReport {
    pub table: String,
    pub source: String,
    pub records: usize,
    pub matched: usize,
    /// Records without a usable title or year.
    pub unusable: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrationReport {
    pub table_created: bool,
    pub index: IndexBuild,
    pub catalogs: Vec<CatalogReport>,
}

pub fn integrated_table_statement(table: &str) -> CreateTable {
    CreateTable::new(table)
        .column(TITLE_COLUMN, ColumnKind::Varchar(300))
        .column(YEAR_COLUMN, ColumnKind::Integer)
        .column(REFERENCE_ID_COLUMN, ColumnKind::Varchar(12))
        .column(SOURCE_COLUMN, ColumnKind::Varchar(10))
        .column(SOURCE_ID_COLUMN, ColumnKind::Varchar(6))
        .column(RATING_COLUMN, ColumnKind::Float)
}

pub fn source_query(catalog: &SourceCatalog) -> String {
    format!(
        "SELECT {}, {}, {} FROM {}",
        quote_identifier(&catalog.id_column),
        quote_identifier(&catalog.title_column),
        quote_identifier(&catalog.year_column),
        quote_identifier(&catalog.table)
    )
}

pub struct Integrator<'a, S> {
    store: &'a S,
    config: &'a IntegrationConfig,
    interrupt: &'a Interrupt,
}

impl<'a, S> Integrator<'a, S>
where
    S: StatementExecutor + RowSource,
{
    pub fn new(store: &'a S, config: &'a IntegrationConfig, interrupt: &'a Interrupt) -> Self {
        Self {
            store,
            config,
            interrupt,
        }
    }

    /// Prepares both tables, then integrates every catalog, committing after each.
    pub fn run(&self) -> Result<IntegrationReport> {
        let table_created = self.ensure_integrated_table()?;
        self.store.commit()?;
        let index = JoinIndexBuilder::new(&self.config.reference).ensure(self.store)?;
        self.store.commit()?;

        let mut catalogs = Vec::with_capacity(self.config.catalogs.len());
        for catalog in &self.config.catalogs {
            let report = self
                .integrate_catalog(catalog)
                .with_context(|| format!("Integrating catalog '{}'", catalog.table))?;
            self.store.commit()?;
            info!(
                "Matched {} of {} record(s) from {}",
                report.matched, report.records, catalog.table
            );
            catalogs.push(report);
        }
        Ok(IntegrationReport {
            table_created,
            index,
            catalogs,
        })
    }

    /// Returns true when the table had to be created.
    pub fn ensure_integrated_table(&self) -> Result<bool> {
        let table = &self.config.integrated_table;
        if self.store.table_exists(table)? {
            info!("Table {table} already exists");
            return Ok(false);
        }
        self.store
            .execute(&integrated_table_statement(table).to_string())
            .with_context(|| format!("Creating table '{table}'"))?;
        info!("New table {table} created");
        Ok(true)
    }

    pub fn integrate_catalog(&self, catalog: &SourceCatalog) -> Result<CatalogReport> {
        let index = JoinIndex::new(&self.config.reference.index_table);
        let interval = self.config.progress_interval;
        let mut report = CatalogReport {
            table: catalog.table.clone(),
            source: catalog.source.clone(),
            records: 0,
            matched: 0,
            unusable: 0,
        };

        self.store.stream_rows(&source_query(catalog), |rows| {
            for row in rows {
                self.interrupt.check()?;
                let row = row?;
                report.records += 1;
                let Some(record) = SourceRecord::from_record(&row) else {
                    debug!("Skipping record without title or year: {row:?}");
                    report.unusable += 1;
                    continue;
                };
                let Some(entry) = index.probe(self.store, &record.title, record.year)? else {
                    continue;
                };
                let merged = MergedRecord::new(record, entry, &catalog.source);
                self.store
                    .execute(&merged.insert_statement(&self.config.integrated_table).to_string())
                    .with_context(|| format!("Storing match for '{}'", merged.title))?;
                report.matched += 1;
                if interval > 0 && report.matched % interval == 0 {
                    info!("{} entries processed", report.matched);
                }
            }
            Ok(())
        })?;
        Ok(report)
    }
}
