//! Materialized join index over the reference catalog.
//!
//! The titles and ratings tables are joined once into a flat table holding
//! just what matching needs (id, both title spellings, year, rating). Probing
//! that table per source record avoids running the join for every lookup.

use anyhow::{Context, Result};
use log::info;

use crate::{
    config::ReferenceCatalog,
    statement::{ColumnKind, CreateTable, Literal, quote_identifier},
    store::{Record, RowSource, StatementExecutor},
};

pub const ID_COLUMN: &str = "id";
pub const PRIMARY_TITLE_COLUMN: &str = "primary_title";
pub const ORIGINAL_TITLE_COLUMN: &str = "original_title";
pub const YEAR_COLUMN: &str = "year";
pub const RATING_COLUMN: &str = "rating";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexBuild {
    Created(usize),
    AlreadyPresent,
}

impl IndexBuild {
    pub fn rows_created(self) -> usize {
        match self {
            IndexBuild::Created(rows) => rows,
            IndexBuild::AlreadyPresent => 0,
        }
    }
}

/// One row of the join index.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinIndexEntry {
    pub id: String,
    pub primary_title: Option<String>,
    pub original_title: Option<String>,
    pub year: Option<i64>,
    pub rating: Option<f64>,
}

impl JoinIndexEntry {
    fn from_record(record: &Record) -> Option<Self> {
        let [id, primary, original, year, rating] = record.as_slice() else {
            return None;
        };
        Some(Self {
            id: id.as_text()?,
            primary_title: primary.as_text(),
            original_title: original.as_text(),
            year: year.as_integer(),
            rating: rating.as_real(),
        })
    }
}

pub struct JoinIndexBuilder<'a> {
    reference: &'a ReferenceCatalog,
}

impl<'a> JoinIndexBuilder<'a> {
    pub fn new(reference: &'a ReferenceCatalog) -> Self {
        Self { reference }
    }

    pub fn create_statement(&self) -> CreateTable {
        CreateTable::new(self.reference.index_table.clone())
            .column(ID_COLUMN, ColumnKind::Varchar(12))
            .column(PRIMARY_TITLE_COLUMN, ColumnKind::Varchar(300))
            .column(ORIGINAL_TITLE_COLUMN, ColumnKind::Varchar(300))
            .column(YEAR_COLUMN, ColumnKind::Integer)
            .column(RATING_COLUMN, ColumnKind::Float)
    }

    /// `INSERT … SELECT` joining titles to ratings on the id column.
    pub fn populate_statement(&self) -> String {
        let r = self.reference;
        let titles = |column: &str| format!("t.{}", quote_identifier(column));
        format!(
            "INSERT INTO {index} ({columns}) SELECT {id}, {primary}, {original}, {year}, r.{rating} \
             FROM {titles_table} AS t INNER JOIN {ratings_table} AS r ON {id} = r.{ratings_id}",
            index = quote_identifier(&r.index_table),
            columns = [
                ID_COLUMN,
                PRIMARY_TITLE_COLUMN,
                ORIGINAL_TITLE_COLUMN,
                YEAR_COLUMN,
                RATING_COLUMN
            ]
            .map(quote_identifier)
            .join(", "),
            id = titles(&r.id_column),
            primary = titles(&r.primary_title_column),
            original = titles(&r.original_title_column),
            year = titles(&r.year_column),
            rating = quote_identifier(&r.rating_column),
            titles_table = quote_identifier(&r.titles_table),
            ratings_table = quote_identifier(&r.ratings_table),
            ratings_id = quote_identifier(&r.id_column),
        )
    }

    /// Creates and fills the index unless a table of that name already exists.
    pub fn ensure<E: StatementExecutor>(&self, executor: &E) -> Result<IndexBuild> {
        let table = &self.reference.index_table;
        if executor.table_exists(table)? {
            info!("Join index {table} already exists");
            return Ok(IndexBuild::AlreadyPresent);
        }
        executor
            .execute(&self.create_statement().to_string())
            .with_context(|| format!("Creating join index '{table}'"))?;
        let rows = executor
            .execute(&self.populate_statement())
            .with_context(|| format!("Populating join index '{table}'"))?;
        info!("Created join index {table} containing {rows} rows");
        Ok(IndexBuild::Created(rows))
    }
}

/// Read side of the join index.
pub struct JoinIndex<'a> {
    table: &'a str,
}

impl<'a> JoinIndex<'a> {
    pub fn new(table: &'a str) -> Self {
        Self { table }
    }

    /// Exact, case-sensitive lookup on year and either title spelling.
    pub fn probe_statement(&self, title: &str, year: i64) -> String {
        let title = Literal::text(title);
        format!(
            "SELECT {id}, {primary}, {original}, {year_col}, {rating} FROM {table} \
             WHERE {year_col} = {year} AND ({primary} = {title} OR {original} = {title})",
            id = quote_identifier(ID_COLUMN),
            primary = quote_identifier(PRIMARY_TITLE_COLUMN),
            original = quote_identifier(ORIGINAL_TITLE_COLUMN),
            year_col = quote_identifier(YEAR_COLUMN),
            rating = quote_identifier(RATING_COLUMN),
            table = quote_identifier(self.table),
        )
    }

    /// First entry the store returns for `(title, year)`, if any.
    pub fn probe<S: RowSource>(&self, source: &S, title: &str, year: i64) -> Result<Option<JoinIndexEntry>> {
        let record = source
            .first_row(&self.probe_statement(title, year))
            .with_context(|| format!("Probing join index for '{title}' ({year})"))?;
        Ok(record.as_ref().and_then(JoinIndexEntry::from_record))
    }
}
