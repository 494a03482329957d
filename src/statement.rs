//! Structured `CREATE TABLE` and `INSERT` statements.
//!
//! Statements are assembled from typed clauses and serialized in exactly one
//! place, their [`fmt::Display`] impls. Identifiers are double-quoted and
//! string literals single-quoted, with embedded quote characters doubled.

use std::fmt;

use itertools::Itertools;

use crate::{
    inference::{NullMarkers, SqlType},
    schema::InferredSchema,
};

pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Storage declared for a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Float,
    Varchar(usize),
    Text,
}

impl ColumnKind {
    /// Strings shorter than `text_threshold` get a `varchar` sized to the
    /// longest observed value; longer ones become `TEXT`.
    pub fn for_column(sql_type: SqlType, max_length: usize, text_threshold: usize) -> Self {
        match sql_type {
            SqlType::Integer => ColumnKind::Integer,
            SqlType::Float => ColumnKind::Float,
            SqlType::String if max_length < text_threshold => ColumnKind::Varchar(max_length),
            SqlType::String => ColumnKind::Text,
        }
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnKind::Integer => f.write_str("INT"),
            ColumnKind::Float => f.write_str("FLOAT"),
            ColumnKind::Varchar(length) => write!(f, "varchar({length})"),
            ColumnKind::Text => f.write_str("TEXT"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnClause {
    pub name: String,
    pub kind: ColumnKind,
    pub not_null: bool,
}

impl fmt::Display for ColumnClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", quote_identifier(&self.name), self.kind)?;
        if self.not_null {
            f.write_str(" NOT NULL")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTable {
    pub table: String,
    pub columns: Vec<ColumnClause>,
    pub primary_key: Option<String>,
}

impl CreateTable {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
            primary_key: None,
        }
    }

    pub fn column(mut self, name: impl Into<String>, kind: ColumnKind) -> Self {
        self.columns.push(ColumnClause {
            name: name.into(),
            kind,
            not_null: false,
        });
        self
    }

    /// Declares `name` as the primary key and marks it `NOT NULL`.
    pub fn primary_key(mut self, name: &str) -> Self {
        for clause in self.columns.iter_mut().filter(|c| c.name == name) {
            clause.not_null = true;
        }
        self.primary_key = Some(name.to_string());
        self
    }

    pub fn from_schema(table: &str, schema: &InferredSchema, text_threshold: usize) -> Self {
        let statement = schema.columns.iter().fold(Self::new(table), |statement, column| {
            statement.column(
                column.name.clone(),
                ColumnKind::for_column(column.sql_type, column.max_length, text_threshold),
            )
        });
        statement.primary_key(&schema.key_column().name)
    }
}

impl fmt::Display for CreateTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut clauses = self.columns.iter().map(|c| c.to_string()).collect_vec();
        if let Some(key) = &self.primary_key {
            clauses.push(format!("PRIMARY KEY ({})", quote_identifier(key)));
        }
        write!(
            f,
            "CREATE TABLE {} ({})",
            quote_identifier(&self.table),
            clauses.join(", ")
        )
    }
}

/// A rendered value; escaping happens when the literal is displayed.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Quoted(String),
    Bare(String),
    Null,
}

impl Literal {
    pub fn text(value: impl Into<String>) -> Self {
        Literal::Quoted(value.into())
    }

    pub fn number(value: impl ToString) -> Self {
        Literal::Bare(value.to_string())
    }

    pub fn for_type(sql_type: SqlType, raw: &str) -> Self {
        if sql_type.is_numeric() {
            Literal::Bare(raw.to_string())
        } else {
            Literal::Quoted(raw.to_string())
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Quoted(value) => f.write_str(&quote_literal(value)),
            Literal::Bare(value) => f.write_str(value),
            Literal::Null => f.write_str("NULL"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Insert {
    pub table: String,
    pub columns: Vec<String>,
    pub values: Vec<Literal>,
}

impl Insert {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
            values: Vec::new(),
        }
    }

    pub fn value(mut self, column: impl Into<String>, literal: Literal) -> Self {
        self.columns.push(column.into());
        self.values.push(literal);
        self
    }

    /// Builds the insert for one source row, omitting every null-marker cell.
    ///
    /// Returns `None` when no cell survives.
    pub fn from_row<S: AsRef<str>>(
        table: &str,
        schema: &InferredSchema,
        row: &[S],
        null_markers: &NullMarkers,
    ) -> Option<Self> {
        let insert = schema
            .columns
            .iter()
            .zip(row)
            .map(|(column, raw)| (column, raw.as_ref()))
            .filter(|(_, raw)| !null_markers.is_null(raw))
            .fold(Self::new(table), |insert, (column, raw)| {
                insert.value(column.name.clone(), Literal::for_type(column.sql_type, raw))
            });
        (!insert.columns.is_empty()).then_some(insert)
    }
}

impl fmt::Display for Insert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "INSERT INTO {} ({}) VALUES ({})",
            quote_identifier(&self.table),
            self.columns.iter().map(|c| quote_identifier(c)).join(", "),
            self.values.iter().join(", ")
        )
    }
}
