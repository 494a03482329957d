//! Per-file schema inference.
//!
//! [`SchemaBuilder`] consumes rows one at a time and tracks, per column, the
//! widening type cursor and the longest rendered non-null value. The finished
//! [`InferredSchema`] keeps the header order of the source file and remembers
//! which column is the table key (the first one unless overridden).

use std::{fs, path::Path};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::{
    inference::{NullMarkers, SqlType, TypeInference},
    interrupt::Interrupt,
    io_utils::InputFormat,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnProfile {
    pub name: String,
    pub sql_type: SqlType,
    /// Longest non-null value, in characters.
    pub max_length: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferredSchema {
    pub columns: Vec<ColumnProfile>,
    pub key_index: usize,
    pub rows_scanned: usize,
}

impl InferredSchema {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn key_column(&self) -> &ColumnProfile {
        &self.columns[self.key_index]
    }

    pub fn with_key_column(mut self, name: &str) -> Result<Self> {
        self.key_index = self
            .column_index(name)
            .ok_or_else(|| anyhow!("Key column '{name}' not found in header"))?;
        Ok(self)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let serialized = serde_yaml::to_string(self).context("Serializing schema")?;
        fs::write(path, serialized).with_context(|| format!("Writing schema to {path:?}"))
    }
}

#[derive(Debug, Clone)]
struct ColumnState {
    inference: TypeInference,
    max_length: usize,
}

pub struct SchemaBuilder<'a> {
    headers: Vec<String>,
    columns: Vec<ColumnState>,
    null_markers: &'a NullMarkers,
    rows_scanned: usize,
}

impl<'a> SchemaBuilder<'a> {
    pub fn new(headers: Vec<String>, null_markers: &'a NullMarkers) -> Self {
        let columns = vec![
            ColumnState {
                inference: TypeInference::new(),
                max_length: 0,
            };
            headers.len()
        ];
        Self {
            headers,
            columns,
            null_markers,
            rows_scanned: 0,
        }
    }

    pub fn observe_row<S: AsRef<str>>(&mut self, row: &[S]) {
        self.rows_scanned += 1;
        for (state, value) in self.columns.iter_mut().zip(row) {
            let value = value.as_ref();
            if self.null_markers.is_null(value) {
                continue;
            }
            state.max_length = state.max_length.max(value.chars().count());
            if !state.inference.is_settled() {
                state.inference.observe(value);
            }
        }
    }

    pub fn finish(self) -> InferredSchema {
        let columns = self
            .headers
            .into_iter()
            .zip(self.columns)
            .map(|(name, state)| ColumnProfile {
                name,
                sql_type: state.inference.candidate(),
                max_length: state.max_length,
            })
            .collect();
        InferredSchema {
            columns,
            key_index: 0,
            rows_scanned: self.rows_scanned,
        }
    }
}

/// Scans the whole file once and infers its schema.
pub fn infer_schema(
    path: &Path,
    format: &InputFormat,
    null_markers: &NullMarkers,
    interrupt: &Interrupt,
) -> Result<InferredSchema> {
    let mut reader = format.open(path)?;
    let mut builder = SchemaBuilder::new(reader.headers().to_vec(), null_markers);
    while let Some(row) = reader
        .next_row()
        .with_context(|| format!("Inferring schema of {path:?}"))?
    {
        interrupt.check()?;
        builder.observe_row(&row);
    }
    Ok(builder.finish())
}
